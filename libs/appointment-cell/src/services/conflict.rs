use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{DbError, SupabaseClient};

use crate::models::AppointmentError;

/// Decides whether a proposed (doctor, day, slot) triple collides with an
/// existing non-cancelled booking. Read-only pre-filter; the store's
/// partial unique index is what closes the race under concurrency.
pub struct SlotConflictService {
    supabase: Arc<SupabaseClient>,
}

impl SlotConflictService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Check whether the slot is taken on the calendar day containing
    /// `date`. `exclude_appointment_id` lets a reschedule skip the
    /// appointment being moved.
    pub async fn is_slot_taken(
        &self,
        doctor_id: Uuid,
        date: DateTime<Utc>,
        time_slot: &str,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let (day_start, day_end) = day_bounds(date);

        debug!(
            "Checking slot {} for doctor {} on [{}, {})",
            time_slot, doctor_id, day_start, day_end
        );

        let mut query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            format!("date=gte.{}", urlencoding::encode(&day_start.to_rfc3339())),
            format!("date=lt.{}", urlencoding::encode(&day_end.to_rfc3339())),
            format!("time_slot=eq.{}", urlencoding::encode(time_slot)),
            "status=neq.cancelled".to_string(),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        query_parts.push("limit=1".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| match e {
                DbError::Unavailable(msg) => AppointmentError::Unavailable(msg),
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        let taken = !result.is_empty();
        if taken {
            warn!(
                "Slot {} already booked for doctor {} on {}",
                time_slot,
                doctor_id,
                day_start.date_naive()
            );
        }

        Ok(taken)
    }
}

/// Closed-open interval covering the calendar day of `date`:
/// [start of day, start of next day).
pub fn day_bounds(date: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let day_start = date.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
    (day_start, day_start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let date = Utc.with_ymd_and_hms(2024, 6, 1, 14, 30, 0).unwrap();
        let (start, end) = day_bounds(date);

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn day_bounds_have_no_gap_at_the_last_second() {
        // The final second of the day falls inside the interval; the old
        // 23:59:59 cap would have excluded times past it.
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 59).unwrap()
            + Duration::milliseconds(500);
        let (start, end) = day_bounds(late);

        assert!(late >= start && late < end);
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn midnight_belongs_to_the_new_day() {
        let midnight = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
        let (start, _) = day_bounds(midnight);

        assert_eq!(start, midnight);
    }
}
