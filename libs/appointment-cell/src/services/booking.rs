use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::doctor::DoctorService;
use doctor_cell::models::DoctorError;
use patient_cell::services::patient::PatientService;
use patient_cell::models::PatientError;
use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};
use shared_models::auth::CallerContext;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AppointmentSummary,
    BookAppointmentRequest, DoctorInfo, PaginatedAppointments, PatientInfo,
    UpdateAppointmentRequest,
};
use crate::services::conflict::SlotConflictService;
use crate::services::policy;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https?://.+$").unwrap())
}

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    conflict_service: SlotConflictService,
    doctor_directory: DoctorService,
    patient_directory: PatientService,
    require_directions_link: bool,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let conflict_service = SlotConflictService::new(Arc::clone(&supabase));

        Self {
            conflict_service,
            doctor_directory: DoctorService::new(config),
            patient_directory: PatientService::new(config),
            supabase,
            require_directions_link: config.require_directions_link,
        }
    }

    /// Book an appointment: validate, resolve the doctor, run the
    /// conflict pre-check, then persist with status pending. A store-level
    /// uniqueness violation (lost race) surfaces as SlotTaken.
    pub async fn book_appointment(
        &self,
        ctx: &CallerContext,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let validated = self.validate_booking_request(&request)?;

        // Patients book for themselves; admins may book on behalf
        let patient_id = request.patient_id.unwrap_or(ctx.actor_id);
        if patient_id != ctx.actor_id && !ctx.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        info!(
            "Booking appointment for patient {} with doctor {} at {} {}",
            patient_id, request.doctor_id, validated.date, validated.time_slot
        );

        self.patient_directory
            .get_patient(patient_id, auth_token)
            .await
            .map_err(|e| match e {
                PatientError::NotFound => AppointmentError::PatientNotFound,
                PatientError::Unavailable(msg) => AppointmentError::Unavailable(msg),
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        let doctor = self
            .doctor_directory
            .get_doctor(request.doctor_id, Some(auth_token))
            .await
            .map_err(|e| match e {
                DoctorError::NotFound => AppointmentError::DoctorNotFound,
                DoctorError::Unavailable(msg) => AppointmentError::Unavailable(msg),
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        if !doctor.publishes_slot(&validated.time_slot) {
            warn!(
                "Requested slot {} is not in doctor {}'s published slots",
                validated.time_slot, doctor.id
            );
        }

        let taken = self
            .conflict_service
            .is_slot_taken(doctor.id, validated.date, &validated.time_slot, None, auth_token)
            .await?;
        if taken {
            return Err(AppointmentError::SlotTaken);
        }

        let appointment_data = json!({
            "patient_id": patient_id,
            "doctor_id": doctor.id,
            "date": validated.date.to_rfc3339(),
            "time_slot": validated.time_slot,
            "status": AppointmentStatus::Pending,
            "reason": validated.reason,
            "symptoms": validated.symptoms,
            "notes": request.notes,
            "prescriptions": [],
            "directions_link": request.directions_link,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(map_db_error)?;

        let appointment: Appointment = result
            .first()
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
            })?
            .ok_or_else(|| {
                AppointmentError::DatabaseError("Failed to create appointment".to_string())
            })?;

        info!("Appointment {} booked successfully", appointment.id);
        Ok(appointment)
    }

    /// Fetch a single appointment, enforcing the read ownership rule.
    pub async fn get_appointment(
        &self,
        ctx: &CallerContext,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        policy::resolve_relation(ctx, appointment.patient_id, appointment.doctor_id)
            .ok_or(AppointmentError::Unauthorized)?;

        Ok(appointment)
    }

    /// All appointments for a patient, newest date first, enriched with
    /// doctor display attributes.
    pub async fn list_by_patient(
        &self,
        ctx: &CallerContext,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AppointmentSummary>, AppointmentError> {
        if ctx.actor_id != patient_id && !ctx.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        debug!("Listing appointments for patient {}", patient_id);

        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=date.desc",
            patient_id
        );
        let appointments = self.fetch_appointments(&path, auth_token).await?;

        Ok(self.enrich(appointments, true, false, auth_token).await)
    }

    /// All appointments for a doctor, newest date first, enriched with
    /// patient display attributes.
    pub async fn list_by_doctor(
        &self,
        ctx: &CallerContext,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AppointmentSummary>, AppointmentError> {
        if ctx.actor_id != doctor_id && !ctx.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        debug!("Listing appointments for doctor {}", doctor_id);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=date.desc",
            doctor_id
        );
        let appointments = self.fetch_appointments(&path, auth_token).await?;

        Ok(self.enrich(appointments, false, true, auth_token).await)
    }

    /// Admin view over all appointments, paginated.
    pub async fn list_all(
        &self,
        ctx: &CallerContext,
        page: u32,
        limit: u32,
        auth_token: &str,
    ) -> Result<PaginatedAppointments, AppointmentError> {
        if !ctx.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        let page = page.max(1);
        let limit = limit.max(1);
        let offset = (page - 1) * limit;

        debug!("Listing all appointments, page {} limit {}", page, limit);

        let path = format!(
            "/rest/v1/appointments?order=date.desc&limit={}&offset={}",
            limit, offset
        );

        let (appointments, total): (Vec<Appointment>, u64) = self
            .supabase
            .request_with_count(Method::GET, &path, Some(auth_token))
            .await
            .map_err(map_db_error)?;

        let items = self.enrich(appointments, true, true, auth_token).await;

        Ok(PaginatedAppointments {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit as u64),
            appointments: items,
        })
    }

    /// Role-scoped partial update. Fields merge with
    /// replace-if-present-and-non-empty semantics; prescriptions append.
    pub async fn update_appointment(
        &self,
        ctx: &CallerContext,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment: {}", appointment_id);

        let current = self.fetch_appointment(appointment_id, auth_token).await?;

        let relation = policy::resolve_relation(ctx, current.patient_id, current.doctor_id)
            .ok_or(AppointmentError::Unauthorized)?;

        policy::authorize_update(relation, &request)?;

        if let Some(new_status) = &request.status {
            if current.status.is_terminal() && *new_status != current.status {
                return Err(AppointmentError::InvalidStatusTransition(current.status));
            }
        }

        // Re-run the conflict check when the booking moves
        let effective_date = request.date.unwrap_or(current.date);
        let effective_slot = UpdateAppointmentRequest::effective(&request.time_slot)
            .unwrap_or(&current.time_slot)
            .to_string();
        let moved = effective_date != current.date || effective_slot != current.time_slot;

        if moved {
            let taken = self
                .conflict_service
                .is_slot_taken(
                    current.doctor_id,
                    effective_date,
                    &effective_slot,
                    Some(appointment_id),
                    auth_token,
                )
                .await?;
            if taken {
                return Err(AppointmentError::SlotTaken);
            }
        }

        let mut update_data = serde_json::Map::new();

        if let Some(date) = request.date {
            update_data.insert("date".to_string(), json!(date.to_rfc3339()));
        }
        if let Some(slot) = UpdateAppointmentRequest::effective(&request.time_slot) {
            update_data.insert("time_slot".to_string(), json!(slot));
        }
        if let Some(reason) = UpdateAppointmentRequest::effective(&request.reason) {
            update_data.insert("reason".to_string(), json!(reason));
        }
        if let Some(symptoms) = UpdateAppointmentRequest::effective(&request.symptoms) {
            update_data.insert("symptoms".to_string(), json!(symptoms));
        }
        if let Some(notes) = UpdateAppointmentRequest::effective(&request.notes) {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if let Some(status) = &request.status {
            update_data.insert("status".to_string(), json!(status));
        }
        if let Some(new_prescriptions) = &request.prescriptions {
            if !new_prescriptions.is_empty() {
                // Append-only: existing entries are never rewritten
                let mut combined = current.prescriptions.clone();
                combined.extend(new_prescriptions.iter().cloned());
                update_data.insert("prescriptions".to_string(), json!(combined));
            }
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(map_db_error)?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        let updated: Appointment = serde_json::from_value(result[0].clone()).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
        })?;

        info!("Appointment {} updated successfully", appointment_id);
        Ok(updated)
    }

    /// Hard delete, gated by the same ownership rule as reads.
    pub async fn delete_appointment(
        &self,
        ctx: &CallerContext,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        debug!("Deleting appointment: {}", appointment_id);

        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        policy::resolve_relation(ctx, appointment.patient_id, appointment.doctor_id)
            .ok_or(AppointmentError::Unauthorized)?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.supabase
            .execute(Method::DELETE, &path, Some(auth_token))
            .await
            .map_err(map_db_error)?;

        info!("Appointment {} removed", appointment_id);
        Ok(())
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn fetch_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_db_error)?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone()).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
        })
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(map_db_error)?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })
    }

    fn validate_booking_request(
        &self,
        request: &BookAppointmentRequest,
    ) -> Result<ValidatedBooking, AppointmentError> {
        let date = request.date.ok_or_else(|| {
            AppointmentError::ValidationError("Please add appointment date".to_string())
        })?;

        let time_slot = non_empty(&request.time_slot).ok_or_else(|| {
            AppointmentError::ValidationError("Please add appointment time slot".to_string())
        })?;

        let reason = non_empty(&request.reason).ok_or_else(|| {
            AppointmentError::ValidationError("Please add reason for appointment".to_string())
        })?;

        let symptoms = non_empty(&request.symptoms).ok_or_else(|| {
            AppointmentError::ValidationError("Please describe your symptoms".to_string())
        })?;

        match &request.directions_link {
            Some(link) if !url_pattern().is_match(link) => {
                return Err(AppointmentError::ValidationError(format!(
                    "{} is not a valid URL",
                    link
                )));
            }
            None if self.require_directions_link => {
                return Err(AppointmentError::ValidationError(
                    "Please provide a driving directions link".to_string(),
                ));
            }
            _ => {}
        }

        Ok(ValidatedBooking {
            date,
            time_slot,
            reason,
            symptoms,
        })
    }

    /// Join doctor/patient display attributes onto listings. Lookup
    /// failures are logged and swallowed; the listing itself still returns.
    async fn enrich(
        &self,
        appointments: Vec<Appointment>,
        with_doctor: bool,
        with_patient: bool,
        auth_token: &str,
    ) -> Vec<AppointmentSummary> {
        let mut doctor_cache: HashMap<Uuid, Option<DoctorInfo>> = HashMap::new();
        let mut patient_cache: HashMap<Uuid, Option<PatientInfo>> = HashMap::new();
        let mut summaries = Vec::with_capacity(appointments.len());

        for appointment in appointments {
            let doctor = if with_doctor {
                if !doctor_cache.contains_key(&appointment.doctor_id) {
                    let info = match self
                        .doctor_directory
                        .get_doctor(appointment.doctor_id, Some(auth_token))
                        .await
                    {
                        Ok(d) => Some(DoctorInfo {
                            full_name: d.full_name,
                            specialization: d.specialization,
                            email: d.email,
                        }),
                        Err(e) => {
                            warn!(
                                "Doctor lookup failed for listing enrichment ({}): {}",
                                appointment.doctor_id, e
                            );
                            None
                        }
                    };
                    doctor_cache.insert(appointment.doctor_id, info);
                }
                doctor_cache.get(&appointment.doctor_id).cloned().flatten()
            } else {
                None
            };

            let patient = if with_patient {
                if !patient_cache.contains_key(&appointment.patient_id) {
                    let info = match self
                        .patient_directory
                        .get_patient(appointment.patient_id, auth_token)
                        .await
                    {
                        Ok(p) => Some(PatientInfo {
                            full_name: p.full_name,
                            email: p.email,
                        }),
                        Err(e) => {
                            warn!(
                                "Patient lookup failed for listing enrichment ({}): {}",
                                appointment.patient_id, e
                            );
                            None
                        }
                    };
                    patient_cache.insert(appointment.patient_id, info);
                }
                patient_cache.get(&appointment.patient_id).cloned().flatten()
            } else {
                None
            };

            summaries.push(AppointmentSummary {
                appointment,
                doctor,
                patient,
            });
        }

        summaries
    }
}

struct ValidatedBooking {
    date: DateTime<Utc>,
    time_slot: String,
    reason: String,
    symptoms: String,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn map_db_error(err: DbError) -> AppointmentError {
    match err {
        // A 409 from the store is the partial unique index rejecting a
        // concurrent booking for the same slot
        DbError::Conflict(_) => AppointmentError::SlotTaken,
        DbError::Unavailable(msg) => AppointmentError::Unavailable(msg),
        DbError::Unauthorized(_) => AppointmentError::Unauthorized,
        other => AppointmentError::DatabaseError(other.to_string()),
    }
}
