use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{CallerContext, Role};

use crate::models::{AppointmentError, AppointmentStatus, UpdateAppointmentRequest};

/// The caller's relationship to a specific appointment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRelation {
    Owner,
    AssignedDoctor,
    Admin,
}

/// Fields an update request can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentField {
    Date,
    TimeSlot,
    Reason,
    Symptoms,
    Notes,
    Status,
    Prescriptions,
}

impl AppointmentField {
    fn name(&self) -> &'static str {
        match self {
            AppointmentField::Date => "date",
            AppointmentField::TimeSlot => "time_slot",
            AppointmentField::Reason => "reason",
            AppointmentField::Symptoms => "symptoms",
            AppointmentField::Notes => "notes",
            AppointmentField::Status => "status",
            AppointmentField::Prescriptions => "prescriptions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Allowed,
    Forbidden,
    /// Writable, but only to the listed values.
    RestrictedTo(&'static [AppointmentStatus]),
}

/// Resolve the strongest relation the caller holds on the record.
/// Admin wins over assigned doctor, which wins over owner.
pub fn resolve_relation(
    ctx: &CallerContext,
    patient_id: Uuid,
    doctor_id: Uuid,
) -> Option<CallerRelation> {
    if ctx.role == Role::Admin {
        Some(CallerRelation::Admin)
    } else if ctx.actor_id == doctor_id {
        Some(CallerRelation::AssignedDoctor)
    } else if ctx.actor_id == patient_id {
        Some(CallerRelation::Owner)
    } else {
        None
    }
}

/// The role x field mutation table. Evaluated once per update call.
pub fn rule_for(relation: CallerRelation, field: AppointmentField) -> FieldRule {
    use AppointmentField::*;
    use CallerRelation::*;
    use FieldRule::*;

    match (relation, field) {
        // Patients manage their own narrative fields and may back out of
        // a booking, nothing else.
        (Owner, Reason | Symptoms | Notes) => Allowed,
        (Owner, Status) => RestrictedTo(&[AppointmentStatus::Cancelled]),
        (Owner, Date | TimeSlot | Prescriptions) => Forbidden,

        // The assigned doctor owns the clinical side of the record.
        (AssignedDoctor, _) => Allowed,

        // Admins manage scheduling and status, but prescriptions stay
        // with the assigned doctor.
        (Admin, Prescriptions) => Forbidden,
        (Admin, _) => Allowed,
    }
}

/// Check every field the request touches against the table.
pub fn authorize_update(
    relation: CallerRelation,
    request: &UpdateAppointmentRequest,
) -> Result<(), AppointmentError> {
    debug!("Authorizing update for relation {:?}", relation);

    let mut touched: Vec<AppointmentField> = Vec::new();
    if request.date.is_some() {
        touched.push(AppointmentField::Date);
    }
    if UpdateAppointmentRequest::effective(&request.time_slot).is_some() {
        touched.push(AppointmentField::TimeSlot);
    }
    if UpdateAppointmentRequest::effective(&request.reason).is_some() {
        touched.push(AppointmentField::Reason);
    }
    if UpdateAppointmentRequest::effective(&request.symptoms).is_some() {
        touched.push(AppointmentField::Symptoms);
    }
    if UpdateAppointmentRequest::effective(&request.notes).is_some() {
        touched.push(AppointmentField::Notes);
    }
    if request.status.is_some() {
        touched.push(AppointmentField::Status);
    }
    if request.prescriptions.as_ref().is_some_and(|p| !p.is_empty()) {
        touched.push(AppointmentField::Prescriptions);
    }

    for field in touched {
        match rule_for(relation, field) {
            FieldRule::Allowed => {}
            FieldRule::Forbidden => {
                debug!("Field '{}' forbidden for relation {:?}", field.name(), relation);
                return Err(AppointmentError::Unauthorized);
            }
            FieldRule::RestrictedTo(allowed_values) => {
                // Only the status field carries a restricted rule
                if let Some(requested) = request.status.as_ref() {
                    if !allowed_values.contains(requested) {
                        return Err(AppointmentError::Unauthorized);
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn patch() -> UpdateAppointmentRequest {
        UpdateAppointmentRequest::default()
    }

    #[test]
    fn owner_may_edit_narrative_fields() {
        let request = UpdateAppointmentRequest {
            reason: Some("Follow-up on medication".to_string()),
            symptoms: Some("Less coughing".to_string()),
            notes: Some("Prefers mornings".to_string()),
            ..patch()
        };

        assert_matches!(authorize_update(CallerRelation::Owner, &request), Ok(()));
    }

    #[test]
    fn owner_may_cancel_but_not_confirm() {
        let cancel = UpdateAppointmentRequest {
            status: Some(AppointmentStatus::Cancelled),
            ..patch()
        };
        assert_matches!(authorize_update(CallerRelation::Owner, &cancel), Ok(()));

        let confirm = UpdateAppointmentRequest {
            status: Some(AppointmentStatus::Confirmed),
            ..patch()
        };
        assert_matches!(
            authorize_update(CallerRelation::Owner, &confirm),
            Err(AppointmentError::Unauthorized)
        );
    }

    #[test]
    fn owner_may_not_reschedule_or_prescribe() {
        let reschedule = UpdateAppointmentRequest {
            time_slot: Some("10:00-10:30".to_string()),
            ..patch()
        };
        assert_matches!(
            authorize_update(CallerRelation::Owner, &reschedule),
            Err(AppointmentError::Unauthorized)
        );

        let prescribe = UpdateAppointmentRequest {
            prescriptions: Some(vec![crate::models::Prescription {
                medicine: "Amoxicillin".to_string(),
                dosage: "500mg".to_string(),
                duration: "7 days".to_string(),
            }]),
            ..patch()
        };
        assert_matches!(
            authorize_update(CallerRelation::Owner, &prescribe),
            Err(AppointmentError::Unauthorized)
        );
    }

    #[test]
    fn assigned_doctor_may_edit_everything() {
        let request = UpdateAppointmentRequest {
            date: Some(chrono::Utc::now()),
            time_slot: Some("11:00-11:30".to_string()),
            reason: Some("Rescheduled follow-up".to_string()),
            status: Some(AppointmentStatus::Completed),
            prescriptions: Some(vec![crate::models::Prescription {
                medicine: "Ibuprofen".to_string(),
                dosage: "200mg".to_string(),
                duration: "5 days".to_string(),
            }]),
            ..patch()
        };

        assert_matches!(
            authorize_update(CallerRelation::AssignedDoctor, &request),
            Ok(())
        );
    }

    #[test]
    fn admin_may_manage_scheduling_but_not_prescriptions() {
        let reschedule = UpdateAppointmentRequest {
            date: Some(chrono::Utc::now()),
            status: Some(AppointmentStatus::Confirmed),
            ..patch()
        };
        assert_matches!(authorize_update(CallerRelation::Admin, &reschedule), Ok(()));

        let prescribe = UpdateAppointmentRequest {
            prescriptions: Some(vec![crate::models::Prescription {
                medicine: "Amoxicillin".to_string(),
                dosage: "500mg".to_string(),
                duration: "7 days".to_string(),
            }]),
            ..patch()
        };
        assert_matches!(
            authorize_update(CallerRelation::Admin, &prescribe),
            Err(AppointmentError::Unauthorized)
        );
    }

    #[test]
    fn empty_strings_do_not_count_as_touched_fields() {
        // Replace-if-present-and-non-empty: an empty time_slot is "keep",
        // so the owner is not rejected for it.
        let request = UpdateAppointmentRequest {
            time_slot: Some("".to_string()),
            reason: Some("Updated reason".to_string()),
            ..patch()
        };

        assert_matches!(authorize_update(CallerRelation::Owner, &request), Ok(()));
    }

    #[test]
    fn relation_resolution_prefers_admin_then_doctor_then_owner() {
        let patient_id = Uuid::new_v4();
        let doctor_id = Uuid::new_v4();

        let admin = CallerContext::new(Uuid::new_v4(), Role::Admin);
        assert_eq!(
            resolve_relation(&admin, patient_id, doctor_id),
            Some(CallerRelation::Admin)
        );

        let doctor = CallerContext::new(doctor_id, Role::Doctor);
        assert_eq!(
            resolve_relation(&doctor, patient_id, doctor_id),
            Some(CallerRelation::AssignedDoctor)
        );

        let owner = CallerContext::new(patient_id, Role::Patient);
        assert_eq!(
            resolve_relation(&owner, patient_id, doctor_id),
            Some(CallerRelation::Owner)
        );

        let stranger = CallerContext::new(Uuid::new_v4(), Role::Patient);
        assert_eq!(resolve_relation(&stranger, patient_id, doctor_id), None);
    }
}
