use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    /// Calendar day of the visit. The time of day is carried by `time_slot`;
    /// conflict checks normalize this to the containing day.
    pub date: DateTime<Utc>,
    /// Doctor-published slot token, e.g. "09:00-09:30".
    pub time_slot: String,
    pub status: AppointmentStatus,
    pub reason: String,
    pub symptoms: String,
    pub notes: Option<String>,
    pub prescriptions: Vec<Prescription>,
    pub directions_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub medicine: String,
    pub dosage: String,
    pub duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Terminal statuses admit no further status transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Booking request. Required fields stay optional here so a missing field
/// surfaces as a validation failure rather than a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    /// Defaults to the caller; admins may book on behalf of a patient.
    pub patient_id: Option<Uuid>,
    pub doctor_id: Uuid,
    pub date: Option<DateTime<Utc>>,
    pub time_slot: Option<String>,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub directions_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub date: Option<DateTime<Utc>>,
    pub time_slot: Option<String>,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub status: Option<AppointmentStatus>,
    /// Appended to the existing list, never replacing it.
    pub prescriptions: Option<Vec<Prescription>>,
}

impl UpdateAppointmentRequest {
    /// Present-and-non-empty test used by the partial-update semantics:
    /// an empty string keeps the stored value.
    pub fn effective(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

// ==============================================================================
// LISTING MODELS
// ==============================================================================

/// Display attributes joined from the doctor directory for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorInfo {
    pub full_name: String,
    pub specialization: String,
    pub email: String,
}

/// Display attributes joined from the patient directory for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInfo {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSummary {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientInfo>,
}

/// Admin listing envelope. `totalPages` keeps the public wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedAppointments {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
    pub appointments: Vec<AppointmentSummary>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("This time slot is already booked")]
    SlotTaken,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
