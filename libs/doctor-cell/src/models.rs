use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialization: String,
    pub experience_years: i32,
    pub consultation_fee: f64,
    pub available_days: Vec<String>,
    pub available_time_slots: Vec<String>,
    pub rating: f32,
    pub num_reviews: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    /// Whether the doctor has published the given slot token.
    pub fn publishes_slot(&self, time_slot: &str) -> bool {
        self.available_time_slots.iter().any(|s| s == time_slot)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialization: String,
    pub experience_years: i32,
    pub consultation_fee: f64,
    pub available_days: Vec<String>,
    pub available_time_slots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
    pub consultation_fee: Option<f64>,
    pub available_days: Option<Vec<String>>,
    pub available_time_slots: Option<Vec<String>>,
}

/// Paginated directory listing. Field names follow the public wire
/// contract, hence the camelCase total_pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedDoctors {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
    pub doctors: Vec<Doctor>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor with email {email} already exists")]
    EmailAlreadyExists { email: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access to doctor data")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
