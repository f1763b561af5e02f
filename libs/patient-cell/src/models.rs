use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Patient identity record. This repository only resolves identities and
/// display attributes; patient profiles are written elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Unauthorized access to patient data")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
