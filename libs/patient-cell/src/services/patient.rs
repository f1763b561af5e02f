use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};

use crate::models::{Patient, PatientError};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Resolve a patient identity by id.
    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_db_error)?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }
}

fn map_db_error(err: DbError) -> PatientError {
    match err {
        DbError::Unavailable(msg) => PatientError::Unavailable(msg),
        DbError::Unauthorized(_) => PatientError::Unauthorized,
        other => PatientError::DatabaseError(other.to_string()),
    }
}
