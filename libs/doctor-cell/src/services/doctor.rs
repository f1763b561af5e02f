use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};

use crate::models::{
    CreateDoctorRequest, Doctor, DoctorError, PaginatedDoctors, UpdateDoctorRequest,
};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Look a doctor up by id. The directory is the authority on whether a
    /// booking target exists.
    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(map_db_error)?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))
    }

    /// Directory listing with an optional specialization filter.
    pub async fn search_doctors(
        &self,
        specialization: Option<&str>,
        page: u32,
        limit: u32,
        auth_token: Option<&str>,
    ) -> Result<PaginatedDoctors, DoctorError> {
        let page = page.max(1);
        let limit = limit.max(1);
        let offset = (page - 1) * limit;

        let mut query_parts = Vec::new();
        if let Some(spec) = specialization {
            query_parts.push(format!("specialization=eq.{}", urlencoding::encode(spec)));
        }
        query_parts.push(format!("limit={}", limit));
        query_parts.push(format!("offset={}", offset));

        let path = format!("/rest/v1/doctors?{}", query_parts.join("&"));
        debug!("Searching doctors: {}", path);

        let (doctors, total): (Vec<Doctor>, u64) = self
            .supabase
            .request_with_count(Method::GET, &path, auth_token)
            .await
            .map_err(map_db_error)?;

        Ok(PaginatedDoctors {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit as u64),
            doctors,
        })
    }

    /// Register a new doctor profile. Credential handling lives with the
    /// identity provider, not here.
    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Creating new doctor profile for: {}", request.email);

        if request.full_name.trim().is_empty() {
            return Err(DoctorError::ValidationError("Please add a name".to_string()));
        }
        if request.specialization.trim().is_empty() {
            return Err(DoctorError::ValidationError(
                "Please add specialization".to_string(),
            ));
        }
        if request.available_time_slots.is_empty() {
            return Err(DoctorError::ValidationError(
                "Please add available time slots".to_string(),
            ));
        }

        let existing_check_path = format!(
            "/rest/v1/doctors?email=eq.{}",
            urlencoding::encode(&request.email)
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_check_path, Some(auth_token), None)
            .await
            .map_err(map_db_error)?;

        if !existing.is_empty() {
            return Err(DoctorError::EmailAlreadyExists {
                email: request.email,
            });
        }

        let doctor_data = json!({
            "full_name": request.full_name,
            "email": request.email,
            "phone": request.phone,
            "specialization": request.specialization,
            "experience_years": request.experience_years,
            "consultation_fee": request.consultation_fee,
            "available_days": request.available_days,
            "available_time_slots": request.available_time_slots,
            "rating": 0.0,
            "num_reviews": 0,
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
                "/rest/v1/doctors",
                Some(auth_token),
                Some(doctor_data),
                Some(headers),
            )
            .await
            .map_err(map_db_error)?;

        if result.is_empty() {
            return Err(DoctorError::DatabaseError(
                "Failed to create doctor profile".to_string(),
            ));
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;
        debug!("Doctor profile created successfully with ID: {}", doctor.id);

        Ok(doctor)
    }

    /// Partial profile update. Only the provided fields are written.
    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor profile: {}", doctor_id);

        // Confirm the row exists so a bad id is NotFound, not a no-op patch
        self.get_doctor(doctor_id, Some(auth_token)).await?;

        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.full_name {
            update_data.insert("full_name".to_string(), json!(name));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(specialization) = request.specialization {
            update_data.insert("specialization".to_string(), json!(specialization));
        }
        if let Some(experience) = request.experience_years {
            update_data.insert("experience_years".to_string(), json!(experience));
        }
        if let Some(fee) = request.consultation_fee {
            update_data.insert("consultation_fee".to_string(), json!(fee));
        }
        if let Some(days) = request.available_days {
            update_data.insert("available_days".to_string(), json!(days));
        }
        if let Some(slots) = request.available_time_slots {
            update_data.insert("available_time_slots".to_string(), json!(slots));
        }

        update_data.insert(
            "updated_at".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
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
            return Err(DoctorError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))
    }

    pub async fn delete_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        debug!("Deleting doctor profile: {}", doctor_id);

        self.get_doctor(doctor_id, Some(auth_token)).await?;

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        self.supabase
            .execute(Method::DELETE, &path, Some(auth_token))
            .await
            .map_err(map_db_error)?;

        Ok(())
    }
}

fn map_db_error(err: DbError) -> DoctorError {
    match err {
        DbError::Unavailable(msg) => DoctorError::Unavailable(msg),
        DbError::Unauthorized(_) => DoctorError::Unauthorized,
        other => DoctorError::DatabaseError(other.to_string()),
    }
}
