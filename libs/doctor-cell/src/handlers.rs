use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, DoctorError, UpdateDoctorRequest};
use crate::services::doctor::DoctorService;

#[derive(Debug, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialization: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[axum::debug_handler]
pub async fn search_doctors_public(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    // Anon-key read; the directory listing is public
    let doctor_service = DoctorService::new(&state);

    let listing = doctor_service
        .search_doctors(
            query.specialization.as_deref(),
            query.page.unwrap_or(1),
            query.limit.unwrap_or(10),
            None,
        )
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(listing)))
}

#[axum::debug_handler]
pub async fn get_doctor_public(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .get_doctor(doctor_id, None)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .create_doctor(request, token)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Doctor profile created successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .update_doctor(doctor_id, request, token)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Doctor profile updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let doctor_service = DoctorService::new(&state);

    doctor_service
        .delete_doctor(doctor_id, token)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Doctor removed"
    })))
}

fn map_doctor_error(err: DoctorError) -> AppError {
    match err {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::EmailAlreadyExists { email } => {
            AppError::Conflict(format!("Doctor with email {} already exists", email))
        }
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::Unauthorized => {
            AppError::Auth("Not authorized to access doctor data".to_string())
        }
        DoctorError::Unavailable(msg) => AppError::Unavailable(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}
