use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{CallerContext, User};
use shared_models::error::AppError;

use crate::models::{AppointmentError, BookAppointmentRequest, UpdateAppointmentRequest};
use crate::services::booking::AppointmentBookingService;

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let ctx = CallerContext::from_user(&user).map_err(AppError::Auth)?;

    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service
        .book_appointment(&ctx, request, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let ctx = CallerContext::from_user(&user).map_err(AppError::Auth)?;

    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service
        .get_appointment(&ctx, appointment_id, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let ctx = CallerContext::from_user(&user).map_err(AppError::Auth)?;

    let booking_service = AppointmentBookingService::new(&state);

    let appointments = booking_service
        .list_by_patient(&ctx, patient_id, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let ctx = CallerContext::from_user(&user).map_err(AppError::Auth)?;

    let booking_service = AppointmentBookingService::new(&state);

    let appointments = booking_service
        .list_by_doctor(&ctx, doctor_id, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn list_all_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<PaginationQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let ctx = CallerContext::from_user(&user).map_err(AppError::Auth)?;

    let booking_service = AppointmentBookingService::new(&state);

    let listing = booking_service
        .list_all(
            &ctx,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(10),
            token,
        )
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(listing)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let ctx = CallerContext::from_user(&user).map_err(AppError::Auth)?;

    let booking_service = AppointmentBookingService::new(&state);

    let updated = booking_service
        .update_appointment(&ctx, appointment_id, request, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": updated,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let ctx = CallerContext::from_user(&user).map_err(AppError::Auth)?;

    let booking_service = AppointmentBookingService::new(&state);

    booking_service
        .delete_appointment(&ctx, appointment_id, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment removed"
    })))
}

fn map_appointment_error(err: AppointmentError) -> AppError {
    match err {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        AppointmentError::SlotTaken => {
            AppError::Conflict("This time slot is already booked".to_string())
        }
        AppointmentError::Unauthorized => {
            AppError::Auth("Not authorized to access this appointment".to_string())
        }
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::InvalidStatusTransition(status) => {
            AppError::BadRequest(format!("Cannot transition from current status: {}", status))
        }
        AppointmentError::Unavailable(msg) => AppError::Unavailable(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}
