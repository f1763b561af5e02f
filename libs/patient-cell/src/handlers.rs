use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{CallerContext, User};
use shared_models::error::AppError;

use crate::models::PatientError;
use crate::services::patient::PatientService;

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let ctx = CallerContext::from_user(&user).map_err(AppError::Auth)?;

    // Patients may read themselves; admins may read anyone
    if ctx.actor_id != patient_id && !ctx.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to view this patient".to_string(),
        ));
    }

    let patient_service = PatientService::new(&state);

    let patient = patient_service
        .get_patient(patient_id, token)
        .await
        .map_err(|e| match e {
            PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
            PatientError::Unauthorized => {
                AppError::Auth("Not authorized to access patient data".to_string())
            }
            PatientError::Unavailable(msg) => AppError::Unavailable(msg),
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        })?;

    Ok(Json(json!(patient)))
}
