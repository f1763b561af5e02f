use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::router::doctor_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    doctor_routes(Arc::new(config))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_get_doctor_by_id() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(
                &doctor_id.to_string(),
                "doctor@example.com",
                "Dr. Test",
                "Cardiology"
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let app = create_test_app(config);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", doctor_id))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["specialization"], json!("Cardiology"));
    assert_eq!(
        body["available_time_slots"].as_array().unwrap().len(),
        3
    );
}

#[tokio::test]
async fn test_get_missing_doctor_returns_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let app = create_test_app(config);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], json!("not_found"));
}

#[tokio::test]
async fn test_search_doctors_pagination_envelope() {
    let mock_server = MockServer::start().await;

    let doctors: Vec<Value> = (0..10)
        .map(|i| {
            MockSupabaseResponses::doctor_response(
                &Uuid::new_v4().to_string(),
                &format!("doctor{}@example.com", i),
                &format!("Dr. Number {}", i),
                "General Practice",
            )
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialization", "eq.General Practice"))
        .and(query_param("limit", "10"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-9/23")
                .set_body_json(json!(doctors)),
        )
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let app = create_test_app(config);

    let request = Request::builder()
        .method("GET")
        .uri("/search?specialization=General%20Practice&page=1&limit=10")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(23));
    assert_eq!(body["totalPages"], json!(3));
    assert_eq!(body["doctors"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_create_doctor_with_duplicate_email_conflicts() {
    let mock_server = MockServer::start().await;
    let existing_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(
                &existing_id.to_string(),
                "taken@example.com",
                "Dr. Incumbent",
                "Dermatology"
            )
        ])))
        .mount(&mock_server)
        .await;

    let test_config = TestConfig::with_supabase_url(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &test_config.jwt_secret, None);
    let app = create_test_app(test_config.to_app_config());

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({
                "full_name": "Dr. Newcomer",
                "email": "taken@example.com",
                "specialization": "Dermatology",
                "experience_years": 4,
                "consultation_fee": 45.0,
                "available_days": ["Monday"],
                "available_time_slots": ["09:00-09:30"]
            })
            .to_string(),
        ))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], json!("conflict"));
}

#[tokio::test]
async fn test_create_doctor_requires_authentication() {
    let config = TestConfig::with_supabase_url("http://127.0.0.1:1").to_app_config();
    let app = create_test_app(config);

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"full_name": "Dr. Nobody"}).to_string()))
        .unwrap();

    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
