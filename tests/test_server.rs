//! Integration test: HTML form and JSON API endpoints

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use lifestyle_risk::data::{DataLoader, FeatureSchema};
use lifestyle_risk::export::save_pipeline;
use lifestyle_risk::inference::{PredictionResult, Predictor};
use lifestyle_risk::server::{create_router, AppState, ServerConfig};
use lifestyle_risk::training::{build_pipeline, ForestConfig, RiskPipeline};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const FORM: &str = "Age=45&BMI=31.2&SystolicBP=130&DiastolicBP=85&Glucose=140\
                    &Smoker=0&PhysActivity=1&HighChol=0&GenHlth=3";

fn fitted_pipeline() -> RiskPipeline {
    let dir = tempfile::tempdir().unwrap();
    let csv = common::write_vitals_csv(dir.path(), "vitals.csv", 300, 21);
    let data = DataLoader::new(FeatureSchema::vitals()).load(csv).unwrap();
    let mut pipeline = build_pipeline(
        FeatureSchema::vitals(),
        ForestConfig::default().with_n_estimators(10).with_max_depth(Some(6)),
    )
    .unwrap();
    pipeline.fit(&data).unwrap();
    pipeline
}

fn ready_app() -> axum::Router {
    let predictor = Arc::new(Predictor::from_pipeline(fitted_pipeline()).unwrap());
    let state = AppState::with_predictor(ServerConfig::default(), predictor);
    create_router(Arc::new(state))
}

fn unloaded_app() -> axum::Router {
    let config = ServerConfig::default().with_model_path("/nonexistent/lifestyle-risk/model.bin");
    create_router(Arc::new(AppState::new(config)))
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_root_serves_form() {
    let response = ready_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("<form method=\"post\" action=\"/predict\">"));
    for name in FeatureSchema::vitals().feature_names() {
        assert!(html.contains(&format!("name=\"{}\"", name)), "missing input {}", name);
    }
}

#[tokio::test]
async fn test_root_without_model_shows_notice() {
    let response = unloaded_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("No trained model"));
}

#[tokio::test]
async fn test_form_prediction_renders_result() {
    let response = ready_app().oneshot(form_request(FORM)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    for disease in ["Diabetes", "Hypertension", "Obesity"] {
        assert!(html.contains(disease), "no card for {}", disease);
    }
    assert!(html.contains("Obese"));
}

#[tokio::test]
async fn test_form_invalid_input_is_400_page() {
    let body = FORM.replace("Age=45", "Age=old");
    let response = ready_app().oneshot(form_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_string(response).await;
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Age"));
}

#[tokio::test]
async fn test_form_without_model_is_503() {
    let response = unloaded_app().oneshot(form_request(FORM)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_api_predict_json() {
    let record = serde_json::to_string(&common::sample_record()).unwrap();
    let response = ready_app()
        .oneshot(json_request("/api/predict", &record))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: PredictionResult = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(result.predictions.len(), 3);
    let obesity = result.get("Obesity").unwrap();
    assert_eq!(obesity.class, 3);
    assert_eq!(obesity.label, "Obese");
}

#[tokio::test]
async fn test_api_predict_missing_field() {
    let response = ready_app()
        .oneshot(json_request("/api/predict", r#"{"Age": 45, "BMI": 31.2}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], true);
    assert!(body["message"].as_str().unwrap().contains("Glucose"));
}

async fn assert_json_bad_request(response: axum::response::Response) -> String {
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"), "{}", content_type);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], true);
    body["message"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_api_predict_untyped_values_are_json_400() {
    for value in ["null", "true"] {
        let mut record = serde_json::to_value(common::sample_record()).unwrap();
        record["Smoker"] = serde_json::from_str(value).unwrap();
        let response = ready_app()
            .oneshot(json_request("/api/predict", &record.to_string()))
            .await
            .unwrap();
        let message = assert_json_bad_request(response).await;
        assert!(message.contains("deserialize"), "{}: {}", value, message);
    }
}

#[tokio::test]
async fn test_api_predict_malformed_json_is_json_400() {
    let response = ready_app()
        .oneshot(json_request("/api/predict", r#"{"Age":45,"#))
        .await
        .unwrap();
    assert_json_bad_request(response).await;
}

#[tokio::test]
async fn test_model_appearing_after_startup_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("risk.bin");
    let state = Arc::new(AppState::new(ServerConfig::default().with_model_path(&path)));
    let app = create_router(Arc::clone(&state));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(body_string(response).await.contains("No trained model"));

    save_pipeline(&fitted_pipeline(), &path).unwrap();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_string(response).await.contains("No trained model"));

    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["model_state"], "Loaded");
}

#[tokio::test]
async fn test_api_predict_without_model_is_503() {
    let record = serde_json::to_string(&common::sample_record()).unwrap();
    let response = unloaded_app()
        .oneshot(json_request("/api/predict", &record))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_risk_info() {
    let response = unloaded_app()
        .oneshot(Request::builder().uri("/api/risk-info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["schema"], "vitals");
    assert_eq!(body["targets"]["Obesity"]["3"]["label"], "Obese");
    assert_eq!(body["targets"]["Hypertension"]["1"]["color"], "#E74C3C");
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = ready_app()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_state"], "Loaded");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = ready_app()
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
