//! Input handling of the add-funds function endpoint. Rejections happen before
//! any backend call; the database is reachable but never migrated, so a
//! request that gets through fails with a backend error.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rstest::rstest;
use serde_json::{json, Value};
use uuid::Uuid;

const ADD_FUNDS: &str = "/api/v1/functions/add-funds";

#[rstest]
#[case::empty_body(json!({}))]
#[case::missing_amount(json!({ "site_id": Uuid::new_v4().to_string() }))]
#[case::missing_site(json!({ "amount": 100 }))]
#[case::null_amount(json!({ "site_id": Uuid::new_v4().to_string(), "amount": null }))]
#[case::blank_site(json!({ "site_id": "  ", "amount": "100" }))]
#[tokio::test]
async fn missing_input_is_rejected(#[case] body: Value) {
    let app = TestApp::unmigrated().await;

    let response = app.admin(Method::POST, ADD_FUNDS, Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(response).await,
        json!({ "error": "site_id and amount are required" })
    );
}

#[rstest]
#[case::zero(json!(0))]
#[case::negative(json!("-250"))]
#[case::not_numeric(json!("lots"))]
#[tokio::test]
async fn non_positive_amounts_are_rejected(#[case] amount: Value) {
    let app = TestApp::unmigrated().await;
    let body = json!({ "site_id": Uuid::new_v4().to_string(), "amount": amount });

    let response = app.admin(Method::POST, ADD_FUNDS, Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(response).await["error"],
        "amount must be a positive number"
    );
}

#[rstest]
#[case::fraction_of_paisa(json!("0.001"), "amount must have at most 2 decimal places")]
#[case::beyond_exact_storage(json!("10000000000000"), "amount must not exceed 9999999999999.99")]
#[case::decimal_max(json!("79228162514264337593543950335"), "amount must not exceed 9999999999999.99")]
#[tokio::test]
async fn amounts_storage_would_round_are_rejected(#[case] amount: Value, #[case] expected: &str) {
    let app = TestApp::unmigrated().await;
    let body = json!({ "site_id": Uuid::new_v4().to_string(), "amount": amount });

    let response = app.admin(Method::POST, ADD_FUNDS, Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["error"], expected);
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let app = TestApp::unmigrated().await;
    let token = app.admin_token().to_string();

    let response = app
        .request_raw(Method::POST, ADD_FUNDS, "{\"site_id\":", &token)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_json(response).await["error"].is_string());
}

#[tokio::test]
async fn backend_failure_is_reported_as_500() {
    let app = TestApp::unmigrated().await;
    let body = json!({ "site_id": Uuid::new_v4().to_string(), "amount": "100" });

    let response = app.admin(Method::POST, ADD_FUNDS, Some(body)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let payload = response_json(response).await;
    let message = payload["error"].as_str().expect("error message");
    assert!(message.starts_with("Database error"), "got {message}");
    assert!(payload.get("success").is_none());
}
