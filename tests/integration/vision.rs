//! Vision endpoint tests
//!
//! POST /vision relays a base64 photo to the OpenAI vision model and
//! returns the model's JSON analysis as the response body. The server-side
//! analysis prompt is only injected for requests carrying the gateway's
//! own app identifier.

use serde_json::{json, Value};

use axum::http::StatusCode;

use crate::common::{constants, GatewayHarness};
use gateway::middleware::signature::sign;

/// POST /vision signed and tagged with the gateway's app identifier
async fn post_vision_as_app(harness: &GatewayHarness, body: &Value) -> axum_test::TestResponse {
    let signature = sign(constants::TEST_SESSION_SECRET, "/vision");
    harness
        .server
        .post("/vision")
        .add_header("x-signature".parse::<axum::http::HeaderName>().unwrap(), signature.parse::<axum::http::HeaderValue>().unwrap())
        .add_header(
            "x-app-identifier".parse::<axum::http::HeaderName>().unwrap(),
            constants::TEST_APP_IDENTIFIER
                .parse::<axum::http::HeaderValue>()
                .unwrap(),
        )
        .json(body)
        .await
}

#[tokio::test]
async fn test_vision_returns_parsed_analysis() {
    let harness = GatewayHarness::start().await;
    harness
        .openai
        .mock_chat_completion(
            "```json\n{\"name\": \"Pasta Carbonara\", \"total_calories_estimation\": 450}\n```",
        )
        .await;

    let response = post_vision_as_app(
        &harness,
        &json!({"image": "base64data", "language": "English"}),
    )
    .await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["name"], "Pasta Carbonara");
    assert_eq!(body["total_calories_estimation"], 450);
}

#[tokio::test]
async fn test_vision_accepts_bare_json() {
    let harness = GatewayHarness::start().await;
    harness
        .openai
        .mock_chat_completion("{\"name\": \"Salad\", \"total_calories_estimation\": 120}")
        .await;

    let response = post_vision_as_app(&harness, &json!({"image": "base64data"})).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Salad");
}

#[tokio::test]
async fn test_vision_missing_image_rejected() {
    let harness = GatewayHarness::start().await;
    harness.openai.mock_chat_completion("unreachable").await;

    let response = harness
        .post_signed("/vision", &json!({"language": "English"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Missing \"image\" in request body");

    // An empty string counts as missing
    let response = harness
        .post_signed("/vision", &json!({"image": "", "language": "English"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    assert!(harness.openai.received_requests().await.is_empty());
}

#[tokio::test]
async fn test_vision_payload_for_own_app() {
    let harness = GatewayHarness::start().await;
    harness.openai.mock_chat_completion("{}").await;

    post_vision_as_app(
        &harness,
        &json!({"image": "base64data", "language": "Spanish"}),
    )
    .await
    .assert_status_ok();

    let payload = harness.openai.single_request_body().await;
    assert_eq!(payload["model"], "gpt-4o");
    assert_eq!(payload["max_tokens"], 1000);

    let system_text = payload["messages"][0]["content"][0]["text"]
        .as_str()
        .unwrap();
    assert!(
        system_text.contains("Name the meal in Spanish."),
        "Prompt should interpolate the language (got {})",
        system_text
    );

    let image_url = &payload["messages"][1]["content"][0]["image_url"];
    assert_eq!(image_url["url"], "data:image/jpeg;base64,base64data");
    assert_eq!(image_url["detail"], "low");
}

#[tokio::test]
async fn test_vision_foreign_app_gets_empty_prompt() {
    let harness = GatewayHarness::start().await;
    harness.openai.mock_chat_completion("{}").await;

    // No x-app-identifier header on this request
    harness
        .post_signed("/vision", &json!({"image": "base64data", "language": "Spanish"}))
        .await
        .assert_status_ok();

    let payload = harness.openai.single_request_body().await;
    assert_eq!(payload["messages"][0]["content"][0]["text"], "");
}

#[tokio::test]
async fn test_vision_unparseable_response() {
    let harness = GatewayHarness::start().await;
    harness
        .openai
        .mock_chat_completion("I cannot identify this meal.")
        .await;

    let response = post_vision_as_app(&harness, &json!({"image": "base64data"})).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to parse vision response as JSON"),
        "Unexpected error message: {}",
        body["error"]
    );
}
