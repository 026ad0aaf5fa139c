//! Mock Anthropic API server for testing
//!
//! Provides wiremock-based mocks for POST /v1/messages, including the
//! 529 overloaded responses the gateway retries on.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock Anthropic API server wrapper
pub struct MockAnthropic {
    server: MockServer,
}

impl MockAnthropic {
    /// Start a new mock Anthropic server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the mock server URI
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Get all received requests (for assertion in tests)
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Parse the JSON body of the only received request
    pub async fn single_request_body(&self) -> Value {
        let requests = self.received_requests().await;
        assert_eq!(requests.len(), 1, "expected exactly one upstream request");
        serde_json::from_slice(&requests[0].body).expect("Failed to parse upstream request body")
    }

    /// Mock a message response whose first content block is `text`
    pub async fn mock_message(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_body(text)))
            .mount(&self.server)
            .await;
    }

    /// Mock a message response with an arbitrary 2xx body
    pub async fn mock_message_raw(&self, body: Value) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Mock `times` overloaded (529) responses before later mocks take over
    ///
    /// Mount this before a success mock: wiremock serves the earliest
    /// mounted matching mock until it is exhausted.
    pub async fn mock_overloaded_up_to(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_json(overloaded_body()))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// Mock an always-overloaded endpoint, expecting exactly `expected` calls
    pub async fn mock_overloaded_expect(&self, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_json(overloaded_body()))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    /// Mock an HTTP error status on messages, expecting `expected` calls
    pub async fn mock_http_error(&self, status: u16, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "type": "error",
                "error": {
                    "type": "api_error",
                    "message": "Internal server error"
                }
            })))
            .expect(expected)
            .mount(&self.server)
            .await;
    }
}

/// Anthropic message body with the given text content
pub fn message_body(text: &str) -> Value {
    json!({
        "id": "msg_01XFDUDYJgAACzvnptvVoYEL",
        "type": "message",
        "role": "assistant",
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "model": "claude-3-5-sonnet-20240620",
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {
            "input_tokens": 10,
            "output_tokens": 25
        }
    })
}

/// Anthropic overloaded error body (served with status 529)
pub fn overloaded_body() -> Value {
    json!({
        "type": "error",
        "error": {
            "type": "overloaded_error",
            "message": "Overloaded"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_message() {
        let mock = MockAnthropic::start().await;
        mock.mock_message("Hello from Claude").await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/v1/messages", mock.uri()))
            .json(&json!({
                "model": "claude-3-5-sonnet-20240620",
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": "Hi"}]
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["content"][0]["text"], "Hello from Claude");
    }

    #[tokio::test]
    async fn test_overloaded_then_success() {
        let mock = MockAnthropic::start().await;
        mock.mock_overloaded_up_to(1).await;
        mock.mock_message("Recovered").await;

        let client = reqwest::Client::new();
        let url = format!("{}/v1/messages", mock.uri());

        let first = client.post(&url).json(&json!({})).send().await.unwrap();
        assert_eq!(first.status(), 529);

        let second = client.post(&url).json(&json!({})).send().await.unwrap();
        assert_eq!(second.status(), 200);
    }
}
