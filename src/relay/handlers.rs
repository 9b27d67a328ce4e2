//! HTTP request handlers

use super::RelayState;
use crate::sse::{frames, DONE_SENTINEL};
use crate::transport::{retry_after, ByteStream, TransportError, TransportErrorKind};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Create the relay router
pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/api/turn_response", post(turn_response))
        .route("/version", get(get_version))
        .with_state(state)
}

/// Body accepted from the chat client
#[derive(Debug, Clone, Deserialize)]
pub struct TurnResponseRequest {
    pub messages: Vec<Value>,
    #[serde(default)]
    pub tools: Vec<Value>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub reasoning: Option<Value>,
    #[serde(default)]
    pub previous_response_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Build the upstream request body
pub fn upstream_body(request: &TurnResponseRequest, default_model: &str) -> Value {
    let mut body = json!({
        "model": request.model.as_deref().unwrap_or(default_model),
        "input": request.messages,
        "tools": request.tools,
        "stream": true,
        "parallel_tool_calls": true,
    });
    if let Some(reasoning) = &request.reasoning {
        body["reasoning"] = reasoning.clone();
    }
    if let Some(previous) = &request.previous_response_id {
        body["previous_response_id"] = json!(previous);
    }
    body
}

/// Wrap one upstream payload as a relay record.
///
/// The event name is the payload's own `type`.
pub fn envelope(payload: &str) -> Result<String, serde_json::Error> {
    let event: Value = serde_json::from_str(payload)?;
    let kind = event.get("type").cloned().unwrap_or(Value::Null);
    let record = json!({ "event": kind, "data": event });
    Ok(format!("data: {record}\n\n"))
}

/// Re-emit an upstream event stream in relay form, ending with `[DONE]`.
///
/// A connection failure is passed on as an error, which aborts the
/// response body instead of ending it cleanly.
fn relay_stream(upstream: ByteStream) -> impl Stream<Item = Result<String, TransportError>> + Send {
    let records = frames(upstream).filter_map(|payload| async move {
        match payload {
            Ok(text) => match envelope(&text) {
                Ok(record) => Some(Ok(record)),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unparseable upstream event");
                    None
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Upstream stream failed");
                Some(Err(e))
            }
        }
    });

    let mut records = Box::pin(records);
    async_stream::stream! {
        let mut failed = false;
        while let Some(record) = records.next().await {
            failed = record.is_err();
            yield record;
            if failed {
                break;
            }
        }
        if !failed {
            yield Ok(format!("data: {DONE_SENTINEL}\n\n"));
        }
    }
}

async fn turn_response(
    State(state): State<RelayState>,
    Json(request): Json<TurnResponseRequest>,
) -> Result<Response, RelayError> {
    let Some(api_key) = state.config.api_key.as_deref() else {
        tracing::error!("OPENAI_API_KEY is not set");
        return Err(RelayError::MissingKey);
    };

    let body = upstream_body(&request, &state.config.default_model);
    tracing::info!(
        model = %body["model"],
        items = request.messages.len(),
        tools = request.tools.len(),
        "Relaying turn request"
    );

    let response = state
        .client
        .post(state.config.responses_url())
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| RelayError::Upstream(TransportError::from_reqwest(&e)))?;

    let status = response.status();
    if !status.is_success() {
        let delay = retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        // The client classifies the status again, so keep the upstream text as is
        let error = TransportError::new(TransportErrorKind::from_status(status.as_u16()), message);
        return Err(RelayError::Upstream(match delay {
            Some(delay) => error.with_retry_after(delay),
            None => error,
        }));
    }

    let upstream: ByteStream = Box::pin(response.bytes_stream().map(|chunk| {
        chunk
            .map(|bytes| bytes.to_vec())
            .map_err(|e| TransportError::from_reqwest(&e))
    }));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(relay_stream(upstream)),
    )
        .into_response())
}

async fn get_version() -> &'static str {
    concat!("turnstream ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum RelayError {
    MissingKey,
    Upstream(TransportError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message, delay) = match self {
            RelayError::MissingKey => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "API key not configured".to_string(),
                None,
            ),
            RelayError::Upstream(e) => {
                tracing::warn!(
                    kind = ?e.kind,
                    error = %e.message,
                    retry_after = ?e.retry_after,
                    "Upstream request failed"
                );
                let status = match e.kind {
                    TransportErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
                    TransportErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, e.message, e.retry_after)
            }
        };

        let mut response = (status, Json(ErrorResponse { error: message })).into_response();
        if let Some(delay) = delay {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(delay.as_secs()));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use axum::http::Request;
    use futures::stream;
    use tower::ServiceExt;

    fn config(api_key: Option<&str>, base_url: &str) -> RelayConfig {
        RelayConfig {
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
            port: 0,
            default_model: "gpt-4.1".to_string(),
        }
    }

    fn turn_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/turn_response")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Serve a canned upstream on a loopback port and return its base URL
    async fn fake_upstream(status: StatusCode, body: &'static str) -> String {
        fake_upstream_with_headers(status, &[], body).await
    }

    async fn fake_upstream_with_headers(
        status: StatusCode,
        headers: &'static [(&'static str, &'static str)],
        body: &'static str,
    ) -> String {
        let app = Router::new().route(
            "/responses",
            post(move || async move {
                let mut response =
                    (status, [(header::CONTENT_TYPE, "text/event-stream")], body).into_response();
                for &(name, value) in headers {
                    response.headers_mut().insert(name, HeaderValue::from_static(value));
                }
                response
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_upstream_body() {
        let request: TurnResponseRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "tools": [{"type": "web_search"}],
        }))
        .unwrap();

        let body = upstream_body(&request, "gpt-4.1");
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["input"][0]["content"], "hi");
        assert_eq!(body["tools"][0]["type"], "web_search");
        assert_eq!(body["stream"], true);
        assert_eq!(body["parallel_tool_calls"], true);
        assert!(body.get("reasoning").is_none());
        assert!(body.get("previous_response_id").is_none());
    }

    #[test]
    fn test_upstream_body_optional_fields() {
        let request: TurnResponseRequest = serde_json::from_value(json!({
            "messages": [],
            "model": "o3",
            "reasoning": {"effort": "high"},
            "previous_response_id": "resp_1",
        }))
        .unwrap();

        let body = upstream_body(&request, "gpt-4.1");
        assert_eq!(body["model"], "o3");
        assert_eq!(body["tools"], json!([]));
        assert_eq!(body["reasoning"]["effort"], "high");
        assert_eq!(body["previous_response_id"], "resp_1");
    }

    #[test]
    fn test_envelope() {
        let record = envelope(r#"{"type":"response.output_text.delta","delta":"hi"}"#).unwrap();
        let payload = record
            .strip_prefix("data: ")
            .and_then(|r| r.strip_suffix("\n\n"))
            .unwrap();
        let value: Value = serde_json::from_str(payload).unwrap();
        assert_eq!(value["event"], "response.output_text.delta");
        assert_eq!(value["data"]["delta"], "hi");

        assert!(envelope("not json").is_err());
    }

    #[tokio::test]
    async fn test_relay_stream_ends_with_done() {
        let upstream: ByteStream = Box::pin(stream::iter(vec![
            Ok(b"event: response.created\ndata: {\"type\":\"response.created\"}\n\n".to_vec()),
            Ok(b"data: garbage\n\n".to_vec()),
        ]));
        let records: Vec<_> = relay_stream(upstream).collect().await;
        let records: Vec<String> = records.into_iter().map(Result::unwrap).collect();

        assert_eq!(records.len(), 2);
        assert!(records[0].contains("\"event\":\"response.created\""));
        assert_eq!(records[1], "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn test_relay_stream_aborts_on_failure() {
        let upstream: ByteStream = Box::pin(stream::iter(vec![
            Ok(b"data: {\"type\":\"response.created\"}\n\n".to_vec()),
            Err(TransportError::network("reset")),
        ]));
        let records: Vec<_> = relay_stream(upstream).collect().await;

        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert!(records[1].is_err());
    }

    #[tokio::test]
    async fn test_missing_key_is_500() {
        let state = RelayState::new(config(None, "http://127.0.0.1:9")).unwrap();
        let response = create_router(state)
            .oneshot(turn_request(&json!({"messages": []})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "API key not configured");
    }

    #[tokio::test]
    async fn test_relays_upstream_events() {
        let base = fake_upstream(
            StatusCode::OK,
            "event: response.created\ndata: {\"type\":\"response.created\",\"response\":{\"id\":\"r1\"}}\n\n\
             event: response.output_text.delta\ndata: {\"type\":\"response.output_text.delta\",\"item_id\":\"m1\",\"delta\":\"Hi\"}\n\n",
        )
        .await;
        let state = RelayState::new(config(Some("sk-test"), &base)).unwrap();
        let response = create_router(state)
            .oneshot(turn_request(&json!({"messages": [{"role": "user", "content": "hi"}]})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        let text = body_text(response).await;
        let records: Vec<&str> = text.split("\n\n").filter(|r| !r.is_empty()).collect();
        assert_eq!(records.len(), 3);
        assert!(records[0].contains("\"event\":\"response.created\""));
        assert!(records[1].contains("\"delta\":\"Hi\""));
        assert_eq!(records[2], "data: [DONE]");
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let base = fake_upstream_with_headers(
            StatusCode::TOO_MANY_REQUESTS,
            &[("retry-after", "20")],
            r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#,
        )
        .await;
        let state = RelayState::new(config(Some("sk-test"), &base)).unwrap();
        let response = create_router(state)
            .oneshot(turn_request(&json!({"messages": []})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "20");
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "Rate limit reached");
    }

    #[tokio::test]
    async fn test_upstream_bad_request_keeps_message() {
        let base = fake_upstream(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Unknown parameter: 'foo'.","type":"invalid_request_error"}}"#,
        )
        .await;
        let state = RelayState::new(config(Some("sk-test"), &base)).unwrap();
        let response = create_router(state)
            .oneshot(turn_request(&json!({"messages": []})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "Unknown parameter: 'foo'.");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_502() {
        let state = RelayState::new(config(Some("sk-test"), "http://127.0.0.1:9")).unwrap();
        let response = create_router(state)
            .oneshot(turn_request(&json!({"messages": []})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
