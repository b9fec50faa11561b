//! Chat-completion relay endpoint.
//!
//! Receives `POST /v1/chat/completions` requests, prepends the optional
//! `system` field as a system message, and forwards the conversation through
//! the provider chain. The winning completion is formatted either as a single
//! `chat.completion` object or as an SSE stream of `chat.completion.chunk`
//! events: one content delta, one stop chunk, then `[DONE]`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::llm::{ChatMessage, Role, RouterError};

use super::types::{
    ChatCompletionResponse, ChatRequest, ChunkResponse, ErrorBody, ErrorResponse, ModelObject,
    ModelsResponse,
};
use super::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Error helpers
// ─────────────────────────────────────────────────────────────────────────────

fn error_response(status: StatusCode, message: String, code: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            message,
            r#type: "error".to_string(),
            code: Some(code.to_string()),
        },
    };
    (status, Json(body)).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// POST /v1/chat/completions
// ─────────────────────────────────────────────────────────────────────────────

pub(super) async fn chat_completions(
    State(state): State<Arc<AppState>>,
    body: bytes::Bytes,
) -> Response {
    // 1. Parse the request body ourselves so malformed JSON yields the
    //    OpenAI error envelope instead of axum's plain-text rejection.
    let req: ChatRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", e),
                "invalid_request_error",
            );
        }
    };

    let request_id = Uuid::new_v4();
    let is_stream = req.stream.unwrap_or(false);
    if let Some(model) = &req.model {
        tracing::debug!(
            request_id = %request_id,
            model = %model,
            "Requested model is advisory; routing is fixed by the chain"
        );
    }

    // 2. Prepend the system field and check the leading-system invariant.
    let messages = match prepare_messages(req.messages, req.system) {
        Ok(m) => m,
        Err(msg) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                msg.to_string(),
                "invalid_request_error",
            );
        }
    };

    tracing::debug!(
        request_id = %request_id,
        messages = messages.len(),
        stream = is_stream,
        "Relaying chat completion"
    );

    // 3. Waterfall through the chain.
    let outcome = match state.router.complete(&messages).await {
        Ok(o) => o,
        Err(RouterError::Rejected { status, body }) => {
            return error_response(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST),
                body,
                "invalid_request_error",
            );
        }
        Err(e @ RouterError::Exhausted { .. }) | Err(e @ RouterError::NoProviders) => {
            return error_response(
                StatusCode::TOO_MANY_REQUESTS,
                e.to_string(),
                "rate_limit_exceeded",
            );
        }
    };

    // 4. Format the response.
    let created = chrono::Utc::now().timestamp();
    let completion_id = format!("chatcmpl-{}", created);

    if is_stream {
        stream_response(&completion_id, created, &outcome.model, outcome.content)
    } else {
        Json(ChatCompletionResponse::new(
            completion_id,
            created,
            outcome.model,
            outcome.content,
        ))
        .into_response()
    }
}

/// Prepend the optional `system` field and validate the conversation.
///
/// The first message must be a system message once the optional field has
/// been folded in; anything else is a client error.
pub(crate) fn prepare_messages(
    mut messages: Vec<ChatMessage>,
    system: Option<String>,
) -> Result<Vec<ChatMessage>, &'static str> {
    if let Some(system) = system {
        messages.insert(0, ChatMessage::system(system));
    }
    match messages.first() {
        None => Err("messages must not be empty"),
        Some(m) if m.role != Role::System => Err("first message must be a system message"),
        Some(_) => Ok(messages),
    }
}

/// Build the SSE response: one content chunk, one stop chunk, `[DONE]`.
fn stream_response(id: &str, created: i64, model: &str, content: String) -> Response {
    let events = vec![
        sse_data(&ChunkResponse::content(id, created, model, content)),
        sse_data(&ChunkResponse::stop(id, created, model)),
        bytes::Bytes::from_static(b"data: [DONE]\n\n"),
    ];

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "text/event-stream".parse().unwrap());
    headers.insert(header::CACHE_CONTROL, "no-cache".parse().unwrap());

    let stream = futures::stream::iter(
        events.into_iter().map(Ok::<bytes::Bytes, Infallible>),
    );

    (StatusCode::OK, headers, Body::from_stream(stream)).into_response()
}

fn sse_data<T: serde::Serialize>(chunk: &T) -> bytes::Bytes {
    // Serialization of these fixed shapes cannot fail.
    let json = serde_json::to_string(chunk).expect("chunk serializes");
    bytes::Bytes::from(format!("data: {}\n\n", json))
}

// ─────────────────────────────────────────────────────────────────────────────
// GET /v1/models — chain entries as virtual models
// ─────────────────────────────────────────────────────────────────────────────

pub(super) async fn list_models(State(state): State<Arc<AppState>>) -> Response {
    let created = state.started_at.timestamp();
    let data = state
        .router
        .entries()
        .iter()
        .map(|e| ModelObject {
            id: e.model.clone(),
            object: "model",
            created,
            owned_by: e.provider.id().to_string(),
        })
        .collect();
    Json(ModelsResponse {
        object: "list",
        data,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_field_is_prepended() {
        let messages = vec![ChatMessage::user("hello")];
        let prepared = prepare_messages(messages, Some("be brief".to_string())).unwrap();
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[0].role, Role::System);
        assert_eq!(prepared[0].content, "be brief");
        assert_eq!(prepared[1].role, Role::User);
    }

    #[test]
    fn leading_system_message_passes_without_field() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        assert!(prepare_messages(messages, None).is_ok());
    }

    #[test]
    fn missing_system_message_is_rejected() {
        let messages = vec![ChatMessage::user("hello")];
        let err = prepare_messages(messages, None).unwrap_err();
        assert_eq!(err, "first message must be a system message");
    }

    #[test]
    fn empty_messages_are_rejected() {
        assert_eq!(
            prepare_messages(Vec::new(), None).unwrap_err(),
            "messages must not be empty"
        );
    }

    #[test]
    fn sse_events_are_framed() {
        let chunk = ChunkResponse::content("chatcmpl-9", 9, "m", "hi".into());
        let bytes = sse_data(&chunk);
        let line = std::str::from_utf8(&bytes).unwrap();
        assert!(line.starts_with("data: {"));
        assert!(line.ends_with("\n\n"));

        let json: serde_json::Value =
            serde_json::from_str(line.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(json["id"], "chatcmpl-9");
    }
}
