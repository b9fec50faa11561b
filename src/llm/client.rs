//! HTTP client for OpenAI-compatible chat-completion upstreams.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::providers::{completions_url, UpstreamEntry};

use super::ChatMessage;

/// Failure modes of a single upstream attempt.
///
/// The router uses these to decide between failing over to the next chain
/// entry and returning the error to the caller.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("rate limited")]
    RateLimited { retry_after: Option<std::time::Duration> },

    #[error("overloaded")]
    Overloaded { retry_after: Option<std::time::Duration> },

    #[error("credentials rejected")]
    Auth,

    #[error("server error: HTTP {status}")]
    Server { status: u16 },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed upstream response: {0}")]
    BadResponse(String),

    /// A 4xx other than auth/rate-limit: the request itself was rejected.
    /// Not retryable on another provider.
    #[error("upstream rejected request: HTTP {status}")]
    Rejected { status: u16, body: String },
}

/// A successful completion from an upstream provider.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// The assistant message content.
    pub content: String,
    /// The model that produced it, as reported by the upstream.
    pub model: String,
}

/// Seam for upstream chat-completion calls, so the router can be exercised
/// without a network.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn complete(
        &self,
        entry: &UpstreamEntry,
        messages: &[ChatMessage],
    ) -> Result<CompletionOutcome, UpstreamError>;
}

/// `reqwest`-backed upstream client.
pub struct HttpUpstreamClient {
    http: reqwest::Client,
}

impl HttpUpstreamClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http })
    }
}

// Upstream response shape (the subset we read).
#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChoiceBody>,
}

#[derive(Deserialize)]
struct ChoiceBody {
    message: MessageBody,
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn complete(
        &self,
        entry: &UpstreamEntry,
        messages: &[ChatMessage],
    ) -> Result<CompletionOutcome, UpstreamError> {
        let url = completions_url(&entry.base_url);
        let body = json!({
            "model": entry.model,
            "messages": messages,
        });

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", entry.api_key))
            // The upstream call is non-streaming; bound how long a single
            // generation may take before we fail over.
            .timeout(std::time::Duration::from_secs(300))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::Transport(e.to_string())
                }
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(UpstreamError::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            });
        }
        if status.as_u16() == 529 {
            return Err(UpstreamError::Overloaded {
                retry_after: parse_retry_after(response.headers()),
            });
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(UpstreamError::Auth);
        }
        if status.is_server_error() {
            return Err(UpstreamError::Server {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
                body: truncate(&body, 2000),
            });
        }

        let body: CompletionBody = response
            .json()
            .await
            .map_err(|e| UpstreamError::BadResponse(e.to_string()))?;

        parse_completion(body, &entry.model)
    }
}

/// Extract content and model from a parsed upstream body.
fn parse_completion(
    body: CompletionBody,
    requested_model: &str,
) -> Result<CompletionOutcome, UpstreamError> {
    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| UpstreamError::BadResponse("no choices in response".to_string()))?;

    Ok(CompletionOutcome {
        content,
        model: body.model.unwrap_or_else(|| requested_model.to_string()),
    })
}

/// Parse `Retry-After` header into a Duration (numeric seconds only).
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<std::time::Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?;
    let secs: f64 = value.parse().ok()?;
    if secs > 0.0 {
        Some(std::time::Duration::from_secs_f64(secs))
    } else {
        None
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice_content() {
        let body: CompletionBody = serde_json::from_str(
            r#"{
                "id": "chatcmpl-abc",
                "model": "llama-3.3-70b",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}
                ]
            }"#,
        )
        .unwrap();
        let outcome = parse_completion(body, "requested").unwrap();
        assert_eq!(outcome.content, "hello");
        assert_eq!(outcome.model, "llama-3.3-70b");
    }

    #[test]
    fn falls_back_to_requested_model() {
        let body: CompletionBody = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "x"}}]}"#,
        )
        .unwrap();
        let outcome = parse_completion(body, "requested").unwrap();
        assert_eq!(outcome.model, "requested");
    }

    #[test]
    fn empty_choices_is_bad_response() {
        let body: CompletionBody = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            parse_completion(body, "m").unwrap_err(),
            UpstreamError::BadResponse(_)
        ));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo wörld";
        let t = truncate(s, 2);
        assert!(t.starts_with('h'));
        assert!(t.ends_with("[truncated]"));
    }
}
