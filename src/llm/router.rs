//! Waterfall completion routing across the provider chain.
//!
//! Walks the resolved chain in order, skipping providers in cooldown, and
//! returns the first successful completion. Rate limits, overloads, timeouts,
//! auth failures, and server errors advance to the next entry; a request the
//! upstream rejects outright (other 4xx) is returned to the caller, since
//! retrying it elsewhere would fail the same way.

use std::sync::Arc;

use crate::health::{CooldownReason, SharedProviderHealthTracker};
use crate::providers::UpstreamEntry;

use super::{ChatMessage, CompletionOutcome, UpstreamClient, UpstreamError};

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("no upstream providers configured")]
    NoProviders,

    #[error("all {attempted} chain providers are rate-limited or unavailable")]
    Exhausted { attempted: usize },

    #[error("upstream rejected the request: HTTP {status}")]
    Rejected { status: u16, body: String },
}

/// Routes completions through the provider chain.
pub struct CompletionRouter {
    entries: Vec<UpstreamEntry>,
    health: SharedProviderHealthTracker,
    client: Arc<dyn UpstreamClient>,
}

impl CompletionRouter {
    pub fn new(
        entries: Vec<UpstreamEntry>,
        health: SharedProviderHealthTracker,
        client: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            entries,
            health,
            client,
        }
    }

    /// The resolved chain, in priority order.
    pub fn entries(&self) -> &[UpstreamEntry] {
        &self.entries
    }

    pub fn health(&self) -> &SharedProviderHealthTracker {
        &self.health
    }

    /// Forward a conversation to the first healthy provider that answers.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
    ) -> Result<CompletionOutcome, RouterError> {
        if self.entries.is_empty() {
            return Err(RouterError::NoProviders);
        }

        for entry in &self.entries {
            let provider = entry.provider.id();

            if !self.health.is_healthy(provider).await {
                tracing::debug!(provider = %provider, "Skipping provider in cooldown");
                continue;
            }

            tracing::debug!(
                provider = %provider,
                model = %entry.model,
                "Trying upstream provider"
            );

            match self.client.complete(entry, messages).await {
                Ok(outcome) => {
                    self.health.record_success(provider).await;
                    return Ok(outcome);
                }
                Err(UpstreamError::RateLimited { retry_after }) => {
                    tracing::info!(
                        provider = %provider,
                        retry_after_secs = ?retry_after.map(|d| d.as_secs_f64()),
                        "Upstream rate limited, trying next entry"
                    );
                    self.health
                        .record_failure(provider, CooldownReason::RateLimit, retry_after)
                        .await;
                }
                Err(UpstreamError::Overloaded { retry_after }) => {
                    tracing::info!(provider = %provider, "Upstream overloaded, trying next entry");
                    self.health
                        .record_failure(provider, CooldownReason::Overloaded, retry_after)
                        .await;
                }
                Err(UpstreamError::Timeout) => {
                    tracing::warn!(provider = %provider, "Upstream timed out, trying next entry");
                    self.health
                        .record_failure(provider, CooldownReason::Timeout, None)
                        .await;
                }
                Err(UpstreamError::Auth) => {
                    tracing::warn!(provider = %provider, "Upstream auth error, trying next entry");
                    self.health
                        .record_failure(provider, CooldownReason::AuthError, None)
                        .await;
                }
                Err(UpstreamError::Server { status }) => {
                    tracing::warn!(
                        provider = %provider,
                        status = status,
                        "Upstream server error, trying next entry"
                    );
                    self.health
                        .record_failure(provider, CooldownReason::ServerError, None)
                        .await;
                }
                Err(UpstreamError::Transport(err)) | Err(UpstreamError::BadResponse(err)) => {
                    tracing::warn!(
                        provider = %provider,
                        error = %err,
                        "Upstream request failed, trying next entry"
                    );
                    self.health
                        .record_failure(provider, CooldownReason::ServerError, None)
                        .await;
                }
                Err(UpstreamError::Rejected { status, body }) => {
                    // The caller's request is at fault; no point failing over.
                    return Err(RouterError::Rejected { status, body });
                }
            }
        }

        tracing::warn!(
            total_entries = self.entries.len(),
            "All chain entries exhausted"
        );
        Err(RouterError::Exhausted {
            attempted: self.entries.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ProviderHealthTracker;
    use crate::providers::ProviderKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn entry(provider: ProviderKind, model: &str) -> UpstreamEntry {
        UpstreamEntry {
            provider,
            model: model.to_string(),
            api_key: "test-key".to_string(),
            base_url: "http://localhost:1".to_string(),
        }
    }

    /// Scripted upstream: pops one canned result per call, records the
    /// providers it was asked to hit.
    struct ScriptedClient {
        script: Mutex<Vec<Result<CompletionOutcome, UpstreamError>>>,
        attempted: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<CompletionOutcome, UpstreamError>>) -> Self {
            Self {
                script: Mutex::new(script),
                attempted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UpstreamClient for ScriptedClient {
        async fn complete(
            &self,
            entry: &UpstreamEntry,
            _messages: &[ChatMessage],
        ) -> Result<CompletionOutcome, UpstreamError> {
            self.attempted
                .lock()
                .unwrap()
                .push(entry.provider.id().to_string());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                panic!("scripted client called more times than scripted");
            }
            script.remove(0)
        }
    }

    fn outcome(content: &str, model: &str) -> CompletionOutcome {
        CompletionOutcome {
            content: content.to_string(),
            model: model.to_string(),
        }
    }

    #[tokio::test]
    async fn first_success_wins() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(outcome("hi", "m1"))]));
        let router = CompletionRouter::new(
            vec![
                entry(ProviderKind::Cerebras, "m1"),
                entry(ProviderKind::Groq, "m2"),
            ],
            Arc::new(ProviderHealthTracker::new()),
            client.clone(),
        );

        let result = router.complete(&[ChatMessage::user("hello")]).await.unwrap();
        assert_eq!(result.content, "hi");
        assert_eq!(*client.attempted.lock().unwrap(), vec!["cerebras"]);
    }

    #[tokio::test]
    async fn rate_limit_fails_over_and_cools_down() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(UpstreamError::RateLimited { retry_after: None }),
            Ok(outcome("from groq", "m2")),
        ]));
        let health = Arc::new(ProviderHealthTracker::new());
        let router = CompletionRouter::new(
            vec![
                entry(ProviderKind::Cerebras, "m1"),
                entry(ProviderKind::Groq, "m2"),
            ],
            health.clone(),
            client.clone(),
        );

        let result = router.complete(&[ChatMessage::user("hello")]).await.unwrap();
        assert_eq!(result.content, "from groq");
        assert_eq!(*client.attempted.lock().unwrap(), vec!["cerebras", "groq"]);

        // First provider went into cooldown, second recorded a success.
        assert!(!health.is_healthy("cerebras").await);
        assert!(health.is_healthy("groq").await);
    }

    #[tokio::test]
    async fn cooled_down_provider_is_skipped() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(outcome("ok", "m2"))]));
        let health = Arc::new(ProviderHealthTracker::new());
        health
            .record_failure("cerebras", CooldownReason::RateLimit, None)
            .await;

        let router = CompletionRouter::new(
            vec![
                entry(ProviderKind::Cerebras, "m1"),
                entry(ProviderKind::Groq, "m2"),
            ],
            health,
            client.clone(),
        );

        router.complete(&[ChatMessage::user("hello")]).await.unwrap();
        assert_eq!(*client.attempted.lock().unwrap(), vec!["groq"]);
    }

    #[tokio::test]
    async fn all_failures_exhaust_the_chain() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(UpstreamError::Server { status: 500 }),
            Err(UpstreamError::Timeout),
        ]));
        let router = CompletionRouter::new(
            vec![
                entry(ProviderKind::Cerebras, "m1"),
                entry(ProviderKind::Groq, "m2"),
            ],
            Arc::new(ProviderHealthTracker::new()),
            client,
        );

        let err = router.complete(&[ChatMessage::user("x")]).await.unwrap_err();
        assert!(matches!(err, RouterError::Exhausted { attempted: 2 }));
    }

    #[tokio::test]
    async fn rejected_request_does_not_fail_over() {
        let client = Arc::new(ScriptedClient::new(vec![Err(UpstreamError::Rejected {
            status: 400,
            body: "bad request".to_string(),
        })]));
        let router = CompletionRouter::new(
            vec![
                entry(ProviderKind::Cerebras, "m1"),
                entry(ProviderKind::Groq, "m2"),
            ],
            Arc::new(ProviderHealthTracker::new()),
            client.clone(),
        );

        let err = router.complete(&[ChatMessage::user("x")]).await.unwrap_err();
        assert!(matches!(err, RouterError::Rejected { status: 400, .. }));
        assert_eq!(*client.attempted.lock().unwrap(), vec!["cerebras"]);
    }

    #[tokio::test]
    async fn empty_chain_is_no_providers() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let router = CompletionRouter::new(
            vec![],
            Arc::new(ProviderHealthTracker::new()),
            client,
        );
        assert!(matches!(
            router.complete(&[ChatMessage::user("x")]).await.unwrap_err(),
            RouterError::NoProviders
        ));
    }
}
