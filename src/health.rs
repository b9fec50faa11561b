//! Upstream provider health tracking.
//!
//! Implements per-provider cooldown tracking with exponential backoff.
//! Used by the completion router to skip providers that recently rate-limited
//! or errored, so a waterfall pass doesn't hammer a provider that already
//! said no.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

// ─────────────────────────────────────────────────────────────────────────────
// Health Tracking
// ─────────────────────────────────────────────────────────────────────────────

/// Reason a provider was placed into cooldown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownReason {
    /// HTTP 429 rate limit
    RateLimit,
    /// HTTP 529 overloaded
    Overloaded,
    /// Connection timeout
    Timeout,
    /// Server or network error
    ServerError,
    /// Credentials rejected (401/403)
    AuthError,
}

impl std::fmt::Display for CooldownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Overloaded => write!(f, "overloaded"),
            Self::Timeout => write!(f, "timeout"),
            Self::ServerError => write!(f, "server_error"),
            Self::AuthError => write!(f, "auth_error"),
        }
    }
}

/// Health state for a single provider.
#[derive(Debug, Clone, Default)]
struct ProviderHealth {
    /// When the cooldown expires (None = healthy).
    cooldown_until: Option<std::time::Instant>,
    /// Number of consecutive failures (for exponential backoff).
    consecutive_failures: u32,
    /// Last failure reason.
    last_failure_reason: Option<CooldownReason>,
    /// Last failure timestamp (wall clock, for API responses).
    last_failure_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Total requests routed to this provider.
    total_requests: u64,
    /// Total successful requests.
    total_successes: u64,
    /// Total rate-limited requests.
    total_rate_limits: u64,
    /// Total errors (non-rate-limit).
    total_errors: u64,
}

impl ProviderHealth {
    fn is_in_cooldown(&self) -> bool {
        self.cooldown_until
            .map(|until| std::time::Instant::now() < until)
            .unwrap_or(false)
    }

    fn remaining_cooldown(&self) -> Option<std::time::Duration> {
        self.cooldown_until.and_then(|until| {
            let now = std::time::Instant::now();
            if now < until {
                Some(until - now)
            } else {
                None
            }
        })
    }
}

/// Backoff configuration.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Base delay for first failure.
    pub base_delay: std::time::Duration,
    /// Maximum backoff cap.
    pub max_delay: std::time::Duration,
    /// Multiplier per consecutive failure (typically 2.0).
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: std::time::Duration::from_secs(5),
            max_delay: std::time::Duration::from_secs(300), // 5 minutes
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Calculate the cooldown duration for a given number of consecutive failures.
    pub fn cooldown_for(&self, consecutive_failures: u32) -> std::time::Duration {
        let delay_secs =
            self.base_delay.as_secs_f64() * self.multiplier.powi(consecutive_failures as i32);
        let capped = delay_secs.min(self.max_delay.as_secs_f64());
        std::time::Duration::from_secs_f64(capped)
    }
}

/// Serializable snapshot of provider health for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealthSnapshot {
    pub provider: String,
    pub is_healthy: bool,
    pub cooldown_remaining_secs: Option<f64>,
    pub consecutive_failures: u32,
    pub last_failure_reason: Option<String>,
    pub last_failure_at: Option<chrono::DateTime<chrono::Utc>>,
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_rate_limits: u64,
    pub total_errors: u64,
}

/// Tracker for all chain providers.
///
/// Thread-safe, shared between the relay endpoint and the health API. Keyed
/// by provider ID string.
#[derive(Debug, Clone)]
pub struct ProviderHealthTracker {
    providers: Arc<RwLock<HashMap<String, ProviderHealth>>>,
    backoff_config: BackoffConfig,
}

impl Default for ProviderHealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderHealthTracker {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            backoff_config: BackoffConfig::default(),
        }
    }

    pub fn with_backoff(backoff_config: BackoffConfig) -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            backoff_config,
        }
    }

    /// Check whether a provider is currently healthy (not in cooldown).
    pub async fn is_healthy(&self, provider: &str) -> bool {
        let providers = self.providers.read().await;
        providers
            .get(provider)
            .map(|h| !h.is_in_cooldown())
            .unwrap_or(true) // Unknown providers are healthy by default
    }

    /// Record a successful request for a provider.
    pub async fn record_success(&self, provider: &str) {
        let mut providers = self.providers.write().await;
        let health = providers.entry(provider.to_string()).or_default();
        health.total_requests += 1;
        health.total_successes += 1;
        // Reset consecutive failures on success
        health.consecutive_failures = 0;
        health.cooldown_until = None;
    }

    /// Record a failure and place the provider into cooldown.
    ///
    /// If `retry_after` is provided (from response headers), use that as the
    /// cooldown duration instead of exponential backoff.
    pub async fn record_failure(
        &self,
        provider: &str,
        reason: CooldownReason,
        retry_after: Option<std::time::Duration>,
    ) {
        let mut providers = self.providers.write().await;
        let health = providers.entry(provider.to_string()).or_default();

        health.total_requests += 1;
        match &reason {
            CooldownReason::RateLimit => health.total_rate_limits += 1,
            _ => health.total_errors += 1,
        }

        health.consecutive_failures += 1;
        health.last_failure_reason = Some(reason);
        health.last_failure_at = Some(chrono::Utc::now());

        // Use retry_after from headers if available, else exponential backoff
        let cooldown = retry_after.unwrap_or_else(|| {
            self.backoff_config
                .cooldown_for(health.consecutive_failures.saturating_sub(1))
        });

        health.cooldown_until = Some(std::time::Instant::now() + cooldown);

        tracing::info!(
            provider = %provider,
            consecutive_failures = health.consecutive_failures,
            cooldown_secs = cooldown.as_secs_f64(),
            "Provider placed in cooldown"
        );
    }

    /// Get a snapshot of health state for a provider (for API responses).
    pub async fn snapshot(&self, provider: &str) -> ProviderHealthSnapshot {
        let providers = self.providers.read().await;
        match providers.get(provider) {
            Some(health) => snapshot_of(provider, health),
            None => ProviderHealthSnapshot {
                provider: provider.to_string(),
                is_healthy: true,
                cooldown_remaining_secs: None,
                consecutive_failures: 0,
                last_failure_reason: None,
                last_failure_at: None,
                total_requests: 0,
                total_successes: 0,
                total_rate_limits: 0,
                total_errors: 0,
            },
        }
    }

    /// Get health snapshots for all tracked providers.
    pub async fn all_snapshots(&self) -> Vec<ProviderHealthSnapshot> {
        let providers = self.providers.read().await;
        let mut snapshots: Vec<_> = providers
            .iter()
            .map(|(id, health)| snapshot_of(id, health))
            .collect();
        snapshots.sort_by(|a, b| a.provider.cmp(&b.provider));
        snapshots
    }

    /// Clear cooldown for a provider (e.g., after manual recovery).
    pub async fn clear_cooldown(&self, provider: &str) {
        let mut providers = self.providers.write().await;
        if let Some(health) = providers.get_mut(provider) {
            health.cooldown_until = None;
            health.consecutive_failures = 0;
        }
    }
}

fn snapshot_of(provider: &str, health: &ProviderHealth) -> ProviderHealthSnapshot {
    ProviderHealthSnapshot {
        provider: provider.to_string(),
        is_healthy: !health.is_in_cooldown(),
        cooldown_remaining_secs: health.remaining_cooldown().map(|d| d.as_secs_f64()),
        consecutive_failures: health.consecutive_failures,
        last_failure_reason: health.last_failure_reason.as_ref().map(|r| r.to_string()),
        last_failure_at: health.last_failure_at,
        total_requests: health.total_requests,
        total_successes: health.total_successes,
        total_rate_limits: health.total_rate_limits,
        total_errors: health.total_errors,
    }
}

/// Shared tracker type.
pub type SharedProviderHealthTracker = Arc<ProviderHealthTracker>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn backoff_doubles_and_caps() {
        let backoff = BackoffConfig::default();
        assert_eq!(backoff.cooldown_for(0), Duration::from_secs(5));
        assert_eq!(backoff.cooldown_for(1), Duration::from_secs(10));
        assert_eq!(backoff.cooldown_for(2), Duration::from_secs(20));
        // Cap at max_delay
        assert_eq!(backoff.cooldown_for(10), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn unknown_provider_is_healthy() {
        let tracker = ProviderHealthTracker::new();
        assert!(tracker.is_healthy("cerebras").await);
    }

    #[tokio::test]
    async fn failure_places_provider_in_cooldown() {
        let tracker = ProviderHealthTracker::new();
        tracker
            .record_failure("cerebras", CooldownReason::RateLimit, None)
            .await;
        assert!(!tracker.is_healthy("cerebras").await);

        let snap = tracker.snapshot("cerebras").await;
        assert_eq!(snap.consecutive_failures, 1);
        assert_eq!(snap.total_rate_limits, 1);
        assert_eq!(snap.last_failure_reason.as_deref(), Some("rate_limit"));
    }

    #[tokio::test]
    async fn success_clears_cooldown() {
        let tracker = ProviderHealthTracker::new();
        tracker
            .record_failure("groq", CooldownReason::ServerError, None)
            .await;
        assert!(!tracker.is_healthy("groq").await);

        tracker.record_success("groq").await;
        assert!(tracker.is_healthy("groq").await);

        let snap = tracker.snapshot("groq").await;
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.total_successes, 1);
    }

    #[tokio::test]
    async fn retry_after_overrides_backoff() {
        let tracker = ProviderHealthTracker::new();
        tracker
            .record_failure(
                "openai",
                CooldownReason::RateLimit,
                Some(Duration::from_millis(1)),
            )
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(tracker.is_healthy("openai").await);
    }

    #[tokio::test]
    async fn clear_cooldown_resets_state() {
        let tracker = ProviderHealthTracker::new();
        tracker
            .record_failure("custom", CooldownReason::AuthError, None)
            .await;
        tracker.clear_cooldown("custom").await;
        assert!(tracker.is_healthy("custom").await);
        assert_eq!(tracker.snapshot("custom").await.consecutive_failures, 0);
    }
}
