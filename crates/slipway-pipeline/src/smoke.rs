use std::time::Duration;

use slipway_core::SmokeConfig;

/// Abstraction over the HTTP health check for testability.
#[allow(async_fn_in_trait)]
pub trait HealthProbe: Send + Sync {
    /// Issue a GET against the endpoint and return the response status code.
    async fn get(&self, url: &str) -> Result<u16, ProbeError>;
}

/// reqwest-backed probe with a per-request timeout.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(request_timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProbeError::Client { source: e })?;
        Ok(Self { client })
    }
}

impl HealthProbe for HttpProbe {
    async fn get(&self, url: &str) -> Result<u16, ProbeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProbeError::Request {
                detail: e.to_string(),
            })?;
        Ok(response.status().as_u16())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to construct HTTP client")]
    Client { source: reqwest::Error },

    #[error("health check request failed: {detail}")]
    Request { detail: String },
}

/// Smoke-test outcome, threaded by value into the publish gate.
#[derive(Debug)]
pub enum SmokeOutcome {
    Healthy(SmokeReport),
    Unhealthy {
        reason: String,
        container_logs: Option<String>,
    },
}

#[derive(Debug)]
pub struct SmokeReport {
    /// Health checks issued before the first 2xx response.
    pub attempts: u32,
    pub status: u16,
}

/// Wait for the endpoint to answer with a success status: one grace period
/// for the container to start, then up to `max_attempts` checks with
/// exponential backoff between them.
///
/// Returns an outcome rather than an error so the caller branches on it
/// explicitly.
pub async fn wait_for_ready<P: HealthProbe>(
    probe: &P,
    url: &str,
    policy: &SmokeConfig,
) -> SmokeOutcome {
    tokio::time::sleep(Duration::from_millis(policy.grace_period_ms)).await;

    let mut last_reason = "no health check attempted".to_owned();
    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            // base * 2^(attempt-1), shift capped so large attempt counts
            // cannot overflow
            let backoff = policy
                .base_delay_ms
                .saturating_mul(1u64 << (attempt - 1).min(16));
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }

        match probe.get(url).await {
            Ok(status) if (200..300).contains(&status) => {
                return SmokeOutcome::Healthy(SmokeReport {
                    attempts: attempt + 1,
                    status,
                });
            }
            Ok(status) => {
                last_reason = format!("health check returned HTTP {status}");
                tracing::warn!(attempt, status, "endpoint not ready");
            }
            Err(e) => {
                last_reason = format!("health check failed: {e}");
                tracing::warn!(attempt, error = %e, "endpoint unreachable");
            }
        }
    }

    SmokeOutcome::Unhealthy {
        reason: format!(
            "{last_reason} ({} attempt(s) exhausted)",
            policy.max_attempts
        ),
        container_logs: None,
    }
}
