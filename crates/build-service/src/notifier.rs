//! Evaluation webhook client

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

/// Per-request timeout for evaluator calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Delays between notification attempts.
///
/// One attempt is made per delay. The delay belonging to the final attempt is
/// never slept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
        ])
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len()
    }

    /// Delay to wait after the zero-based `attempt` fails, if another attempt follows
    pub fn delay_after(&self, attempt: usize) -> Option<Duration> {
        if attempt + 1 < self.delays.len() {
            self.delays.get(attempt).copied()
        } else {
            None
        }
    }
}

/// Posts build results to the evaluator
#[derive(Clone)]
pub struct EvaluationClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl EvaluationClient {
    /// Create a new evaluation client
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, policy })
    }

    /// POST `payload` as JSON until the evaluator answers 200.
    ///
    /// Returns whether any attempt succeeded; never errors.
    pub async fn notify<T>(&self, evaluation_url: &str, payload: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        info!("Notifying evaluation service: {}", evaluation_url);

        for attempt in 0..self.policy.max_attempts() {
            match self.client.post(evaluation_url).json(payload).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::OK => {
                    info!("Successfully notified evaluation service");
                    return true;
                }
                Ok(response) => {
                    warn!("Attempt {} failed: {}", attempt + 1, response.status());
                }
                Err(e) => {
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                }
            }

            if let Some(delay) = self.policy.delay_after(attempt) {
                info!("Retrying in {:?}...", delay);
                tokio::time::sleep(delay).await;
            }
        }

        error!("Failed to notify evaluation service after all retries");
        false
    }
}
