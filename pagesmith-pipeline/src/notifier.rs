//! Completion callback delivery with bounded exponential backoff.
//!
//! Attempt `n` (1-based) that fails is followed by a pause of
//! `base * 2^(n-1)`, including after the last attempt. Only HTTP 200 counts
//! as delivered.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use pagesmith_core::NotificationPayload;

use crate::error::{PipelineError, TransportError};

/// Pause after the failed attempt with 0-based index `attempt`.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// One POST of the payload; returns the HTTP status.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, TransportError>;
}

/// Production transport: JSON POST over `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pagesmith/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackTransport for ReqwestTransport {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, TransportError> {
        let resp = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(resp.status().as_u16())
    }
}

/// Proof of delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub attempts: u32,
}

pub struct Notifier {
    transport: Arc<dyn CallbackTransport>,
    max_attempts: u32,
    base_delay: Duration,
    timeout: Duration,
}

impl Notifier {
    pub fn new(
        transport: Arc<dyn CallbackTransport>,
        max_attempts: u32,
        base_delay: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            max_attempts,
            base_delay,
            timeout,
        }
    }

    /// POST `payload` to `url` until it is answered with 200 or attempts run out.
    pub async fn notify(
        &self,
        payload: &NotificationPayload,
        url: &str,
    ) -> Result<DeliveryReceipt, PipelineError> {
        let mut last_error = String::from("no attempt made");
        for attempt in 1..=self.max_attempts {
            let outcome = tokio::time::timeout(self.timeout, self.transport.post(url, payload)).await;
            match outcome {
                Ok(Ok(200)) => {
                    tracing::info!(task = %payload.task, attempt, "callback delivered");
                    return Ok(DeliveryReceipt { attempts: attempt });
                }
                Ok(Ok(status)) => last_error = format!("callback answered HTTP {status}"),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = format!("no response within {:?}", self.timeout),
            }

            let delay = backoff_delay(attempt - 1, self.base_delay);
            tracing::warn!(
                task = %payload.task,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "callback attempt failed",
            );
            tokio::time::sleep(delay).await;
        }
        Err(PipelineError::DeliveryFailed {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        let base = Duration::from_millis(1_000);
        let delays: Vec<u64> = (0..5).map(|n| backoff_delay(n, base).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let d = backoff_delay(40, Duration::from_secs(1));
        assert_eq!(d, Duration::from_secs(u32::MAX as u64));
    }
}
