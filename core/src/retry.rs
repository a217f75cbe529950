//! Retry decorator for resource clients.
//!
//! # Design
//! `Retrying<C>` wraps any `RestResource` and implements `RestResource`
//! itself, so code composing clients does not care whether retry is enabled.
//! Each call re-issues the same verb with the same params; resolution is
//! pure, so every attempt sends an identical request.
//!
//! The policy alone decides what is retried: which verbs are safe to
//! re-issue, which statuses count as transient, and whether transport
//! failures qualify. Argument errors never reach the network and are never
//! retried. On exhaustion the last error is returned unchanged.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;
use crate::params::Params;
use crate::resource::RestResource;

/// The five resource verbs, used to scope retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Create,
    GetAll,
    Get,
    Update,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Create, Verb::GetAll, Verb::Get, Verb::Update, Verb::Delete];
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Create => "create",
            Verb::GetAll => "get_all",
            Verb::Get => "get",
            Verb::Update => "update",
            Verb::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub enabled: bool,
    /// Total calls per operation, the first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retry_on_status: Vec<u16>,
    pub retry_transport_errors: bool,
    /// Verbs whose re-issue is safe for the API behind the client.
    pub verbs: Vec<Verb>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
            retry_on_status: vec![429],
            retry_transport_errors: true,
            verbs: Verb::ALL.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// How many calls `verb` may make in total.
    pub fn attempts_for(&self, verb: Verb) -> u32 {
        if self.enabled && self.verbs.contains(&verb) {
            self.max_attempts.max(1)
        } else {
            1
        }
    }

    pub fn is_retryable(&self, error: &ApiError) -> bool {
        match error {
            ApiError::Transport(_) => self.retry_transport_errors,
            ApiError::NotFound | ApiError::Http { .. } => error
                .status()
                .is_some_and(|status| self.retry_on_status.contains(&status)),
            ApiError::Argument(_) | ApiError::Serialization(_) | ApiError::Deserialization(_) => false,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

/// Exponential backoff with up to 10% jitter.
fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[derive(Debug, Clone)]
pub struct Retrying<C> {
    inner: C,
    policy: Arc<RetryPolicy>,
}

impl<C> Retrying<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy: Arc::new(policy),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn run<T, F, Fut>(&self, verb: Verb, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, ApiError>> + Send,
        T: Send,
    {
        let max_attempts = self.policy.attempts_for(verb);
        let mut attempt = 1;
        loop {
            match op().await {
                Err(error) if attempt < max_attempts && self.policy.is_retryable(&error) => {
                    let delay = self.policy.delay(attempt);
                    warn!(
                        %verb,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

#[async_trait]
impl<C: RestResource> RestResource for Retrying<C> {
    async fn create<D, T>(&self, params: &Params, data: &D) -> Result<T, ApiError>
    where
        D: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        self.run(Verb::Create, || self.inner.create(params, data)).await
    }

    async fn get_all<T>(&self, params: &Params) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        self.run(Verb::GetAll, || self.inner.get_all(params)).await
    }

    async fn get<T>(&self, params: &Params) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        self.run(Verb::Get, || self.inner.get(params)).await
    }

    async fn update<D, T>(&self, params: &Params, data: &D) -> Result<T, ApiError>
    where
        D: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        self.run(Verb::Update, || self.inner.update(params, data)).await
    }

    async fn delete(&self, params: &Params, body: Option<&Value>) -> Result<(), ApiError> {
        self.run(Verb::Delete, || self.inner.delete(params, body)).await
    }
}
