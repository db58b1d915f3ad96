//! The Retry & Fallback Orchestrator.
//!
//! Wraps a [`Model`] with two orthogonal capabilities: retrying the same
//! model on transient failures with exponential backoff and jitter, then
//! sweeping across an ordered sequence of fallback models, each with its own
//! retry budget.

use crate::error::{ErrorKind, MicError};
use crate::model::{CallContent, CallOverrides, Model};
use crate::response::{Response, StreamResponse};
use rand::Rng;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

tokio::task_local! {
    /// The ambient "current model" installed by [`with_model`]. An
    /// orchestrator running inside the scope of a `with_model` call uses
    /// this instead of its stored primary, keeping its retry/fallback
    /// configuration unchanged.
    static CURRENT_MODEL: Model;
}

/// Run `f` with `model` installed as the ambient current model for the
/// duration of the returned future. Any [`Orchestrator`] invoked from
/// within `f` substitutes `model` for its stored primary while keeping the
/// same retry policy and fallback sequence.
pub async fn with_model<F, Fut, T>(model: Model, f: F) -> T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    CURRENT_MODEL.scope(model, f()).await
}

/// One failed attempt recorded in a retry trail.
#[derive(Debug, Clone)]
pub struct RetryFailure {
    pub model: String,
    pub exception: ErrorKind,
}

/// Retry/fallback configuration, validated at construction.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_on: HashSet<ErrorKind>,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Fractional uniform variation in `[0, 1]` added to the computed delay.
    pub jitter: f64,
    pub fallback_models: Vec<Model>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            retry_on: [ErrorKind::Connection, ErrorKind::RateLimit, ErrorKind::Server, ErrorKind::Timeout].into_iter().collect(),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: 0.0,
            fallback_models: Vec::new(),
        }
    }
}

impl RetryPolicy {
    /// Validate construction invariants: `backoff_multiplier >= 1`, `jitter`
    /// in `[0, 1]`. `max_retries`/`initial_delay`/`max_delay` are unsigned
    /// types here so their `>= 0` invariants hold by construction.
    pub fn validate(&self) -> Result<(), MicError> {
        if self.backoff_multiplier < 1.0 {
            return Err(MicError::InvalidRetryPolicy {
                reason: "backoff_multiplier must be >= 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(MicError::InvalidRetryPolicy {
                reason: "jitter must be in [0, 1]".to_string(),
            });
        }
        Ok(())
    }

    /// `delay(n) = min(initialDelay * multiplier^(n-1), maxDelay) * (1 + uniform(-jitter, +jitter))`.
    /// `attempt` is 1-indexed, matching the formula.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped = base.min(self.max_delay.as_secs_f64());
        let factor = if self.jitter > 0.0 {
            1.0 + rand::thread_rng().gen_range(-self.jitter..=self.jitter)
        } else {
            1.0
        };
        Duration::from_secs_f64((capped * factor).max(0.0))
    }
}

/// Wraps a primary [`Model`] plus [`RetryPolicy`] to implement the retry and
/// fallback sweep.
#[derive(Clone)]
pub struct Orchestrator {
    pub primary: Model,
    pub policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(primary: Model, policy: RetryPolicy) -> Result<Self, MicError> {
        policy.validate()?;
        Ok(Orchestrator { primary, policy })
    }

    /// The primary this run actually uses: the ambient current model
    /// installed via [`with_model`] if one is in scope, otherwise the
    /// orchestrator's own stored primary.
    fn effective_primary(&self) -> Model {
        CURRENT_MODEL.try_with(|m| m.clone()).unwrap_or_else(|_| self.primary.clone())
    }

    fn variants(&self) -> Vec<Model> {
        std::iter::once(self.effective_primary()).chain(self.policy.fallback_models.iter().cloned()).collect()
    }

    fn retryable(&self, error: &MicError) -> bool {
        error.kind().map(|k| self.policy.retry_on.contains(&k)).unwrap_or(false)
    }

    /// An orchestrator carrying `active` as its new primary and every other
    /// variant as fallbacks, preserving their relative order. The variant
    /// that succeeded is promoted so a subsequent resume tries it first.
    fn promote(&self, active: &Model) -> Orchestrator {
        let mut policy = self.policy.clone();
        policy.fallback_models = self.variants().into_iter().filter(|m| m.id.as_str() != active.id.as_str()).collect();
        Orchestrator { primary: active.clone(), policy }
    }

    /// For each variant in declaration order, retry up to `max_retries`
    /// times with backoff; non-retryable errors terminate immediately;
    /// exhausting every variant raises [`MicError::RetriesExhausted`].
    /// `cancel_token`, when given, races the backoff sleep: cancellation
    /// short-circuits the wait and propagates [`MicError::Cancelled`]
    /// instead of retrying.
    async fn run<F, Fut, T>(
        &self,
        cancel_token: Option<&CancellationToken>,
        mut invoke: F,
    ) -> Result<(T, Vec<RetryFailure>, Orchestrator), MicError>
    where
        F: FnMut(Model) -> Fut,
        Fut: std::future::Future<Output = Result<T, MicError>>,
    {
        let mut trail = Vec::new();
        for variant in self.variants() {
            for attempt in 0..=self.policy.max_retries {
                match invoke(variant.clone()).await {
                    Ok(value) => return Ok((value, trail, self.promote(&variant))),
                    Err(e) => {
                        if !self.retryable(&e) {
                            return Err(e);
                        }
                        trail.push(RetryFailure {
                            model: variant.id.as_str().to_string(),
                            exception: e.kind().expect("retryable implies a classified kind"),
                        });
                        if attempt < self.policy.max_retries {
                            let delay = self.policy.delay_for_attempt(attempt + 1);
                            match cancel_token {
                                Some(token) => tokio::select! {
                                    _ = tokio::time::sleep(delay) => {}
                                    _ = token.cancelled() => return Err(MicError::Cancelled),
                                },
                                None => tokio::time::sleep(delay).await,
                            }
                        }
                    }
                }
            }
        }
        Err(MicError::RetriesExhausted { trail })
    }

    /// Perform a retried/fallback-swept [`Model::call`].
    /// Returns the response, the accumulated failure trail, and a new
    /// orchestrator carrying the successful variant as its primary.
    pub async fn call(
        &self,
        content: impl Into<CallContent>,
        overrides: impl Fn() -> CallOverrides,
    ) -> Result<(Response, Vec<RetryFailure>, Orchestrator), MicError> {
        self.call_cancellable(content, overrides, None).await
    }

    /// Same as [`Orchestrator::call`], but races the retry backoff sleep
    /// against `cancel_token`. Cancellation is never retried: it propagates
    /// [`MicError::Cancelled`] immediately, even for a `retry_on`-eligible
    /// failure.
    pub async fn call_cancellable(
        &self,
        content: impl Into<CallContent>,
        overrides: impl Fn() -> CallOverrides,
        cancel_token: Option<&CancellationToken>,
    ) -> Result<(Response, Vec<RetryFailure>, Orchestrator), MicError> {
        let content = content.into();
        self.run(cancel_token, |model| {
            let content = clone_content(&content);
            let overrides = overrides();
            async move { model.call(content, overrides).await }
        })
        .await
    }

    /// Perform a retried/fallback-swept [`Model::stream`]. The caller is
    /// responsible for surfacing [`MicError::StreamRestarted`] while
    /// consuming the returned stream's chunks if a retryable error occurs
    /// mid-consumption.
    pub async fn stream(
        &self,
        content: impl Into<CallContent>,
        overrides: impl Fn() -> CallOverrides,
    ) -> Result<(StreamResponse, Vec<RetryFailure>, Orchestrator), MicError> {
        self.stream_cancellable(content, overrides, None).await
    }

    /// Same as [`Orchestrator::stream`], but races the retry backoff sleep
    /// against `cancel_token`, as in [`Orchestrator::call_cancellable`].
    pub async fn stream_cancellable(
        &self,
        content: impl Into<CallContent>,
        overrides: impl Fn() -> CallOverrides,
        cancel_token: Option<&CancellationToken>,
    ) -> Result<(StreamResponse, Vec<RetryFailure>, Orchestrator), MicError> {
        let content = content.into();
        self.run(cancel_token, |model| {
            let content = clone_content(&content);
            let overrides = overrides();
            async move { model.stream(content, overrides).await }
        })
        .await
    }
}

fn clone_content(content: &CallContent) -> CallContent {
    match content {
        CallContent::Text(t) => CallContent::Text(t.clone()),
        CallContent::UserParts(p) => CallContent::UserParts(p.clone()),
        CallContent::Messages(m) => CallContent::Messages(m.clone()),
    }
}
