//! Step validators and the verdicts they produce
//!
//! A validator sees an immutable snapshot of the shared form data. Whatever it
//! does (return `false`, return an error, panic, or run past the configured
//! timeout) the engine turns it into a [`Verdict`]; nothing propagates.

use async_trait::async_trait;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use super::types::FormData;

/// Gate for forward navigation out of a step
#[async_trait]
pub trait Validator: Send + Sync {
    /// `Ok(false)` rejects; an `Err` is treated as a fault and also rejects
    async fn validate(&self, data: Arc<FormData>) -> anyhow::Result<bool>;
}

/// Result of validating a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No validator, or the validator accepted the data
    Valid,
    /// The validator rejected the data
    Invalid,
    /// The validator failed to produce an answer
    Faulted(String),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, Verdict::Faulted(_))
    }
}

/// Validator backed by a synchronous predicate
pub struct FnValidator<F>(F);

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(&FormData) -> bool + Send + Sync,
{
    async fn validate(&self, data: Arc<FormData>) -> anyhow::Result<bool> {
        Ok((self.0)(&data))
    }
}

/// Validator backed by an async closure
pub struct AsyncFnValidator<F>(F);

#[async_trait]
impl<F, Fut> Validator for AsyncFnValidator<F>
where
    F: Fn(Arc<FormData>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send,
{
    async fn validate(&self, data: Arc<FormData>) -> anyhow::Result<bool> {
        (self.0)(data).await
    }
}

/// Wrap a synchronous predicate over the form data
pub fn validator_fn<F>(predicate: F) -> FnValidator<F>
where
    F: Fn(&FormData) -> bool + Send + Sync,
{
    FnValidator(predicate)
}

/// Wrap an async check over the form data
pub fn async_validator<F, Fut>(check: F) -> AsyncFnValidator<F>
where
    F: Fn(Arc<FormData>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send,
{
    AsyncFnValidator(check)
}

/// Run a validator to a verdict, containing errors, panics and overruns
pub(crate) async fn run_validator(
    validator: Arc<dyn Validator>,
    data: Arc<FormData>,
    timeout: Option<Duration>,
) -> Verdict {
    let check = AssertUnwindSafe(validator.validate(data)).catch_unwind();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, check).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return Verdict::Faulted(format!(
                    "validator timed out after {}ms",
                    limit.as_millis()
                ))
            }
        },
        None => check.await,
    };

    match outcome {
        Ok(Ok(true)) => Verdict::Valid,
        Ok(Ok(false)) => Verdict::Invalid,
        Ok(Err(err)) => Verdict::Faulted(format!("{:#}", err)),
        Err(payload) => Verdict::Faulted(format!(
            "validator panicked: {}",
            panic_message(&*payload)
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
