//! Debounced side checks
//!
//! A [`DebouncedCheck`] runs an async lookup some time after the last input,
//! e.g. "is this email already registered". Only the newest input's result is
//! ever published: each submit aborts the previous task and bumps a generation
//! counter that the lookup re-checks before publishing.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Where a check currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckState<T> {
    Idle,
    /// Waiting out the delay or running the lookup
    Pending,
    Resolved(T),
    Failed(String),
}

impl<T> CheckState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, CheckState::Pending)
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            CheckState::Resolved(value) => Some(value),
            _ => None,
        }
    }
}

pub struct DebouncedCheck<T> {
    delay: Duration,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<CheckState<T>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T> DebouncedCheck<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(CheckState::Idle);
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(tx),
            task: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `lookup(input)` after the delay, replacing any pending check.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<I, F, Fut>(&self, input: I, lookup: F)
    where
        I: Send + 'static,
        F: FnOnce(I) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = CheckState::Pending;
        });

        let delay = self.delay;
        let current = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = lookup(input).await;

            let published = state.send_if_modified(|slot| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *slot = match result {
                    Ok(value) => CheckState::Resolved(value),
                    Err(err) => CheckState::Failed(format!("{:#}", err)),
                };
                true
            });
            if !published {
                debug!(generation, "stale check result dropped");
            }
        });

        if let Some(previous) = self.replace_task(Some(handle)) {
            previous.abort();
        }
    }

    pub fn state(&self) -> CheckState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CheckState<T>> {
        self.state.subscribe()
    }

    /// Drop any pending check and go back to idle
    pub fn cancel(&self) {
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = CheckState::Idle;
        });
        if let Some(previous) = self.replace_task(None) {
            previous.abort();
        }
    }

    fn replace_task(&self, handle: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, handle)
    }
}

impl<T> Drop for DebouncedCheck<T> {
    fn drop(&mut self) {
        let slot = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
