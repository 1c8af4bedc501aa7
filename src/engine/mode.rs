//! Ownership of the active index: engine-owned or fed in by an external owner

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Callback invoked with the newly requested active position
pub type ChangeFn = Arc<dyn Fn(usize) + Send + Sync>;

/// Who owns the active index
pub enum ActiveMode {
    /// The engine holds the index and moves it itself
    Owned { initial: usize },
    /// The owner publishes the index through `source`; the engine only asks
    /// for moves through `on_change` and never writes the index
    External {
        source: watch::Receiver<usize>,
        on_change: ChangeFn,
    },
}

impl ActiveMode {
    pub fn owned(initial: usize) -> Self {
        ActiveMode::Owned { initial }
    }

    pub fn external(
        source: watch::Receiver<usize>,
        on_change: impl Fn(usize) + Send + Sync + 'static,
    ) -> Self {
        ActiveMode::External {
            source,
            on_change: Arc::new(on_change),
        }
    }

    pub fn is_controlled(&self) -> bool {
        matches!(self, ActiveMode::External { .. })
    }

    /// Initial engine-owned index (the owner's value is read live when controlled)
    pub(crate) fn initial(&self) -> usize {
        match self {
            ActiveMode::Owned { initial } => *initial,
            ActiveMode::External { source, .. } => *source.borrow(),
        }
    }
}

impl Default for ActiveMode {
    fn default() -> Self {
        ActiveMode::owned(0)
    }
}

impl fmt::Debug for ActiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveMode::Owned { initial } => {
                f.debug_struct("Owned").field("initial", initial).finish()
            }
            ActiveMode::External { source, .. } => f
                .debug_struct("External")
                .field("current", &*source.borrow())
                .finish_non_exhaustive(),
        }
    }
}
