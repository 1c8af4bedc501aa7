//! Handles given to collaborators: weak engine references, per-step handles
//! and change subscriptions

use std::sync::{Arc, Weak};
use tokio::sync::watch;

use super::error::EngineError;
use super::guard::{GoTo, NavOptions};
use super::types::{FormData, Snapshot, StepId, StepMeta, StepStatus};
use super::{Advance, EngineState, Inner, Stepper};

/// Weak reference to an engine; fails with [`EngineError::Detached`] once
/// every [`Stepper`] clone is dropped
#[derive(Clone)]
pub struct StepperHandle {
    inner: Weak<Inner>,
}

impl StepperHandle {
    pub(crate) fn new(stepper: &Stepper) -> Self {
        Self {
            inner: stepper.downgrade(),
        }
    }

    /// The live engine, or an error if it is gone
    pub fn stepper(&self) -> Result<Stepper, EngineError> {
        self.inner
            .upgrade()
            .map(Stepper::from_inner)
            .ok_or(EngineError::Detached)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl std::fmt::Debug for StepperHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepperHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// What a step panel needs to render itself
#[derive(Debug, Clone)]
pub struct StepProps {
    pub id: StepId,
    pub position: usize,
    pub active: bool,
    pub is_first: bool,
    pub is_last: bool,
    pub status: StepStatus,
    pub data: Arc<FormData>,
}

/// A step collaborator's connection to the engine.
///
/// Created by [`Stepper::attach`]; the owning collaborator calls
/// [`StepHandle::detach`] when the step goes away.
#[derive(Debug, Clone)]
pub struct StepHandle {
    id: StepId,
    engine: StepperHandle,
}

impl StepHandle {
    pub(crate) fn new(id: StepId, engine: StepperHandle) -> Self {
        Self { id, engine }
    }

    /// Register a step through a weak engine handle
    pub fn attach(engine: &StepperHandle, meta: StepMeta) -> Result<Self, EngineError> {
        Ok(engine.stepper()?.attach(meta))
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn props(&self) -> Result<StepProps, EngineError> {
        let stepper = self.engine.stepper()?;
        let snapshot = stepper.snapshot();
        let position = snapshot
            .steps
            .iter()
            .position(|view| view.id == self.id)
            .ok_or(EngineError::UnknownStep(self.id))?;

        Ok(StepProps {
            id: self.id,
            position,
            active: position == snapshot.active,
            is_first: position == 0,
            is_last: position + 1 == snapshot.steps.len(),
            status: snapshot.steps[position].status.clone(),
            data: snapshot.data,
        })
    }

    /// Set this step's own status
    pub fn set_status(&self, status: StepStatus) -> Result<bool, EngineError> {
        Ok(self.engine.stepper()?.set_status_for(self.id, status))
    }

    pub fn set_data(&self, data: FormData) -> Result<(), EngineError> {
        self.engine.stepper()?.set_data(data);
        Ok(())
    }

    pub async fn go_next(&self, opts: NavOptions) -> Result<Advance, EngineError> {
        let stepper = self.engine.stepper()?;
        Ok(stepper.go_next(opts).await)
    }

    pub fn go_prev(&self) -> Result<GoTo, EngineError> {
        Ok(self.engine.stepper()?.go_prev())
    }

    pub fn go_to(&self, position: usize, opts: NavOptions) -> Result<GoTo, EngineError> {
        Ok(self.engine.stepper()?.go_to(position, opts))
    }

    /// Remove this step from the engine
    pub fn detach(self) -> Result<bool, EngineError> {
        Ok(self.engine.stepper()?.unregister(self.id))
    }
}

/// Subscription to engine-owned state changes (registration, status, data and
/// the engine-owned active index). A controlled index is published by its
/// owner, not here.
pub struct Updates {
    rx: watch::Receiver<EngineState>,
    engine: StepperHandle,
}

impl Updates {
    pub(crate) fn new(rx: watch::Receiver<EngineState>, engine: StepperHandle) -> Self {
        Self { rx, engine }
    }

    /// Wait for the next change and return a fresh snapshot
    pub async fn changed(&mut self) -> Result<Snapshot, EngineError> {
        self.rx.changed().await.map_err(|_| EngineError::Detached)?;
        self.engine.stepper().map(|stepper| stepper.snapshot())
    }

    /// Whether a change arrived that has not been seen yet
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}
