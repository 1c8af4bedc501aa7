use thiserror::Error;

use super::types::StepId;

/// Wiring errors raised to step collaborators.
///
/// Navigation that cannot happen is never an error (see `GoTo` and `Advance`);
/// these only signal a collaborator talking to an engine or step that is gone.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("stepper engine is no longer alive; collaborators must be attached to a live engine")]
    Detached,
    #[error("{0} is not registered with the stepper")]
    UnknownStep(StepId),
}
