//! Stepper - step navigation engine for multi-step forms and wizards
//!
//! The [`engine`] owns the ordered steps, the active index, per-step status and
//! the shared form data. [`nav`] and [`indicator`] are collaborators that read
//! from it; [`demo`] is a registration wizard driven from the terminal.

pub mod checks;
pub mod config;
pub mod demo;
pub mod engine;
pub mod indicator;
pub mod logging;
pub mod nav;

pub use engine::{
    ActiveMode, Advance, EngineError, FormData, GoTo, Ignored, NavOptions, Snapshot, StepHandle,
    StepId, StepMeta, StepStatus, StepView, Stepper, StepperBuilder, StepperHandle, Validator,
    Verdict,
};
pub use indicator::Progress;
