//! Step navigation engine
//!
//! [`Stepper`] owns the ordered list of live steps, the active index (unless an
//! external owner controls it), per-step completion status and the shared form
//! data. Collaborators (step panels, the tab strip, the progress indicator)
//! read snapshots from it and call its navigation operations.
//!
//! State lives in a `watch` channel: every mutation is a synchronous in-place
//! update of the current value, and subscribers are woken when engine-owned
//! state changes. Nothing holds the state across an `.await`.
//!
//! Forward navigation is single-flight: `go_next` claims a navigation ticket
//! before validating and only commits if no newer navigation was accepted in
//! the meantime. See [`Advance::Superseded`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::indicator::Progress;

pub mod error;
pub mod guard;
pub mod handle;
pub mod mode;
pub mod types;
pub mod validation;

pub use error::EngineError;
pub use guard::{GoTo, Ignored, NavOptions};
pub use handle::{StepHandle, StepProps, StepperHandle, Updates};
pub use mode::{ActiveMode, ChangeFn};
pub use types::{FormData, Snapshot, StepId, StepMeta, StepStatus, StepView};
pub use validation::{async_validator, validator_fn, Validator, Verdict};

use types::StepRecord;


/// Outcome of a validate-then-advance request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Validation passed and the active step moved forward
    Moved { from: usize, to: usize },
    /// Validation passed but the active step did not move (last step, or the
    /// target was ignored)
    Stayed {
        at: usize,
        ignored: Option<Ignored>,
    },
    /// The current step did not validate; nothing moved
    Rejected(Verdict),
    /// Another navigation was accepted while validation was pending
    Superseded,
}

impl Advance {
    /// Validation passed and this request was not superseded
    pub fn passed(&self) -> bool {
        matches!(self, Advance::Moved { .. } | Advance::Stayed { .. })
    }

    pub fn moved(&self) -> bool {
        matches!(self, Advance::Moved { .. })
    }
}

/// Engine-owned state, replaced in place under the watch channel
#[derive(Debug)]
pub(crate) struct EngineState {
    pub steps: Vec<StepRecord>,
    pub statuses: HashMap<StepId, StepStatus>,
    pub data: Arc<FormData>,
    pub owned_active: usize,
    /// Bumped by every accepted navigation; see `Stepper::go_next`
    pub ticket: u64,
    pub next_id: u64,
}

impl EngineState {
    fn mint(&mut self, meta: StepMeta) -> StepId {
        let id = StepId::new(self.next_id);
        self.next_id += 1;
        self.steps.push(StepRecord::new(id, meta));
        id
    }

    fn views(&self) -> Vec<StepView> {
        self.steps
            .iter()
            .enumerate()
            .map(|(position, record)| record.view(position, &self.statuses))
            .collect()
    }
}

pub(crate) struct Inner {
    state: watch::Sender<EngineState>,
    mode: ActiveMode,
    linear: bool,
    listener: Option<ChangeFn>,
    validation_timeout: Option<Duration>,
}

impl Inner {
    fn active_in(&self, state: &EngineState) -> usize {
        match &self.mode {
            ActiveMode::Owned { .. } => state.owned_active,
            ActiveMode::External { source, .. } => *source.borrow(),
        }
    }
}

/// How a navigation request relates to the ticket
#[derive(Debug, Clone, Copy)]
enum Claim {
    /// Immediate request for a position; claims a ticket if accepted
    Fresh(usize),
    /// Step forward from a step that has just passed validation. The request
    /// claimed `ticket` earlier and must still hold it. `validated` is `None`
    /// when no step sat at the claimed position `from`.
    Next {
        ticket: u64,
        validated: Option<StepId>,
        from: usize,
    },
}

/// Builder for [`Stepper`]
pub struct StepperBuilder {
    mode: ActiveMode,
    linear: bool,
    listener: Option<ChangeFn>,
    validation_timeout: Option<Duration>,
    steps: Vec<StepMeta>,
    data: FormData,
}

impl StepperBuilder {
    fn new() -> Self {
        Self {
            mode: ActiveMode::default(),
            linear: false,
            listener: None,
            validation_timeout: None,
            steps: Vec::new(),
            data: FormData::new(),
        }
    }

    /// Engine settings from configuration (linear mode, initial step, timeout)
    pub fn from_config(config: &Config) -> Self {
        let timeout = match config.validation.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        Self::new()
            .linear(config.engine.linear)
            .initial(config.engine.initial)
            .validation_timeout(timeout)
    }

    /// Engine-owned active index starting at `initial`
    pub fn initial(mut self, initial: usize) -> Self {
        self.mode = ActiveMode::owned(initial);
        self
    }

    /// Active index owned by the caller
    pub fn controlled(
        mut self,
        source: watch::Receiver<usize>,
        on_change: impl Fn(usize) + Send + Sync + 'static,
    ) -> Self {
        self.mode = ActiveMode::external(source, on_change);
        self
    }

    pub fn mode(mut self, mode: ActiveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn linear(mut self, linear: bool) -> Self {
        self.linear = linear;
        self
    }

    /// Notified with the new position after every committed move
    pub fn on_change(mut self, listener: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn validation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.validation_timeout = timeout;
        self
    }

    /// Register a step up front, in order
    pub fn step(mut self, meta: StepMeta) -> Self {
        self.steps.push(meta);
        self
    }

    pub fn steps(mut self, metas: impl IntoIterator<Item = StepMeta>) -> Self {
        self.steps.extend(metas);
        self
    }

    pub fn data(mut self, data: FormData) -> Self {
        self.data = data;
        self
    }

    pub fn build(self) -> Stepper {
        let mut state = EngineState {
            steps: Vec::with_capacity(self.steps.len()),
            statuses: HashMap::new(),
            data: Arc::new(self.data),
            owned_active: self.mode.initial(),
            ticket: 0,
            next_id: 0,
        };
        for meta in self.steps {
            state.mint(meta);
        }

        debug!(
            steps = state.steps.len(),
            linear = self.linear,
            controlled = self.mode.is_controlled(),
            "stepper created"
        );

        let (tx, _rx) = watch::channel(state);
        Stepper {
            inner: Arc::new(Inner {
                state: tx,
                mode: self.mode,
                linear: self.linear,
                listener: self.listener,
                validation_timeout: self.validation_timeout,
            }),
        }
    }
}

/// Handle to a navigation engine; clones share the same engine
#[derive(Clone)]
pub struct Stepper {
    inner: Arc<Inner>,
}

impl Default for Stepper {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for Stepper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stepper")
            .field("mode", &self.inner.mode)
            .field("linear", &self.inner.linear)
            .field("count", &self.count())
            .field("active", &self.active())
            .finish()
    }
}

impl Stepper {
    pub fn builder() -> StepperBuilder {
        StepperBuilder::new()
    }

    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    // ─── Registration ───────────────────────────────────────────────────────

    /// Append a step; its position is its place in registration order
    pub fn register(&self, meta: StepMeta) -> StepId {
        let title = meta.title.clone();
        let mut id = StepId::new(0);
        self.inner.state.send_modify(|state| {
            id = state.mint(meta);
        });
        debug!(step = %id, title = %title, "step registered");
        id
    }

    /// Remove a step. Statuses of the remaining steps stay attached to them;
    /// the active index is left numerically unchanged.
    pub fn unregister(&self, id: StepId) -> bool {
        let removed = self.inner.state.send_if_modified(|state| {
            let before = state.steps.len();
            state.steps.retain(|record| record.id != id);
            state.statuses.remove(&id);
            state.steps.len() != before
        });
        if removed {
            debug!(step = %id, "step unregistered");
        }
        removed
    }

    /// Register a step and return a handle for its collaborator
    pub fn attach(&self, meta: StepMeta) -> StepHandle {
        let id = self.register(meta);
        StepHandle::new(id, self.handle())
    }

    /// Weak handle for collaborators that must not keep the engine alive
    pub fn handle(&self) -> StepperHandle {
        StepperHandle::new(self)
    }

    // ─── Status and data ────────────────────────────────────────────────────

    /// Set the status of whichever step currently sits at `position`
    pub fn set_status(&self, position: usize, status: StepStatus) -> bool {
        let target = self.inner.state.borrow().steps.get(position).map(|r| r.id);
        match target {
            Some(id) => self.set_status_for(id, status),
            None => {
                debug!(position, "status ignored: no step at position");
                false
            }
        }
    }

    /// Set the status of a specific step
    pub fn set_status_for(&self, id: StepId, status: StepStatus) -> bool {
        let applied = self.inner.state.send_if_modified(|state| {
            if !state.steps.iter().any(|record| record.id == id) {
                return false;
            }
            state.statuses.insert(id, status);
            true
        });
        if applied {
            debug!(step = %id, "status updated");
        } else {
            debug!(step = %id, "status ignored: step not registered");
        }
        applied
    }

    /// Replace the shared data wholesale
    pub fn set_data(&self, data: FormData) {
        self.inner.state.send_modify(|state| {
            state.data = Arc::new(data);
        });
    }

    /// Read-modify-write of the shared data; last writer wins. `edit` runs on
    /// a copy outside the state lock, so it may read the engine.
    pub fn update_data(&self, edit: impl FnOnce(&mut FormData)) {
        let mut data = FormData::clone(&self.data());
        edit(&mut data);
        self.set_data(data);
    }

    pub fn data(&self) -> Arc<FormData> {
        self.inner.state.borrow().data.clone()
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    pub fn active(&self) -> usize {
        let state = self.inner.state.borrow();
        self.inner.active_in(&state)
    }

    pub fn count(&self) -> usize {
        self.inner.state.borrow().steps.len()
    }

    pub fn is_linear(&self) -> bool {
        self.inner.linear
    }

    pub fn is_controlled(&self) -> bool {
        self.inner.mode.is_controlled()
    }

    pub fn steps(&self) -> Vec<StepView> {
        self.inner.state.borrow().views()
    }

    pub fn step_at(&self, position: usize) -> Option<StepView> {
        let state = self.inner.state.borrow();
        state
            .steps
            .get(position)
            .map(|record| record.view(position, &state.statuses))
    }

    pub fn position_of(&self, id: StepId) -> Option<usize> {
        self.inner
            .state
            .borrow()
            .steps
            .iter()
            .position(|record| record.id == id)
    }

    /// Status of a registered step; `None` if the step is gone
    pub fn status_of(&self, id: StepId) -> Option<StepStatus> {
        let state = self.inner.state.borrow();
        state
            .steps
            .iter()
            .any(|record| record.id == id)
            .then(|| state.statuses.get(&id).cloned().unwrap_or_default())
    }

    /// Statuses by current position
    pub fn statuses(&self) -> Vec<StepStatus> {
        self.steps().into_iter().map(|view| view.status).collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.inner.state.borrow();
        Snapshot {
            steps: state.views(),
            active: self.inner.active_in(&state),
            data: state.data.clone(),
        }
    }

    pub fn progress(&self) -> Progress {
        let state = self.inner.state.borrow();
        Progress::of(self.inner.active_in(&state), state.steps.len())
    }

    /// Wake-ups for changes to engine-owned state
    pub fn subscribe(&self) -> Updates {
        Updates::new(self.inner.state.subscribe(), self.handle())
    }

    // ─── Navigation ─────────────────────────────────────────────────────────

    /// Run the validator of the step at `position` against the current data
    pub async fn validate_step(&self, position: usize) -> Verdict {
        let pending = {
            let state = self.inner.state.borrow();
            state
                .steps
                .get(position)
                .and_then(|record| record.meta.validator.clone())
                .map(|validator| (validator, state.data.clone()))
        };

        let Some((validator, data)) = pending else {
            return Verdict::Valid;
        };

        let verdict =
            validation::run_validator(validator, data, self.inner.validation_timeout).await;
        if let Verdict::Faulted(reason) = &verdict {
            warn!(position, reason = %reason, "validator faulted; treating step as invalid");
        }
        verdict
    }

    /// Jump to `position` if range, disabled and linear checks allow it
    pub fn go_to(&self, position: usize, opts: NavOptions) -> GoTo {
        self.commit(Claim::Fresh(position), opts)
    }

    /// Validate the active step, then move one step forward (clamped). In
    /// linear mode a step that validates unlocks the one after it.
    ///
    /// The step is tracked by id while its validator runs. If it is
    /// unregistered in the meantime the request is superseded.
    #[instrument(skip(self), level = "debug")]
    pub async fn go_next(&self, opts: NavOptions) -> Advance {
        let (ticket, from, validated) = self.claim();

        let verdict = self.validate_step(from).await;
        if !verdict.is_valid() {
            debug!(position = from, ?verdict, "forward navigation rejected");
            return Advance::Rejected(verdict);
        }

        let claim = Claim::Next {
            ticket,
            validated,
            from,
        };
        match self.commit(claim, opts) {
            GoTo::Committed { from, to } => Advance::Moved { from, to },
            GoTo::Unchanged(at) => Advance::Stayed { at, ignored: None },
            GoTo::Ignored(Ignored::Superseded) => Advance::Superseded,
            GoTo::Ignored(reason) => Advance::Stayed {
                at: self.active(),
                ignored: Some(reason),
            },
        }
    }

    /// Move one step back; never blocked by the linear guard
    pub fn go_prev(&self) -> GoTo {
        let target = self.active().saturating_sub(1);
        self.go_to(target, NavOptions::forced())
    }

    /// Take a fresh ticket and note which step navigation starts from
    fn claim(&self) -> (u64, usize, Option<StepId>) {
        let mut claimed = (0, 0, None);
        self.inner.state.send_if_modified(|state| {
            state.ticket += 1;
            let active = self.inner.active_in(state);
            let id = state.steps.get(active).map(|record| record.id);
            claimed = (state.ticket, active, id);
            false
        });
        claimed
    }

    fn commit(&self, claim: Claim, opts: NavOptions) -> GoTo {
        let inner = &self.inner;
        let mut outcome = GoTo::Ignored(Ignored::NoSteps);
        let mut position = match claim {
            Claim::Fresh(position) => position,
            Claim::Next { from, .. } => from,
        };

        inner.state.send_if_modified(|state| {
            let validated = match claim {
                Claim::Fresh(_) => None,
                Claim::Next {
                    ticket,
                    validated,
                    from,
                } => {
                    if state.ticket != ticket {
                        outcome = GoTo::Ignored(Ignored::Superseded);
                        return false;
                    }
                    // Re-resolve the validated step; removals shift positions
                    let at = match validated {
                        Some(id) => match state.steps.iter().position(|r| r.id == id) {
                            Some(at) => at,
                            None => {
                                outcome = GoTo::Ignored(Ignored::Superseded);
                                return false;
                            }
                        },
                        None => from,
                    };
                    position = at.saturating_add(1).min(state.steps.len().saturating_sub(1));
                    Some(at)
                }
            };

            if let Err(reason) = guard::check_target(
                &state.steps,
                &state.statuses,
                position,
                inner.linear,
                opts,
                validated,
            ) {
                outcome = GoTo::Ignored(reason);
                return false;
            }

            let from = inner.active_in(state);
            outcome = if from == position {
                GoTo::Unchanged(from)
            } else {
                GoTo::Committed { from, to: position }
            };
            if outcome.accepted() {
                state.ticket += 1;
            }

            match (&inner.mode, outcome) {
                (ActiveMode::Owned { .. }, GoTo::Committed { to, .. }) => {
                    state.owned_active = to;
                    true
                }
                _ => false,
            }
        });

        self.announce(position, outcome);
        outcome
    }

    /// Log the outcome and notify change callbacks, outside the state lock
    fn announce(&self, position: usize, outcome: GoTo) {
        match outcome {
            GoTo::Committed { from, to } => {
                info!(from, to, controlled = self.is_controlled(), "active step changed");
                if let ActiveMode::External { on_change, .. } = &self.inner.mode {
                    on_change(to);
                }
                if let Some(listener) = &self.inner.listener {
                    listener(to);
                }
            }
            GoTo::Unchanged(at) => debug!(position = at, "already on requested step"),
            GoTo::Ignored(reason) => debug!(position, reason = %reason, "navigation ignored"),
        }
    }
}
