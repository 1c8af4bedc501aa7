//! Tab strip over the engine's steps, with roving keyboard focus
//!
//! Focus and the active step are separate: arrow keys, Home and End move focus
//! among the tabs, Enter and Space navigate to the focused tab. With
//! [`ArrowPolicy::Activate`] every focus move also navigates.

use serde::{Deserialize, Serialize};

use crate::engine::{GoTo, NavOptions, StepStatus, Stepper};

pub mod keys;

pub use keys::{Shortcut, TabKey, SHORTCUTS};

/// Whether focus moves also move the active step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowPolicy {
    /// Arrow keys only move focus; Enter/Space navigate
    #[default]
    FocusOnly,
    /// Arrow keys navigate to the newly focused tab
    Activate,
}

/// What a key press did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabAction {
    /// Focus moved; the active step did not change
    Focused(usize),
    /// A navigation request was sent to the engine
    Navigated(GoTo),
    /// Nothing to do (no tabs)
    None,
}

/// One rendered tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub position: usize,
    pub label: String,
    pub status: StepStatus,
    /// The tab for the active step
    pub selected: bool,
    /// Only the selected tab is a tab stop
    pub focusable: bool,
    pub disabled: bool,
    pub tab_id: String,
    pub panel_id: String,
}

/// Focus state for the step tabs
#[derive(Debug, Clone)]
pub struct TabStrip {
    focus: usize,
    policy: ArrowPolicy,
}

impl TabStrip {
    pub fn new(policy: ArrowPolicy) -> Self {
        Self { focus: 0, policy }
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn policy(&self) -> ArrowPolicy {
        self.policy
    }

    /// Snap focus back to the active step
    pub fn sync(&mut self, stepper: &Stepper) {
        self.focus = stepper.active();
    }

    /// Tabs in step order
    pub fn tabs(&self, stepper: &Stepper) -> Vec<Tab> {
        let snapshot = stepper.snapshot();
        snapshot
            .steps
            .iter()
            .map(|step| {
                let selected = step.position == snapshot.active;
                Tab {
                    position: step.position,
                    label: step.label(),
                    status: step.status.clone(),
                    selected,
                    focusable: selected,
                    disabled: step.disabled,
                    tab_id: step.tab_id(),
                    panel_id: step.panel_id(),
                }
            })
            .collect()
    }

    /// Pointer activation of a tab; respects the linear guard
    pub fn click(&mut self, stepper: &Stepper, position: usize) -> GoTo {
        self.focus = position;
        stepper.go_to(position, NavOptions::default())
    }

    pub fn handle_key(&mut self, stepper: &Stepper, key: TabKey) -> TabAction {
        let count = stepper.count();
        if count == 0 {
            return TabAction::None;
        }
        // Steps may have been removed since focus was last set
        let current = self.focus.min(count - 1);

        if key.activates() {
            self.focus = current;
            return TabAction::Navigated(stepper.go_to(current, NavOptions::default()));
        }

        let next = match key {
            TabKey::Right => (current + 1) % count,
            TabKey::Left => (current + count - 1) % count,
            TabKey::Home => 0,
            TabKey::End => count - 1,
            TabKey::Enter | TabKey::Space => current,
        };
        self.focus = next;

        match self.policy {
            ArrowPolicy::FocusOnly => TabAction::Focused(next),
            ArrowPolicy::Activate => {
                TabAction::Navigated(stepper.go_to(next, NavOptions::default()))
            }
        }
    }
}

impl Default for TabStrip {
    fn default() -> Self {
        Self::new(ArrowPolicy::default())
    }
}
