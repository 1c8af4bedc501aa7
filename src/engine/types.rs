//! Step records, statuses and the read-only views handed to collaborators

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::validation::Validator;
use crate::indicator::Progress;

/// Shared form data, one map for the whole wizard
pub type FormData = serde_json::Map<String, serde_json::Value>;

/// Stable identity of a registered step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(u64);

impl StepId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step-{}", self.0)
    }
}

/// Completion status tag of a step
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// No status recorded
    #[default]
    #[serde(rename = "none")]
    Pending,
    /// Step finished; counts towards the linear guard
    Complete,
    /// Caller-defined tag (e.g. "error", "skipped")
    Custom(String),
}

impl StepStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, StepStatus::Complete)
    }

    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Pending => "none",
            StepStatus::Complete => "complete",
            StepStatus::Custom(tag) => tag,
        }
    }
}

impl From<&str> for StepStatus {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "" | "none" => StepStatus::Pending,
            "complete" => StepStatus::Complete,
            other => StepStatus::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata supplied when a step is registered
#[derive(Clone, Default)]
pub struct StepMeta {
    /// Display title (tab label)
    pub title: String,
    /// Disabled steps cannot be navigated to
    pub disabled: bool,
    /// Optional gate for forward navigation out of this step
    pub validator: Option<Arc<dyn Validator>>,
}

impl StepMeta {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_shared_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }
}

impl fmt::Debug for StepMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepMeta")
            .field("title", &self.title)
            .field("disabled", &self.disabled)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// A live step as owned by the engine
#[derive(Debug, Clone)]
pub(crate) struct StepRecord {
    pub id: StepId,
    pub key: Uuid,
    pub meta: StepMeta,
}

impl StepRecord {
    pub fn new(id: StepId, meta: StepMeta) -> Self {
        Self {
            id,
            key: Uuid::new_v4(),
            meta,
        }
    }

    pub fn view(&self, position: usize, statuses: &HashMap<StepId, StepStatus>) -> StepView {
        StepView {
            id: self.id,
            key: self.key,
            position,
            title: self.meta.title.clone(),
            disabled: self.meta.disabled,
            status: statuses.get(&self.id).cloned().unwrap_or_default(),
            has_validator: self.meta.validator.is_some(),
        }
    }
}

/// Read-only view of one step, with its current position resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub id: StepId,
    pub key: Uuid,
    pub position: usize,
    pub title: String,
    pub disabled: bool,
    pub status: StepStatus,
    pub has_validator: bool,
}

impl StepView {
    /// Title, falling back to "Step N" for untitled steps
    pub fn label(&self) -> String {
        if self.title.is_empty() {
            format!("Step {}", self.position + 1)
        } else {
            self.title.clone()
        }
    }

    /// Element id for this step's tab
    pub fn tab_id(&self) -> String {
        format!("tab-{}", self.key)
    }

    /// Element id for this step's panel
    pub fn panel_id(&self) -> String {
        format!("panel-{}", self.key)
    }
}

/// Everything a renderer needs in one consistent read
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub steps: Vec<StepView>,
    pub active: usize,
    pub data: Arc<FormData>,
}

impl Snapshot {
    /// The step at the active position, if one exists there
    pub fn active_step(&self) -> Option<&StepView> {
        self.steps.get(self.active)
    }

    pub fn progress(&self) -> Progress {
        Progress::of(self.active, self.steps.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_from_text() {
        assert_eq!(StepStatus::from("complete"), StepStatus::Complete);
        assert_eq!(StepStatus::from("none"), StepStatus::Pending);
        assert_eq!(StepStatus::from(""), StepStatus::Pending);
        assert_eq!(
            StepStatus::from("error"),
            StepStatus::Custom("error".to_string())
        );
    }

    #[test]
    fn test_status_serializes_pending_as_none() {
        let json = serde_json::to_string(&StepStatus::Pending).unwrap();
        assert_eq!(json, "\"none\"");
        let json = serde_json::to_string(&StepStatus::Complete).unwrap();
        assert_eq!(json, "\"complete\"");
    }

    #[test]
    fn test_view_label_falls_back_to_position() {
        let record = StepRecord::new(StepId::new(7), StepMeta::new(""));
        let view = record.view(2, &HashMap::new());
        assert_eq!(view.label(), "Step 3");
        assert_eq!(view.status, StepStatus::Pending);
    }

    #[test]
    fn test_view_element_ids_share_render_key() {
        let record = StepRecord::new(StepId::new(1), StepMeta::new("Account"));
        let view = record.view(0, &HashMap::new());
        assert_eq!(view.label(), "Account");
        assert!(view.tab_id().starts_with("tab-"));
        assert_eq!(
            view.tab_id().trim_start_matches("tab-"),
            view.panel_id().trim_start_matches("panel-")
        );
    }

    #[test]
    fn test_meta_debug_hides_validator_body() {
        let meta = StepMeta::new("Contact").disabled(true);
        let rendered = format!("{:?}", meta);
        assert!(rendered.contains("Contact"));
        assert!(rendered.contains("validator: false"));
    }
}
