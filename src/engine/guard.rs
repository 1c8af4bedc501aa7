//! Target checks for navigation: range, disabled steps and the linear guard

use std::collections::HashMap;
use std::fmt;

use super::types::{StepId, StepRecord, StepStatus};

/// Per-call navigation options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavOptions {
    /// Skip the linear guard (range and disabled checks still apply)
    pub force: bool,
}

impl NavOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// Why a navigation request was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    /// No steps are registered
    NoSteps,
    /// Target outside `[0, count)`
    OutOfRange { position: usize, count: usize },
    /// Target step is disabled
    Disabled { position: usize },
    /// Linear mode forbids skipping past the first incomplete step
    LinearGuard {
        position: usize,
        highest_complete: Option<usize>,
    },
    /// A newer navigation request was accepted while this one was pending
    Superseded,
}

impl fmt::Display for Ignored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ignored::NoSteps => write!(f, "no steps registered"),
            Ignored::OutOfRange { position, count } => {
                write!(f, "position {} out of range (count {})", position, count)
            }
            Ignored::Disabled { position } => write!(f, "step {} is disabled", position),
            Ignored::LinearGuard {
                position,
                highest_complete,
            } => match highest_complete {
                Some(highest) => write!(
                    f,
                    "step {} is ahead of the last completed step {}",
                    position, highest
                ),
                None => write!(f, "step {} is ahead of the first step", position),
            },
            Ignored::Superseded => write!(f, "superseded by a newer navigation"),
        }
    }
}

/// Outcome of a direct jump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoTo {
    /// Active index moved (or, when controlled, the owner was asked to move it)
    Committed { from: usize, to: usize },
    /// Target is already active
    Unchanged(usize),
    /// Request dropped without effect
    Ignored(Ignored),
}

impl GoTo {
    pub fn moved(&self) -> bool {
        matches!(self, GoTo::Committed { .. })
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, GoTo::Ignored(_))
    }

    /// Accepted requests claim the navigation ticket
    pub(crate) fn accepted(&self) -> bool {
        !self.is_ignored()
    }
}

/// Highest position whose step is marked complete
pub(crate) fn highest_complete(
    steps: &[StepRecord],
    statuses: &HashMap<StepId, StepStatus>,
) -> Option<usize> {
    steps
        .iter()
        .enumerate()
        .filter(|(_, record)| statuses.get(&record.id).is_some_and(StepStatus::is_complete))
        .map(|(position, _)| position)
        .max()
}

/// Check whether `position` may become active.
///
/// `validated` is a position whose validator just passed; in linear mode the
/// step right after it is reachable as if it were complete.
pub(crate) fn check_target(
    steps: &[StepRecord],
    statuses: &HashMap<StepId, StepStatus>,
    position: usize,
    linear: bool,
    opts: NavOptions,
    validated: Option<usize>,
) -> Result<(), Ignored> {
    if steps.is_empty() {
        return Err(Ignored::NoSteps);
    }

    let Some(target) = steps.get(position) else {
        return Err(Ignored::OutOfRange {
            position,
            count: steps.len(),
        });
    };

    if target.meta.disabled {
        return Err(Ignored::Disabled { position });
    }

    if linear && !opts.force {
        let highest = highest_complete(steps, statuses);
        let reachable = highest.max(validated).map_or(0, |h| h + 1);
        if position > reachable {
            return Err(Ignored::LinearGuard {
                position,
                highest_complete: highest,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::StepMeta;

    fn records(titles: &[&str]) -> Vec<StepRecord> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| StepRecord::new(StepId::new(i as u64), StepMeta::new(*t)))
            .collect()
    }

    #[test]
    fn test_highest_complete_none_when_nothing_complete() {
        let steps = records(&["a", "b", "c"]);
        assert_eq!(highest_complete(&steps, &HashMap::new()), None);
    }

    #[test]
    fn test_highest_complete_ignores_custom_tags() {
        let steps = records(&["a", "b", "c"]);
        let mut statuses = HashMap::new();
        statuses.insert(steps[0].id, StepStatus::Complete);
        statuses.insert(steps[2].id, StepStatus::Custom("error".into()));
        assert_eq!(highest_complete(&steps, &statuses), Some(0));
    }

    #[test]
    fn test_empty_is_no_steps() {
        let result = check_target(&[], &HashMap::new(), 0, false, NavOptions::default(), None);
        assert_eq!(result, Err(Ignored::NoSteps));
    }

    #[test]
    fn test_out_of_range() {
        let steps = records(&["a", "b"]);
        let result = check_target(&steps, &HashMap::new(), 2, false, NavOptions::default(), None);
        assert_eq!(
            result,
            Err(Ignored::OutOfRange {
                position: 2,
                count: 2
            })
        );
    }

    #[test]
    fn test_disabled_even_when_forced() {
        let mut steps = records(&["a", "b"]);
        steps[1].meta.disabled = true;
        let result = check_target(&steps, &HashMap::new(), 1, true, NavOptions::forced(), None);
        assert_eq!(result, Err(Ignored::Disabled { position: 1 }));
    }

    #[test]
    fn test_linear_allows_first_incomplete_only() {
        let steps = records(&["a", "b", "c"]);
        let mut statuses = HashMap::new();

        assert!(check_target(&steps, &statuses, 0, true, NavOptions::default(), None).is_ok());
        assert_eq!(
            check_target(&steps, &statuses, 1, true, NavOptions::default(), None),
            Err(Ignored::LinearGuard {
                position: 1,
                highest_complete: None
            })
        );

        statuses.insert(steps[0].id, StepStatus::Complete);
        assert!(check_target(&steps, &statuses, 1, true, NavOptions::default(), None).is_ok());
        assert!(check_target(&steps, &statuses, 2, true, NavOptions::default(), None).is_err());
    }

    #[test]
    fn test_validated_step_unlocks_the_next_one() {
        let steps = records(&["a", "b", "c"]);
        let statuses = HashMap::new();

        assert!(check_target(&steps, &statuses, 1, true, NavOptions::default(), Some(0)).is_ok());
        assert_eq!(
            check_target(&steps, &statuses, 2, true, NavOptions::default(), Some(0)),
            Err(Ignored::LinearGuard {
                position: 2,
                highest_complete: None
            })
        );
    }

    #[test]
    fn test_force_bypasses_linear_guard() {
        let steps = records(&["a", "b", "c"]);
        assert!(check_target(&steps, &HashMap::new(), 2, true, NavOptions::forced(), None).is_ok());
    }

    #[test]
    fn test_free_mode_allows_any_enabled_step() {
        let steps = records(&["a", "b", "c"]);
        assert!(check_target(&steps, &HashMap::new(), 2, false, NavOptions::default(), None).is_ok());
    }
}
