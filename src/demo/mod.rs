//! Registration wizard built on the engine
//!
//! Four steps: Account (a name), Contact (an email that is well formed and not
//! already registered), Confirm and Summary. [`session::Session`] drives it
//! from text commands.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::Config;
use crate::engine::{
    async_validator, validator_fn, FormData, StepId, StepMeta, Stepper, StepperBuilder,
};

pub mod command;
pub mod directory;
pub mod session;

pub use command::{Command, CommandError};
pub use directory::EmailDirectory;
pub use session::{Reply, Session};

pub const NAME_FIELD: &str = "name";
pub const EMAIL_FIELD: &str = "email";

/// Shown for summary fields that were never filled in
pub const MISSING: &str = "—";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern must be a valid regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn field<'a>(data: &'a FormData, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

/// Account step: a name longer than one character
pub fn account_step() -> StepMeta {
    StepMeta::new("Account").with_validator(validator_fn(|data: &FormData| {
        field(data, NAME_FIELD).is_some_and(|name| name.chars().count() > 1)
    }))
}

/// Contact step: a well-formed email that the directory does not know yet
pub fn contact_step(directory: Arc<EmailDirectory>) -> StepMeta {
    StepMeta::new("Contact").with_validator(async_validator(move |data: Arc<FormData>| {
        let directory = Arc::clone(&directory);
        async move {
            let email = match field(&data, EMAIL_FIELD) {
                Some(email) if is_valid_email(email) => email,
                _ => return anyhow::Ok(false),
            };
            let taken: anyhow::Result<bool> = directory.is_taken(email).await;
            taken.map(|taken| !taken)
        }
    }))
}

/// Which panel a registered step renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Account,
    Contact,
    Confirm,
    Summary,
}

pub fn registration_steps(directory: Arc<EmailDirectory>) -> Vec<(Panel, StepMeta)> {
    vec![
        (Panel::Account, account_step()),
        (Panel::Contact, contact_step(directory)),
        (Panel::Confirm, StepMeta::new("Confirm")),
        (Panel::Summary, StepMeta::new("Summary")),
    ]
}

/// Engine plus the panel each registered step renders, keyed by step id
pub struct Wizard {
    pub stepper: Stepper,
    pub panels: HashMap<StepId, Panel>,
}

impl Wizard {
    /// Register the registration steps on `stepper`
    pub fn register(stepper: Stepper, directory: Arc<EmailDirectory>) -> Self {
        let panels = registration_steps(directory)
            .into_iter()
            .map(|(panel, meta)| (stepper.register(meta), panel))
            .collect();
        Self { stepper, panels }
    }

    pub fn panel(&self, id: StepId) -> Option<Panel> {
        self.panels.get(&id).copied()
    }
}

/// Label/value pairs for the summary panel
pub fn summary(data: &FormData) -> Vec<(&'static str, String)> {
    let value = |key: &str| {
        field(data, key)
            .filter(|value| !value.is_empty())
            .unwrap_or(MISSING)
            .to_string()
    };
    vec![("Full Name", value(NAME_FIELD)), ("Email Address", value(EMAIL_FIELD))]
}

/// Build the registration wizard from configuration.
///
/// With `controlled`, the active index lives in a channel owned by the caller
/// (here, a forwarding closure that accepts every requested move).
pub fn build_wizard(
    config: &Config,
    directory: Arc<EmailDirectory>,
    linear: bool,
    controlled: bool,
) -> Wizard {
    let builder = StepperBuilder::from_config(config).linear(linear || config.engine.linear);

    let stepper = if controlled {
        let (tx, rx) = watch::channel(config.engine.initial);
        builder
            .controlled(rx, move |position| {
                tx.send_replace(position);
            })
            .build()
    } else {
        builder.build()
    };
    Wizard::register(stepper, directory)
}

/// Directory with latency and seeded accounts taken from configuration
pub fn directory_from_config(config: &Config) -> Arc<EmailDirectory> {
    Arc::new(EmailDirectory::seeded(Duration::from_millis(
        config.checks.lookup_latency_ms,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Advance, NavOptions, StepStatus, Verdict};
    use serde_json::json;

    fn form(value: Value) -> FormData {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test data must be an object"),
        }
    }

    fn wizard() -> Stepper {
        let directory = Arc::new(
            EmailDirectory::new(Duration::from_millis(50)).with_taken(["taken@example.com"]),
        );
        Wizard::register(Stepper::builder().build(), directory).stepper
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@example.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email("@c.d"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_summary_fallbacks() {
        let rows = summary(&form(json!({ "name": "Ada Lovelace" })));
        assert_eq!(rows[0], ("Full Name", "Ada Lovelace".to_string()));
        assert_eq!(rows[1], ("Email Address", MISSING.to_string()));

        let rows = summary(&form(json!({ "name": "", "email": 7 })));
        assert_eq!(rows[0].1, MISSING);
        assert_eq!(rows[1].1, MISSING);
    }

    #[tokio::test]
    async fn test_account_requires_two_characters() {
        let stepper = wizard();

        stepper.set_data(form(json!({ "name": "A" })));
        assert_eq!(stepper.validate_step(0).await, Verdict::Invalid);

        stepper.set_data(form(json!({ "name": "Al" })));
        assert_eq!(stepper.validate_step(0).await, Verdict::Valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contact_rejects_taken_and_malformed_email() {
        let stepper = wizard();

        stepper.set_data(form(json!({ "email": "not-an-email" })));
        assert_eq!(stepper.validate_step(1).await, Verdict::Invalid);

        stepper.set_data(form(json!({ "email": "Taken@Example.com" })));
        assert_eq!(stepper.validate_step(1).await, Verdict::Invalid);

        stepper.set_data(form(json!({ "email": "new@example.com" })));
        assert_eq!(stepper.validate_step(1).await, Verdict::Valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_registration_walkthrough() {
        let stepper = wizard();

        assert!(matches!(
            stepper.go_next(NavOptions::default()).await,
            Advance::Rejected(Verdict::Invalid)
        ));

        stepper.update_data(|data| {
            data.insert(NAME_FIELD.into(), json!("Ada"));
        });
        assert!(stepper.go_next(NavOptions::default()).await.moved());
        stepper.set_status(0, StepStatus::Complete);

        stepper.update_data(|data| {
            data.insert(EMAIL_FIELD.into(), json!("ada@example.com"));
        });
        assert!(stepper.go_next(NavOptions::default()).await.moved());
        assert!(stepper.go_next(NavOptions::default()).await.moved());
        assert_eq!(stepper.active(), 3);

        let rows = summary(&stepper.data());
        assert_eq!(rows[1].1, "ada@example.com");
    }

    #[test]
    fn test_build_from_config() {
        let mut config = Config::default();
        config.engine.initial = 1;
        let directory = directory_from_config(&config);

        let owned = build_wizard(&config, Arc::clone(&directory), true, false).stepper;
        assert_eq!(owned.count(), 4);
        assert_eq!(owned.active(), 1);
        assert!(owned.is_linear());
        assert!(!owned.is_controlled());

        let controlled = build_wizard(&config, directory, false, true).stepper;
        assert!(controlled.is_controlled());
        assert_eq!(controlled.active(), 1);
        controlled.go_to(3, NavOptions::default());
        assert_eq!(controlled.active(), 3);
    }

    #[test]
    fn test_panels_follow_step_ids() {
        let directory = directory_from_config(&Config::default());
        let wizard = Wizard::register(Stepper::builder().build(), directory);
        let ids: Vec<_> = wizard.stepper.steps().into_iter().map(|step| step.id).collect();
        assert_eq!(wizard.panel(ids[1]), Some(Panel::Contact));

        wizard.stepper.unregister(ids[0]);
        let first = wizard.stepper.steps()[0].id;
        assert_eq!(wizard.panel(first), Some(Panel::Contact));
        assert_eq!(wizard.panel(ids[0]), Some(Panel::Account));
    }
}
