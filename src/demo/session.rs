//! Line-oriented registration session
//!
//! Each input line is parsed into a [`Command`] and applied to the engine. The
//! reply is plain text for the terminal.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::command::{Command, HELP};
use super::directory::EmailDirectory;
use super::{is_valid_email, summary, Panel, Wizard, EMAIL_FIELD, NAME_FIELD};
use crate::checks::{CheckState, DebouncedCheck};
use crate::config::Config;
use crate::engine::{Advance, GoTo, Ignored, NavOptions, StepId, StepStatus, Stepper, Verdict};
use crate::nav::{TabAction, TabStrip, SHORTCUTS};

const BAR_WIDTH: usize = 20;

/// What the session wants the caller to do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Print(String),
    Quit,
}

impl Reply {
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Print(text) => Some(text),
            Reply::Quit => None,
        }
    }
}

pub struct Session {
    stepper: Stepper,
    panels: HashMap<StepId, Panel>,
    strip: TabStrip,
    email_check: DebouncedCheck<bool>,
    directory: Arc<EmailDirectory>,
}

impl Session {
    pub fn new(config: &Config, wizard: Wizard, directory: Arc<EmailDirectory>) -> Self {
        let Wizard { stepper, panels } = wizard;
        let mut strip = TabStrip::new(config.nav.arrow_policy);
        strip.sync(&stepper);
        Self {
            stepper,
            panels,
            strip,
            email_check: DebouncedCheck::new(Duration::from_millis(config.checks.debounce_ms)),
            directory,
        }
    }

    pub fn stepper(&self) -> &Stepper {
        &self.stepper
    }

    pub fn strip(&self) -> &TabStrip {
        &self.strip
    }

    /// Panel of the active step, if it is one of ours
    fn active_panel(&self) -> Option<Panel> {
        let step = self.stepper.snapshot().active_step()?.id;
        self.panels.get(&step).copied()
    }

    pub fn email_check(&self) -> CheckState<bool> {
        self.email_check.state()
    }

    /// Parse and run one input line
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        match line.parse::<Command>() {
            Ok(command) => self.execute(command).await,
            Err(err) => Reply::Print(err.to_string()),
        }
    }

    pub async fn execute(&mut self, command: Command) -> Reply {
        debug!(?command, "session command");
        let text = match command {
            Command::Next { force } => self.next(force).await,
            Command::Prev => {
                let outcome = self.stepper.go_prev();
                self.after_move(outcome)
            }
            Command::GoTo { number, force } => {
                let outcome = self.stepper.go_to(number.saturating_sub(1), NavOptions { force });
                self.after_move(outcome)
            }
            Command::Set { key, value } => self.set_field(key, value),
            Command::Status(status) => {
                let active = self.stepper.active();
                if self.stepper.set_status(active, status.clone()) {
                    format!("Step {} marked '{}'", active + 1, status)
                } else {
                    "No step to mark".to_string()
                }
            }
            Command::Tab(key) => match self.strip.handle_key(&self.stepper, key) {
                TabAction::Focused(position) => {
                    format!("{}\nFocus on tab {}", self.render(), position + 1)
                }
                TabAction::Navigated(outcome) => self.after_move(outcome),
                TabAction::None => "No tabs".to_string(),
            },
            Command::Show => self.render(),
            Command::Help => help(),
            Command::Quit => return Reply::Quit,
        };
        Reply::Print(text)
    }

    async fn next(&mut self, force: bool) -> String {
        let leaving = self.stepper.snapshot().active_step().map(|step| step.id);
        let outcome = self.stepper.go_next(NavOptions { force }).await;

        if outcome.passed() {
            if let Some(id) = leaving {
                self.stepper.set_status_for(id, StepStatus::Complete);
            }
        }
        self.strip.sync(&self.stepper);

        match outcome {
            Advance::Moved { .. } => self.render(),
            Advance::Stayed { ignored: None, .. } => {
                format!("{}\nThat was the last step.", self.render())
            }
            Advance::Stayed {
                ignored: Some(reason),
                ..
            } => format!("{}\nCould not move on: {}", self.render(), reason),
            Advance::Rejected(Verdict::Faulted(reason)) => {
                format!("Could not check this step: {}", reason)
            }
            Advance::Rejected(_) => self.rejection_hint(),
            Advance::Superseded => "Another navigation happened first.".to_string(),
        }
    }

    fn rejection_hint(&self) -> String {
        let data = self.stepper.data();
        match self.active_panel() {
            Some(Panel::Account) => {
                "Enter a name of at least two characters: set name=...".to_string()
            }
            Some(Panel::Contact) => match data.get(EMAIL_FIELD).and_then(Value::as_str) {
                Some(email) if is_valid_email(email) => {
                    format!("{} is already registered", email)
                }
                Some(_) => "Please enter a valid email address".to_string(),
                None => "Enter an email address: set email=...".to_string(),
            },
            _ => "This step is not complete yet".to_string(),
        }
    }

    fn after_move(&mut self, outcome: GoTo) -> String {
        self.strip.sync(&self.stepper);
        match outcome {
            GoTo::Committed { .. } => self.render(),
            GoTo::Unchanged(position) => format!("Already on step {}", position + 1),
            GoTo::Ignored(Ignored::LinearGuard { position, .. }) => format!(
                "Step {} is locked until the steps before it are complete",
                position + 1
            ),
            GoTo::Ignored(reason) => format!("Cannot go there: {}", reason),
        }
    }

    fn set_field(&mut self, key: String, value: String) -> String {
        let reply = if value.is_empty() {
            format!("Cleared {}", key)
        } else {
            format!("{} = {}", key, value)
        };

        if key == EMAIL_FIELD {
            self.check_email(&value);
        }

        self.stepper.update_data(|data| {
            if value.is_empty() {
                data.remove(&key);
            } else {
                data.insert(key, Value::String(value));
            }
        });
        reply
    }

    fn check_email(&self, email: &str) {
        if !is_valid_email(email) {
            self.email_check.cancel();
            return;
        }
        let directory = Arc::clone(&self.directory);
        self.email_check
            .submit(email.to_string(), move |email: String| async move {
                directory.is_taken(&email).await
            });
    }

    /// The whole wizard as text: progress, tabs and the active panel
    pub fn render(&self) -> String {
        let snapshot = self.stepper.snapshot();
        let progress = snapshot.progress();
        let mut out = String::new();

        let _ = writeln!(
            out,
            "Step {} of {}  {}",
            progress.current,
            progress.total,
            progress.render_bar(BAR_WIDTH)
        );

        let tabs = self
            .strip
            .tabs(&self.stepper)
            .into_iter()
            .map(|tab| {
                let done = if tab.status.is_complete() { " ✓" } else { "" };
                let focus = if tab.position == self.strip.focus() { "*" } else { "" };
                let label = format!("{} {}{}{}", tab.position + 1, tab.label, done, focus);
                if tab.selected {
                    format!("[{}]", label)
                } else {
                    format!(" {} ", label)
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "{}", tabs);

        let Some(step) = snapshot.active_step() else {
            out.push_str("(no steps)");
            return out;
        };
        let field = |key: &str| {
            snapshot
                .data
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let _ = writeln!(out, "── {} ──", step.label());
        match self.panels.get(&step.id) {
            Some(Panel::Account) => {
                let _ = write!(out, "Name: {}", field(NAME_FIELD));
            }
            Some(Panel::Contact) => {
                let _ = write!(out, "Email: {}", field(EMAIL_FIELD));
                let note = match self.email_check.state() {
                    CheckState::Idle => String::new(),
                    CheckState::Pending => "  (checking...)".to_string(),
                    CheckState::Resolved(true) => "  (already registered)".to_string(),
                    CheckState::Resolved(false) => "  (available)".to_string(),
                    CheckState::Failed(reason) => format!("  (check failed: {})", reason),
                };
                out.push_str(&note);
            }
            Some(Panel::Confirm) => {
                let _ = write!(
                    out,
                    "Name: {}\nEmail: {}",
                    field(NAME_FIELD),
                    field(EMAIL_FIELD)
                );
            }
            Some(Panel::Summary) => {
                out.push_str("Registration complete");
                for (label, value) in summary(&snapshot.data) {
                    let _ = write!(out, "\n{:<14} {}", label, value);
                }
            }
            None => {}
        }
        out
    }
}

fn help() -> String {
    let mut out = String::from("Commands:");
    for (usage, description) in HELP {
        let _ = write!(out, "\n  {:<16} {}", usage, description);
    }
    out.push_str("\nTab keys:");
    for shortcut in SHORTCUTS {
        let _ = write!(
            out,
            "\n  {} {}",
            shortcut.key_display_padded(),
            shortcut.description
        );
    }
    out
}

impl Drop for Session {
    fn drop(&mut self) {
        info!(
            active = self.stepper.active(),
            steps = self.stepper.count(),
            "session ended"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::build_wizard;
    use crate::engine::StepMeta;

    fn session(linear: bool) -> Session {
        let mut config = Config::default();
        config.checks.debounce_ms = 100;
        let directory = Arc::new(
            EmailDirectory::new(Duration::from_millis(50)).with_taken(["taken@example.com"]),
        );
        let wizard = build_wizard(&config, Arc::clone(&directory), linear, false);
        Session::new(&config, wizard, directory)
    }

    fn text(reply: Reply) -> String {
        reply.text().unwrap_or_default().to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_marks_left_step_complete() {
        let mut session = session(false);

        let reply = text(session.handle_line("next").await);
        assert!(reply.contains("at least two characters"));
        assert_eq!(session.stepper().active(), 0);

        session.handle_line("set name=Ada").await;
        session.handle_line("next").await;
        assert_eq!(session.stepper().active(), 1);
        assert_eq!(session.stepper().statuses()[0], StepStatus::Complete);
        assert_eq!(session.strip().focus(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contact_hints() {
        let mut session = session(false);
        session.handle_line("goto 2").await;

        session.handle_line("set email=nope").await;
        let reply = text(session.handle_line("next").await);
        assert!(reply.contains("valid email"));

        session.handle_line("set email=taken@example.com").await;
        let reply = text(session.handle_line("next").await);
        assert!(reply.contains("already registered"));
        assert_eq!(session.stepper().active(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_email_check_runs_after_debounce() {
        let mut session = session(false);

        session.handle_line("set email=taken@example.com").await;
        assert!(session.email_check().is_pending());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(session.email_check(), CheckState::Resolved(true));

        session.handle_line("set email=bad").await;
        assert_eq!(session.email_check(), CheckState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_linear_session_locks_ahead() {
        let mut session = session(true);

        let reply = text(session.handle_line("goto 3").await);
        assert!(reply.contains("locked"));

        let reply = text(session.handle_line("goto 3 force").await);
        assert!(reply.contains("Step 3 of 4"));
        assert_eq!(session.stepper().active(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_renders_summary() {
        let mut session = session(false);
        for line in [
            "set name=Ada Lovelace",
            "next",
            "set email=ada@example.com",
            "next",
            "next",
        ] {
            session.handle_line(line).await;
        }

        let reply = text(session.handle_line("show").await);
        assert!(reply.contains("Step 4 of 4"));
        assert!(reply.contains("100%"));
        assert!(reply.contains("Registration complete"));
        assert!(reply.contains("Ada Lovelace"));
        assert!(reply.contains("1 Account ✓"));
    }

    #[tokio::test]
    async fn test_tab_keys_and_misc() {
        let mut session = session(false);

        let reply = text(session.handle_line("tab end").await);
        assert!(reply.contains("Focus on tab 4"));
        assert_eq!(session.stepper().active(), 0);

        session.handle_line("tab enter").await;
        assert_eq!(session.stepper().active(), 3);

        let reply = text(session.handle_line("status skipped").await);
        assert!(reply.contains("marked 'skipped'"));

        assert!(text(session.handle_line("help").await).contains("goto N"));
        assert!(text(session.handle_line("jump").await).contains("unknown command"));
        assert_eq!(session.handle_line("quit").await, Reply::Quit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panels_survive_title_changes() {
        let config = Config::default();
        let directory = Arc::new(EmailDirectory::new(Duration::from_millis(50)));
        let mut wizard = Wizard::register(Stepper::builder().build(), Arc::clone(&directory));
        let account = wizard.stepper.steps()[0].id;
        wizard.stepper.unregister(account);
        let renamed = wizard.stepper.register(StepMeta::new("Your details"));
        wizard.panels.insert(renamed, Panel::Account);
        wizard.stepper.go_to(3, NavOptions::forced());
        let mut session = Session::new(&config, wizard, directory);

        session.handle_line("set name=Ada").await;
        let reply = text(session.handle_line("show").await);
        assert!(reply.contains("Your details"));
        assert!(reply.contains("Name: Ada"));

        session.handle_line("goto 1").await;
        let reply = text(session.handle_line("show").await);
        assert!(reply.contains("Email: "));
    }
}
