//! Text commands for the interactive registration session

use std::str::FromStr;
use thiserror::Error;

use crate::engine::StepStatus;
use crate::nav::TabKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate the active step and move forward
    Next { force: bool },
    Prev,
    /// Jump to a step by its 1-based number
    GoTo { number: usize, force: bool },
    /// Set a form field
    Set { key: String, value: String },
    /// Set the status of the active step
    Status(StepStatus),
    /// Send a key to the tab strip
    Tab(TabKey),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("'{0}' is not a step number")]
    InvalidNumber(String),

    #[error("expected key=value, got '{0}'")]
    InvalidAssignment(String),

    #[error("{0}")]
    InvalidKey(String),
}

/// Help lines, one per command
pub const HELP: &[(&str, &str)] = &[
    ("next [force]", "Validate this step and continue"),
    ("prev", "Go back one step"),
    ("goto N [force]", "Jump to step N"),
    ("set KEY=VALUE", "Set a form field (name, email)"),
    ("status TAG", "Set this step's status (complete, none, ...)"),
    ("tab KEY", "Tab strip key: left, right, home, end, enter, space"),
    ("show", "Show the wizard"),
    ("help", "Show this help"),
    ("quit", "Leave the wizard"),
];

fn is_force(token: Option<&str>) -> bool {
    matches!(token, Some("force" | "-f" | "--force"))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let mut args = rest.split_whitespace();

        match verb.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "next" | "n" => Ok(Command::Next {
                force: is_force(args.next()),
            }),
            "prev" | "back" | "p" => Ok(Command::Prev),
            "goto" | "g" => {
                let raw = args.next().ok_or(CommandError::MissingArgument {
                    command: "goto",
                    argument: "a step number",
                })?;
                let number = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| CommandError::InvalidNumber(raw.to_string()))?;
                Ok(Command::GoTo {
                    number,
                    force: is_force(args.next()),
                })
            }
            "set" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "set",
                        argument: "key=value",
                    });
                }
                let (key, value) = rest
                    .split_once('=')
                    .filter(|(key, _)| !key.trim().is_empty())
                    .ok_or_else(|| CommandError::InvalidAssignment(rest.to_string()))?;
                Ok(Command::Set {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                })
            }
            "status" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "status",
                        argument: "a status tag",
                    });
                }
                Ok(Command::Status(StepStatus::from(rest)))
            }
            "tab" => {
                let raw = args.next().ok_or(CommandError::MissingArgument {
                    command: "tab",
                    argument: "a key",
                })?;
                raw.parse::<TabKey>()
                    .map(Command::Tab)
                    .map_err(CommandError::InvalidKey)
            }
            "show" | "s" => Ok(Command::Show),
            "help" | "h" | "?" => Ok(Command::Help),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
