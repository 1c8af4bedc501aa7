//! Keys understood by the tab strip, and the registry used for help output

use crossterm::event::KeyCode;
use std::str::FromStr;

/// A tab strip key, independent of the input backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabKey {
    Left,
    Right,
    Home,
    End,
    Enter,
    Space,
}

impl TabKey {
    /// Map a terminal key; keys the tab strip does not handle yield `None`
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Left => Some(TabKey::Left),
            KeyCode::Right => Some(TabKey::Right),
            KeyCode::Home => Some(TabKey::Home),
            KeyCode::End => Some(TabKey::End),
            KeyCode::Enter => Some(TabKey::Enter),
            KeyCode::Char(' ') => Some(TabKey::Space),
            _ => None,
        }
    }

    /// Enter and Space activate the focused tab
    pub fn activates(&self) -> bool {
        matches!(self, TabKey::Enter | TabKey::Space)
    }
}

impl FromStr for TabKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "arrowleft" => Ok(TabKey::Left),
            "right" | "arrowright" => Ok(TabKey::Right),
            "home" => Ok(TabKey::Home),
            "end" => Ok(TabKey::End),
            "enter" => Ok(TabKey::Enter),
            "space" | " " => Ok(TabKey::Space),
            other => Err(format!("unknown tab key '{}'", other)),
        }
    }
}

/// A keyboard shortcut definition
#[derive(Debug, Clone)]
pub struct Shortcut {
    /// Primary key for this shortcut
    pub key: KeyCode,
    /// Alternative key
    pub alt_key: Option<KeyCode>,
    /// Human-readable description of what this shortcut does
    pub description: &'static str,
}

impl Shortcut {
    /// Format key for display (e.g., "→", "Enter/Space")
    pub fn key_display(&self) -> String {
        let primary = format_keycode(&self.key);
        match &self.alt_key {
            Some(alt) => format!("{}/{}", primary, format_keycode(alt)),
            None => primary,
        }
    }

    /// Format key for help output (left-padded to 12 chars)
    pub fn key_display_padded(&self) -> String {
        format!("{:<12}", self.key_display())
    }
}

/// Format a KeyCode for display
fn format_keycode(key: &KeyCode) -> String {
    match key {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        _ => format!("{:?}", key),
    }
}

/// Static registry of tab strip shortcuts
pub static SHORTCUTS: &[Shortcut] = &[
    Shortcut {
        key: KeyCode::Tab,
        alt_key: None,
        description: "Focus the step tabs",
    },
    Shortcut {
        key: KeyCode::Right,
        alt_key: None,
        description: "Focus next tab (wraps around)",
    },
    Shortcut {
        key: KeyCode::Left,
        alt_key: None,
        description: "Focus previous tab (wraps around)",
    },
    Shortcut {
        key: KeyCode::Home,
        alt_key: None,
        description: "Focus first tab",
    },
    Shortcut {
        key: KeyCode::End,
        alt_key: None,
        description: "Focus last tab",
    },
    Shortcut {
        key: KeyCode::Enter,
        alt_key: Some(KeyCode::Char(' ')),
        description: "Go to focused step",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_codes_map_to_tab_keys() {
        assert_eq!(TabKey::from_key_code(KeyCode::Right), Some(TabKey::Right));
        assert_eq!(TabKey::from_key_code(KeyCode::Char(' ')), Some(TabKey::Space));
        assert_eq!(TabKey::from_key_code(KeyCode::Char('x')), None);
        assert_eq!(TabKey::from_key_code(KeyCode::Esc), None);
    }

    #[test]
    fn test_tab_key_from_text() {
        assert_eq!("Right".parse::<TabKey>(), Ok(TabKey::Right));
        assert_eq!("arrowleft".parse::<TabKey>(), Ok(TabKey::Left));
        assert!("up".parse::<TabKey>().is_err());
    }

    #[test]
    fn test_every_shortcut_key_is_handled() {
        for shortcut in SHORTCUTS.iter().filter(|s| s.key != KeyCode::Tab) {
            assert!(
                TabKey::from_key_code(shortcut.key).is_some(),
                "{} is listed but not handled",
                shortcut.key_display()
            );
        }
    }

    #[test]
    fn test_shortcut_display() {
        let activate = SHORTCUTS
            .iter()
            .find(|s| s.description.starts_with("Go to"))
            .unwrap();
        assert_eq!(activate.key_display(), "Enter/Space");
        assert_eq!(activate.key_display_padded().len(), 12);
    }
}
