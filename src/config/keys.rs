use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyBindingError {
    #[error("key binding cannot be empty")]
    Empty,
    #[error("unknown modifier: {0:?}")]
    UnknownModifier(String),
    #[error("key cannot be empty")]
    MissingKey,
}

/// A parsed binding such as `alt+m`, `ctrl+shift+tab` or `f11`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombination {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyCombination {
    pub fn parse(binding: &str) -> Result<Self, KeyBindingError> {
        if binding.is_empty() {
            return Err(KeyBindingError::Empty);
        }
        // A lone space is a key, not an empty binding.
        if binding == " " {
            return Ok(Self::plain("space"));
        }

        let lowered = binding.to_lowercase();
        let mut parts: Vec<&str> = lowered.split('+').collect();
        let key = parts.pop().map(str::trim).unwrap_or_default();

        let mut combo = Self::plain(canonical_key(key));
        for modifier in parts {
            match modifier.trim() {
                "ctrl" | "control" => combo.ctrl = true,
                "alt" => combo.alt = true,
                "shift" => combo.shift = true,
                other => return Err(KeyBindingError::UnknownModifier(other.to_string())),
            }
        }
        if combo.key.is_empty() {
            return Err(KeyBindingError::MissingKey);
        }
        Ok(combo)
    }

    fn plain(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        let Some(name) = key_name(event.code) else {
            return false;
        };
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let alt = event.modifiers.contains(KeyModifiers::ALT);
        name == self.key && ctrl == self.ctrl && alt == self.alt && shift_held(event) == self.shift
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("ctrl+")?;
        }
        if self.alt {
            f.write_str("alt+")?;
        }
        if self.shift {
            f.write_str("shift+")?;
        }
        f.write_str(&self.key)
    }
}

/// True when `binding` parses and matches `event`. Unparseable bindings never match.
pub fn binding_matches(binding: &str, event: &KeyEvent) -> bool {
    KeyCombination::parse(binding).is_ok_and(|combo| combo.matches(event))
}

fn canonical_key(key: &str) -> &str {
    match key {
        "escape" => "esc",
        "return" => "enter",
        "del" => "delete",
        "pageup" => "pgup",
        "pagedown" | "pgdn" => "pgdown",
        " " => "space",
        other => other,
    }
}

fn key_name(code: KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_lowercase().collect(),
        KeyCode::Tab | KeyCode::BackTab => "tab".to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Insert => "insert".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pgup".to_string(),
        KeyCode::PageDown => "pgdown".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        _ => return None,
    };
    Some(name)
}

/// Terminals disagree on reporting shift for symbols, so only letters and
/// non-character keys carry it.
fn shift_held(event: &KeyEvent) -> bool {
    match event.code {
        KeyCode::BackTab => true,
        KeyCode::Char(c) if c.is_alphabetic() => {
            c.is_uppercase() || event.modifiers.contains(KeyModifiers::SHIFT)
        }
        KeyCode::Char(_) => false,
        _ => event.modifiers.contains(KeyModifiers::SHIFT),
    }
}

/// Human-readable form of a key event, as shown by the debug echo.
pub fn describe_key(event: &KeyEvent) -> String {
    let name = key_name(event.code).unwrap_or_else(|| format!("{:?}", event.code).to_lowercase());
    let combo = KeyCombination {
        key: name,
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        alt: event.modifiers.contains(KeyModifiers::ALT),
        shift: shift_held(event),
    };
    combo.to_string()
}

/// Short label for help text: `space` for a literal space, `del` for delete.
pub fn display_binding(binding: &str) -> String {
    match binding {
        " " | "space" => "space".to_string(),
        "delete" => "del".to_string(),
        other => other.to_string(),
    }
}
