//! Key-chord specifications (`$mod+Shift+Left`) and the variable table
//! used to expand them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Flat `$name -> value` table, built once from config and read-only after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    vars: BTreeMap<String, String>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

impl From<BTreeMap<String, String>> for VariableTable {
    fn from(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }
}

/// Modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Cmd,
    Ctrl,
    Alt,
    Shift,
}

impl Modifier {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "cmd" | "command" | "super" | "mod4" | "win" => Some(Modifier::Cmd),
            "ctrl" | "control" => Some(Modifier::Ctrl),
            "alt" | "option" | "opt" | "mod1" => Some(Modifier::Alt),
            "shift" => Some(Modifier::Shift),
            _ => None,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Cmd => write!(f, "cmd"),
            Modifier::Ctrl => write!(f, "ctrl"),
            Modifier::Alt => write!(f, "alt"),
            Modifier::Shift => write!(f, "shift"),
        }
    }
}

/// A non-modifier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// `a`–`z`, always lower case.
    Letter(char),
    /// `0`–`9`.
    Digit(u8),
    /// `F1`–`F12`.
    Function(u8),
    Left,
    Right,
    Up,
    Down,
    Return,
    Space,
    Escape,
    Tab,
    Backspace,
    Grave,
    Minus,
    Equal,
    Comma,
    Period,
    Slash,
    Semicolon,
    Quote,
    BracketLeft,
    BracketRight,
    Backslash,
}

impl Key {
    fn parse(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_lowercase() {
                return Some(Key::Letter(c));
            }
            if let Some(d) = c.to_digit(10) {
                return Some(Key::Digit(d as u8));
            }
        }
        if let Some(n) = token.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            if (1..=12).contains(&n) {
                return Some(Key::Function(n));
            }
        }
        let key = match token {
            "left" => Key::Left,
            "right" => Key::Right,
            "up" => Key::Up,
            "down" => Key::Down,
            "return" | "enter" => Key::Return,
            "space" => Key::Space,
            "escape" | "esc" => Key::Escape,
            "tab" => Key::Tab,
            "backspace" | "delete" => Key::Backspace,
            "grave" | "`" => Key::Grave,
            "minus" | "-" => Key::Minus,
            "equal" | "=" => Key::Equal,
            "comma" | "," => Key::Comma,
            "period" | "." => Key::Period,
            "slash" | "/" => Key::Slash,
            "semicolon" | ";" => Key::Semicolon,
            "quote" | "apostrophe" | "'" => Key::Quote,
            "bracketleft" | "[" => Key::BracketLeft,
            "bracketright" | "]" => Key::BracketRight,
            "backslash" | "\\" => Key::Backslash,
            _ => return None,
        };
        Some(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Letter(c) => write!(f, "{}", c),
            Key::Digit(d) => write!(f, "{}", d),
            Key::Function(n) => write!(f, "F{}", n),
            Key::Left => write!(f, "Left"),
            Key::Right => write!(f, "Right"),
            Key::Up => write!(f, "Up"),
            Key::Down => write!(f, "Down"),
            Key::Return => write!(f, "Return"),
            Key::Space => write!(f, "space"),
            Key::Escape => write!(f, "Escape"),
            Key::Tab => write!(f, "Tab"),
            Key::Backspace => write!(f, "BackSpace"),
            Key::Grave => write!(f, "grave"),
            Key::Minus => write!(f, "minus"),
            Key::Equal => write!(f, "equal"),
            Key::Comma => write!(f, "comma"),
            Key::Period => write!(f, "period"),
            Key::Slash => write!(f, "slash"),
            Key::Semicolon => write!(f, "semicolon"),
            Key::Quote => write!(f, "apostrophe"),
            Key::BracketLeft => write!(f, "bracketleft"),
            Key::BracketRight => write!(f, "bracketright"),
            Key::Backslash => write!(f, "backslash"),
        }
    }
}

/// Errors from parsing or validating a chord.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChordError {
    /// The chord would swallow the terminal's interrupt/EOF keys.
    #[error("cannot use {chord} as a hotkey")]
    ReservedHotkey { chord: String },

    #[error("{spec}: undefined variable {name}")]
    UnknownVariable { spec: String, name: String },

    #[error("{spec}: unknown key {token:?}")]
    UnknownToken { spec: String, token: String },

    #[error("{spec}: no key, only modifiers")]
    MissingKey { spec: String },

    #[error("{spec}: more than one key")]
    MultipleKeys { spec: String },
}

/// A resolved key combination: a set of modifiers plus exactly one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chord {
    modifiers: BTreeSet<Modifier>,
    key: Key,
}

impl Chord {
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, key: Key) -> Self {
        Self {
            modifiers: modifiers.into_iter().collect(),
            key,
        }
    }

    pub fn modifiers(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.modifiers.iter().copied()
    }

    pub fn key(&self) -> Key {
        self.key
    }

    /// Parse a `+`-joined chord, expanding `$variables`.
    ///
    /// Tokens are case-insensitive.  A variable may itself expand to a
    /// `+`-joined list (`$hyper = "cmd+alt+ctrl"`).
    pub fn parse(spec: &str, variables: &VariableTable) -> Result<Self, ChordError> {
        let mut modifiers = BTreeSet::new();
        let mut key = None;

        for raw in spec.split('+').map(str::trim) {
            let expanded = if raw.starts_with('$') {
                variables
                    .get(raw)
                    .ok_or_else(|| ChordError::UnknownVariable {
                        spec: spec.to_string(),
                        name: raw.to_string(),
                    })?
            } else {
                raw
            };

            for token in expanded.split('+').map(|t| t.trim().to_lowercase()) {
                if let Some(m) = Modifier::parse(&token) {
                    modifiers.insert(m);
                    continue;
                }
                let k = Key::parse(&token).ok_or_else(|| ChordError::UnknownToken {
                    spec: spec.to_string(),
                    token: token.clone(),
                })?;
                if key.replace(k).is_some() {
                    return Err(ChordError::MultipleKeys {
                        spec: spec.to_string(),
                    });
                }
            }
        }

        let key = key.ok_or_else(|| ChordError::MissingKey {
            spec: spec.to_string(),
        })?;
        let chord = Self { modifiers, key };
        if chord.is_reserved() {
            return Err(ChordError::ReservedHotkey {
                chord: chord.to_string(),
            });
        }
        Ok(chord)
    }

    /// `ctrl+c` and `ctrl+d` on their own are never bound.
    pub fn is_reserved(&self) -> bool {
        self.modifiers.len() == 1
            && self.modifiers.contains(&Modifier::Ctrl)
            && matches!(self.key, Key::Letter('c') | Key::Letter('d'))
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m)?;
        }
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> VariableTable {
        let mut v = VariableTable::new();
        v.insert("$mod", "cmd");
        v.insert("$hyper", "cmd+alt+ctrl");
        v
    }

    #[test]
    fn variable_resolves_to_modifier() {
        let chord = Chord::parse("$mod+Left", &vars()).unwrap();
        assert_eq!(chord, Chord::new([Modifier::Cmd], Key::Left));
        assert_eq!(chord.to_string(), "cmd+Left");
    }

    #[test]
    fn modifier_order_does_not_matter() {
        let a = Chord::parse("shift+$mod+a", &vars()).unwrap();
        let b = Chord::parse("Cmd+Shift+A", &vars()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn variables_may_expand_to_several_modifiers() {
        let chord = Chord::parse("$hyper+F5", &vars()).unwrap();
        assert_eq!(
            chord,
            Chord::new([Modifier::Cmd, Modifier::Alt, Modifier::Ctrl], Key::Function(5))
        );
    }

    #[test]
    fn keys_cover_digits_and_punctuation() {
        let v = vars();
        assert_eq!(Chord::parse("$mod+1", &v).unwrap().key(), Key::Digit(1));
        assert_eq!(Chord::parse("$mod+grave", &v).unwrap().key(), Key::Grave);
        assert_eq!(Chord::parse("$mod+Return", &v).unwrap().key(), Key::Return);
        assert_eq!(Chord::parse("$mod+comma", &v).unwrap().key(), Key::Comma);
        assert_eq!(Chord::parse("Escape", &v).unwrap().key(), Key::Escape);
    }

    #[test]
    fn undefined_variable_is_an_error() {
        assert_eq!(
            Chord::parse("$meta+a", &vars()),
            Err(ChordError::UnknownVariable {
                spec: "$meta+a".into(),
                name: "$meta".into(),
            })
        );
    }

    #[test]
    fn unknown_token_is_an_error() {
        assert!(matches!(
            Chord::parse("$mod+banana", &vars()),
            Err(ChordError::UnknownToken { .. })
        ));
        assert!(matches!(
            Chord::parse("$mod+F13", &vars()),
            Err(ChordError::UnknownToken { .. })
        ));
    }

    #[test]
    fn modifiers_alone_are_not_a_chord() {
        assert!(matches!(
            Chord::parse("$mod+shift", &vars()),
            Err(ChordError::MissingKey { .. })
        ));
    }

    #[test]
    fn two_keys_are_rejected() {
        assert!(matches!(
            Chord::parse("$mod+a+b", &vars()),
            Err(ChordError::MultipleKeys { .. })
        ));
    }

    #[test]
    fn ctrl_c_and_ctrl_d_are_reserved() {
        for spec in ["ctrl+c", "Control+D"] {
            assert!(matches!(
                Chord::parse(spec, &vars()),
                Err(ChordError::ReservedHotkey { .. })
            ));
        }
        assert_eq!(
            Chord::parse("ctrl+c", &vars()).unwrap_err().to_string(),
            "cannot use ctrl+c as a hotkey"
        );
    }

    #[test]
    fn ctrl_c_with_extra_modifiers_is_allowed() {
        assert!(Chord::parse("ctrl+shift+c", &vars()).is_ok());
        assert!(Chord::parse("$mod+c", &vars()).is_ok());
    }
}
