//! Commands and supporting types used throughout wmbind.
//!
//! A [`Command`] is the declarative, i3-flavoured description of an action
//! (`focus left`, `move container to workspace "3"`, …).  It renders back to
//! config text through [`Command::generate`] and exposes a typed view of
//! itself through [`Command::kind`], which is what the runtime translator
//! matches on.
//!
//! Commands are plain values: two separately constructed `focus left`
//! commands compare equal, so matching never depends on identity.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Cardinal direction for focus, swap and display navigation.
///
/// The variants use yabai's compass names; the i3 dialect spells them
/// `up`, `down`, `right` and `left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// The word used for this direction in i3 config text.
    pub fn i3_name(self) -> &'static str {
        match self {
            Direction::North => "up",
            Direction::South => "down",
            Direction::East => "right",
            Direction::West => "left",
        }
    }

}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::North => write!(f, "north"),
            Direction::South => write!(f, "south"),
            Direction::East => write!(f, "east"),
            Direction::West => write!(f, "west"),
        }
    }
}

/// Parse a direction word (case-insensitive; accepts both `left` and `west`).
pub fn parse_direction(s: &str) -> Option<Direction> {
    match s.trim().to_lowercase().as_str() {
        "up" | "north" => Some(Direction::North),
        "down" | "south" => Some(Direction::South),
        "right" | "east" => Some(Direction::East),
        "left" | "west" => Some(Direction::West),
        _ => None,
    }
}

/// Window dimension addressed by a resize command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Width,
    Height,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Width => write!(f, "width"),
            Axis::Height => write!(f, "height"),
        }
    }
}

/// Whether a resize makes the window bigger or smaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeChange {
    Grow,
    Shrink,
}

impl SizeChange {
    /// `+1` for grow, `-1` for shrink.
    pub fn sign(self) -> i32 {
        match self {
            SizeChange::Grow => 1,
            SizeChange::Shrink => -1,
        }
    }
}

impl fmt::Display for SizeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeChange::Grow => write!(f, "grow"),
            SizeChange::Shrink => write!(f, "shrink"),
        }
    }
}

const MOVE_TO_WORKSPACE: &str = "container to workspace";
const NO_STARTUP_ID: &str = "--no-startup-id";

/// An abstract, immutable window-manager command.
///
/// `name` is the verb (`focus`, `move`, `resize`, …), `qualifier` the
/// sub-verb or direction, and `value` the free-form remainder.  Values that
/// carry names or command lines (workspace names, `exec` arguments, function
/// keys) are stored JSON-escaped, exactly as they appear in config text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    name: String,
    qualifier: String,
    value: String,
}

/// Typed view of a [`Command`] for the runtime path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Launch a program; `argv[0]` is the application or binary.
    Exec { argv: Vec<String> },
    /// Move focus one window (or one display) in a direction.
    Focus(Direction),
    /// Swap the focused window in a direction, or carry it to the next
    /// display.
    Move(Direction),
    /// Send the focused window to a named space.
    ///
    /// `follow` asks the translator to refocus the moved window afterwards.
    /// It is only ever set by the directional-move fallback.
    MoveToWorkspace { workspace: String, follow: bool },
    /// Grow or shrink the focused window along one axis.
    Resize {
        change: SizeChange,
        axis: Axis,
        amount: i32,
    },
    /// Focus a named space.
    Workspace(String),
    /// Invoke a registered callback.
    Func(String),
    /// Valid in config text, but nothing happens at runtime.
    Unknown,
}

/// Errors produced while interpreting a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unsupported(String),
    #[error("malformed resize: {0}")]
    Resize(String),
    #[error("exec without a program")]
    EmptyExec,
}

impl Command {
    /// Build a command from its raw parts.
    pub fn new(
        name: impl Into<String>,
        qualifier: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    //  Canonical constructors

    pub fn focus(direction: Direction) -> Self {
        Self::new("focus", direction.i3_name(), "")
    }

    pub fn move_window(direction: Direction) -> Self {
        Self::new("move", direction.i3_name(), "")
    }

    pub fn move_container(workspace: &str) -> Self {
        Self::new("move", MOVE_TO_WORKSPACE, escape(workspace))
    }

    pub fn workspace(name: &str) -> Self {
        Self::new("workspace", "", escape(name))
    }

    pub fn resize_grow(axis: Axis, amount: i32) -> Self {
        Self::resize(SizeChange::Grow, axis, amount)
    }

    pub fn resize_shrink(axis: Axis, amount: i32) -> Self {
        Self::resize(SizeChange::Shrink, axis, amount)
    }

    fn resize(change: SizeChange, axis: Axis, amount: i32) -> Self {
        Self::new(
            "resize",
            change.to_string(),
            format!("{} {} px or {} ppt", axis, amount, amount),
        )
    }

    pub fn exec(command_line: &str) -> Self {
        Self::new("exec", "", escape(command_line))
    }

    pub fn func(key: &str) -> Self {
        Self::new("func", "", escape(key))
    }

    pub fn mode(name: &str) -> Self {
        Self::new("mode", "", escape(name))
    }

    pub fn kill() -> Self {
        Self::new("kill", "", "")
    }

    pub fn fullscreen_toggle() -> Self {
        Self::new("fullscreen", "toggle", "")
    }

    /// Rewrite `exec` as `exec --no-startup-id`; other commands are returned
    /// unchanged.
    pub fn no_startup_id(&self) -> Self {
        if self.name == "exec" && self.qualifier.is_empty() {
            Self::new("exec", NO_STARTUP_ID, self.value.clone())
        } else {
            self.clone()
        }
    }

    //  Text form

    /// Render the command in the declarative i3 dialect.
    pub fn generate(&self) -> String {
        [&self.name, &self.qualifier, &self.value]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse i3 command text into its parts.
    ///
    /// This is the inverse of [`generate`](Command::generate) for every
    /// command the constructors produce.
    pub fn parse(text: &str) -> Result<Self, CommandParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommandParseError::Empty);
        }
        let (name, rest) = split_word(text);
        let (qualifier, value) = match name {
            "move" if rest.starts_with(MOVE_TO_WORKSPACE) => (
                MOVE_TO_WORKSPACE,
                rest[MOVE_TO_WORKSPACE.len()..].trim_start(),
            ),
            "exec" if rest.starts_with(NO_STARTUP_ID) => {
                (NO_STARTUP_ID, rest[NO_STARTUP_ID.len()..].trim_start())
            }
            "focus" | "move" | "resize" | "layout" | "split" | "fullscreen" | "floating"
            | "border" => split_word(rest),
            _ => ("", rest),
        };
        Ok(Self::new(name, qualifier, value))
    }

    //  Runtime view

    /// Interpret the command for the runtime translator.
    pub fn kind(&self) -> Result<CommandKind, CommandParseError> {
        match self.name.as_str() {
            "exec" => {
                let argv = parse_args(&unescape(&self.value));
                if argv.is_empty() {
                    return Err(CommandParseError::EmptyExec);
                }
                Ok(CommandKind::Exec { argv })
            }
            "focus" => parse_direction(&self.qualifier)
                .map(CommandKind::Focus)
                .ok_or_else(|| CommandParseError::Unsupported(self.generate())),
            "move" if self.qualifier == MOVE_TO_WORKSPACE => Ok(CommandKind::MoveToWorkspace {
                workspace: unescape(&self.value),
                follow: false,
            }),
            "move" => parse_direction(&self.qualifier)
                .map(CommandKind::Move)
                .ok_or_else(|| CommandParseError::Unsupported(self.generate())),
            "resize" => self.resize_kind(),
            "workspace" => Ok(CommandKind::Workspace(unescape(&self.value))),
            "func" => Ok(CommandKind::Func(unescape(&self.value))),
            _ => Ok(CommandKind::Unknown),
        }
    }

    fn resize_kind(&self) -> Result<CommandKind, CommandParseError> {
        let change = match self.qualifier.as_str() {
            "grow" => SizeChange::Grow,
            "shrink" => SizeChange::Shrink,
            // `resize set …` only has meaning inside i3.
            _ => return Ok(CommandKind::Unknown),
        };
        let mut parts = self.value.split_whitespace();
        let axis = match parts.next() {
            Some("width") => Axis::Width,
            Some("height") => Axis::Height,
            _ => return Err(CommandParseError::Resize(self.generate())),
        };
        let amount = parts
            .next()
            .and_then(|n| n.parse::<i32>().ok())
            .ok_or_else(|| CommandParseError::Resize(self.generate()))?;
        Ok(CommandKind::Resize {
            change,
            axis,
            amount,
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.generate())
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.generate())
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Command::parse(&s).map_err(DeError::custom)
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

/// Quote a string the way it appears in config text (JSON string syntax).
pub fn escape(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Undo [`escape`].  Text that is not a quoted string is returned trimmed
/// but otherwise verbatim.
pub fn unescape(s: &str) -> String {
    let s = s.trim();
    serde_json::from_str::<String>(s).unwrap_or_else(|_| s.to_string())
}

/// Quote `arg` so that [`parse_args`] reads it back as a single argument.
pub fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:+@%,=".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Split a command line into arguments, honouring single quotes, double
/// quotes and backslash escapes the way a POSIX shell would.
pub fn parse_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    current.push(q);
                }
            }
            '"' => {
                in_word = true;
                while let Some(q) = chars.next() {
                    match q {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                        }
                        _ => current.push(q),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            _ => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        args.push(current);
    }
    args
}
