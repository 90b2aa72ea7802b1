//! [`WindowManager`] implementation backed by the yabai CLI.
//!
//! Every call runs one `yabai -m …` process and waits for it.  Queries parse
//! the JSON printed on stdout; actions succeed when yabai exits with status
//! zero.

use crate::snapshot::{Display, Rect, Snapshot, Space, WindowId};
use crate::traits::{WindowManager, WmAction};
use log::debug;
use serde::Deserialize;
use std::process::Command as Process;

/// yabai-backed window manager.
pub struct YabaiWm {
    binary: String,
}

/// Errors that can occur when talking to yabai.
#[derive(Debug, thiserror::Error)]
#[error("yabai error: {0}")]
pub struct YabaiError(String);

impl Default for YabaiWm {
    fn default() -> Self {
        Self::new("yabai")
    }
}

impl YabaiWm {
    /// `binary` is the path or name of the yabai executable.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run `yabai -m <args>` and return its stdout.
    fn message(&self, args: &[String]) -> Result<String, YabaiError> {
        debug!("{} -m {}", self.binary, args.join(" "));
        let output = Process::new(&self.binary)
            .arg("-m")
            .args(args)
            .output()
            .map_err(|e| YabaiError(format!("run {}: {}", self.binary, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(YabaiError(format!(
                "{} ({})",
                stderr.trim(),
                output.status
            )));
        }
        String::from_utf8(output.stdout).map_err(|e| YabaiError(format!("utf-8: {}", e)))
    }

    fn query(&self, what: &[&str]) -> Result<String, YabaiError> {
        let mut args = vec!["query".to_string()];
        args.extend(what.iter().map(|s| s.to_string()));
        self.message(&args)
    }
}

//  Minimal serde structs for the JSON we care about

#[derive(Deserialize)]
struct FrameJson {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

/// Subset of an entry from `query --displays`.
#[derive(Deserialize)]
struct DisplayJson {
    index: u32,
    frame: FrameJson,
}

/// Subset of an entry from `query --spaces`.
///
/// Older yabai releases spell the flags `focused` / `visible`.
#[derive(Deserialize)]
struct SpaceJson {
    index: u32,
    #[serde(default)]
    label: String,
    display: u32,
    #[serde(rename = "has-focus", alias = "focused", default)]
    has_focus: bool,
    #[serde(rename = "is-visible", alias = "visible", default)]
    is_visible: bool,
}

/// Subset of `query --windows --window`.
#[derive(Deserialize)]
struct WindowJson {
    id: u64,
}

fn parse_json<'a, T: Deserialize<'a>>(json: &'a str, what: &str) -> Result<T, YabaiError> {
    serde_json::from_str(json).map_err(|e| YabaiError(format!("parse {}: {}", what, e)))
}

/// Parse `query --displays` output.  Empty output means no displays.
pub fn parse_displays(json: &str) -> Result<Vec<Display>, YabaiError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let displays: Vec<DisplayJson> = parse_json(json, "displays")?;
    Ok(displays
        .into_iter()
        .map(|d| Display {
            index: d.index,
            frame: Rect::new(
                d.frame.x.round() as i32,
                d.frame.y.round() as i32,
                d.frame.w.round() as i32,
                d.frame.h.round() as i32,
            ),
        })
        .collect())
}

/// Parse `query --spaces` output.  Empty output means no spaces.
pub fn parse_spaces(json: &str) -> Result<Vec<Space>, YabaiError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let spaces: Vec<SpaceJson> = parse_json(json, "spaces")?;
    Ok(spaces
        .into_iter()
        .map(|s| Space {
            index: s.index,
            display_index: s.display,
            is_visible: s.is_visible,
            has_focus: s.has_focus,
            label: Some(s.label).filter(|l| !l.is_empty()),
        })
        .collect())
}

/// Parse `query --windows --window` output.  Empty output or `{}` means no
/// window has focus.
pub fn parse_window(json: &str) -> Result<Option<WindowId>, YabaiError> {
    let json = json.trim();
    if json.is_empty() || json == "{}" {
        return Ok(None);
    }
    let window: WindowJson = parse_json(json, "window")?;
    Ok(Some(WindowId(window.id)))
}

//  WindowManager implementation

impl WindowManager for YabaiWm {
    type Error = YabaiError;

    fn snapshot(&self) -> Result<Snapshot, Self::Error> {
        let displays = parse_displays(&self.query(&["--displays"])?)?;
        let spaces = parse_spaces(&self.query(&["--spaces"])?)?;
        Ok(Snapshot::new(displays, spaces))
    }

    fn focused_window(&self) -> Result<Option<WindowId>, Self::Error> {
        match self.query(&["--windows", "--window"]) {
            Ok(json) => parse_window(&json),
            // yabai exits non-zero when nothing has focus.
            Err(YabaiError(msg)) if msg.contains("could not retrieve window details") => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn perform(&self, action: &WmAction) -> Result<(), Self::Error> {
        self.message(&action.args()).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_displays_rounds_frames() {
        let json = r#"[
            {"id":1,"uuid":"A","index":1,"frame":{"x":0.0000,"y":0.0000,"w":2560.0000,"h":1440.0000},"spaces":[1,2]},
            {"id":2,"uuid":"B","index":2,"frame":{"x":2560.0000,"y":-179.5000,"w":1919.6000,"h":1080.0000},"spaces":[3]}
        ]"#;
        let displays = parse_displays(json).unwrap();
        assert_eq!(displays.len(), 2);
        assert_eq!(displays[0].frame, Rect::new(0, 0, 2560, 1440));
        assert_eq!(displays[1].index, 2);
        assert_eq!(displays[1].frame, Rect::new(2560, -180, 1920, 1080));
    }

    #[test]
    fn parse_spaces_reads_flags_and_labels() {
        let json = r#"[
            {"id":3,"uuid":"x","index":1,"label":"","type":"bsp","display":1,"windows":[],"has-focus":true,"is-visible":true,"is-native-fullscreen":false},
            {"id":4,"uuid":"y","index":2,"label":"web","type":"bsp","display":2,"windows":[12],"has-focus":false,"is-visible":true,"is-native-fullscreen":false}
        ]"#;
        let spaces = parse_spaces(json).unwrap();
        assert_eq!(
            spaces[0],
            Space {
                index: 1,
                display_index: 1,
                is_visible: true,
                has_focus: true,
                label: None,
            }
        );
        assert_eq!(spaces[1].label.as_deref(), Some("web"));
        assert!(!spaces[1].has_focus);
    }

    #[test]
    fn parse_spaces_accepts_older_flag_names() {
        let json = r#"[{"index":5,"display":1,"focused":true,"visible":true}]"#;
        let spaces = parse_spaces(json).unwrap();
        assert!(spaces[0].has_focus && spaces[0].is_visible);
    }

    #[test]
    fn empty_output_is_an_empty_list() {
        assert!(parse_displays("").unwrap().is_empty());
        assert!(parse_spaces("\n").unwrap().is_empty());
    }

    #[test]
    fn parse_window_id() {
        let json = r#"{"id":4242,"pid":501,"app":"Alacritty","title":"zsh","display":1,"space":1}"#;
        assert_eq!(parse_window(json).unwrap(), Some(WindowId(4242)));
        assert_eq!(parse_window("{}").unwrap(), None);
        assert_eq!(parse_window("").unwrap(), None);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_displays("not json").unwrap_err();
        assert!(err.to_string().starts_with("yabai error: parse displays"));
    }

    #[test]
    fn missing_binary_is_reported() {
        let wm = YabaiWm::new("/nonexistent/yabai");
        let err = wm.snapshot().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/yabai"));
    }
}
