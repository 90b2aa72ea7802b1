//! Point-in-time view of the window manager's displays and spaces.
//!
//! A [`Snapshot`] is never patched: whenever a decision depends on live
//! state, a fresh one is queried through
//! [`WindowManager::snapshot`](crate::traits::WindowManager::snapshot).

use std::fmt;

/// Axis-aligned rectangle in window-manager pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One physical monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    /// 1-based index assigned by the window manager.
    pub index: u32,
    pub frame: Rect,
}

/// A logical workspace bound to one display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    /// Mission-control index, usable as a `space --focus` target.
    pub index: u32,
    /// Index of the [`Display`] currently showing this space.
    pub display_index: u32,
    pub is_visible: bool,
    pub has_focus: bool,
    pub label: Option<String>,
}

impl Space {
    /// The label if one is set, otherwise the index.
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.index.to_string(),
        }
    }
}

/// Identity of a window, as reported by the window manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// All displays and spaces at one moment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    displays: Vec<Display>,
    spaces: Vec<Space>,
}

impl Snapshot {
    pub fn new(displays: Vec<Display>, spaces: Vec<Space>) -> Self {
        Self { displays, spaces }
    }

    /// Displays in the order the window manager enumerated them.
    pub fn displays(&self) -> &[Display] {
        &self.displays
    }

    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    /// `true` while the window manager is restarting and reports nothing.
    pub fn is_empty(&self) -> bool {
        self.displays.is_empty() && self.spaces.is_empty()
    }

    pub fn display(&self, index: u32) -> Option<&Display> {
        self.displays.iter().find(|d| d.index == index)
    }

    /// Spaces currently shown on `display_index`.
    pub fn visible_spaces_on(&self, display_index: u32) -> impl Iterator<Item = &Space> {
        self.spaces
            .iter()
            .filter(move |s| s.is_visible && s.display_index == display_index)
    }
}
