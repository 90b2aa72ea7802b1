//! Core traits that decouple wmbind from any specific window manager,
//! launcher, notification channel, hotkey facility or transport.
//!
//! Every concrete backend (yabai, the macOS `open` launcher, the
//! `global-hotkey` registration layer, a test harness, …) implements one of
//! these traits.  The [`Translator`](crate::translator::Translator) and the
//! [`Dispatcher`](crate::dispatcher::Dispatcher) only depend on these
//! abstractions.

use crate::chord::Chord;
use crate::command::{Command, Direction};
use crate::snapshot::{Snapshot, WindowId};
use std::fmt;
use std::sync::{mpsc, Arc};

/// Window edge a resize is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeEdge {
    Top,
    Bottom,
    Left,
    Right,
}

impl ResizeEdge {
    /// The edge on the opposite side of the window.
    pub fn mirrored(self) -> Self {
        match self {
            ResizeEdge::Top => ResizeEdge::Bottom,
            ResizeEdge::Bottom => ResizeEdge::Top,
            ResizeEdge::Left => ResizeEdge::Right,
            ResizeEdge::Right => ResizeEdge::Left,
        }
    }
}

impl fmt::Display for ResizeEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeEdge::Top => write!(f, "top"),
            ResizeEdge::Bottom => write!(f, "bottom"),
            ResizeEdge::Left => write!(f, "left"),
            ResizeEdge::Right => write!(f, "right"),
        }
    }
}

/// One imperative request to the window manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmAction {
    /// Focus the neighbouring window on the current display.
    FocusWindow(Direction),
    /// Swap the focused window with its neighbour on the current display.
    SwapWindow(Direction),
    /// Focus a specific window by id.
    FocusWindowId(WindowId),
    /// Send the focused window to a space.
    MoveWindowToSpace(String),
    /// Make a space the focused one.
    FocusSpace(String),
    /// Resize the focused window by a signed delta anchored on `edge`.
    /// Only one of `dx`/`dy` is non-zero.
    ResizeWindow { edge: ResizeEdge, dx: i32, dy: i32 },
}

impl WmAction {
    /// Arguments in yabai's `-m` message syntax.
    pub fn args(&self) -> Vec<String> {
        match self {
            WmAction::FocusWindow(dir) => vec!["window".into(), "--focus".into(), dir.to_string()],
            WmAction::SwapWindow(dir) => vec!["window".into(), "--swap".into(), dir.to_string()],
            WmAction::FocusWindowId(id) => {
                vec!["window".into(), "--focus".into(), id.to_string()]
            }
            WmAction::MoveWindowToSpace(space) => {
                vec!["window".into(), "--space".into(), space.clone()]
            }
            WmAction::FocusSpace(space) => vec!["space".into(), "--focus".into(), space.clone()],
            WmAction::ResizeWindow { edge, dx, dy } => vec![
                "window".into(),
                "--resize".into(),
                format!("{}:{}:{}", edge, dx, dy),
            ],
        }
    }
}

impl fmt::Display for WmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

/// Abstraction over the window manager being driven.
///
/// An implementation might shell out to `yabai -m`, or it might be a
/// recording stub used in tests.  Implementations are shared between the
/// hotkey listeners and the status poller, hence `Send + Sync`.
pub trait WindowManager: Send + Sync {
    /// The error type produced by this window manager.
    type Error: std::error::Error + Send + 'static;

    /// Query every display and space.
    ///
    /// May legitimately return an empty snapshot while the window manager
    /// is restarting.
    fn snapshot(&self) -> Result<Snapshot, Self::Error>;

    /// The currently focused window, or `None` if nothing has focus.
    fn focused_window(&self) -> Result<Option<WindowId>, Self::Error>;

    /// Carry out one action.  An `Err` means the window manager refused it
    /// (for example because there is no window in that direction).
    fn perform(&self, action: &WmAction) -> Result<(), Self::Error>;
}

impl<T: WindowManager + ?Sized> WindowManager for Arc<T> {
    type Error = T::Error;

    fn snapshot(&self) -> Result<Snapshot, Self::Error> {
        (**self).snapshot()
    }

    fn focused_window(&self) -> Result<Option<WindowId>, Self::Error> {
        (**self).focused_window()
    }

    fn perform(&self, action: &WmAction) -> Result<(), Self::Error> {
        (**self).perform(action)
    }
}

//  Launcher

/// Result of asking the platform to open an application by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Launched,
    /// The platform has no application with that name; the caller may try
    /// running the command line directly instead.
    NotFound,
}

/// Starts programs on behalf of `exec` commands.
pub trait Launcher: Send + Sync {
    type Error: std::error::Error + Send + 'static;

    /// Open `argv[0]` through the platform's application mechanism, passing
    /// the remaining arguments to it.
    fn open_application(&self, argv: &[String]) -> Result<OpenOutcome, Self::Error>;

    /// Run `argv` as a plain process.
    fn spawn(&self, argv: &[String]) -> Result<(), Self::Error>;
}

//  Notifier

/// Best-effort desktop notification.
///
/// Failing to notify is never reported to the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// A [`Notifier`] that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _message: &str) {}
}

//  Hotkeys

/// Opaque handle for one registered chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HotkeyHandle(pub u64);

/// A successful registration: its handle and the stream of keydown events.
///
/// The stream ends (the receiver disconnects) once the handle is
/// unregistered.
#[derive(Debug)]
pub struct HotkeyRegistration {
    pub handle: HotkeyHandle,
    pub keydown: mpsc::Receiver<()>,
}

/// OS-level global hotkey registration.
///
/// Registering the same chord twice yields two independent handles.
pub trait HotkeyBackend {
    type Error: std::error::Error + Send + 'static;

    fn register(&mut self, chord: &Chord) -> Result<HotkeyRegistration, Self::Error>;

    fn unregister(&mut self, handle: HotkeyHandle) -> Result<(), Self::Error>;
}

//  Command Source

/// A source of command sequences.
///
/// Implementations listen on some transport (a Unix socket, an in-memory
/// channel, …) and forward each received sequence into the provided
/// [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted,
///   asked to stop, or hits an unrecoverable error.
/// * Each received sequence must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    type Error: std::error::Error + Send + 'static;

    fn run(&mut self, sink: mpsc::Sender<Vec<Command>>) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_render_as_yabai_messages() {
        assert_eq!(
            WmAction::FocusWindow(Direction::West).to_string(),
            "window --focus west"
        );
        assert_eq!(
            WmAction::SwapWindow(Direction::North).to_string(),
            "window --swap north"
        );
        assert_eq!(
            WmAction::FocusWindowId(WindowId(4242)).to_string(),
            "window --focus 4242"
        );
        assert_eq!(
            WmAction::MoveWindowToSpace("3".into()).to_string(),
            "window --space 3"
        );
        assert_eq!(WmAction::FocusSpace("2".into()).to_string(), "space --focus 2");
        assert_eq!(
            WmAction::ResizeWindow {
                edge: ResizeEdge::Left,
                dx: -10,
                dy: 0
            }
            .to_string(),
            "window --resize left:-10:0"
        );
    }

    #[test]
    fn mirrored_edges() {
        assert_eq!(ResizeEdge::Right.mirrored(), ResizeEdge::Left);
        assert_eq!(ResizeEdge::Bottom.mirrored(), ResizeEdge::Top);
        assert_eq!(ResizeEdge::Top.mirrored().mirrored(), ResizeEdge::Top);
    }
}
