//! Turns abstract [`Command`]s into window-manager calls.
//!
//! [`Translator`] owns no state between calls.  Every invocation is a
//! self-contained attempt: the direct action first, then at most one
//! documented fallback.  When the fallback needs geometry, a fresh
//! [`Snapshot`] is queried; nothing is cached between calls.

use crate::adjacency::{self, ResolveError};
use crate::command::{Axis, Command, CommandKind, CommandParseError, Direction, SizeChange};
use crate::context::RuntimeContext;
use crate::snapshot::Snapshot;
use crate::traits::{Launcher, OpenOutcome, ResizeEdge, WindowManager, WmAction};
use log::{debug, info, warn};
use std::sync::Arc;

/// Why a single command could not be carried out.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("no func {key}")]
    UnknownFunctionKey { key: String },

    /// The window manager rejected an action.
    #[error("yabai -m {command}: {cause}")]
    BackendActionFailed { command: String, cause: String },

    #[error("window manager state unavailable: {cause}")]
    SnapshotUnavailable { cause: String },

    #[error("launch failed: {0}")]
    Launch(String),

    #[error(transparent)]
    Malformed(#[from] CommandParseError),

    #[error("{0}")]
    Function(String),
}

/// A [`TranslateError`] tagged with the text of the command that caused it.
#[derive(Debug, thiserror::Error)]
#[error("{command}: {source}")]
pub struct RunError {
    pub command: String,
    #[source]
    pub source: TranslateError,
}

/// Maps commands onto a [`WindowManager`] and a [`Launcher`].
///
/// The translator is generic over both collaborators, making it independent
/// of yabai or any concrete launcher.  It is `Sync`, so one instance is
/// shared by every hotkey listener.
///
/// # Typical usage
///
/// ```ignore
/// let translator = Translator::new(YabaiWm::new("yabai"), SystemLauncher::new(), ctx);
/// translator.run(&Command::focus(Direction::West))?;
/// ```
pub struct Translator<W: WindowManager, L: Launcher> {
    wm: W,
    launcher: L,
    context: Arc<RuntimeContext>,
}

impl<W: WindowManager, L: Launcher> Translator<W, L> {
    pub fn new(wm: W, launcher: L, context: Arc<RuntimeContext>) -> Self {
        Self {
            wm,
            launcher,
            context,
        }
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    /// Run one command.
    ///
    /// Commands without a runtime meaning (`kill`, `layout tabbed`, …)
    /// succeed without doing anything.
    pub fn run(&self, cmd: &Command) -> Result<(), RunError> {
        self.translate(cmd).map_err(|source| RunError {
            command: cmd.generate(),
            source,
        })
    }

    fn translate(&self, cmd: &Command) -> Result<(), TranslateError> {
        match cmd.kind()? {
            CommandKind::Exec { argv } => {
                info!("exec {:?}", argv);
                self.exec(&argv)
            }
            CommandKind::Focus(dir) => {
                info!("focus {}", dir);
                self.focus(dir)
            }
            CommandKind::Move(dir) => {
                info!("move {}", dir);
                self.move_window(dir)
            }
            CommandKind::MoveToWorkspace { workspace, follow } => {
                info!("move to workspace {}", workspace);
                self.move_to_workspace(&workspace, follow)
            }
            CommandKind::Resize {
                change,
                axis,
                amount,
            } => {
                info!("resize {} {} {}", change, axis, amount);
                self.resize(change, axis, amount)
            }
            CommandKind::Workspace(name) => {
                info!("workspace {}", name);
                self.perform(&WmAction::FocusSpace(name))
            }
            CommandKind::Func(key) => {
                info!("func {}", key);
                self.call_function(&key)
            }
            CommandKind::Unknown => {
                debug!("no runtime handler for {}", cmd);
                Ok(())
            }
        }
    }

    //  Handlers

    fn exec(&self, argv: &[String]) -> Result<(), TranslateError> {
        let outcome = self
            .launcher
            .open_application(argv)
            .map_err(|e| TranslateError::Launch(e.to_string()))?;
        match outcome {
            OpenOutcome::Launched => Ok(()),
            OpenOutcome::NotFound => {
                debug!("no application named {}, running directly", argv[0]);
                self.launcher
                    .spawn(argv)
                    .map_err(|e| TranslateError::Launch(e.to_string()))
            }
        }
    }

    fn focus(&self, dir: Direction) -> Result<(), TranslateError> {
        match self.perform(&WmAction::FocusWindow(dir)) {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("no window {} on this display ({}), trying next display", dir, e);
                let space = self.space_toward(dir)?;
                self.perform(&WmAction::FocusSpace(space.to_string()))
            }
        }
    }

    fn move_window(&self, dir: Direction) -> Result<(), TranslateError> {
        match self.perform(&WmAction::SwapWindow(dir)) {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("no window {} to swap with ({}), moving to next display", dir, e);
                let space = self.space_toward(dir)?;
                self.move_to_workspace(&space.to_string(), true)
            }
        }
    }

    /// Send the focused window to `workspace`.
    ///
    /// With `follow`, the window id is captured before the move and focused
    /// again afterwards; moving a window to another space otherwise leaves
    /// focus on whatever that space showed before.
    fn move_to_workspace(&self, workspace: &str, follow: bool) -> Result<(), TranslateError> {
        let window = if follow {
            match self.wm.focused_window() {
                Ok(window) => window,
                Err(e) => {
                    warn!("could not capture focused window: {}", e);
                    None
                }
            }
        } else {
            None
        };

        self.perform(&WmAction::MoveWindowToSpace(workspace.to_string()))?;

        if let Some(id) = window {
            debug!("  refocusing window {}", id);
            self.perform(&WmAction::FocusWindowId(id))?;
        }
        Ok(())
    }

    /// Resize along one axis; if the window has no room on the primary edge,
    /// retry once from the opposite edge with the delta negated.
    fn resize(&self, change: SizeChange, axis: Axis, amount: i32) -> Result<(), TranslateError> {
        let delta = change.sign() * amount;
        let (edge, dx, dy) = match axis {
            Axis::Width => (ResizeEdge::Right, delta, 0),
            Axis::Height => (ResizeEdge::Bottom, 0, delta),
        };

        match self.perform(&WmAction::ResizeWindow { edge, dx, dy }) {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("resize from {} failed ({}), trying {}", edge, e, edge.mirrored());
                self.perform(&WmAction::ResizeWindow {
                    edge: edge.mirrored(),
                    dx: -dx,
                    dy: -dy,
                })
            }
        }
    }

    fn call_function(&self, key: &str) -> Result<(), TranslateError> {
        let f = self
            .context
            .functions
            .get(key)
            .ok_or_else(|| TranslateError::UnknownFunctionKey {
                key: key.to_string(),
            })?;
        f().map_err(|e| TranslateError::Function(e.to_string()))
    }

    //  Window manager helpers

    fn perform(&self, action: &WmAction) -> Result<(), TranslateError> {
        debug!("  yabai -m {}", action);
        self.wm
            .perform(action)
            .map_err(|e| TranslateError::BackendActionFailed {
                command: action.to_string(),
                cause: e.to_string(),
            })
    }

    fn snapshot(&self) -> Result<Snapshot, TranslateError> {
        self.wm
            .snapshot()
            .map_err(|e| TranslateError::SnapshotUnavailable {
                cause: e.to_string(),
            })
    }

    /// Index of the visible space on the display next to the focused one.
    fn space_toward(&self, dir: Direction) -> Result<u32, TranslateError> {
        let snapshot = self.snapshot()?;
        let space = adjacency::space_in_direction(&snapshot, dir)?;
        debug!("  next space {} is {}", dir, space.index);
        Ok(space.index)
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FunctionError, FunctionTable};
    use crate::snapshot::{Display, Rect, Space, WindowId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Everything the translator asked the window manager for, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Snapshot,
        FocusedWindow,
        Perform(WmAction),
    }

    /// Record-keeping mock window manager.
    ///
    /// `refuse` decides which actions fail, mimicking yabai refusing to
    /// focus or swap when there is no window in that direction.
    struct RecorderWm {
        calls: Mutex<Vec<Call>>,
        snapshot: Snapshot,
        focused: Option<WindowId>,
        refuse: Box<dyn Fn(&WmAction) -> bool + Send + Sync>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recorder error")]
    struct RecorderErr;

    impl RecorderWm {
        fn new(refuse: impl Fn(&WmAction) -> bool + Send + Sync + 'static) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                snapshot: two_displays(),
                focused: Some(WindowId(77)),
                refuse: Box::new(refuse),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl WindowManager for RecorderWm {
        type Error = RecorderErr;

        fn snapshot(&self) -> Result<Snapshot, RecorderErr> {
            self.calls.lock().unwrap().push(Call::Snapshot);
            Ok(self.snapshot.clone())
        }

        fn focused_window(&self) -> Result<Option<WindowId>, RecorderErr> {
            self.calls.lock().unwrap().push(Call::FocusedWindow);
            Ok(self.focused)
        }

        fn perform(&self, action: &WmAction) -> Result<(), RecorderErr> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Perform(action.clone()));
            if (self.refuse)(action) {
                Err(RecorderErr)
            } else {
                Ok(())
            }
        }
    }

    /// Launcher mock: records which path was taken.
    #[derive(Default)]
    struct RecorderLauncher {
        opened: Mutex<Vec<Vec<String>>>,
        spawned: Mutex<Vec<Vec<String>>>,
        known_apps: Vec<String>,
    }

    impl Launcher for RecorderLauncher {
        type Error = RecorderErr;

        fn open_application(&self, argv: &[String]) -> Result<OpenOutcome, RecorderErr> {
            self.opened.lock().unwrap().push(argv.to_vec());
            if self.known_apps.contains(&argv[0]) {
                Ok(OpenOutcome::Launched)
            } else {
                Ok(OpenOutcome::NotFound)
            }
        }

        fn spawn(&self, argv: &[String]) -> Result<(), RecorderErr> {
            self.spawned.lock().unwrap().push(argv.to_vec());
            if argv[0] == "missing-binary" {
                Err(RecorderErr)
            } else {
                Ok(())
            }
        }
    }

    /// Display 1 at the origin (focused, space 1), display 2 to its right
    /// showing space 4.
    fn two_displays() -> Snapshot {
        Snapshot::new(
            vec![
                Display {
                    index: 1,
                    frame: Rect::new(0, 0, 2560, 1440),
                },
                Display {
                    index: 2,
                    frame: Rect::new(2560, 0, 2560, 1440),
                },
            ],
            vec![
                Space {
                    index: 1,
                    display_index: 1,
                    is_visible: true,
                    has_focus: true,
                    label: None,
                },
                Space {
                    index: 2,
                    display_index: 1,
                    is_visible: false,
                    has_focus: false,
                    label: None,
                },
                Space {
                    index: 4,
                    display_index: 2,
                    is_visible: true,
                    has_focus: false,
                    label: Some("web".into()),
                },
            ],
        )
    }

    fn translator(wm: RecorderWm) -> Translator<RecorderWm, RecorderLauncher> {
        Translator::new(wm, RecorderLauncher::default(), Arc::new(RuntimeContext::default()))
    }

    fn refuse_all_directional(action: &WmAction) -> bool {
        matches!(
            action,
            WmAction::FocusWindow(_) | WmAction::SwapWindow(_)
        )
    }

    #[test]
    fn focus_within_display_needs_no_snapshot() {
        let t = translator(RecorderWm::new(|_| false));
        t.run(&Command::focus(Direction::East)).unwrap();
        assert_eq!(
            t.wm.calls(),
            vec![Call::Perform(WmAction::FocusWindow(Direction::East))]
        );
    }

    #[test]
    fn focus_falls_back_to_next_display() {
        let t = translator(RecorderWm::new(refuse_all_directional));
        t.run(&Command::focus(Direction::East)).unwrap();
        assert_eq!(
            t.wm.calls(),
            vec![
                Call::Perform(WmAction::FocusWindow(Direction::East)),
                Call::Snapshot,
                Call::Perform(WmAction::FocusSpace("4".into())),
            ]
        );
    }

    #[test]
    fn focus_without_adjacent_display_reports_direction() {
        let t = translator(RecorderWm::new(refuse_all_directional));
        let err = t.run(&Command::focus(Direction::West)).unwrap_err();
        assert_eq!(err.command, "focus left");
        assert!(matches!(
            err.source,
            TranslateError::Resolve(ResolveError::NoAdjacentDisplay {
                direction: Direction::West
            })
        ));
        assert_eq!(
            err.to_string(),
            "focus left: no display west of current display"
        );
    }

    #[test]
    fn move_swaps_within_display() {
        let t = translator(RecorderWm::new(|_| false));
        t.run(&Command::move_window(Direction::East)).unwrap();
        assert_eq!(
            t.wm.calls(),
            vec![Call::Perform(WmAction::SwapWindow(Direction::East))]
        );
    }

    #[test]
    fn move_across_displays_refocuses_moved_window() {
        let t = translator(RecorderWm::new(refuse_all_directional));
        t.run(&Command::move_window(Direction::East)).unwrap();
        assert_eq!(
            t.wm.calls(),
            vec![
                Call::Perform(WmAction::SwapWindow(Direction::East)),
                Call::Snapshot,
                Call::FocusedWindow,
                Call::Perform(WmAction::MoveWindowToSpace("4".into())),
                Call::Perform(WmAction::FocusWindowId(WindowId(77))),
            ]
        );
    }

    #[test]
    fn move_across_displays_without_focused_window_skips_refocus() {
        let mut wm = RecorderWm::new(refuse_all_directional);
        wm.focused = None;
        let t = translator(wm);
        t.run(&Command::move_window(Direction::East)).unwrap();
        assert_eq!(
            t.wm.calls().last(),
            Some(&Call::Perform(WmAction::MoveWindowToSpace("4".into())))
        );
    }

    #[test]
    fn move_does_not_rewrite_the_configured_command() {
        let t = translator(RecorderWm::new(refuse_all_directional));
        let cmd = Command::move_window(Direction::East);
        let before = cmd.clone();
        t.run(&cmd).unwrap();
        assert_eq!(cmd, before);
        assert_eq!(cmd.generate(), "move right");
    }

    #[test]
    fn move_container_does_not_capture_focus() {
        let t = translator(RecorderWm::new(|_| false));
        t.run(&Command::move_container("3")).unwrap();
        assert_eq!(
            t.wm.calls(),
            vec![Call::Perform(WmAction::MoveWindowToSpace("3".into()))]
        );
    }

    #[test]
    fn resize_grow_width_uses_right_edge() {
        let t = translator(RecorderWm::new(|_| false));
        t.run(&Command::resize_grow(Axis::Width, 10)).unwrap();
        assert_eq!(
            t.wm.calls(),
            vec![Call::Perform(WmAction::ResizeWindow {
                edge: ResizeEdge::Right,
                dx: 10,
                dy: 0
            })]
        );
    }

    #[test]
    fn resize_mirrors_once_when_primary_edge_fails() {
        let t = translator(RecorderWm::new(|a| {
            matches!(
                a,
                WmAction::ResizeWindow {
                    edge: ResizeEdge::Right,
                    ..
                }
            )
        }));
        t.run(&Command::resize_grow(Axis::Width, 10)).unwrap();
        assert_eq!(
            t.wm.calls(),
            vec![
                Call::Perform(WmAction::ResizeWindow {
                    edge: ResizeEdge::Right,
                    dx: 10,
                    dy: 0
                }),
                Call::Perform(WmAction::ResizeWindow {
                    edge: ResizeEdge::Left,
                    dx: -10,
                    dy: 0
                }),
            ]
        );
    }

    #[test]
    fn resize_shrink_height_mirrors_to_top() {
        let t = translator(RecorderWm::new(|a| {
            matches!(
                a,
                WmAction::ResizeWindow {
                    edge: ResizeEdge::Bottom,
                    ..
                }
            )
        }));
        t.run(&Command::resize_shrink(Axis::Height, 25)).unwrap();
        assert_eq!(
            t.wm.calls()[1],
            Call::Perform(WmAction::ResizeWindow {
                edge: ResizeEdge::Top,
                dx: 0,
                dy: 25
            })
        );
    }

    #[test]
    fn resize_surfaces_error_after_single_fallback() {
        let t = translator(RecorderWm::new(|_| true));
        let err = t.run(&Command::resize_grow(Axis::Height, 5)).unwrap_err();
        assert_eq!(t.wm.calls().len(), 2);
        assert!(matches!(
            err.source,
            TranslateError::BackendActionFailed { ref command, .. } if command == "window --resize top:0:-5"
        ));
    }

    #[test]
    fn workspace_focuses_space_verbatim() {
        let t = translator(RecorderWm::new(|_| false));
        t.run(&Command::workspace("2")).unwrap();
        t.run(&Command::parse("workspace recent").unwrap()).unwrap();
        assert_eq!(
            t.wm.calls(),
            vec![
                Call::Perform(WmAction::FocusSpace("2".into())),
                Call::Perform(WmAction::FocusSpace("recent".into())),
            ]
        );
    }

    #[test]
    fn unknown_function_key_makes_no_backend_call() {
        let t = translator(RecorderWm::new(|_| false));
        let err = t.run(&Command::func("7")).unwrap_err();
        assert!(matches!(
            err.source,
            TranslateError::UnknownFunctionKey { ref key } if key == "7"
        ));
        assert!(t.wm.calls().is_empty());
    }

    #[test]
    fn registered_function_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut functions = FunctionTable::new();
        let counter = Arc::clone(&calls);
        let ok = functions.register("0", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let failing = functions.register("1", || Err(FunctionError("boom".into())));
        let t = Translator::new(
            RecorderWm::new(|_| false),
            RecorderLauncher::default(),
            Arc::new(RuntimeContext::new(Default::default(), functions)),
        );
        t.run(&ok).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let err = t.run(&failing).unwrap_err();
        assert_eq!(err.to_string(), r#"func "1": boom"#);
    }

    #[test]
    fn exec_prefers_application_launch() {
        let launcher = RecorderLauncher {
            known_apps: vec!["Safari".into()],
            ..Default::default()
        };
        let t = Translator::new(
            RecorderWm::new(|_| false),
            launcher,
            Arc::new(RuntimeContext::default()),
        );
        t.run(&Command::exec("Safari")).unwrap();
        assert_eq!(t.launcher.opened.lock().unwrap().len(), 1);
        assert!(t.launcher.spawned.lock().unwrap().is_empty());
    }

    #[test]
    fn exec_falls_back_to_direct_execution() {
        let t = translator(RecorderWm::new(|_| false));
        t.run(&Command::exec("alacritty -e zsh")).unwrap();
        assert_eq!(
            *t.launcher.spawned.lock().unwrap(),
            vec![vec![
                "alacritty".to_string(),
                "-e".to_string(),
                "zsh".to_string()
            ]]
        );
    }

    #[test]
    fn exec_surfaces_failure_of_both_paths() {
        let t = translator(RecorderWm::new(|_| false));
        let err = t.run(&Command::exec("missing-binary")).unwrap_err();
        assert!(matches!(err.source, TranslateError::Launch(_)));
    }

    #[test]
    fn declarative_only_commands_are_noops() {
        let t = translator(RecorderWm::new(|_| true));
        t.run(&Command::kill()).unwrap();
        t.run(&Command::mode("resize")).unwrap();
        assert!(t.wm.calls().is_empty());
    }

    #[test]
    fn malformed_command_is_reported_with_its_text() {
        let t = translator(RecorderWm::new(|_| false));
        let err = t
            .run(&Command::parse("resize grow width lots").unwrap())
            .unwrap_err();
        assert_eq!(err.command, "resize grow width lots");
        assert!(matches!(err.source, TranslateError::Malformed(_)));
    }

    #[test]
    fn every_fallback_fetches_a_fresh_snapshot() {
        let t = translator(RecorderWm::new(refuse_all_directional));
        t.run(&Command::focus(Direction::East)).unwrap();
        t.run(&Command::focus(Direction::East)).unwrap();
        let snapshots = t
            .wm
            .calls()
            .iter()
            .filter(|c| **c == Call::Snapshot)
            .count();
        assert_eq!(snapshots, 2);
    }
}
