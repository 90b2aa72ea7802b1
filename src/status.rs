//! Menu-bar style status line: which space is showing on each display.

use crate::config::StatusConfig;
use crate::shutdown::DoneSignal;
use crate::snapshot::Snapshot;
use crate::traits::WindowManager;
use log::{debug, info, warn};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// The current status title.  One writer (the poller), any number of
/// readers.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    title: Arc<RwLock<String>>,
}

impl StatusBoard {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            title: Arc::new(RwLock::new(initial.into())),
        }
    }

    pub fn title(&self) -> String {
        self.title
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Store `title`; returns `true` if it differs from the previous one.
    fn publish(&self, title: String) -> bool {
        let mut current = self.title.write().unwrap_or_else(|e| e.into_inner());
        if *current == title {
            return false;
        }
        *current = title;
        true
    }
}

/// `"<prefix>: a | b"`, one entry per visible space, displays ordered left
/// to right.  A space shows its label when it has one, its index otherwise.
pub fn render_title(prefix: &str, snapshot: &Snapshot) -> String {
    let mut displays: Vec<_> = snapshot.displays().iter().collect();
    displays.sort_by_key(|d| d.frame.x);

    let visible: Vec<String> = displays
        .iter()
        .flat_map(|d| snapshot.visible_spaces_on(d.index))
        .map(|s| s.display_name())
        .collect();

    if visible.is_empty() {
        prefix.to_string()
    } else {
        format!("{}: {}", prefix, visible.join(" | "))
    }
}

/// Refresh `board` from `wm` every `poll_interval_ms` until `done` closes.
///
/// A failed query is logged and retried on the next tick; the previous
/// title stays up in the meantime.
pub fn spawn_poller<W>(
    wm: W,
    board: StatusBoard,
    config: StatusConfig,
    done: DoneSignal,
) -> JoinHandle<()>
where
    W: WindowManager + 'static,
{
    let interval = Duration::from_millis(config.poll_interval_ms.max(1));
    thread::spawn(move || {
        loop {
            match wm.snapshot() {
                Ok(snapshot) => {
                    let title = render_title(&config.title, &snapshot);
                    if board.publish(title.clone()) {
                        info!("status: {}", title);
                    }
                }
                Err(e) => warn!("status poll failed: {}", e),
            }
            if done.wait_timeout(interval) {
                break;
            }
        }
        debug!("status poller stopped");
    })
}
