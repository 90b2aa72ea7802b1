//! Desktop notifications: `osascript` on macOS, `notify-send` elsewhere.

use crate::traits::Notifier;
use log::debug;
use std::process::{Command as Process, Stdio};

#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

/// AppleScript source for a notification.
pub fn applescript(title: &str, message: &str) -> String {
    format!(
        "display notification {} with title {}",
        crate::command::escape(message),
        crate::command::escape(title)
    )
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) {
        let mut process = if cfg!(target_os = "macos") {
            let mut p = Process::new("osascript");
            p.arg("-e").arg(applescript(title, message));
            p
        } else {
            let mut p = Process::new("notify-send");
            p.arg(title).arg(message);
            p
        };
        let result = process
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match result {
            Ok(status) if status.success() => {}
            Ok(status) => debug!("notification exited with {}", status),
            Err(e) => debug!("notification failed: {}", e),
        }
    }
}
