//! [`Launcher`] backed by the platform's process facilities.

use crate::traits::{Launcher, OpenOutcome};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as Process, Stdio};
use std::thread;

/// Starts applications with `open -a` on macOS and plain processes
/// everywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

#[derive(Debug, thiserror::Error)]
#[error("launch error: {0}")]
pub struct LaunchError(String);

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

/// Wait for `child` on a background thread so it never lingers as a
/// zombie.
fn reap(mut child: Child) {
    thread::spawn(move || {
        let _ = child.wait();
    });
}

/// Marker `open` prints when no application has the requested name.
const NOT_FOUND_MARKER: &str = "Unable to find application named";

/// `true` if `open`'s stderr reports a missing application.
pub fn is_missing_application(stderr: &str) -> bool {
    stderr.contains(NOT_FOUND_MARKER)
}

impl Launcher for SystemLauncher {
    type Error = LaunchError;

    #[cfg(target_os = "macos")]
    fn open_application(&self, argv: &[String]) -> Result<OpenOutcome, LaunchError> {
        let (app, args) = argv
            .split_first()
            .ok_or_else(|| LaunchError("empty command".into()))?;
        let output = Process::new("open")
            .args(["-a", app.as_str(), "-n", "--args"])
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| LaunchError(format!("open -a {}: {}", app, e)))?;
        if output.status.success() {
            return Ok(OpenOutcome::Launched);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_missing_application(&stderr) {
            debug!("open: no application named {}", app);
            Ok(OpenOutcome::NotFound)
        } else {
            Err(LaunchError(format!("open -a {}: {}", app, stderr.trim())))
        }
    }

    /// Outside macOS there is no application registry; everything runs as a
    /// plain process.
    #[cfg(not(target_os = "macos"))]
    fn open_application(&self, _argv: &[String]) -> Result<OpenOutcome, LaunchError> {
        Ok(OpenOutcome::NotFound)
    }

    fn spawn(&self, argv: &[String]) -> Result<(), LaunchError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| LaunchError("empty command".into()))?;
        let child = Process::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| LaunchError(format!("{}: {}", program, e)))?;
        debug!("spawned {} as {}", program, child.id());
        reap(child);
        Ok(())
    }
}

/// Locate `program`: a path containing `/` must exist as a file, a bare name
/// is searched for on `PATH`.
pub fn find_program(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return path.is_file().then(|| path.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
