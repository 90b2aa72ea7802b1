//! Drop-down ("quake") terminals.
//!
//! Each configured terminal is a function toggled by a hotkey: the first
//! press starts `<terminal> --class quake_term -e <command>` and records its
//! PID in a file; the next press kills that process and removes the file.
//! The PID file is the only state kept across restarts.

use crate::command::parse_args;
use crate::config::Config;
use crate::context::{FunctionError, FunctionTable};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::{Command as Process, Stdio};
use std::{fs, io, thread};

/// Window class the terminal is started with, for floating rules.
pub const QUAKE_CLASS: &str = "quake_term";

#[derive(Debug, thiserror::Error)]
pub enum QuakeError {
    #[error("quake {name}: empty command")]
    EmptyCommand { name: String },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("pid file {}: {source}", .path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to kill process {pid}")]
    Kill { pid: u32 },
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuakeState {
    Opened(u32),
    Closed(u32),
}

#[derive(Debug, Clone)]
pub struct QuakeTerminal {
    name: String,
    launch: Vec<String>,
    pid_file: PathBuf,
}

impl QuakeTerminal {
    pub fn new(name: &str, terminal: &str, command: &str) -> Self {
        let mut launch = vec![
            terminal.to_string(),
            "--class".to_string(),
            QUAKE_CLASS.to_string(),
            "-e".to_string(),
        ];
        launch.extend(parse_args(command));
        Self {
            name: name.to_string(),
            launch,
            pid_file: std::env::temp_dir().join(format!("wmbind-quake-{}", name)),
        }
    }

    /// Replace the command line used to start the terminal.
    pub fn with_launch(mut self, argv: Vec<String>) -> Self {
        self.launch = argv;
        self
    }

    pub fn with_pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pid_file = path.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn launch(&self) -> &[String] {
        &self.launch
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// Close the terminal if it is running, open it otherwise.
    pub fn toggle(&self) -> Result<QuakeState, QuakeError> {
        if let Some(pid) = self.recorded_pid()? {
            if process_alive(pid) {
                kill(pid)?;
                self.remove_pid_file()?;
                info!("quake {}: closed {}", self.name, pid);
                return Ok(QuakeState::Closed(pid));
            }
            debug!("quake {}: stale pid {}", self.name, pid);
            self.remove_pid_file()?;
        }
        let pid = self.open()?;
        info!("quake {}: opened {}", self.name, pid);
        Ok(QuakeState::Opened(pid))
    }

    fn open(&self) -> Result<u32, QuakeError> {
        let (program, args) = self
            .launch
            .split_first()
            .ok_or_else(|| QuakeError::EmptyCommand {
                name: self.name.clone(),
            })?;
        let mut child = Process::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| QuakeError::Spawn {
                program: program.clone(),
                source,
            })?;
        let pid = child.id();

        let written = fs::write(&self.pid_file, pid.to_string());
        thread::spawn(move || {
            let _ = child.wait();
        });
        written.map_err(|source| QuakeError::PidFile {
            path: self.pid_file.clone(),
            source,
        })?;
        Ok(pid)
    }

    /// PID from the file, `None` if the file is absent or unreadable as a
    /// number.
    fn recorded_pid(&self) -> Result<Option<u32>, QuakeError> {
        match fs::read_to_string(&self.pid_file) {
            Ok(text) => Ok(text.trim().parse().ok()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(QuakeError::PidFile {
                path: self.pid_file.clone(),
                source,
            }),
        }
    }

    fn remove_pid_file(&self) -> Result<(), QuakeError> {
        match fs::remove_file(&self.pid_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(QuakeError::PidFile {
                path: self.pid_file.clone(),
                source,
            }),
        }
    }
}

fn process_alive(pid: u32) -> bool {
    Process::new("kill")
        .args(["-0", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn kill(pid: u32) -> Result<(), QuakeError> {
    let status = Process::new("kill")
        .arg(pid.to_string())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(s) if s.success() => Ok(()),
        _ => Err(QuakeError::Kill { pid }),
    }
}

/// Register a `quake:<name>` toggle for every configured quake terminal.
pub fn register_quake_functions(functions: &mut FunctionTable, config: &Config) {
    for q in &config.quake {
        let terminal = QuakeTerminal::new(&q.name, &config.terminal, &q.command);
        debug!("quake {}: {:?}", q.name, terminal.launch());
        functions.register(q.function_key(), move || {
            terminal.toggle().map(|_| ()).map_err(|e| {
                warn!("{}", e);
                FunctionError(e.to_string())
            })
        });
    }
}
