//! Unix-socket [`CommandSource`] implementation.
//!
//! Binds a Unix stream socket and serves one connection at a time.
//! Each line received is parsed as a JSON-encoded command sequence.
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`: either one
//! command string or an array of them, run in order.
//!
//! ```json
//! "focus left"
//! ["workspace \"2\"", "move container to workspace \"3\""]
//! "func \"quake:zsh\""
//! ```

use crate::command::Command;
use crate::shutdown::DoneSignal;
use crate::traits::CommandSource;
use log::{debug, error, info};
use serde::Deserialize;
use std::io::{self, BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// How often an idle accept or read re-checks the done signal.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// One line on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum Request {
    One(Command),
    Many(Vec<Command>),
}

impl From<Request> for Vec<Command> {
    fn from(req: Request) -> Self {
        match req {
            Request::One(cmd) => vec![cmd],
            Request::Many(cmds) => cmds,
        }
    }
}

/// A [`CommandSource`] that listens on a Unix stream socket for
/// JSON-encoded command sequences.
///
/// Each accepted connection can send multiple newline-delimited messages.
/// When the connection closes, the listener waits for the next one.
pub struct UnixSocketListener {
    path: PathBuf,
    done: DoneSignal,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`, stopping once `done` closes.
    ///
    /// The socket file is created when [`run`](CommandSource::run) is called
    /// and removed when it returns.
    pub fn new(path: impl AsRef<Path>, done: DoneSignal) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            done,
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read messages from one client until it disconnects or the done
    /// signal closes.  Returns `false` once the sink is gone.
    fn serve(&self, stream: UnixStream, sink: &mpsc::Sender<Vec<Command>>) -> bool {
        let setup = stream
            .set_nonblocking(false)
            .and_then(|()| stream.set_read_timeout(Some(ACCEPT_POLL)));
        if let Err(e) = setup {
            error!("client setup failed: {}", e);
            return true;
        }
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();
        loop {
            if self.done.is_closed() {
                debug!("dropping client on shutdown");
                return true;
            }
            match reader.read_until(b'\n', &mut line) {
                // EOF: a final line without a newline still counts.
                Ok(0) => return line.is_empty() || self.deliver(&line, sink),
                Ok(_) if line.ends_with(b"\n") => {
                    if !self.deliver(&line, sink) {
                        return false;
                    }
                    line.clear();
                }
                Ok(_) => {}
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => {
                    error!("read error: {}", e);
                    return true;
                }
            }
        }
    }

    /// Parse one raw line and forward it.  Returns `false` once the sink is
    /// gone.
    fn deliver(&self, raw: &[u8], sink: &mpsc::Sender<Vec<Command>>) -> bool {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim();
        if text.is_empty() {
            return true;
        }
        match parse_request(text) {
            Ok(cmds) => {
                debug!("received {:?}", cmds);
                sink.send(cmds).is_ok()
            }
            Err(e) => {
                error!("bad request {}: {}", text, e);
                true
            }
        }
    }
}

/// Parse one wire line into the commands it carries.
pub fn parse_request(line: &str) -> Result<Vec<Command>, UnixSocketError> {
    let req: Request = serde_json::from_str(line)?;
    Ok(req.into())
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and accept connections until the done signal closes
    /// or the sink is dropped.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Vec<Command>>) -> Result<(), Self::Error> {
        // Remove stale socket if present.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        listener.set_nonblocking(true)?;
        info!("listening on {}", self.path.display());

        while !self.done.is_closed() {
            match listener.accept() {
                Ok((stream, _)) => {
                    debug!("client connected");
                    if !self.serve(stream, &sink) {
                        info!("sink closed, shutting down");
                        break;
                    }
                    debug!("client disconnected");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.done.wait_timeout(ACCEPT_POLL);
                }
                Err(e) => {
                    error!("accept error: {}", e);
                    self.done.wait_timeout(ACCEPT_POLL);
                }
            }
        }

        let _ = std::fs::remove_file(&self.path);
        debug!("socket listener stopped");
        Ok(())
    }
}

//  Tests
