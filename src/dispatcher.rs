//! Binds global hotkeys to command sequences.
//!
//! Every chord (the main keys and each alias) gets its own registration and
//! its own listener thread.  Listeners share the sequence through an
//! `Arc<[Command]>` and the translator through an `Arc`, so two different
//! hotkeys may run concurrently while the commands of one sequence always
//! run in order.

use crate::chord::{Chord, ChordError};
use crate::command::Command;
use crate::config::Binding;
use crate::shutdown::DoneSignal;
use crate::traits::{
    HotkeyBackend, HotkeyHandle, HotkeyRegistration, Launcher, Notifier, WindowManager,
};
use crate::translator::Translator;
use log::{debug, error, info, warn};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often an idle listener re-checks the done signal.
const LISTENER_POLL: Duration = Duration::from_millis(100);

/// Title used for failure notifications.
pub const NOTIFY_TITLE: &str = "wmbind";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Chord(#[from] ChordError),

    #[error("hotkey backend: {0}")]
    Backend(String),
}

struct Worker {
    handle: HotkeyHandle,
    chord: Chord,
    thread: Option<JoinHandle<()>>,
}

/// Owns the hotkey registrations and their listener threads.
pub struct Dispatcher<B, W, L>
where
    B: HotkeyBackend,
    W: WindowManager + 'static,
    L: Launcher + 'static,
{
    backend: B,
    translator: Arc<Translator<W, L>>,
    notifier: Arc<dyn Notifier>,
    done: DoneSignal,
    workers: Vec<Worker>,
}

impl<B, W, L> Dispatcher<B, W, L>
where
    B: HotkeyBackend,
    W: WindowManager + 'static,
    L: Launcher + 'static,
{
    pub fn new(
        backend: B,
        translator: Arc<Translator<W, L>>,
        notifier: Arc<dyn Notifier>,
        done: DoneSignal,
    ) -> Self {
        Self {
            backend,
            translator,
            notifier,
            done,
            workers: Vec::new(),
        }
    }

    /// Handles of every live registration, in bind order.
    pub fn handles(&self) -> Vec<HotkeyHandle> {
        self.workers.iter().map(|w| w.handle).collect()
    }

    /// Register a binding's aliases and main keys.
    ///
    /// Every chord is parsed before anything is registered.  If the backend
    /// refuses one of them, the chords this call already registered are
    /// released again, so a failed bind leaves nothing behind.
    pub fn bind(&mut self, binding: &Binding) -> Result<(), DispatchError> {
        let variables = &self.translator.context().variables;
        let chords = binding
            .aliases
            .iter()
            .chain(std::iter::once(&binding.keys))
            .map(|spec| Chord::parse(spec, variables))
            .collect::<Result<Vec<_>, _>>()?;

        let commands: Arc<[Command]> = binding.commands.clone().into();
        let first = self.workers.len();
        for chord in chords {
            let HotkeyRegistration { handle, keydown } = match self.backend.register(&chord) {
                Ok(registration) => registration,
                Err(e) => {
                    self.release_from(first);
                    return Err(DispatchError::Backend(format!("{}: {}", chord, e)));
                }
            };
            info!(
                "bound {} (handle {}) to {} command(s)",
                chord,
                handle.0,
                commands.len()
            );

            let thread = {
                let chord = chord.clone();
                let commands = Arc::clone(&commands);
                let translator = Arc::clone(&self.translator);
                let notifier = Arc::clone(&self.notifier);
                let done = self.done.clone();
                thread::spawn(move || {
                    listen(
                        keydown,
                        &chord,
                        &commands,
                        &translator,
                        notifier.as_ref(),
                        &done,
                    )
                })
            };

            self.workers.push(Worker {
                handle,
                chord,
                thread: Some(thread),
            });
        }
        Ok(())
    }

    /// Unregister the workers from index `first` on.  Dropping the backend's
    /// sender ends each listener, which is then joined.
    fn release_from(&mut self, first: usize) {
        for mut worker in self.workers.split_off(first) {
            if let Err(e) = self.backend.unregister(worker.handle) {
                warn!("failed to unregister {}: {}", worker.chord, e);
            }
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    error!("listener for {} panicked", worker.chord);
                }
            }
        }
    }

    /// Stop every listener and release every registration.
    ///
    /// All handles are unregistered even if some fail; the first failure is
    /// returned.
    pub fn shutdown(&mut self) -> Result<(), DispatchError> {
        self.done.close();

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    error!("listener for {} panicked", worker.chord);
                }
            }
        }

        let mut first_err = None;
        for worker in self.workers.drain(..) {
            debug!("unregistering {}", worker.chord);
            if let Err(e) = self.backend.unregister(worker.handle) {
                warn!("failed to unregister {}: {}", worker.chord, e);
                first_err.get_or_insert(DispatchError::Backend(format!(
                    "{}: {}",
                    worker.chord, e
                )));
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<B, W, L> Drop for Dispatcher<B, W, L>
where
    B: HotkeyBackend,
    W: WindowManager + 'static,
    L: Launcher + 'static,
{
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            if let Err(e) = self.shutdown() {
                error!("shutdown on drop: {}", e);
            }
        }
    }
}

fn listen<W: WindowManager, L: Launcher>(
    keydown: Receiver<()>,
    chord: &Chord,
    commands: &[Command],
    translator: &Translator<W, L>,
    notifier: &dyn Notifier,
    done: &DoneSignal,
) {
    loop {
        match keydown.recv_timeout(LISTENER_POLL) {
            Ok(()) => {
                if done.is_closed() {
                    break;
                }
                debug!("{} pressed", chord);
                run_sequence(translator, commands, notifier);
            }
            Err(RecvTimeoutError::Timeout) => {
                if done.is_closed() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("listener for {} stopped", chord);
}

/// Run `commands` in order.
///
/// A failing command is logged and reported through `notifier`; the rest
/// of the sequence still runs.  Returns the number of failures.
pub fn run_sequence<W: WindowManager, L: Launcher>(
    translator: &Translator<W, L>,
    commands: &[Command],
    notifier: &dyn Notifier,
) -> usize {
    let mut failures = 0;
    for cmd in commands {
        if let Err(e) = translator.run(cmd) {
            error!("{}", e);
            notifier.notify(NOTIFY_TITLE, &e.to_string());
            failures += 1;
        }
    }
    failures
}
