//! [`HotkeyBackend`] on top of the `global-hotkey` crate.
//!
//! `global-hotkey` delivers every press through one process-wide event
//! channel.  A router thread drains that channel and forwards each press to
//! the per-handle senders registered for the hotkey's id.  Registering the
//! same chord twice adds a second route without asking the OS again; the OS
//! registration is released with the last handle.
//!
//! On macOS the events are produced by the main thread's run loop, so the
//! binary must keep pumping it (see `main.rs`).

use crate::chord::{Chord, Key, Modifier};
use crate::shutdown::DoneSignal;
use crate::traits::{HotkeyBackend, HotkeyHandle, HotkeyRegistration};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const ROUTER_POLL: Duration = Duration::from_millis(100);

type Routes = Arc<Mutex<HashMap<u32, Vec<(HotkeyHandle, Sender<()>)>>>>;

#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("global hotkey: {0}")]
    Manager(String),

    #[error("{0} has no key code")]
    Unmappable(String),

    #[error("unknown hotkey handle {0}")]
    UnknownHandle(u64),
}

pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    routes: Routes,
    hotkeys: HashMap<HotkeyHandle, HotKey>,
    next_handle: u64,
    stop: DoneSignal,
    router: Option<JoinHandle<()>>,
}

impl GlobalHotkeyBackend {
    /// Create the OS hotkey manager and start the router thread.
    ///
    /// On macOS this must be called on the main thread.
    pub fn new() -> Result<Self, HotkeyError> {
        let manager = GlobalHotKeyManager::new().map_err(|e| HotkeyError::Manager(e.to_string()))?;
        let routes: Routes = Arc::default();
        let stop = DoneSignal::new();
        let router = {
            let routes = Arc::clone(&routes);
            let stop = stop.clone();
            thread::spawn(move || route_events(&routes, &stop))
        };
        Ok(Self {
            manager,
            routes,
            hotkeys: HashMap::new(),
            next_handle: 0,
            stop,
            router: Some(router),
        })
    }
}

fn route_events(routes: &Routes, stop: &DoneSignal) {
    let events = GlobalHotKeyEvent::receiver();
    while !stop.is_closed() {
        match events.recv_timeout(ROUTER_POLL) {
            Ok(event) => {
                if event.state != HotKeyState::Pressed {
                    continue;
                }
                trace!("hotkey event {}", event.id);
                let routes = routes.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(senders) = routes.get(&event.id) {
                    for (_, tx) in senders {
                        let _ = tx.send(());
                    }
                }
            }
            Err(e) if e.is_timeout() => {}
            Err(_) => break,
        }
    }
    debug!("hotkey router stopped");
}

impl HotkeyBackend for GlobalHotkeyBackend {
    type Error = HotkeyError;

    fn register(&mut self, chord: &Chord) -> Result<HotkeyRegistration, HotkeyError> {
        let hotkey = to_hotkey(chord)?;
        let (tx, rx) = mpsc::channel();

        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let first = routes.get(&hotkey.id()).map_or(true, Vec::is_empty);
        if first {
            self.manager
                .register(hotkey)
                .map_err(|e| HotkeyError::Manager(format!("{}: {}", chord, e)))?;
        }

        self.next_handle += 1;
        let handle = HotkeyHandle(self.next_handle);
        routes.entry(hotkey.id()).or_default().push((handle, tx));
        self.hotkeys.insert(handle, hotkey);
        debug!("registered {} as {} (id {})", chord, handle.0, hotkey.id());

        Ok(HotkeyRegistration {
            handle,
            keydown: rx,
        })
    }

    fn unregister(&mut self, handle: HotkeyHandle) -> Result<(), HotkeyError> {
        let hotkey = self
            .hotkeys
            .remove(&handle)
            .ok_or(HotkeyError::UnknownHandle(handle.0))?;

        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let last = match routes.get_mut(&hotkey.id()) {
            Some(senders) => {
                senders.retain(|(h, _)| *h != handle);
                senders.is_empty()
            }
            None => true,
        };
        if last {
            routes.remove(&hotkey.id());
            self.manager
                .unregister(hotkey)
                .map_err(|e| HotkeyError::Manager(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for GlobalHotkeyBackend {
    fn drop(&mut self) {
        self.stop.close();
        if let Some(router) = self.router.take() {
            let _ = router.join();
        }
    }
}

//  Chord conversion

pub fn to_modifiers(chord: &Chord) -> Modifiers {
    chord.modifiers().fold(Modifiers::empty(), |acc, m| {
        acc | match m {
            Modifier::Cmd => Modifiers::SUPER,
            Modifier::Ctrl => Modifiers::CONTROL,
            Modifier::Alt => Modifiers::ALT,
            Modifier::Shift => Modifiers::SHIFT,
        }
    })
}

pub fn to_hotkey(chord: &Chord) -> Result<HotKey, HotkeyError> {
    let code = to_code(chord.key()).ok_or_else(|| HotkeyError::Unmappable(chord.to_string()))?;
    let mods = to_modifiers(chord);
    Ok(HotKey::new((!mods.is_empty()).then_some(mods), code))
}

pub fn to_code(key: Key) -> Option<Code> {
    let code = match key {
        Key::Letter(c) => letter_code(c)?,
        Key::Digit(d) => digit_code(d)?,
        Key::Function(n) => function_code(n)?,
        Key::Left => Code::ArrowLeft,
        Key::Right => Code::ArrowRight,
        Key::Up => Code::ArrowUp,
        Key::Down => Code::ArrowDown,
        Key::Return => Code::Enter,
        Key::Space => Code::Space,
        Key::Escape => Code::Escape,
        Key::Tab => Code::Tab,
        Key::Backspace => Code::Backspace,
        Key::Grave => Code::Backquote,
        Key::Minus => Code::Minus,
        Key::Equal => Code::Equal,
        Key::Comma => Code::Comma,
        Key::Period => Code::Period,
        Key::Slash => Code::Slash,
        Key::Semicolon => Code::Semicolon,
        Key::Quote => Code::Quote,
        Key::BracketLeft => Code::BracketLeft,
        Key::BracketRight => Code::BracketRight,
        Key::Backslash => Code::Backslash,
    };
    Some(code)
}

fn letter_code(c: char) -> Option<Code> {
    Some(match c {
        'a' => Code::KeyA,
        'b' => Code::KeyB,
        'c' => Code::KeyC,
        'd' => Code::KeyD,
        'e' => Code::KeyE,
        'f' => Code::KeyF,
        'g' => Code::KeyG,
        'h' => Code::KeyH,
        'i' => Code::KeyI,
        'j' => Code::KeyJ,
        'k' => Code::KeyK,
        'l' => Code::KeyL,
        'm' => Code::KeyM,
        'n' => Code::KeyN,
        'o' => Code::KeyO,
        'p' => Code::KeyP,
        'q' => Code::KeyQ,
        'r' => Code::KeyR,
        's' => Code::KeyS,
        't' => Code::KeyT,
        'u' => Code::KeyU,
        'v' => Code::KeyV,
        'w' => Code::KeyW,
        'x' => Code::KeyX,
        'y' => Code::KeyY,
        'z' => Code::KeyZ,
        _ => return None,
    })
}

fn digit_code(d: u8) -> Option<Code> {
    Some(match d {
        0 => Code::Digit0,
        1 => Code::Digit1,
        2 => Code::Digit2,
        3 => Code::Digit3,
        4 => Code::Digit4,
        5 => Code::Digit5,
        6 => Code::Digit6,
        7 => Code::Digit7,
        8 => Code::Digit8,
        9 => Code::Digit9,
        _ => return None,
    })
}

fn function_code(n: u8) -> Option<Code> {
    Some(match n {
        1 => Code::F1,
        2 => Code::F2,
        3 => Code::F3,
        4 => Code::F4,
        5 => Code::F5,
        6 => Code::F6,
        7 => Code::F7,
        8 => Code::F8,
        9 => Code::F9,
        10 => Code::F10,
        11 => Code::F11,
        12 => Code::F12,
        _ => return None,
    })
}
