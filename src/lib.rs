//! **wmbind**: i3-style hotkey bindings driving yabai.
//!
//! Bindings are declared once, in the i3 dialect (`focus left`,
//! `move container to workspace "3"`, `resize grow width 10 px or 10 ppt`).
//! At runtime each hotkey press runs its command sequence through a
//! translator that turns every command into `yabai -m` calls.  When the
//! direct call fails at a monitor edge, the translator falls back to the
//! live display geometry to find the neighbouring display and the space it
//! is showing.
//!
//! # Architecture
//!
//! The crate is organised around the traits in [`traits`]:
//!
//! * [`traits::WindowManager`] abstracts yabai so the translation and
//!   geometry logic can be tested against recording mocks.
//! * [`traits::HotkeyBackend`] abstracts OS hotkey registration for the
//!   [`dispatcher`].
//! * [`traits::Launcher`] and [`traits::Notifier`] abstract process launching
//!   and desktop notifications.
//! * [`traits::CommandSource`] abstracts transports that deliver command
//!   sequences from outside (the [`ipc`] socket).
//!
//! Concrete implementations live in [`yabai`] and [`system`].

pub mod adjacency;
pub mod chord;
pub mod command;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod ipc;
pub mod quake;
pub mod shutdown;
pub mod snapshot;
pub mod status;
pub mod system;
pub mod traits;
pub mod translator;
pub mod yabai;
