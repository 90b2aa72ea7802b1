//! IPC listener that accepts command sequences over a Unix socket.
//!
//! Scripts can connect to the socket and send newline-delimited JSON, much
//! like `i3-msg`, and have it run through the same translator as hotkeys.

pub mod listener;
