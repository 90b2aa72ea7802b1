//! yabai-specific implementations.
//!
//! This module provides the concrete backend for the
//! [`WindowManager`](crate::traits::WindowManager) trait, driving yabai
//! through its `yabai -m` message interface.
//!
//! Nothing outside this module should reference yabai directly.

pub mod wm;

pub use wm::{YabaiError, YabaiWm};
