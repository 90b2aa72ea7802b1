//! Operating-system integrations: process launching, desktop
//! notifications and global hotkey registration.

pub mod hotkeys;
pub mod launcher;
pub mod notify;
