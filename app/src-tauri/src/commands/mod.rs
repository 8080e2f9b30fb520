//! IPC surface of the Control Window (and the media report from the browser
//! window). Commands validate their input, then hand the work to the shell on
//! the main thread.

pub mod browser;
pub mod settings;
pub mod windows;
