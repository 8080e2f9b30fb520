//! Seams between the shell logic and the GUI toolkit: window operations,
//! global shortcut registration and events pushed to the Control Window.

use serde::Serialize;
use serde_json::{json, Value};

use crate::geometry::{Display, WindowBounds};
use crate::settings::{ShortcutAction, ShortcutBindings};

pub const MAIN_WINDOW: &str = "main";
pub const BROWSER_WINDOW: &str = "browser";

/// Title of the browser window until its page reports one.
pub const BROWSER_TITLE: &str = "Teyvat Browser";
/// Control Window title. Native lookups match titles by substring, so it
/// shares no text with anything the browser window can be found by.
pub const CONTROL_TITLE: &str = "Teyvat Control Panel";

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Window '{0}' does not exist")]
    MissingWindow(&'static str),

    #[error("Failed to register '{combination}': {reason}")]
    Shortcut { combination: String, reason: String },

    #[error("{0}")]
    Toolkit(String),
}

impl From<tauri::Error> for HostError {
    fn from(e: tauri::Error) -> Self {
        Self::Toolkit(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    Main,
    Browser,
}

/// Everything needed to build the browser window.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserWindowRequest {
    pub url: String,
    pub bounds: WindowBounds,
    pub opacity: f64,
}

/// Window operations the shell performs. Browser methods fail with
/// [`HostError::MissingWindow`] when the browser window does not exist.
pub trait WindowHost: Send {
    fn displays(&self) -> Vec<Display>;

    /// Build the browser window hidden; it is shown once its page is ready.
    fn create_browser(&mut self, request: &BrowserWindowRequest) -> Result<(), HostError>;
    fn show_browser(&mut self) -> Result<(), HostError>;
    fn minimize_browser(&mut self) -> Result<(), HostError>;
    /// Unminimize, show and focus.
    fn restore_browser(&mut self) -> Result<(), HostError>;
    fn focus_browser(&mut self) -> Result<(), HostError>;
    fn close_browser(&mut self) -> Result<(), HostError>;
    fn navigate_browser(&mut self, url: &str) -> Result<(), HostError>;
    fn reload_browser(&mut self) -> Result<(), HostError>;
    fn set_browser_always_on_top(&mut self, enabled: bool) -> Result<(), HostError>;
    fn set_browser_opacity(&mut self, opacity: f64) -> Result<(), HostError>;
    fn browser_title(&self) -> Option<String>;
    /// Run a script in the browser page; results come back asynchronously.
    fn eval_in_browser(&mut self, script: &str) -> Result<(), HostError>;
}

/// Toolkit-level global shortcuts.
pub trait ShortcutRegistrar: Send {
    fn unregister_all(&mut self) -> Result<(), HostError>;
    fn register(&mut self, action: ShortcutAction, combination: &str) -> Result<(), HostError>;
}

/// Pushes events to the Control Window.
pub trait EventSink: Send {
    fn emit(&self, event: ShellEvent);
}

/// Views of the Control Window UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Home,
    Settings,
    About,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialSettings {
    pub shortcuts: ShortcutBindings,
    pub opacity: f64,
    pub enable_gpu: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    BrowserWindowCreated,
    BrowserWindowClosed,
    BrowserOpacityChanged(f64),
    ShortcutTriggered(ShortcutAction),
    Navigate(View),
    InitialSettings(InitialSettings),
}

impl ShellEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BrowserWindowCreated => "browser-window-created",
            Self::BrowserWindowClosed => "browser-window-closed",
            Self::BrowserOpacityChanged(_) => "browser-opacity-changed",
            Self::ShortcutTriggered(_) => "shortcut-triggered",
            Self::Navigate(_) => "navigate",
            Self::InitialSettings(_) => "initial-settings",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::BrowserWindowCreated | Self::BrowserWindowClosed => Value::Null,
            Self::BrowserOpacityChanged(opacity) => json!(opacity),
            Self::ShortcutTriggered(action) => json!(action.as_str()),
            Self::Navigate(view) => json!(view),
            Self::InitialSettings(settings) => json!(settings),
        }
    }
}
