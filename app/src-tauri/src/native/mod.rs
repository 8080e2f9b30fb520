//! Optional platform add-on: OS-level global hotkeys and always-on-top
//! enforcement of windows matched by title.
//!
//! [`NativeAdapter`] is the only way the rest of the app talks to the add-on.
//! It never lets a backend failure escape: calls made while a capability is
//! missing return `false`/empty and log once, and backend errors are logged and
//! reported as `false`. The one loud failure is registering hotkeys before the
//! hook was installed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::settings::ShortcutAction;

#[cfg(target_os = "windows")]
mod keymap;
#[cfg(target_os = "windows")]
mod win32;

/// Invoked with the action name of a pressed native hotkey.
pub type HotkeyCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WindowInfo {
    pub title: String,
    pub handle: isize,
}

/// Which add-on entry points the loaded backend actually provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryPoints {
    pub install_hook: bool,
    pub register_shortcuts: bool,
    pub uninstall_hook: bool,
    pub start_monitoring: bool,
    pub stop_monitoring: bool,
    pub set_topmost: bool,
    pub list_visible_windows: bool,
    pub bring_to_foreground: bool,
}

impl EntryPoints {
    pub const fn all() -> Self {
        Self {
            install_hook: true,
            register_shortcuts: true,
            uninstall_hook: true,
            start_monitoring: true,
            stop_monitoring: true,
            set_topmost: true,
            list_visible_windows: true,
            bring_to_foreground: true,
        }
    }

    fn hotkeys_complete(&self) -> bool {
        self.install_hook && self.register_shortcuts && self.uninstall_hook
    }

    fn topmost_complete(&self) -> bool {
        self.start_monitoring
            && self.stop_monitoring
            && self.set_topmost
            && self.list_visible_windows
            && self.bring_to_foreground
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("native shortcuts registered before the hotkey hook was installed")]
    HookNotInstalled,
}

/// Raw add-on entry points. Errors are plain strings; the adapter logs them.
pub trait NativeBackend: Send {
    fn entry_points(&self) -> EntryPoints;
    fn install_hook(&mut self, callback: HotkeyCallback) -> Result<(), String>;
    /// Replace the active hotkeys with `(combination, action name)` pairs and
    /// return the action names that were actually registered.
    fn set_hotkeys(&mut self, bindings: &[(String, String)]) -> Result<Vec<String>, String>;
    fn uninstall_hook(&mut self) -> Result<(), String>;
    fn start_monitoring(&mut self, title: &str) -> Result<bool, String>;
    fn stop_monitoring(&mut self, title: Option<&str>) -> Result<bool, String>;
    fn set_topmost(&mut self, title: &str, enabled: bool) -> Result<bool, String>;
    fn visible_windows(&self) -> Result<Vec<WindowInfo>, String>;
    fn bring_to_foreground(&mut self, title: &str) -> Result<bool, String>;
}

/// The backend for the current platform, if there is one.
pub fn platform_backend() -> Option<Box<dyn NativeBackend>> {
    #[cfg(target_os = "windows")]
    {
        Some(Box::new(win32::Win32Backend::default()))
    }
    #[cfg(not(target_os = "windows"))]
    {
        None
    }
}

pub struct NativeAdapter {
    backend: Option<Box<dyn NativeBackend>>,
    hotkeys_available: bool,
    topmost_available: bool,
    hook_installed: bool,
    warned_hotkeys: AtomicBool,
    warned_topmost: AtomicBool,
}

impl NativeAdapter {
    /// Wrap a backend. Each capability group is enabled only when every entry
    /// point it needs is present.
    pub fn new(backend: Option<Box<dyn NativeBackend>>) -> Self {
        let entry_points = backend
            .as_ref()
            .map(|b| b.entry_points())
            .unwrap_or_default();
        let hotkeys_available = entry_points.hotkeys_complete();
        let topmost_available = entry_points.topmost_complete();

        match &backend {
            None => log::info!("Native add-on not present; using toolkit fallbacks"),
            Some(_) => log::info!(
                "Native add-on loaded (hotkeys: {}, topmost: {})",
                hotkeys_available,
                topmost_available
            ),
        }

        Self {
            backend,
            hotkeys_available,
            topmost_available,
            hook_installed: false,
            warned_hotkeys: AtomicBool::new(false),
            warned_topmost: AtomicBool::new(false),
        }
    }

    pub fn unavailable() -> Self {
        Self::new(None)
    }

    /// Topmost control (monitoring, z-order, window enumeration) is usable.
    pub fn is_available(&self) -> bool {
        self.topmost_available
    }

    pub fn hotkeys_available(&self) -> bool {
        self.hotkeys_available
    }

    pub fn hook_installed(&self) -> bool {
        self.hook_installed
    }

    fn warn_once(flag: &AtomicBool, what: &str) {
        if !flag.swap(true, Ordering::Relaxed) {
            log::warn!("Native {} unavailable; call ignored", what);
        }
    }

    fn hotkey_backend(&mut self) -> Option<&mut Box<dyn NativeBackend>> {
        if !self.hotkeys_available {
            Self::warn_once(&self.warned_hotkeys, "hotkeys");
            return None;
        }
        self.backend.as_mut()
    }

    fn topmost_backend(&mut self) -> Option<&mut Box<dyn NativeBackend>> {
        if !self.topmost_available {
            Self::warn_once(&self.warned_topmost, "topmost control");
            return None;
        }
        self.backend.as_mut()
    }

    fn report<T: Default>(call: &str, result: Result<T, String>) -> T {
        result.unwrap_or_else(|e| {
            log::warn!("Native {} failed: {}", call, e);
            T::default()
        })
    }

    pub fn install_hook(&mut self, callback: HotkeyCallback) -> bool {
        let Some(backend) = self.hotkey_backend() else {
            return false;
        };
        let installed = match backend.install_hook(callback) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Native installHook failed: {}", e);
                false
            }
        };
        self.hook_installed = installed;
        installed
    }

    /// Make `bindings` the complete set of native hotkeys.
    ///
    /// Returns the actions the backend took. Anything missing from the result
    /// (all of them when the capability is absent or the backend refused) is
    /// the caller's to register with the toolkit.
    pub fn register_shortcuts(
        &mut self,
        bindings: &[(ShortcutAction, String)],
    ) -> Result<Vec<ShortcutAction>, AdapterError> {
        if !self.hotkeys_available {
            Self::warn_once(&self.warned_hotkeys, "hotkeys");
            return Ok(Vec::new());
        }
        if !self.hook_installed {
            log::error!("registerShortcuts called before installHook");
            return Err(AdapterError::HookNotInstalled);
        }
        let raw: Vec<(String, String)> = bindings
            .iter()
            .map(|(action, combination)| (combination.clone(), action.as_str().to_string()))
            .collect();
        let Some(backend) = self.backend.as_mut() else {
            return Ok(Vec::new());
        };
        let accepted = match backend.set_hotkeys(&raw) {
            Ok(accepted) => accepted,
            Err(e) => {
                log::warn!("Native registerShortcuts failed: {}", e);
                return Ok(Vec::new());
            }
        };
        Ok(bindings
            .iter()
            .map(|(action, _)| *action)
            .filter(|action| accepted.iter().any(|name| name == action.as_str()))
            .collect())
    }

    pub fn uninstall_hook(&mut self) {
        if !self.hook_installed {
            return;
        }
        self.hook_installed = false;
        if let Some(backend) = self.hotkey_backend() {
            if let Err(e) = backend.uninstall_hook() {
                log::warn!("Native uninstallHook failed: {}", e);
            }
        }
    }

    pub fn start_monitoring(&mut self, title: &str) -> bool {
        self.topmost_backend()
            .map(|b| Self::report("startMonitoring", b.start_monitoring(title)))
            .unwrap_or(false)
    }

    pub fn stop_monitoring(&mut self, title: Option<&str>) -> bool {
        self.topmost_backend()
            .map(|b| Self::report("stopMonitoring", b.stop_monitoring(title)))
            .unwrap_or(false)
    }

    pub fn set_topmost(&mut self, title: &str, enabled: bool) -> bool {
        self.topmost_backend()
            .map(|b| Self::report("setTopmost", b.set_topmost(title, enabled)))
            .unwrap_or(false)
    }

    pub fn list_visible_windows(&self) -> Vec<WindowInfo> {
        if !self.topmost_available {
            Self::warn_once(&self.warned_topmost, "topmost control");
            return Vec::new();
        }
        self.backend
            .as_ref()
            .map(|b| Self::report("listVisibleWindows", b.visible_windows()))
            .unwrap_or_default()
    }

    pub fn bring_to_foreground(&mut self, title: &str) -> bool {
        self.topmost_backend()
            .map(|b| Self::report("bringToForeground", b.bring_to_foreground(title)))
            .unwrap_or(false)
    }
}
