use std::collections::HashSet;
use std::time::{Duration, Instant};

use super::{BrowserPhase, Shell, ShellError};
use crate::settings::{ShortcutAction, OPACITY_STEP};

/// Key repeat on a held toggle key must not flap the window.
pub const TOGGLE_DEBOUNCE: Duration = Duration::from_millis(150);

/// Accepts at most one event per window; events inside it are dropped.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn allow(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

impl Shell {
    /// Rebuild global shortcut registration from the current bindings and
    /// browser state.
    ///
    /// Toggle and opacity go through the native hook when it is installed.
    /// Whatever the hook did not take is registered with the toolkit. Media
    /// shortcuts are only registered while the browser is on screen so Space
    /// and the arrows stay usable elsewhere.
    pub fn register_shortcuts(&mut self) {
        if let Err(e) = self.registrar.unregister_all() {
            log::warn!("Failed to unregister shortcuts: {}", e);
        }

        let media_gate = self.state.phase == BrowserPhase::Visible;
        let bindings: Vec<(ShortcutAction, String)> = self
            .state
            .settings
            .shortcuts
            .iter()
            .map(|(action, combination)| (action, combination.to_string()))
            .collect();

        let mut native_actions = HashSet::new();
        if self.native.hotkeys_available() && self.native.hook_installed() {
            let native_bindings: Vec<(ShortcutAction, String)> = bindings
                .iter()
                .filter(|(action, _)| !action.is_media())
                .cloned()
                .collect();
            match self.native.register_shortcuts(&native_bindings) {
                Ok(accepted) => {
                    if accepted.len() < native_bindings.len() {
                        log::warn!(
                            "Native hook took {} of {} shortcuts; the rest use the toolkit",
                            accepted.len(),
                            native_bindings.len()
                        );
                    }
                    native_actions.extend(accepted);
                }
                Err(e) => log::error!("Native hotkeys unusable, using toolkit shortcuts: {}", e),
            }
        }

        let mut registered = Vec::new();
        for (action, combination) in &bindings {
            if native_actions.contains(action) || (action.is_media() && !media_gate) {
                continue;
            }
            match self.registrar.register(*action, combination) {
                Ok(()) => registered.push(action.as_str()),
                Err(e) => log::warn!("Shortcut for {} left unregistered: {}", action, e),
            }
        }

        self.state.media_registered = media_gate;
        log::info!(
            "Shortcuts registered (native: {}, toolkit: [{}])",
            native_actions.len(),
            registered.join(", ")
        );
    }

    /// Run the action bound to a pressed shortcut.
    pub fn handle_action(&mut self, action: ShortcutAction, now: Instant) -> Result<(), ShellError> {
        log::debug!("Shortcut action {}", action);
        match action {
            ShortcutAction::ToggleBrowser => self.toggle_browser(now),
            ShortcutAction::PlayPause | ShortcutAction::Rewind | ShortcutAction::Forward => {
                self.trigger_media(action)
            }
            ShortcutAction::IncreaseOpacity => {
                self.adjust_opacity_by(OPACITY_STEP);
                Ok(())
            }
            ShortcutAction::DecreaseOpacity => {
                self.adjust_opacity_by(-OPACITY_STEP);
                Ok(())
            }
        }
    }

    /// Same as [`Shell::handle_action`] for actions reported by name (native hook).
    pub fn handle_named_action(&mut self, name: &str, now: Instant) -> Result<(), ShellError> {
        match name.parse::<ShortcutAction>() {
            Ok(action) => self.handle_action(action, now),
            Err(e) => {
                log::warn!("Ignoring hotkey: {}", e);
                Ok(())
            }
        }
    }
}
