//! Window and shortcut coordination.
//!
//! [`Shell`] owns all mutable state of the app (settings, the browser window's
//! lifecycle phase, focus, registered shortcuts, in-flight media scripts) and
//! talks to the outside world only through the traits in [`crate::host`],
//! [`crate::scheduler`], [`crate::settings`] and the [`NativeAdapter`]. Every
//! entry point is expected to run on one thread; the Tauri glue serializes
//! calls onto the main thread.

use std::collections::HashMap;
use std::time::Duration;

use crate::geometry::WindowBounds;
use crate::host::{
    EventSink, HostError, InitialSettings, ShellEvent, ShortcutRegistrar, View, WindowHost,
    WindowKind,
};
use crate::native::{AdapterError, HotkeyCallback, NativeAdapter, WindowInfo};
use crate::scheduler::{DeferredTask, Scheduler};
use crate::settings::{
    keys, save_setting, BindingConflict, SettingsError, SettingsStore, ShellSettings,
    ShortcutBindings,
};

mod browser;
mod media;
mod shortcuts;
mod topmost;

pub use browser::is_web_url;
pub use media::{ActionOutcome, MediaReport};
pub use shortcuts::{Debouncer, TOGGLE_DEBOUNCE};

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Conflict(#[from] BindingConflict),

    #[error("Browser window is still being created")]
    BrowserBusy,

    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),
}

/// Lifecycle of the browser window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserPhase {
    /// Never created in this session.
    Absent,
    /// Built but hidden until its page is ready.
    Creating,
    Visible,
    Minimized,
    /// Closed; the next request builds a new window.
    Destroyed,
}

impl BrowserPhase {
    pub fn window_exists(self) -> bool {
        matches!(self, Self::Creating | Self::Visible | Self::Minimized)
    }
}

/// Collaborators the shell drives.
pub struct ShellDeps {
    pub host: Box<dyn WindowHost>,
    pub registrar: Box<dyn ShortcutRegistrar>,
    pub events: Box<dyn EventSink>,
    pub scheduler: Box<dyn Scheduler>,
    pub store: Box<dyn SettingsStore>,
    pub native: NativeAdapter,
}

struct ShellState {
    settings: ShellSettings,
    phase: BrowserPhase,
    focused: bool,
    toggle_debounce: Debouncer,
    /// Whether media shortcuts were part of the last registration.
    media_registered: bool,
    pending_media: media::PendingActions,
    /// Title the native monitor is tracking, if advanced topmost is active.
    monitored_title: Option<String>,
    /// Latest bounds per window, written when the debounce task fires.
    pending_bounds: HashMap<WindowKind, WindowBounds>,
    /// Slider opacity not yet written to the store.
    opacity_dirty: bool,
}

pub struct Shell {
    state: ShellState,
    host: Box<dyn WindowHost>,
    registrar: Box<dyn ShortcutRegistrar>,
    events: Box<dyn EventSink>,
    scheduler: Box<dyn Scheduler>,
    store: Box<dyn SettingsStore>,
    native: NativeAdapter,
}

impl Shell {
    pub fn new(deps: ShellDeps, settings: ShellSettings) -> Self {
        Self {
            state: ShellState {
                settings,
                phase: BrowserPhase::Absent,
                focused: false,
                toggle_debounce: Debouncer::new(TOGGLE_DEBOUNCE),
                media_registered: false,
                pending_media: media::PendingActions::default(),
                monitored_title: None,
                pending_bounds: HashMap::new(),
                opacity_dirty: false,
            },
            host: deps.host,
            registrar: deps.registrar,
            events: deps.events,
            scheduler: deps.scheduler,
            store: deps.store,
            native: deps.native,
        }
    }

    pub fn settings(&self) -> &ShellSettings {
        &self.state.settings
    }

    pub fn phase(&self) -> BrowserPhase {
        self.state.phase
    }

    pub fn media_shortcuts_registered(&self) -> bool {
        self.state.media_registered
    }

    pub fn initial_settings(&self) -> InitialSettings {
        InitialSettings {
            shortcuts: self.state.settings.shortcuts.clone(),
            opacity: self.state.settings.browser_opacity.value(),
            enable_gpu: self.state.settings.enable_gpu_acceleration,
        }
    }

    /// Push the current settings to the Control Window.
    pub fn emit_initial_settings(&self) -> InitialSettings {
        let initial = self.initial_settings();
        self.emit(ShellEvent::InitialSettings(initial.clone()));
        initial
    }

    /// Switch the Control Window to `view` (menu entries).
    pub fn show_view(&self, view: View) {
        self.emit(ShellEvent::Navigate(view));
    }

    pub fn set_gpu_acceleration(&mut self, enabled: bool) -> Result<(), ShellError> {
        self.state.settings.enable_gpu_acceleration = enabled;
        save_setting(self.store.as_ref(), keys::ENABLE_GPU_ACCELERATION, &enabled)?;
        log::info!(
            "GPU acceleration {} (applies at next launch)",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Replace the shortcut bindings, persist them whole and re-register.
    ///
    /// Uniqueness is checked by the caller (see `ShortcutBindings::find_conflict`).
    pub fn update_shortcuts(&mut self, bindings: ShortcutBindings) -> Result<(), ShellError> {
        save_setting(self.store.as_ref(), keys::SHORTCUTS, &bindings)?;
        self.state.settings.shortcuts = bindings;
        self.register_shortcuts();
        Ok(())
    }

    /// Install the native hotkey hook. Hotkeys it receives are reported to
    /// `callback` by action name.
    pub fn install_native_hook(&mut self, callback: HotkeyCallback) -> bool {
        if !self.native.hotkeys_available() {
            return false;
        }
        self.native.install_hook(callback)
    }

    /// Top-level windows the native add-on can see; empty without it.
    pub fn visible_windows(&self) -> Vec<WindowInfo> {
        self.native.list_visible_windows()
    }

    pub fn bring_window_to_foreground(&mut self, title: &str) -> bool {
        self.native.bring_to_foreground(title)
    }

    /// Entry point for tasks delivered by the scheduler.
    pub fn run_deferred(&mut self, task: DeferredTask) {
        log::debug!("Running deferred task {:?}", task);
        match task {
            DeferredTask::PersistBounds(kind) => self.persist_bounds(kind),
            DeferredTask::PersistOpacity => self.persist_opacity(),
            DeferredTask::AdvancedTopmost { attempt } => self.attempt_advanced_topmost(attempt),
            DeferredTask::RevealBrowser => {
                if self.state.phase == BrowserPhase::Creating {
                    log::warn!("Browser page never signalled ready; revealing anyway");
                    self.reveal_browser();
                }
            }
        }
    }

    /// Tear everything down before the process exits.
    pub fn on_control_window_closed(&mut self) {
        self.persist_bounds(WindowKind::Main);
        self.persist_opacity();
        if self.state.phase.window_exists() {
            if let Err(e) = self.host.close_browser() {
                log::warn!("Failed to close browser window: {}", e);
            }
            self.on_browser_destroyed();
        }
        if let Some(title) = self.state.monitored_title.take() {
            self.native.stop_monitoring(Some(&title));
        }
        self.native.uninstall_hook();
        if let Err(e) = self.registrar.unregister_all() {
            log::warn!("Failed to unregister shortcuts on shutdown: {}", e);
        }
        self.state.media_registered = false;
        log::info!("Shell shut down");
    }

    fn emit(&self, event: ShellEvent) {
        log::debug!("Emitting {}", event.name());
        self.events.emit(event);
    }

    fn schedule(&mut self, task: DeferredTask, delay: Duration) {
        self.scheduler.schedule(task, delay);
    }

    /// Persist a single key; failures are logged and the in-memory value kept.
    fn persist<T: serde::Serialize>(&self, key: &'static str, value: &T) {
        if let Err(e) = save_setting(self.store.as_ref(), key, value) {
            log::warn!("Failed to persist {}: {}", key, e);
        }
    }

    fn persist_bounds(&mut self, kind: WindowKind) {
        self.scheduler
            .cancel(crate::scheduler::TaskKey::PersistBounds(kind));
        let Some(bounds) = self.state.pending_bounds.remove(&kind) else {
            return;
        };
        let key = match kind {
            WindowKind::Main => {
                self.state.settings.main_window_bounds = Some(bounds);
                keys::MAIN_WINDOW_BOUNDS
            }
            WindowKind::Browser => {
                self.state.settings.browser_window_bounds = Some(bounds);
                keys::BROWSER_WINDOW_BOUNDS
            }
        };
        log::debug!("Persisting {} {:?}", key, bounds);
        self.persist(key, &bounds);
    }
}
