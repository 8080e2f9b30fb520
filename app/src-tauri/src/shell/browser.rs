use std::time::Instant;

use super::{BrowserPhase, Shell, ShellError};
use crate::geometry::{resolve_bounds, WindowBounds};
use crate::host::{BrowserWindowRequest, ShellEvent, WindowKind};
use crate::scheduler::{
    DeferredTask, TaskKey, ADVANCED_TOPMOST_DELAY, BOUNDS_PERSIST_DELAY, OPACITY_PERSIST_DELAY,
    REVEAL_FALLBACK_DELAY,
};
use crate::settings::{keys, OpacityLevel, DEFAULT_BROWSER_BOUNDS, FOCUSED_OPACITY};

/// Only plain web pages may be loaded in the browser window.
pub fn is_web_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

impl Shell {
    /// Show, hide or create the browser window.
    ///
    /// Toggles closer together than the debounce window are dropped, and a
    /// toggle while the window is still being created is refused.
    pub fn toggle_browser(&mut self, now: Instant) -> Result<(), ShellError> {
        if !self.state.toggle_debounce.allow(now) {
            log::debug!("Toggle debounced");
            return Ok(());
        }

        match self.state.phase {
            BrowserPhase::Absent | BrowserPhase::Destroyed => {
                let url = self.state.settings.last_url.clone();
                self.create_browser(url)
            }
            BrowserPhase::Creating => Err(ShellError::BrowserBusy),
            BrowserPhase::Visible => self.hide_browser(),
            BrowserPhase::Minimized => self.show_browser(),
        }
    }

    /// Load `url` in the browser window, creating it if needed.
    pub fn navigate_browser(&mut self, url: &str) -> Result<(), ShellError> {
        let url = url.trim();
        if !is_web_url(url) {
            return Err(ShellError::UnsupportedUrl(url.to_string()));
        }
        self.remember_url(url);

        match self.state.phase {
            BrowserPhase::Absent | BrowserPhase::Destroyed => self.create_browser(url.to_string()),
            BrowserPhase::Creating | BrowserPhase::Visible => {
                self.host.navigate_browser(url)?;
                Ok(())
            }
            BrowserPhase::Minimized => {
                self.host.navigate_browser(url)?;
                self.show_browser()
            }
        }
    }

    pub fn reload_browser(&mut self) -> Result<(), ShellError> {
        if self.state.phase.window_exists() {
            self.host.reload_browser()?;
        }
        Ok(())
    }

    /// Top-level page load finished in the browser window.
    pub fn on_browser_page_loaded(&mut self, url: &str) {
        if is_web_url(url) && url != self.state.settings.last_url {
            self.remember_url(url);
        }

        match self.state.phase {
            BrowserPhase::Creating => self.reveal_browser(),
            // A new document starts fully opaque where opacity is page-level.
            BrowserPhase::Visible | BrowserPhase::Minimized => self.apply_live_opacity(),
            BrowserPhase::Absent | BrowserPhase::Destroyed => {}
        }
    }

    pub fn on_browser_focus_changed(&mut self, focused: bool) {
        if self.state.focused == focused {
            return;
        }
        self.state.focused = focused;
        if self.state.phase == BrowserPhase::Visible {
            self.apply_live_opacity();
        }
    }

    /// A window was moved, resized, minimized or restored.
    ///
    /// Bounds are written after [`BOUNDS_PERSIST_DELAY`] of quiet. Minimizing
    /// the browser from outside the app is treated like hiding it.
    pub fn on_window_geometry_changed(
        &mut self,
        kind: WindowKind,
        bounds: WindowBounds,
        minimized: bool,
    ) {
        if kind == WindowKind::Browser {
            match (self.state.phase, minimized) {
                (BrowserPhase::Visible, true) => {
                    self.state.phase = BrowserPhase::Minimized;
                    self.emit(ShellEvent::BrowserWindowClosed);
                    self.register_shortcuts();
                }
                (BrowserPhase::Minimized, false) => {
                    self.state.phase = BrowserPhase::Visible;
                    self.apply_live_opacity();
                    self.emit(ShellEvent::BrowserWindowCreated);
                    self.register_shortcuts();
                }
                (phase, _) if !phase.window_exists() => return,
                _ => {}
            }
        }

        // Minimized windows report placeholder coordinates.
        if minimized || !bounds.has_size() {
            return;
        }
        self.state.pending_bounds.insert(kind, bounds);
        self.schedule(DeferredTask::PersistBounds(kind), BOUNDS_PERSIST_DELAY);
    }

    /// The browser window is gone (closed by the user or torn down).
    pub fn on_browser_destroyed(&mut self) {
        if !self.state.phase.window_exists() {
            return;
        }

        if let Some(title) = self.state.monitored_title.take() {
            self.native.stop_monitoring(Some(&title));
        }
        self.scheduler.cancel(TaskKey::AdvancedTopmost);
        self.scheduler.cancel(TaskKey::RevealBrowser);
        self.persist_bounds(WindowKind::Browser);

        let dropped = self.state.pending_media.clear();
        if dropped > 0 {
            log::debug!("Dropped {} unanswered media requests", dropped);
        }

        self.state.focused = false;
        self.state.phase = BrowserPhase::Destroyed;
        log::info!("Browser window destroyed");
        self.emit(ShellEvent::BrowserWindowClosed);
        self.register_shortcuts();
    }

    /// Shift the resting opacity by `delta` (shortcut steps). Written at once.
    pub fn adjust_opacity_by(&mut self, delta: f64) {
        let level = self.state.settings.browser_opacity.adjusted(delta);
        self.set_opacity_level(level);
        self.state.opacity_dirty = true;
        self.persist_opacity();
    }

    /// Set the resting opacity to an absolute value (settings slider).
    ///
    /// Applied live; the store is written after [`OPACITY_PERSIST_DELAY`] of
    /// quiet.
    pub fn set_opacity(&mut self, value: f64) {
        self.set_opacity_level(OpacityLevel::new(value));
        self.state.opacity_dirty = true;
        self.schedule(DeferredTask::PersistOpacity, OPACITY_PERSIST_DELAY);
    }

    pub(super) fn persist_opacity(&mut self) {
        self.scheduler.cancel(TaskKey::PersistOpacity);
        if !std::mem::take(&mut self.state.opacity_dirty) {
            return;
        }
        let level = self.state.settings.browser_opacity;
        self.persist(keys::BROWSER_OPACITY, &level);
    }

    fn set_opacity_level(&mut self, level: OpacityLevel) {
        self.state.settings.browser_opacity = level;
        if self.state.phase == BrowserPhase::Visible {
            self.apply_live_opacity();
        }
        self.emit(ShellEvent::BrowserOpacityChanged(level.value()));
    }

    /// Opacity the window should render with right now.
    pub fn live_opacity(&self) -> f64 {
        if self.state.focused {
            FOCUSED_OPACITY
        } else {
            self.state.settings.browser_opacity.value()
        }
    }

    fn apply_live_opacity(&mut self) {
        let opacity = self.live_opacity();
        if let Err(e) = self.host.set_browser_opacity(opacity) {
            log::warn!("Failed to apply browser opacity {}: {}", opacity, e);
        }
    }

    fn remember_url(&mut self, url: &str) {
        self.state.settings.last_url = url.to_string();
        self.persist(keys::LAST_URL, &self.state.settings.last_url);
    }

    fn create_browser(&mut self, url: String) -> Result<(), ShellError> {
        let bounds = resolve_bounds(
            self.state.settings.browser_window_bounds,
            DEFAULT_BROWSER_BOUNDS,
            &self.host.displays(),
        );
        let request = BrowserWindowRequest {
            url,
            bounds,
            opacity: self.state.settings.browser_opacity.value(),
        };
        log::info!("Creating browser window at {:?} for {}", bounds, request.url);

        self.host.create_browser(&request)?;
        self.state.phase = BrowserPhase::Creating;
        self.state.focused = false;
        self.schedule(DeferredTask::RevealBrowser, REVEAL_FALLBACK_DELAY);
        Ok(())
    }

    /// Creating -> Visible: show, apply opacity, pin on top.
    pub(super) fn reveal_browser(&mut self) {
        if self.state.phase != BrowserPhase::Creating {
            return;
        }
        self.scheduler.cancel(TaskKey::RevealBrowser);

        if let Err(e) = self.host.show_browser() {
            log::warn!("Failed to show browser window: {}", e);
        }
        self.state.phase = BrowserPhase::Visible;
        self.apply_live_opacity();
        self.apply_basic_topmost();

        if self.state.settings.advanced_topmost && self.native.is_available() {
            self.schedule(
                DeferredTask::AdvancedTopmost { attempt: 1 },
                ADVANCED_TOPMOST_DELAY,
            );
        }

        log::info!("Browser window visible");
        self.emit(ShellEvent::BrowserWindowCreated);
        self.register_shortcuts();
    }

    fn hide_browser(&mut self) -> Result<(), ShellError> {
        self.host.minimize_browser()?;
        self.state.phase = BrowserPhase::Minimized;
        self.state.focused = false;
        self.emit(ShellEvent::BrowserWindowClosed);
        self.register_shortcuts();
        Ok(())
    }

    fn show_browser(&mut self) -> Result<(), ShellError> {
        self.host.restore_browser()?;
        self.state.phase = BrowserPhase::Visible;
        self.apply_live_opacity();
        self.emit(ShellEvent::BrowserWindowCreated);
        self.register_shortcuts();
        Ok(())
    }

    pub(super) fn focus_browser(&mut self) {
        if !self.state.phase.window_exists() {
            return;
        }
        if let Err(e) = self.host.focus_browser() {
            log::warn!("Failed to focus browser window: {}", e);
        }
    }
}
