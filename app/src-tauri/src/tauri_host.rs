//! Tauri implementations of the shell's toolkit seams.

use std::time::Instant;

use tauri::webview::PageLoadEvent;
use tauri::{
    AppHandle, Emitter, Manager, PhysicalPosition, PhysicalSize, WebviewUrl, WebviewWindow,
    WebviewWindowBuilder, WindowEvent,
};
use tauri_utils::config::BackgroundThrottlingPolicy;

use crate::geometry::{Display, Rect, WindowBounds};
use crate::host::{
    BrowserWindowRequest, EventSink, HostError, ShellEvent, ShortcutRegistrar, WindowHost,
    WindowKind, BROWSER_TITLE, BROWSER_WINDOW, MAIN_WINDOW,
};
use crate::settings::ShortcutAction;
use crate::state::dispatch;

/// Chromium flags every webview in the process shares. WebView2 refuses to
/// create a second webview with different arguments, so this is fixed at
/// launch for both windows.
pub fn webview_args(enable_gpu: bool) -> Option<String> {
    if enable_gpu {
        return None;
    }
    Some(
        "--disable-features=msWebOOUI,msPdfOOUI,msSmartScreenProtection --disable-gpu".to_string(),
    )
}

/// Outer position plus inner size, and whether the window is minimized.
pub fn read_bounds(window: &WebviewWindow) -> Option<(WindowBounds, bool)> {
    let position = window.outer_position().ok()?;
    let size = window.inner_size().ok()?;
    let minimized = window.is_minimized().unwrap_or(false);
    Some((
        WindowBounds {
            width: size.width,
            height: size.height,
            x: Some(position.x),
            y: Some(position.y),
        },
        minimized,
    ))
}

pub fn apply_bounds(window: &WebviewWindow, bounds: WindowBounds) -> Result<(), HostError> {
    window.set_size(PhysicalSize::new(bounds.width, bounds.height))?;
    if let Some((x, y)) = bounds.position() {
        window.set_position(PhysicalPosition::new(x, y))?;
    }
    Ok(())
}

/// Forward moves and resizes of `window` to the shell.
pub fn watch_geometry(app: &AppHandle, window: &WebviewWindow, kind: WindowKind) {
    let app = app.clone();
    let watched = window.clone();
    window.on_window_event(move |event| {
        if !matches!(event, WindowEvent::Moved(_) | WindowEvent::Resized(_)) {
            return;
        }
        if let Some((bounds, minimized)) = read_bounds(&watched) {
            dispatch(&app, move |shell, _| {
                shell.on_window_geometry_changed(kind, bounds, minimized)
            });
        }
    });
}

#[derive(Clone)]
pub struct TauriHost {
    app: AppHandle,
    webview_args: Option<String>,
}

impl TauriHost {
    pub fn new(app: &AppHandle, enable_gpu_at_launch: bool) -> Self {
        Self {
            app: app.clone(),
            webview_args: webview_args(enable_gpu_at_launch),
        }
    }

    fn browser(&self) -> Result<WebviewWindow, HostError> {
        self.app
            .get_webview_window(BROWSER_WINDOW)
            .ok_or(HostError::MissingWindow(BROWSER_WINDOW))
    }

    fn watch_browser(&self, window: &WebviewWindow) {
        watch_geometry(&self.app, window, WindowKind::Browser);

        let app = self.app.clone();
        window.on_window_event(move |event| match event {
            WindowEvent::Focused(focused) => {
                let focused = *focused;
                dispatch(&app, move |shell, _| shell.on_browser_focus_changed(focused));
            }
            WindowEvent::Destroyed => {
                dispatch(&app, |shell, _| shell.on_browser_destroyed());
            }
            _ => {}
        });
    }
}

#[cfg(target_os = "windows")]
fn set_layered_opacity(window: &WebviewWindow, opacity: f64) -> Result<(), HostError> {
    use windows::Win32::Foundation::{COLORREF, HWND};
    use windows::Win32::UI::WindowsAndMessaging::{
        GetWindowLongPtrW, SetLayeredWindowAttributes, SetWindowLongPtrW, GWL_EXSTYLE, LWA_ALPHA,
        WS_EX_LAYERED,
    };

    // Tauri links its own `windows` version; only the raw handle crosses over.
    let hwnd = HWND(window.hwnd()?.0);
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    unsafe {
        let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
        if ex_style & WS_EX_LAYERED.0 as isize == 0 {
            SetWindowLongPtrW(hwnd, GWL_EXSTYLE, ex_style | WS_EX_LAYERED.0 as isize);
        }
        SetLayeredWindowAttributes(hwnd, COLORREF(0), alpha, LWA_ALPHA)
            .map_err(|e| HostError::Toolkit(format!("SetLayeredWindowAttributes: {}", e)))
    }
}

#[cfg(not(target_os = "windows"))]
fn set_layered_opacity(window: &WebviewWindow, opacity: f64) -> Result<(), HostError> {
    // No per-window alpha here; fade the page instead.
    window.eval(&format!(
        "document.documentElement.style.opacity = '{}';",
        opacity
    ))?;
    Ok(())
}

impl WindowHost for TauriHost {
    fn displays(&self) -> Vec<Display> {
        let monitors = match self.app.available_monitors() {
            Ok(monitors) => monitors,
            Err(e) => {
                log::warn!("Failed to enumerate monitors: {}", e);
                return Vec::new();
            }
        };
        let primary = self.app.primary_monitor().ok().flatten();

        monitors
            .iter()
            .map(|monitor| {
                let area = monitor.work_area();
                Display {
                    work_area: Rect {
                        x: area.position.x,
                        y: area.position.y,
                        width: area.size.width,
                        height: area.size.height,
                    },
                    is_primary: primary
                        .as_ref()
                        .is_some_and(|p| p.position() == monitor.position()),
                }
            })
            .collect()
    }

    fn create_browser(&mut self, request: &BrowserWindowRequest) -> Result<(), HostError> {
        let url: tauri::Url = request
            .url
            .parse()
            .map_err(|e| HostError::Toolkit(format!("Invalid URL '{}': {}", request.url, e)))?;

        let app = self.app.clone();
        let mut builder =
            WebviewWindowBuilder::new(&self.app, BROWSER_WINDOW, WebviewUrl::External(url))
                .title(BROWSER_TITLE)
                .visible(false)
                .always_on_top(true)
                .resizable(true)
                .background_throttling(BackgroundThrottlingPolicy::Disabled)
                .on_document_title_changed(|window, title| {
                    // Native topmost looks the window up by the page title.
                    let title = title.trim();
                    if !title.is_empty() {
                        let _ = window.set_title(title);
                    }
                })
                .on_page_load(move |_webview, payload| {
                    if matches!(payload.event(), PageLoadEvent::Finished) {
                        let url = payload.url().to_string();
                        dispatch(&app, move |shell, _| shell.on_browser_page_loaded(&url));
                    }
                });
        if let Some(args) = &self.webview_args {
            builder = builder.additional_browser_args(args);
        }

        let window = builder.build()?;
        apply_bounds(&window, request.bounds)?;
        self.watch_browser(&window);
        Ok(())
    }

    fn show_browser(&mut self) -> Result<(), HostError> {
        let window = self.browser()?;
        window.show()?;
        window.set_focus()?;
        Ok(())
    }

    fn minimize_browser(&mut self) -> Result<(), HostError> {
        self.browser()?.minimize()?;
        Ok(())
    }

    fn restore_browser(&mut self) -> Result<(), HostError> {
        let window = self.browser()?;
        window.unminimize()?;
        window.show()?;
        window.set_focus()?;
        Ok(())
    }

    fn focus_browser(&mut self) -> Result<(), HostError> {
        self.browser()?.set_focus()?;
        Ok(())
    }

    fn close_browser(&mut self) -> Result<(), HostError> {
        self.browser()?.destroy()?;
        Ok(())
    }

    fn navigate_browser(&mut self, url: &str) -> Result<(), HostError> {
        let url: tauri::Url = url
            .parse()
            .map_err(|e| HostError::Toolkit(format!("Invalid URL '{}': {}", url, e)))?;
        self.browser()?.navigate(url)?;
        Ok(())
    }

    fn reload_browser(&mut self) -> Result<(), HostError> {
        self.browser()?.eval("window.location.reload();")?;
        Ok(())
    }

    fn set_browser_always_on_top(&mut self, enabled: bool) -> Result<(), HostError> {
        self.browser()?.set_always_on_top(enabled)?;
        Ok(())
    }

    fn set_browser_opacity(&mut self, opacity: f64) -> Result<(), HostError> {
        set_layered_opacity(&self.browser()?, opacity)
    }

    fn browser_title(&self) -> Option<String> {
        self.browser().ok()?.title().ok()
    }

    fn eval_in_browser(&mut self, script: &str) -> Result<(), HostError> {
        self.browser()?.eval(script)?;
        Ok(())
    }
}

impl EventSink for TauriHost {
    fn emit(&self, event: ShellEvent) {
        if let Err(e) = self.app.emit_to(MAIN_WINDOW, event.name(), event.payload()) {
            log::warn!("Failed to emit {}: {}", event.name(), e);
        }
    }
}

#[cfg(desktop)]
impl ShortcutRegistrar for TauriHost {
    fn unregister_all(&mut self) -> Result<(), HostError> {
        use tauri_plugin_global_shortcut::GlobalShortcutExt;

        self.app
            .global_shortcut()
            .unregister_all()
            .map_err(|e| HostError::Toolkit(e.to_string()))
    }

    fn register(&mut self, action: ShortcutAction, combination: &str) -> Result<(), HostError> {
        use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

        let shortcut =
            crate::settings::to_shortcut(combination).map_err(|reason| HostError::Shortcut {
                combination: combination.to_string(),
                reason,
            })?;

        self.app
            .global_shortcut()
            .on_shortcut(shortcut, move |app, _shortcut, event| {
                if event.state != ShortcutState::Pressed {
                    return;
                }
                let pressed_at = Instant::now();
                dispatch(app, move |shell, _| {
                    if let Err(e) = shell.handle_action(action, pressed_at) {
                        log::warn!("Shortcut {} failed: {}", action, e);
                    }
                });
            })
            .map_err(|e| HostError::Shortcut {
                combination: combination.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(not(desktop))]
impl ShortcutRegistrar for TauriHost {
    fn unregister_all(&mut self) -> Result<(), HostError> {
        Ok(())
    }

    fn register(&mut self, action: ShortcutAction, combination: &str) -> Result<(), HostError> {
        log::debug!("Global shortcuts unsupported; skipping {} ({})", action, combination);
        Ok(())
    }
}
