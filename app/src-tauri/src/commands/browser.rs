use std::time::Instant;

use tauri::{AppHandle, WebviewWindow};

use crate::host::BROWSER_WINDOW;
use crate::shell::{is_web_url, MediaReport};
use crate::state::dispatch;

/// Show, hide or create the browser window.
#[tauri::command]
pub fn toggle_browser(app: AppHandle) {
    let requested_at = Instant::now();
    dispatch(&app, move |shell, _| {
        if let Err(e) = shell.toggle_browser(requested_at) {
            log::warn!("Toggle browser failed: {}", e);
        }
    });
}

/// Absolute opacity from the settings slider; clamped by the shell.
#[tauri::command]
pub fn adjust_opacity(app: AppHandle, opacity: f64) -> Result<(), String> {
    if !opacity.is_finite() {
        return Err(format!("Invalid opacity: {}", opacity));
    }
    dispatch(&app, move |shell, _| shell.set_opacity(opacity));
    Ok(())
}

#[tauri::command]
pub fn navigate_browser(app: AppHandle, url: String) -> Result<(), String> {
    if !is_web_url(&url) {
        return Err(format!("Only http(s) pages can be opened: {}", url));
    }
    dispatch(&app, move |shell, _| {
        if let Err(e) = shell.navigate_browser(&url) {
            log::warn!("Navigation to {} failed: {}", url, e);
        }
    });
    Ok(())
}

#[tauri::command]
pub fn reload_browser(app: AppHandle) {
    dispatch(&app, |shell, _| {
        if let Err(e) = shell.reload_browser() {
            log::warn!("Reload failed: {}", e);
        }
    });
}

/// Result of an injected media script. Only accepted from the browser window.
#[tauri::command]
pub fn report_media_outcome(
    app: AppHandle,
    window: WebviewWindow,
    report: MediaReport,
) -> Result<(), String> {
    if window.label() != BROWSER_WINDOW {
        log::warn!(
            "Ignoring media report from unexpected window '{}'",
            window.label()
        );
        return Err("Media reports are only accepted from the browser window".to_string());
    }
    dispatch(&app, move |shell, _| {
        shell.complete_media_action(report.request_id, report.outcome())
    });
    Ok(())
}
