//! Commands touching windows outside the app: the system browser and other
//! top-level windows seen by the native add-on.

use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;

use crate::native::WindowInfo;
use crate::state::{dispatch, SharedShell};

fn is_external_link(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    ["https://", "http://", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// Open a link from the Control Window in the system browser.
#[tauri::command]
pub fn open_external_link(app: AppHandle, url: String) -> Result<(), String> {
    if !is_external_link(&url) {
        log::warn!("Refusing to open external link: {}", url);
        return Err(format!("Unsupported link: {}", url));
    }
    app.opener()
        .open_url(url.trim(), None::<&str>)
        .map_err(|e| format!("Failed to open {}: {}", url, e))
}

/// Visible top-level windows; empty when the native add-on is missing.
#[tauri::command]
pub async fn list_visible_windows(shell: State<'_, SharedShell>) -> Result<Vec<WindowInfo>, String> {
    Ok(shell.lock().visible_windows())
}

#[tauri::command]
pub fn bring_window_to_foreground(app: AppHandle, title: String) {
    dispatch(&app, move |shell, _| {
        if !shell.bring_window_to_foreground(&title) {
            log::info!("No window titled '{}' to bring forward", title);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_links_limited_to_web_and_mail() {
        assert!(is_external_link("https://github.com"));
        assert!(is_external_link("MAILTO:someone@example.com"));
        assert!(!is_external_link("file:///etc/passwd"));
        assert!(!is_external_link("javascript:alert(1)"));
    }
}
