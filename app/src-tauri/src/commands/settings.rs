use std::collections::BTreeMap;

use tauri::{AppHandle, State};

use crate::host::InitialSettings;
use crate::settings::ShortcutBindings;
use crate::state::{dispatch, SharedShell};

/// Replace all shortcut bindings (action name → combination, "" = unbound).
/// Rejected whole when two actions share a combination.
#[tauri::command]
pub fn update_shortcuts(app: AppHandle, shortcuts: BTreeMap<String, String>) -> Result<(), String> {
    let bindings = ShortcutBindings::from_raw(shortcuts);
    if let Some(conflict) = bindings.find_conflict() {
        log::info!("Rejected shortcut update: {}", conflict);
        return Err(conflict.to_string());
    }

    dispatch(&app, move |shell, _| {
        if let Err(e) = shell.update_shortcuts(bindings) {
            log::warn!("Failed to save shortcuts: {}", e);
        }
    });
    Ok(())
}

/// Current settings for the Control Window. Also pushed as an
/// `initial-settings` event so every listener refreshes.
#[tauri::command]
pub async fn get_initial_settings(shell: State<'_, SharedShell>) -> Result<InitialSettings, String> {
    Ok(shell.lock().emit_initial_settings())
}

#[tauri::command]
pub fn set_gpu_acceleration(app: AppHandle, enabled: bool) {
    dispatch(&app, move |shell, _| {
        if let Err(e) = shell.set_gpu_acceleration(enabled) {
            log::warn!("Failed to save GPU acceleration setting: {}", e);
        }
    });
}
