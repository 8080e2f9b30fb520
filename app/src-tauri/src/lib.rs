use std::sync::Arc;
use std::time::Instant;

use tauri::{
    menu::{Menu, MenuItem, Submenu},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    AppHandle, Manager, WebviewUrl, WebviewWindowBuilder, WindowEvent,
};

mod commands;
mod geometry;
mod host;
mod native;
mod scheduler;
mod settings;
mod shell;
mod state;
mod tauri_host;

#[cfg(test)]
mod tests;

use geometry::resolve_bounds;
use host::{View, WindowHost, WindowKind, BROWSER_TITLE, CONTROL_TITLE, MAIN_WINDOW};
use native::NativeAdapter;
use scheduler::{TaskRunner, TokioScheduler};
use settings::{ShellSettings, TauriSettingsStore, DEFAULT_MAIN_BOUNDS};
use shell::{Shell, ShellDeps};
use state::{dispatch, SharedShell, ShellDispatcher};
use tauri_host::{apply_bounds, watch_geometry, webview_args, TauriHost};

/// Tear the shell down, then leave.
fn quit(app: &AppHandle) {
    dispatch(app, |shell, app| {
        shell.on_control_window_closed();
        app.exit(0);
    });
}

fn toggle_browser(app: &AppHandle) {
    let requested_at = Instant::now();
    dispatch(app, move |shell, _| {
        if let Err(e) = shell.toggle_browser(requested_at) {
            log::warn!("Toggle browser failed: {}", e);
        }
    });
}

fn show_main_window(app: &AppHandle) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW) {
        let _ = window.unminimize();
        let _ = window.show();
        let _ = window.set_focus();
    }
}

fn show_view(app: &AppHandle, view: View) {
    show_main_window(app);
    dispatch(app, move |shell, _| shell.show_view(view));
}

fn handle_menu_event(app: &AppHandle, id: &str) {
    match id {
        "quit" => quit(app),
        "toggle-browser" => toggle_browser(app),
        "reload-browser" => dispatch(app, |shell, _| {
            if let Err(e) = shell.reload_browser() {
                log::warn!("Reload failed: {}", e);
            }
        }),
        "shortcut-settings" => show_view(app, View::Settings),
        "about" => show_view(app, View::About),
        #[cfg(debug_assertions)]
        "devtools" => open_devtools(app),
        _ => {}
    }
}

/// Inspector for the focused window, the Control Window otherwise.
#[cfg(debug_assertions)]
fn open_devtools(app: &AppHandle) {
    let windows = app.webview_windows();
    let target = windows
        .values()
        .find(|window| window.is_focused().unwrap_or(false))
        .or_else(|| windows.get(MAIN_WINDOW));
    if let Some(window) = target {
        window.open_devtools();
    }
}

fn setup_menu(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let quit_item = MenuItem::with_id(app, "quit", "Quit", true, Some("CmdOrCtrl+Q"))?;
    let toggle_item =
        MenuItem::with_id(app, "toggle-browser", "Show/Hide Browser", true, None::<&str>)?;
    let reload_item = MenuItem::with_id(app, "reload-browser", "Reload", true, Some("CmdOrCtrl+R"))?;
    let shortcuts_item = MenuItem::with_id(
        app,
        "shortcut-settings",
        "Shortcut Settings",
        true,
        None::<&str>,
    )?;
    let about_item = MenuItem::with_id(app, "about", "About", true, None::<&str>)?;

    let file_menu = Submenu::with_items(app, "File", true, &[&quit_item])?;
    let view_menu = Submenu::with_items(app, "View", true, &[&toggle_item, &reload_item])?;
    #[cfg(debug_assertions)]
    view_menu.append(&MenuItem::with_id(
        app,
        "devtools",
        "Developer Tools",
        true,
        Some("F12"),
    )?)?;
    let settings_menu = Submenu::with_items(app, "Settings", true, &[&shortcuts_item])?;
    let help_menu = Submenu::with_items(app, "Help", true, &[&about_item])?;
    let menu = Menu::with_items(app, &[&file_menu, &view_menu, &settings_menu, &help_menu])?;

    app.set_menu(menu)?;
    app.on_menu_event(|app, event| handle_menu_event(app, event.id.as_ref()));
    Ok(())
}

fn setup_tray(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let show_item = MenuItem::with_id(app, "tray-show", "Show Window", true, None::<&str>)?;
    let browser_item =
        MenuItem::with_id(app, "tray-toggle-browser", "Show/Hide Browser", true, None::<&str>)?;
    let quit_item = MenuItem::with_id(app, "tray-quit", "Quit", true, None::<&str>)?;
    let menu = Menu::with_items(app, &[&show_item, &browser_item, &quit_item])?;

    let icon = tauri::image::Image::from_bytes(include_bytes!("../icons/32x32.png"))?;

    let _tray = TrayIconBuilder::new()
        .icon(icon)
        .tooltip(BROWSER_TITLE)
        .menu(&menu)
        .show_menu_on_left_click(false)
        .on_menu_event(|app, event| match event.id.as_ref() {
            "tray-show" => show_main_window(app),
            "tray-toggle-browser" => toggle_browser(app),
            "tray-quit" => quit(app),
            _ => {}
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                let app = tray.app_handle();
                if let Some(window) = app.get_webview_window(MAIN_WINDOW) {
                    if window.is_visible().unwrap_or(false) {
                        let _ = window.hide();
                    } else {
                        show_main_window(app);
                    }
                }
            }
        })
        .build(app)?;

    Ok(())
}

/// Build the Control Window at its remembered bounds. Closing it ends the app.
fn create_main_window(
    app: &AppHandle,
    settings: &ShellSettings,
    host: &TauriHost,
) -> Result<(), Box<dyn std::error::Error>> {
    let bounds = resolve_bounds(
        settings.main_window_bounds,
        DEFAULT_MAIN_BOUNDS,
        &host.displays(),
    );

    let mut builder =
        WebviewWindowBuilder::new(app, MAIN_WINDOW, WebviewUrl::App("index.html".into()))
            .title(CONTROL_TITLE)
            .visible(false);
    if let Some(args) = webview_args(settings.enable_gpu_acceleration) {
        builder = builder.additional_browser_args(&args);
    }
    let window = builder.build()?;
    apply_bounds(&window, bounds)?;
    window.show()?;

    watch_geometry(app, &window, WindowKind::Main);
    let app_for_close = app.clone();
    window.on_window_event(move |event| {
        if let WindowEvent::CloseRequested { .. } = event {
            log::info!("Control window closing");
            quit(&app_for_close);
        }
    });
    Ok(())
}

#[cfg(desktop)]
fn build_global_shortcut_plugin() -> tauri::plugin::TauriPlugin<tauri::Wry> {
    // Handlers are attached per shortcut once the shell exists.
    tauri_plugin_global_shortcut::Builder::new().build()
}

/// Route native hotkey presses into the shell, then register every binding.
fn start_shortcuts(app: &AppHandle) {
    dispatch(app, |shell, app| {
        let hotkey_app = app.clone();
        let installed = shell.install_native_hook(Arc::new(move |action: &str| {
            let action = action.to_string();
            let pressed_at = Instant::now();
            dispatch(&hotkey_app, move |shell, _| {
                if let Err(e) = shell.handle_named_action(&action, pressed_at) {
                    log::warn!("Native hotkey {} failed: {}", action, e);
                }
            });
        }));
        log::info!(
            "Global shortcuts via {}",
            if installed { "native hook and toolkit" } else { "toolkit" }
        );
        shell.register_shortcuts();
    });
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut builder = tauri::Builder::default();

    #[cfg(desktop)]
    {
        builder = builder.plugin(build_global_shortcut_plugin());
    }

    builder
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_store::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            commands::browser::toggle_browser,
            commands::browser::adjust_opacity,
            commands::browser::navigate_browser,
            commands::browser::reload_browser,
            commands::browser::report_media_outcome,
            commands::settings::update_shortcuts,
            commands::settings::get_initial_settings,
            commands::settings::set_gpu_acceleration,
            commands::windows::open_external_link,
            commands::windows::list_visible_windows,
            commands::windows::bring_window_to_foreground,
        ])
        .setup(|app| {
            let handle = app.handle().clone();

            // Seed before reading so UI and backend agree on effective settings.
            let store = TauriSettingsStore::open(&handle)?;
            settings::seed_defaults(&store)?;
            let loaded = ShellSettings::load(&store);

            let host = TauriHost::new(&handle, loaded.enable_gpu_acceleration);
            create_main_window(&handle, &loaded, &host)?;

            app.manage(ShellDispatcher::start(&handle));

            let runner_app = handle.clone();
            let runner: TaskRunner = Arc::new(move |task| {
                dispatch(&runner_app, move |shell, _| shell.run_deferred(task));
            });
            let runtime =
                tauri::async_runtime::block_on(async { tokio::runtime::Handle::current() });

            let shell = Shell::new(
                ShellDeps {
                    host: Box::new(host.clone()),
                    registrar: Box::new(host.clone()),
                    events: Box::new(host),
                    scheduler: Box::new(TokioScheduler::new(runtime, runner)),
                    store: Box::new(store),
                    native: NativeAdapter::new(native::platform_backend()),
                },
                loaded,
            );
            app.manage(SharedShell::new(shell));

            setup_menu(&handle)?;
            setup_tray(&handle)?;
            start_shortcuts(&handle);

            log::info!("Teyvat Browser started");
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
