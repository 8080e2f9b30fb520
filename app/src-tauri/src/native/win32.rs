// Win32 add-on backend.
//
// Hotkeys are registered with RegisterHotKey on a dedicated thread that owns
// its message queue; topmost enforcement finds windows by title substring and
// keeps a monitored window near the top of the z-order from a polling thread.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use windows::core::BOOL;
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{RegisterHotKey, UnregisterHotKey};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetMessageW, GetTopWindow, GetWindow, GetWindowTextLengthW, GetWindowTextW,
    IsIconic, IsWindow, IsWindowVisible, PeekMessageW, PostThreadMessageW, SetForegroundWindow,
    SetWindowPos, ShowWindow, GW_HWNDNEXT, HWND_NOTOPMOST, HWND_TOPMOST, MSG, PM_NOREMOVE,
    SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SW_RESTORE, WM_HOTKEY, WM_QUIT,
};

use super::keymap::{parse_chord, KeyChord};
use super::{EntryPoints, HotkeyCallback, NativeBackend, WindowInfo};

const MONITOR_INTERVAL: Duration = Duration::from_millis(500);

/// A monitored window counts as "on top" while it is among this many windows
/// at the head of the z-order.
const TOP_WINDOWS_CHECKED: usize = 10;

const TOPMOST_ATTEMPTS: usize = 3;

// ============================================================================
// Window lookup
// ============================================================================

fn window_title(hwnd: HWND) -> Option<String> {
    unsafe {
        let len = GetWindowTextLengthW(hwnd);
        if len == 0 {
            return None;
        }
        let mut buf: Vec<u16> = vec![0; (len as usize) + 1];
        let copied = GetWindowTextW(hwnd, &mut buf);
        if copied == 0 {
            return None;
        }
        let title = String::from_utf16_lossy(&buf[..copied as usize])
            .trim()
            .to_string();
        (!title.is_empty()).then_some(title)
    }
}

fn visible_windows() -> Vec<(HWND, String)> {
    unsafe extern "system" fn enum_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
        // Safety: caller passes a valid mutable Vec pointer via LPARAM.
        let found = unsafe { &mut *(lparam.0 as *mut Vec<(HWND, String)>) };
        if unsafe { IsWindowVisible(hwnd) }.as_bool() {
            if let Some(title) = window_title(hwnd) {
                found.push((hwnd, title));
            }
        }
        BOOL(1)
    }

    let mut found: Vec<(HWND, String)> = Vec::new();
    unsafe {
        let _ = EnumWindows(Some(enum_proc), LPARAM((&mut found as *mut _) as isize));
    }
    found
}

/// First visible top-level window whose title contains `needle`.
fn find_window(needle: &str) -> Option<HWND> {
    visible_windows()
        .into_iter()
        .find(|(_, title)| title.contains(needle))
        .map(|(hwnd, _)| hwnd)
}

fn set_z_order(hwnd: HWND, topmost: bool) -> bool {
    let insert_after = if topmost { HWND_TOPMOST } else { HWND_NOTOPMOST };
    (0..TOPMOST_ATTEMPTS).any(|_| unsafe {
        SetWindowPos(
            hwnd,
            Some(insert_after),
            0,
            0,
            0,
            0,
            SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
        )
        .is_ok()
    })
}

fn is_near_top(hwnd: HWND) -> bool {
    unsafe {
        let mut current = GetTopWindow(None).ok();
        for _ in 0..TOP_WINDOWS_CHECKED {
            match current {
                Some(w) if w == hwnd => return true,
                Some(w) => current = GetWindow(w, GW_HWNDNEXT).ok(),
                None => return false,
            }
        }
        false
    }
}

// HWND wraps a raw pointer and is not Send; threads carry the numeric handle.
fn to_raw(hwnd: HWND) -> isize {
    hwnd.0 as isize
}

fn from_raw(raw: isize) -> HWND {
    HWND(raw as *mut c_void)
}

// ============================================================================
// Hotkey thread
// ============================================================================

struct HotkeyThread {
    thread_id: u32,
    join: JoinHandle<()>,
}

impl HotkeyThread {
    /// Start the message loop and register `chords` on it. Returns the thread
    /// and the actions whose hotkey the OS accepted.
    fn spawn(
        chords: Vec<(KeyChord, String)>,
        callback: HotkeyCallback,
    ) -> Result<(Self, Vec<String>), String> {
        let (ready_tx, ready_rx) = mpsc::channel();

        let join = std::thread::Builder::new()
            .name("native-hotkeys".into())
            .spawn(move || unsafe {
                let mut msg = MSG::default();
                // Force creation of this thread's message queue before anyone posts to it.
                let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);

                let mut actions: HashMap<i32, String> = HashMap::new();
                for (index, (chord, action)) in chords.into_iter().enumerate() {
                    let id = index as i32 + 1;
                    match RegisterHotKey(None, id, chord.modifiers, chord.vk.0 as u32) {
                        Ok(()) => {
                            actions.insert(id, action);
                        }
                        Err(e) => log::warn!("Native hotkey for {} not registered: {}", action, e),
                    }
                }
                let registered: Vec<String> = actions.values().cloned().collect();
                let _ = ready_tx.send((GetCurrentThreadId(), registered));

                while GetMessageW(&mut msg, None, 0, 0).as_bool() {
                    if msg.message == WM_HOTKEY {
                        if let Some(action) = actions.get(&(msg.wParam.0 as i32)) {
                            callback(action);
                        }
                    }
                }

                for id in actions.keys() {
                    let _ = UnregisterHotKey(None, *id);
                }
            })
            .map_err(|e| format!("Failed to spawn hotkey thread: {}", e))?;

        let (thread_id, registered) = ready_rx
            .recv()
            .map_err(|_| "Hotkey thread exited during startup".to_string())?;
        Ok((Self { thread_id, join }, registered))
    }

    fn stop(self) {
        unsafe {
            let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
        if self.join.join().is_err() {
            log::warn!("Native hotkey thread panicked");
        }
    }
}

// ============================================================================
// Topmost monitor
// ============================================================================

struct Monitor {
    title: String,
    active: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl Monitor {
    fn spawn(title: &str, hwnd: HWND) -> Result<Self, String> {
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();
        let raw = to_raw(hwnd);

        let join = std::thread::Builder::new()
            .name("native-topmost".into())
            .spawn(move || {
                let hwnd = from_raw(raw);
                while flag.load(Ordering::Relaxed) && unsafe { IsWindow(Some(hwnd)) }.as_bool() {
                    if !is_near_top(hwnd) {
                        set_z_order(hwnd, true);
                    }
                    std::thread::park_timeout(MONITOR_INTERVAL);
                }
                log::debug!("Topmost monitor stopped");
            })
            .map_err(|e| format!("Failed to spawn monitor thread: {}", e))?;

        Ok(Self {
            title: title.to_string(),
            active,
            join,
        })
    }

    fn stop(self) {
        self.active.store(false, Ordering::Relaxed);
        self.join.thread().unpark();
        let _ = self.join.join();
    }
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Default)]
pub struct Win32Backend {
    callback: Option<HotkeyCallback>,
    hotkeys: Option<HotkeyThread>,
    monitor: Option<Monitor>,
}

impl Win32Backend {
    fn stop_hotkeys(&mut self) {
        if let Some(thread) = self.hotkeys.take() {
            thread.stop();
        }
    }
}

impl NativeBackend for Win32Backend {
    fn entry_points(&self) -> EntryPoints {
        EntryPoints::all()
    }

    fn install_hook(&mut self, callback: HotkeyCallback) -> Result<(), String> {
        self.callback = Some(callback);
        Ok(())
    }

    fn set_hotkeys(&mut self, bindings: &[(String, String)]) -> Result<Vec<String>, String> {
        let callback = self
            .callback
            .clone()
            .ok_or_else(|| "hook not installed".to_string())?;
        self.stop_hotkeys();

        let mut chords = Vec::with_capacity(bindings.len());
        for (combination, action) in bindings {
            match parse_chord(combination) {
                Ok(chord) => chords.push((chord, action.clone())),
                Err(e) => log::warn!("No native hotkey for {}: {}", action, e),
            }
        }
        if chords.is_empty() {
            return Ok(Vec::new());
        }

        let (thread, registered) = HotkeyThread::spawn(chords, callback)?;
        self.hotkeys = Some(thread);
        Ok(registered)
    }

    fn uninstall_hook(&mut self) -> Result<(), String> {
        self.stop_hotkeys();
        self.callback = None;
        Ok(())
    }

    fn start_monitoring(&mut self, title: &str) -> Result<bool, String> {
        let Some(hwnd) = find_window(title) else {
            return Ok(false);
        };
        if let Some(previous) = self.monitor.take() {
            previous.stop();
        }
        set_z_order(hwnd, true);
        self.monitor = Some(Monitor::spawn(title, hwnd)?);
        log::info!("Monitoring topmost for window matching '{}'", title);
        Ok(true)
    }

    fn stop_monitoring(&mut self, title: Option<&str>) -> Result<bool, String> {
        let matches = self
            .monitor
            .as_ref()
            .is_some_and(|m| title.map_or(true, |t| m.title == t));
        if !matches {
            return Ok(false);
        }
        if let Some(monitor) = self.monitor.take() {
            let title = monitor.title.clone();
            monitor.stop();
            if let Some(hwnd) = find_window(&title) {
                set_z_order(hwnd, false);
            }
        }
        Ok(true)
    }

    fn set_topmost(&mut self, title: &str, enabled: bool) -> Result<bool, String> {
        Ok(find_window(title).is_some_and(|hwnd| set_z_order(hwnd, enabled)))
    }

    fn visible_windows(&self) -> Result<Vec<WindowInfo>, String> {
        Ok(visible_windows()
            .into_iter()
            .map(|(hwnd, title)| WindowInfo {
                title,
                handle: to_raw(hwnd),
            })
            .collect())
    }

    fn bring_to_foreground(&mut self, title: &str) -> Result<bool, String> {
        let Some(hwnd) = find_window(title) else {
            return Ok(false);
        };
        unsafe {
            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
            Ok(SetForegroundWindow(hwnd).as_bool())
        }
    }
}

impl Drop for Win32Backend {
    fn drop(&mut self) {
        self.stop_hotkeys();
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
    }
}
