//! In-memory stand-ins for every collaborator of the shell.
//!
//! Each fake is a cheap `Clone` over shared state so a test keeps a handle
//! after boxing the fake into the shell.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::geometry::{Display, Rect};
use crate::host::{
    BrowserWindowRequest, EventSink, HostError, ShellEvent, ShortcutRegistrar, WindowHost,
};
use crate::native::{EntryPoints, HotkeyCallback, NativeAdapter, NativeBackend, WindowInfo};
use crate::scheduler::{DeferredTask, Scheduler, TaskKey};
use crate::settings::{seed_defaults, SettingsError, SettingsStore, ShellSettings, ShortcutAction};
use crate::shell::{Shell, ShellDeps};

// ============================================================================
// Settings store
// ============================================================================

#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, Value>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.lock().unwrap().insert(key.to_string(), value);
    }

    fn save(&self) -> Result<(), SettingsError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Window host
// ============================================================================

#[derive(Debug, Default)]
pub struct HostLog {
    pub displays: Vec<Display>,
    pub created: Vec<BrowserWindowRequest>,
    pub exists: bool,
    pub visible: bool,
    pub minimized: bool,
    pub always_on_top: bool,
    pub opacity_history: Vec<f64>,
    pub navigations: Vec<String>,
    pub scripts: Vec<String>,
    pub focus_requests: usize,
    pub reloads: usize,
    pub closes: usize,
    pub title: Option<String>,
    pub eval_error: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeWindowHost(pub Arc<Mutex<HostLog>>);

impl FakeWindowHost {
    pub fn with_displays(displays: Vec<Display>) -> Self {
        let host = Self::default();
        host.0.lock().unwrap().displays = displays;
        host
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, HostLog> {
        self.0.lock().unwrap()
    }

    pub fn live_opacity(&self) -> Option<f64> {
        self.log().opacity_history.last().copied()
    }

    fn browser(&self) -> Result<std::sync::MutexGuard<'_, HostLog>, HostError> {
        let log = self.0.lock().unwrap();
        if log.exists {
            Ok(log)
        } else {
            Err(HostError::MissingWindow(crate::host::BROWSER_WINDOW))
        }
    }
}

impl WindowHost for FakeWindowHost {
    fn displays(&self) -> Vec<Display> {
        self.log().displays.clone()
    }

    fn create_browser(&mut self, request: &BrowserWindowRequest) -> Result<(), HostError> {
        let mut log = self.log();
        log.created.push(request.clone());
        log.exists = true;
        log.visible = false;
        log.minimized = false;
        log.navigations.push(request.url.clone());
        Ok(())
    }

    fn show_browser(&mut self) -> Result<(), HostError> {
        self.browser()?.visible = true;
        Ok(())
    }

    fn minimize_browser(&mut self) -> Result<(), HostError> {
        self.browser()?.minimized = true;
        Ok(())
    }

    fn restore_browser(&mut self) -> Result<(), HostError> {
        let mut log = self.browser()?;
        log.minimized = false;
        log.visible = true;
        log.focus_requests += 1;
        Ok(())
    }

    fn focus_browser(&mut self) -> Result<(), HostError> {
        self.browser()?.focus_requests += 1;
        Ok(())
    }

    fn close_browser(&mut self) -> Result<(), HostError> {
        let mut log = self.browser()?;
        log.exists = false;
        log.visible = false;
        log.closes += 1;
        Ok(())
    }

    fn navigate_browser(&mut self, url: &str) -> Result<(), HostError> {
        self.browser()?.navigations.push(url.to_string());
        Ok(())
    }

    fn reload_browser(&mut self) -> Result<(), HostError> {
        self.browser()?.reloads += 1;
        Ok(())
    }

    fn set_browser_always_on_top(&mut self, enabled: bool) -> Result<(), HostError> {
        self.browser()?.always_on_top = enabled;
        Ok(())
    }

    fn set_browser_opacity(&mut self, opacity: f64) -> Result<(), HostError> {
        self.browser()?.opacity_history.push(opacity);
        Ok(())
    }

    fn browser_title(&self) -> Option<String> {
        self.log().title.clone()
    }

    fn eval_in_browser(&mut self, script: &str) -> Result<(), HostError> {
        let mut log = self.browser()?;
        if let Some(reason) = log.eval_error.clone() {
            return Err(HostError::Toolkit(reason));
        }
        log.scripts.push(script.to_string());
        Ok(())
    }
}

// ============================================================================
// Shortcut registrar
// ============================================================================

#[derive(Debug, Default)]
pub struct RegistrarLog {
    pub registered: Vec<(ShortcutAction, String)>,
    pub unregister_all_calls: usize,
    /// Combinations "owned by another application".
    pub taken: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct FakeRegistrar(pub Arc<Mutex<RegistrarLog>>);

impl FakeRegistrar {
    pub fn log(&self) -> std::sync::MutexGuard<'_, RegistrarLog> {
        self.0.lock().unwrap()
    }

    pub fn actions(&self) -> Vec<ShortcutAction> {
        self.log().registered.iter().map(|(a, _)| *a).collect()
    }
}

impl ShortcutRegistrar for FakeRegistrar {
    fn unregister_all(&mut self) -> Result<(), HostError> {
        let mut log = self.log();
        log.registered.clear();
        log.unregister_all_calls += 1;
        Ok(())
    }

    fn register(&mut self, action: ShortcutAction, combination: &str) -> Result<(), HostError> {
        let mut log = self.log();
        if log.taken.contains(combination) {
            return Err(HostError::Shortcut {
                combination: combination.to_string(),
                reason: "already registered".to_string(),
            });
        }
        log.registered.push((action, combination.to_string()));
        Ok(())
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeEvents(pub Arc<Mutex<Vec<ShellEvent>>>);

impl FakeEvents {
    pub fn take(&self) -> Vec<ShellEvent> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl EventSink for FakeEvents {
    fn emit(&self, event: ShellEvent) {
        self.0.lock().unwrap().push(event);
    }
}

// ============================================================================
// Scheduler
// ============================================================================

#[derive(Debug, Default)]
struct ManualQueue {
    now: Duration,
    tasks: Vec<(Duration, DeferredTask)>,
}

/// Scheduler driven by explicit time steps.
#[derive(Clone, Default)]
pub struct ManualScheduler(Arc<Mutex<ManualQueue>>);

impl ManualScheduler {
    /// Move time forward and return the tasks that came due, in due order.
    pub fn advance(&self, by: Duration) -> Vec<DeferredTask> {
        let mut queue = self.0.lock().unwrap();
        queue.now += by;
        let now = queue.now;
        let mut due: Vec<(Duration, DeferredTask)> = Vec::new();
        queue.tasks.retain(|(at, task)| {
            if *at <= now {
                due.push((*at, task.clone()));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, task)| task).collect()
    }

    pub fn pending(&self) -> Vec<DeferredTask> {
        self.0
            .lock()
            .unwrap()
            .tasks
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, task: DeferredTask, delay: Duration) {
        let mut queue = self.0.lock().unwrap();
        let key = task.key();
        queue.tasks.retain(|(_, t)| t.key() != key);
        let at = queue.now + delay;
        queue.tasks.push((at, task));
    }

    fn cancel(&mut self, key: TaskKey) {
        self.0.lock().unwrap().tasks.retain(|(_, t)| t.key() != key);
    }

    fn is_pending(&self, key: TaskKey) -> bool {
        self.0.lock().unwrap().tasks.iter().any(|(_, t)| t.key() == key)
    }
}

// ============================================================================
// Native backend
// ============================================================================

/// Records every entry point it is asked to run.
#[derive(Clone)]
pub struct FakeNativeBackend {
    entry_points: EntryPoints,
    calls: Arc<Mutex<Vec<String>>>,
    hotkeys: Arc<Mutex<Vec<(String, String)>>>,
    callback: Arc<Mutex<Option<HotkeyCallback>>>,
    failure: Arc<Mutex<Option<String>>>,
    /// Combinations the OS refuses to register.
    rejected: Arc<Mutex<Vec<String>>>,
    /// Titles of windows that "exist" for monitoring purposes.
    windows: Arc<Mutex<Vec<String>>>,
}

impl Default for FakeNativeBackend {
    fn default() -> Self {
        Self::with_entry_points(EntryPoints::all())
    }
}

impl FakeNativeBackend {
    pub fn with_entry_points(entry_points: EntryPoints) -> Self {
        Self {
            entry_points,
            calls: Arc::default(),
            hotkeys: Arc::default(),
            callback: Arc::default(),
            failure: Arc::default(),
            rejected: Arc::default(),
            windows: Arc::default(),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }

    pub fn hotkeys(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        self.hotkeys.clone()
    }

    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn reject_combination(&self, combination: &str) {
        self.rejected.lock().unwrap().push(combination.to_string());
    }

    pub fn add_window(&self, title: &str) {
        self.windows.lock().unwrap().push(title.to_string());
    }

    /// Simulate the OS reporting a hotkey press.
    pub fn press(&self, action: &str) {
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(action);
        }
    }

    fn record(&self, call: impl Into<String>) -> Result<(), String> {
        self.calls.lock().unwrap().push(call.into());
        match self.failure.lock().unwrap().clone() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    fn has_window(&self, title: &str) -> bool {
        self.windows
            .lock()
            .unwrap()
            .iter()
            .any(|window| window.contains(title))
    }
}

impl NativeBackend for FakeNativeBackend {
    fn entry_points(&self) -> EntryPoints {
        self.entry_points
    }

    fn install_hook(&mut self, callback: HotkeyCallback) -> Result<(), String> {
        self.record("installHook")?;
        *self.callback.lock().unwrap() = Some(callback);
        Ok(())
    }

    fn set_hotkeys(&mut self, bindings: &[(String, String)]) -> Result<Vec<String>, String> {
        self.record("registerShortcuts")?;
        let rejected = self.rejected.lock().unwrap().clone();
        let accepted: Vec<(String, String)> = bindings
            .iter()
            .filter(|(combination, _)| !rejected.contains(combination))
            .cloned()
            .collect();
        let actions = accepted.iter().map(|(_, action)| action.clone()).collect();
        *self.hotkeys.lock().unwrap() = accepted;
        Ok(actions)
    }

    fn uninstall_hook(&mut self) -> Result<(), String> {
        self.record("uninstallHook")?;
        *self.callback.lock().unwrap() = None;
        self.hotkeys.lock().unwrap().clear();
        Ok(())
    }

    fn start_monitoring(&mut self, title: &str) -> Result<bool, String> {
        self.record(format!("startMonitoring:{}", title))?;
        Ok(self.has_window(title))
    }

    fn stop_monitoring(&mut self, title: Option<&str>) -> Result<bool, String> {
        self.record(format!("stopMonitoring:{}", title.unwrap_or("*")))?;
        Ok(true)
    }

    fn set_topmost(&mut self, title: &str, _enabled: bool) -> Result<bool, String> {
        self.record(format!("setTopmost:{}", title))?;
        Ok(self.has_window(title))
    }

    fn visible_windows(&self) -> Result<Vec<WindowInfo>, String> {
        self.record("listVisibleWindows")?;
        Ok(self
            .windows
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, title)| WindowInfo {
                title: title.clone(),
                handle: i as isize + 1,
            })
            .collect())
    }

    fn bring_to_foreground(&mut self, title: &str) -> Result<bool, String> {
        self.record(format!("bringToForeground:{}", title))?;
        Ok(self.has_window(title))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn display(x: i32, y: i32, width: u32, height: u32, is_primary: bool) -> Display {
    Display {
        work_area: Rect {
            x,
            y,
            width,
            height,
        },
        is_primary,
    }
}

/// A shell wired to fakes, plus handles on each fake.
pub struct Harness {
    pub shell: Shell,
    pub host: FakeWindowHost,
    pub registrar: FakeRegistrar,
    pub events: FakeEvents,
    pub scheduler: ManualScheduler,
    pub store: MemoryStore,
    pub start: Instant,
}

impl Harness {
    /// 1920x1040 primary work area, empty store, no native add-on.
    pub fn new() -> Self {
        Self::build(MemoryStore::default(), None)
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self::build(store, None)
    }

    pub fn with_native(backend: FakeNativeBackend) -> Self {
        Self::build(MemoryStore::default(), Some(Box::new(backend)))
    }

    pub fn build(store: MemoryStore, backend: Option<Box<dyn NativeBackend>>) -> Self {
        seed_defaults(&store).unwrap();
        let settings = ShellSettings::load(&store);

        let host = FakeWindowHost::with_displays(vec![display(0, 0, 1920, 1040, true)]);
        let registrar = FakeRegistrar::default();
        let events = FakeEvents::default();
        let scheduler = ManualScheduler::default();

        let shell = Shell::new(
            ShellDeps {
                host: Box::new(host.clone()),
                registrar: Box::new(registrar.clone()),
                events: Box::new(events.clone()),
                scheduler: Box::new(scheduler.clone()),
                store: Box::new(store.clone()),
                native: NativeAdapter::new(backend),
            },
            settings,
        );

        Self {
            shell,
            host,
            registrar,
            events,
            scheduler,
            store,
            start: Instant::now(),
        }
    }

    /// A point in simulated time, `ms` after the harness was built.
    pub fn at(&self, ms: u64) -> Instant {
        self.start + Duration::from_millis(ms)
    }

    /// Advance the scheduler and run whatever came due.
    pub fn advance(&mut self, ms: u64) {
        for task in self.scheduler.advance(Duration::from_millis(ms)) {
            self.shell.run_deferred(task);
        }
    }

    /// Toggle the browser into existence and finish loading its page.
    pub fn open_browser(&mut self) {
        self.shell.toggle_browser(self.at(0)).unwrap();
        let url = self.shell.settings().last_url.clone();
        self.shell.on_browser_page_loaded(&url);
    }
}
