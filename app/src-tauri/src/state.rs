use std::sync::{Arc, Mutex, MutexGuard};

use tauri::{AppHandle, Manager};
use tokio::sync::mpsc;

use crate::shell::Shell;

/// The shell as managed Tauri state.
#[derive(Clone)]
pub struct SharedShell(Arc<Mutex<Shell>>);

impl SharedShell {
    pub fn new(shell: Shell) -> Self {
        Self(Arc::new(Mutex::new(shell)))
    }

    /// Lock the shell. A panic in an earlier job must not wedge every later
    /// window event, so a poisoned lock is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Shell> {
        self.0.lock().unwrap_or_else(|poisoned| {
            log::error!("Shell lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }
}

type Job = Box<dyn FnOnce(&mut Shell, &AppHandle) + Send>;

/// Queue of work for the shell, drained on the main thread in FIFO order.
///
/// Window events, shortcut presses and timers all land here instead of
/// locking the shell in place: toolkit callbacks can fire while a shell
/// operation is still on the stack, and `run_on_main_thread` called from the
/// main thread runs inline.
pub struct ShellDispatcher {
    tx: mpsc::UnboundedSender<Job>,
}

impl ShellDispatcher {
    pub fn start(app: &AppHandle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let app = app.clone();
        tauri::async_runtime::spawn(async move {
            while let Some(job) = rx.recv().await {
                let handle = app.clone();
                if let Err(e) = app.run_on_main_thread(move || run_job(&handle, job)) {
                    log::warn!("Failed to reach the main thread: {}", e);
                }
            }
            log::debug!("Shell dispatcher stopped");
        });
        Self { tx }
    }

    fn send(&self, job: Job) {
        if self.tx.send(job).is_err() {
            log::debug!("Shell dispatcher closed; dropping job");
        }
    }
}

fn run_job(app: &AppHandle, job: Job) {
    let Some(shared) = app.try_state::<SharedShell>() else {
        log::debug!("Shell not ready; dropping job");
        return;
    };
    let mut shell = shared.lock();
    job(&mut shell, app);
}

/// Run `f` against the shell on the main thread, after everything queued
/// before it.
pub fn dispatch<F>(app: &AppHandle, f: F)
where
    F: FnOnce(&mut Shell, &AppHandle) + Send + 'static,
{
    match app.try_state::<ShellDispatcher>() {
        Some(dispatcher) => dispatcher.send(Box::new(f)),
        None => log::debug!("Dispatcher not started; dropping job"),
    }
}
