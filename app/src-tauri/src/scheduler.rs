//! Cancellable delayed tasks.
//!
//! The shell never sleeps or holds timers itself; it asks a [`Scheduler`] to
//! deliver a [`DeferredTask`] later and gets it back through
//! `Shell::run_deferred`. At most one task per [`TaskKey`] is pending:
//! scheduling again replaces (and so debounces) the earlier one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::host::WindowKind;

/// Interactive drags emit a burst of move/resize events; bounds are written
/// once they stop for this long.
pub const BOUNDS_PERSIST_DELAY: Duration = Duration::from_millis(500);

/// Slider drags emit a value per step; the last one is written after this.
pub const OPACITY_PERSIST_DELAY: Duration = Duration::from_millis(500);

/// Lets the page title settle before looking the window up by title.
pub const ADVANCED_TOPMOST_DELAY: Duration = Duration::from_millis(1000);

pub const ADVANCED_TOPMOST_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// The browser window is shown even if its page never finishes loading.
pub const REVEAL_FALLBACK_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKey {
    PersistBounds(WindowKind),
    PersistOpacity,
    AdvancedTopmost,
    RevealBrowser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    PersistBounds(WindowKind),
    PersistOpacity,
    AdvancedTopmost { attempt: u32 },
    RevealBrowser,
}

impl DeferredTask {
    pub fn key(&self) -> TaskKey {
        match self {
            Self::PersistBounds(kind) => TaskKey::PersistBounds(*kind),
            Self::PersistOpacity => TaskKey::PersistOpacity,
            Self::AdvancedTopmost { .. } => TaskKey::AdvancedTopmost,
            Self::RevealBrowser => TaskKey::RevealBrowser,
        }
    }
}

pub trait Scheduler: Send {
    /// Deliver `task` after `delay`, replacing any pending task with the same key.
    fn schedule(&mut self, task: DeferredTask, delay: Duration);
    fn cancel(&mut self, key: TaskKey);
    fn is_pending(&self, key: TaskKey) -> bool;
}

/// Receives due tasks. In the app this hops back onto the main thread.
pub type TaskRunner = Arc<dyn Fn(DeferredTask) + Send + Sync>;

/// Timers on a tokio runtime, cancelled through per-key tokens.
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
    runner: TaskRunner,
    pending: HashMap<TaskKey, CancellationToken>,
}

impl TokioScheduler {
    pub fn new(runtime: tokio::runtime::Handle, runner: TaskRunner) -> Self {
        Self {
            runtime,
            runner,
            pending: HashMap::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, task: DeferredTask, delay: Duration) {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.insert(task.key(), token.clone()) {
            previous.cancel();
        }

        let runner = self.runner.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    // Marks the key as no longer pending.
                    token.cancel();
                    runner(task);
                }
            }
        });
    }

    fn cancel(&mut self, key: TaskKey) {
        if let Some(token) = self.pending.remove(&key) {
            token.cancel();
        }
    }

    fn is_pending(&self, key: TaskKey) -> bool {
        self.pending
            .get(&key)
            .is_some_and(|token| !token.is_cancelled())
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for token in self.pending.values() {
            token.cancel();
        }
    }
}
