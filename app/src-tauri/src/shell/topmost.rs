use super::{BrowserPhase, Shell};
use crate::host::{BROWSER_TITLE, CONTROL_TITLE};
use crate::scheduler::{DeferredTask, ADVANCED_TOPMOST_RETRY_DELAY};

/// Attempts at native monitoring before settling for toolkit topmost.
pub const ADVANCED_TOPMOST_ATTEMPTS: u32 = 3;

/// Titles the browser window is known to carry while the page settles.
pub const FALLBACK_TITLES: [&str; 3] = ["哔哩哔哩", "bilibili", BROWSER_TITLE];

/// Ordered, de-duplicated titles to look the browser window up by: its
/// current title first, then the known fallbacks. A title that would also
/// match the Control Window is never offered.
pub fn title_candidates(current: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    let titles = current
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .into_iter()
        .chain(FALLBACK_TITLES);
    for title in titles {
        if CONTROL_TITLE.contains(title) || title.contains(CONTROL_TITLE) {
            continue;
        }
        if !candidates.iter().any(|c| c == title) {
            candidates.push(title.to_string());
        }
    }
    candidates
}

impl Shell {
    /// Toolkit-level always-on-top.
    pub(super) fn apply_basic_topmost(&mut self) {
        if let Err(e) = self.host.set_browser_always_on_top(true) {
            log::warn!("Failed to set browser window always on top: {}", e);
        }
    }

    /// One round of native topmost monitoring against every title candidate.
    pub(super) fn attempt_advanced_topmost(&mut self, attempt: u32) {
        if !matches!(
            self.state.phase,
            BrowserPhase::Visible | BrowserPhase::Minimized
        ) {
            return;
        }
        if !self.native.is_available() {
            self.apply_basic_topmost();
            return;
        }

        let candidates = title_candidates(self.host.browser_title().as_deref());
        for title in &candidates {
            if self.native.start_monitoring(title) {
                log::info!(
                    "Advanced topmost active for '{}' (attempt {})",
                    title,
                    attempt
                );
                self.state.monitored_title = Some(title.clone());
                return;
            }
        }

        if attempt < ADVANCED_TOPMOST_ATTEMPTS {
            log::debug!(
                "Advanced topmost attempt {} found no window among {:?}",
                attempt,
                candidates
            );
            self.schedule(
                DeferredTask::AdvancedTopmost {
                    attempt: attempt + 1,
                },
                ADVANCED_TOPMOST_RETRY_DELAY,
            );
        } else {
            log::warn!(
                "Advanced topmost gave up after {} attempts; using basic topmost",
                attempt
            );
            self.apply_basic_topmost();
        }
    }
}
