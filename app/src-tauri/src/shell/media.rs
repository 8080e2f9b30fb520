use std::collections::VecDeque;

use serde::Deserialize;
use uuid::Uuid;

use super::{BrowserPhase, Shell, ShellError};
use crate::host::ShellEvent;
use crate::settings::ShortcutAction;

/// Seconds moved by rewind/forward.
pub const SEEK_STEP_SECS: u32 = 5;

/// Unanswered requests kept around; the oldest is dropped beyond this.
const MAX_PENDING_ACTIONS: usize = 32;

/// Player control on the video site, tried before generic elements.
const SITE_PLAY_BUTTON: &str = ".bpx-player-ctrl-play";
const SITE_VIDEO: &str = ".bpx-player-video-wrap video";
const GENERIC_VIDEO: &str = "video";

/// What an injected media script achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Performed,
    NoTargetFound,
    InjectionFailed(String),
}

/// Report posted back by the injected script.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaReport {
    pub request_id: Uuid,
    #[serde(default)]
    pub performed: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl MediaReport {
    pub fn outcome(&self) -> ActionOutcome {
        match (&self.error, self.performed) {
            (Some(error), _) => ActionOutcome::InjectionFailed(error.clone()),
            (None, true) => ActionOutcome::Performed,
            (None, false) => ActionOutcome::NoTargetFound,
        }
    }
}

/// Media scripts waiting for their report, oldest first.
#[derive(Debug, Default)]
pub(super) struct PendingActions(VecDeque<(Uuid, ShortcutAction)>);

impl PendingActions {
    fn push(&mut self, id: Uuid, action: ShortcutAction) {
        if self.0.len() >= MAX_PENDING_ACTIONS {
            if let Some((stale, action)) = self.0.pop_front() {
                log::debug!("Dropping unanswered {} request {}", action, stale);
            }
        }
        self.0.push_back((id, action));
    }

    fn take(&mut self, id: Uuid) -> Option<ShortcutAction> {
        let index = self.0.iter().position(|(pending, _)| *pending == id)?;
        self.0.remove(index).map(|(_, action)| action)
    }

    pub(super) fn len(&self) -> usize {
        self.0.len()
    }

    /// Forget every request; returns how many were dropped.
    pub(super) fn clear(&mut self) -> usize {
        let dropped = self.0.len();
        self.0.clear();
        dropped
    }
}

/// JS body that finds the target element and acts on it. Evaluates to
/// `true` when something was done.
fn action_body(action: ShortcutAction) -> String {
    match action {
        ShortcutAction::PlayPause => format!(
            r#"const button = document.querySelector('{SITE_PLAY_BUTTON}');
    if (button) {{ button.click(); return true; }}
    const video = document.querySelector('{GENERIC_VIDEO}');
    if (!video) return false;
    if (video.paused) {{ video.play(); }} else {{ video.pause(); }}
    return true;"#
        ),
        ShortcutAction::Rewind => format!(
            r#"const video = document.querySelector('{SITE_VIDEO}') || document.querySelector('{GENERIC_VIDEO}');
    if (!video) return false;
    video.currentTime = Math.max(0, video.currentTime - {SEEK_STEP_SECS});
    return true;"#
        ),
        ShortcutAction::Forward => format!(
            r#"const video = document.querySelector('{SITE_VIDEO}') || document.querySelector('{GENERIC_VIDEO}');
    if (!video) return false;
    const end = Number.isFinite(video.duration) ? video.duration : Infinity;
    video.currentTime = Math.min(end, video.currentTime + {SEEK_STEP_SECS});
    return true;"#
        ),
        _ => "return false;".to_string(),
    }
}

/// Self-contained script that performs `action` and reports the result under
/// `request_id` through the `report_media_outcome` command.
pub fn media_script(action: ShortcutAction, request_id: Uuid) -> String {
    format!(
        r#"(() => {{
  const report = (performed, error) => {{
    try {{
      window.__TAURI_INTERNALS__.invoke('report_media_outcome', {{
        report: {{ requestId: '{request_id}', performed, error }}
      }});
    }} catch (_) {{}}
  }};
  try {{
    const act = () => {{
    {body}
    }};
    report(Boolean(act()), null);
  }} catch (e) {{
    report(false, String(e));
  }}
}})();"#,
        body = action_body(action)
    )
}

impl Shell {
    /// Send a media action to the page. Only acts while the browser window is
    /// visible; the result arrives later through
    /// [`Shell::complete_media_action`].
    pub fn trigger_media(&mut self, action: ShortcutAction) -> Result<(), ShellError> {
        if !action.is_media() {
            return Ok(());
        }
        if self.state.phase != BrowserPhase::Visible {
            log::debug!("Ignoring {}: browser window not visible", action);
            return Ok(());
        }

        let request_id = Uuid::new_v4();
        let script = media_script(action, request_id);
        match self.host.eval_in_browser(&script) {
            Ok(()) => {
                self.state.pending_media.push(request_id, action);
            }
            Err(e) => {
                log::warn!("Injecting {} script failed: {}", action, e);
                self.focus_browser();
            }
        }
        Ok(())
    }

    /// Continuation of a media script.
    pub fn complete_media_action(&mut self, request_id: Uuid, outcome: ActionOutcome) {
        let Some(action) = self.state.pending_media.take(request_id) else {
            log::debug!("Media report for unknown request {}", request_id);
            return;
        };

        match outcome {
            ActionOutcome::Performed => {
                log::debug!("{} performed", action);
                self.emit(ShellEvent::ShortcutTriggered(action));
            }
            ActionOutcome::NoTargetFound => {
                log::info!("{}: no media element on the page", action);
            }
            ActionOutcome::InjectionFailed(reason) => {
                log::warn!("{} script failed in page: {}", action, reason);
                self.focus_browser();
            }
        }
    }

    pub fn pending_media_actions(&self) -> usize {
        self.state.pending_media.len()
    }
}
