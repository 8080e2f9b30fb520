//! Window bounds persistence and validation against the attached displays.
//!
//! All coordinates are physical pixels. Stored bounds are only trusted when the
//! whole rectangle lies inside a single display's work area; anything else is
//! recentered on the primary display.

use serde::{Deserialize, Serialize};

/// Persisted size and (optional) position of a window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowBounds {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl WindowBounds {
    pub const fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            x: None,
            y: None,
        }
    }

    pub fn has_size(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        Some((self.x?, self.y?))
    }

    fn rect(&self) -> Option<Rect> {
        let (x, y) = self.position()?;
        Some(Rect {
            x,
            y,
            width: self.width,
            height: self.height,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A display as seen by the toolkit: its usable work area (taskbar excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Display {
    pub work_area: Rect,
    pub is_primary: bool,
}

fn primary_work_area(displays: &[Display]) -> Option<Rect> {
    displays
        .iter()
        .find(|d| d.is_primary)
        .or_else(|| displays.first())
        .map(|d| d.work_area)
}

/// Center a window of the given size on `area`, shrinking it to fit if needed.
fn center_in(area: Rect, width: u32, height: u32) -> WindowBounds {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + ((area.width - width) / 2) as i32;
    let y = area.y + ((area.height - height) / 2) as i32;
    WindowBounds {
        width,
        height,
        x: Some(x),
        y: Some(y),
    }
}

/// Decide the bounds a window should open with.
///
/// - A stored size of zero (or no stored bounds at all) falls back to `fallback`.
/// - A stored position is kept only if the window fits entirely inside one
///   display's work area; otherwise (or when no position is stored) the window
///   is centered on the primary display.
/// - With no displays reported the size is kept and the position is left to
///   the toolkit.
pub fn resolve_bounds(
    stored: Option<WindowBounds>,
    fallback: WindowBounds,
    displays: &[Display],
) -> WindowBounds {
    let stored = stored.unwrap_or(fallback);
    let (width, height) = if stored.has_size() {
        (stored.width, stored.height)
    } else {
        (fallback.width, fallback.height)
    };
    let candidate = WindowBounds {
        width,
        height,
        ..stored
    };

    let Some(primary) = primary_work_area(displays) else {
        return WindowBounds::sized(width, height);
    };

    if let Some(rect) = candidate.rect() {
        if displays.iter().any(|d| d.work_area.contains(&rect)) {
            return candidate;
        }
        log::debug!(
            "Stored window position ({}, {}) {}x{} is off-screen; recentering",
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
    }

    center_in(primary, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(x: i32, y: i32, width: u32, height: u32, is_primary: bool) -> Display {
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

    const FALLBACK: WindowBounds = WindowBounds::sized(960, 600);

    #[test]
    fn test_zero_size_falls_back_to_default() {
        let displays = [display(0, 0, 1920, 1040, true)];
        let stored = WindowBounds {
            width: 0,
            height: 0,
            x: Some(10),
            y: Some(10),
        };
        let bounds = resolve_bounds(Some(stored), FALLBACK, &displays);
        assert_eq!((bounds.width, bounds.height), (960, 600));
        assert_eq!(bounds.position(), Some((10, 10)));
    }

    #[test]
    fn test_no_displays_keeps_size_and_drops_position() {
        let stored = WindowBounds {
            width: 800,
            height: 500,
            x: Some(-5000),
            y: Some(0),
        };
        let bounds = resolve_bounds(Some(stored), FALLBACK, &[]);
        assert_eq!(bounds, WindowBounds::sized(800, 500));
    }

    #[test]
    fn test_single_display_offscreen_is_recentered() {
        let displays = [display(0, 0, 1920, 1040, true)];
        let stored = WindowBounds {
            width: 800,
            height: 600,
            x: Some(1500),
            y: Some(100),
        };
        let bounds = resolve_bounds(Some(stored), FALLBACK, &displays);
        assert_eq!(bounds.position(), Some((560, 220)));
        assert_eq!((bounds.width, bounds.height), (800, 600));
    }

    #[test]
    fn test_single_display_fitting_position_is_kept() {
        let displays = [display(0, 0, 1920, 1040, true)];
        let stored = WindowBounds {
            width: 800,
            height: 600,
            x: Some(100),
            y: Some(100),
        };
        assert_eq!(resolve_bounds(Some(stored), FALLBACK, &displays), stored);
    }

    #[test]
    fn test_window_on_secondary_display_is_kept() {
        let displays = [
            display(0, 0, 1920, 1040, true),
            display(1920, 0, 2560, 1400, false),
        ];
        let stored = WindowBounds {
            width: 1000,
            height: 700,
            x: Some(2200),
            y: Some(300),
        };
        assert_eq!(resolve_bounds(Some(stored), FALLBACK, &displays), stored);
    }

    #[test]
    fn test_window_straddling_two_displays_is_recentered_on_primary() {
        let displays = [
            display(1920, 0, 1920, 1040, false),
            display(0, 0, 1920, 1040, true),
        ];
        let stored = WindowBounds {
            width: 800,
            height: 600,
            x: Some(1600),
            y: Some(100),
        };
        let bounds = resolve_bounds(Some(stored), FALLBACK, &displays);
        assert_eq!(bounds.position(), Some((560, 220)));
    }

    #[test]
    fn test_detached_display_position_is_recentered() {
        // Saved while a second monitor to the left was attached.
        let displays = [display(0, 0, 1920, 1040, true)];
        let stored = WindowBounds {
            width: 960,
            height: 600,
            x: Some(-1500),
            y: Some(200),
        };
        let bounds = resolve_bounds(Some(stored), FALLBACK, &displays);
        assert_eq!(bounds.position(), Some((480, 220)));
    }

    #[test]
    fn test_missing_position_is_centered() {
        let displays = [display(0, 0, 1920, 1040, true)];
        let bounds = resolve_bounds(None, FALLBACK, &displays);
        assert_eq!(bounds.position(), Some((480, 220)));
    }

    #[test]
    fn test_oversized_window_shrinks_to_work_area() {
        let displays = [display(0, 0, 1280, 680, true)];
        let stored = WindowBounds::sized(1600, 900);
        let bounds = resolve_bounds(Some(stored), FALLBACK, &displays);
        assert_eq!((bounds.width, bounds.height), (1280, 680));
        assert_eq!(bounds.position(), Some((0, 0)));
    }

    #[test]
    fn test_first_display_used_when_none_is_primary() {
        let displays = [display(100, 50, 1000, 800, false)];
        let bounds = resolve_bounds(None, WindowBounds::sized(500, 400), &displays);
        assert_eq!(bounds.position(), Some((350, 250)));
    }

    #[test]
    fn test_missing_fields_deserialize_to_zero_size() {
        let bounds: WindowBounds = serde_json::from_str(r#"{"x": 5}"#).unwrap();
        assert!(!bounds.has_size());
        assert_eq!(bounds.x, Some(5));
        assert_eq!(bounds.y, None);
    }
}
