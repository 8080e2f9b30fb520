//! Stored accelerators to RegisterHotKey arguments.
//!
//! Combinations are parsed by the global shortcut plugin, so the native hook
//! accepts exactly what the toolkit path accepts; only the key code is
//! translated here.

use tauri_plugin_global_shortcut::{Code, Modifiers};
use windows::Win32::UI::Input::KeyboardAndMouse::*;

use crate::settings::to_shortcut;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub modifiers: HOT_KEY_MODIFIERS,
    pub vk: VIRTUAL_KEY,
}

fn hotkey_modifiers(mods: Modifiers) -> HOT_KEY_MODIFIERS {
    let mut modifiers = MOD_NOREPEAT;
    if mods.contains(Modifiers::CONTROL) {
        modifiers |= MOD_CONTROL;
    }
    if mods.contains(Modifiers::SHIFT) {
        modifiers |= MOD_SHIFT;
    }
    if mods.contains(Modifiers::ALT) {
        modifiers |= MOD_ALT;
    }
    if mods.intersects(Modifiers::SUPER | Modifiers::META) {
        modifiers |= MOD_WIN;
    }
    modifiers
}

fn virtual_key(code: Code) -> Option<VIRTUAL_KEY> {
    Some(match code {
        Code::KeyA => VK_A,
        Code::KeyB => VK_B,
        Code::KeyC => VK_C,
        Code::KeyD => VK_D,
        Code::KeyE => VK_E,
        Code::KeyF => VK_F,
        Code::KeyG => VK_G,
        Code::KeyH => VK_H,
        Code::KeyI => VK_I,
        Code::KeyJ => VK_J,
        Code::KeyK => VK_K,
        Code::KeyL => VK_L,
        Code::KeyM => VK_M,
        Code::KeyN => VK_N,
        Code::KeyO => VK_O,
        Code::KeyP => VK_P,
        Code::KeyQ => VK_Q,
        Code::KeyR => VK_R,
        Code::KeyS => VK_S,
        Code::KeyT => VK_T,
        Code::KeyU => VK_U,
        Code::KeyV => VK_V,
        Code::KeyW => VK_W,
        Code::KeyX => VK_X,
        Code::KeyY => VK_Y,
        Code::KeyZ => VK_Z,

        Code::Digit0 => VK_0,
        Code::Digit1 => VK_1,
        Code::Digit2 => VK_2,
        Code::Digit3 => VK_3,
        Code::Digit4 => VK_4,
        Code::Digit5 => VK_5,
        Code::Digit6 => VK_6,
        Code::Digit7 => VK_7,
        Code::Digit8 => VK_8,
        Code::Digit9 => VK_9,

        Code::F1 => VK_F1,
        Code::F2 => VK_F2,
        Code::F3 => VK_F3,
        Code::F4 => VK_F4,
        Code::F5 => VK_F5,
        Code::F6 => VK_F6,
        Code::F7 => VK_F7,
        Code::F8 => VK_F8,
        Code::F9 => VK_F9,
        Code::F10 => VK_F10,
        Code::F11 => VK_F11,
        Code::F12 => VK_F12,
        Code::F13 => VK_F13,
        Code::F14 => VK_F14,
        Code::F15 => VK_F15,
        Code::F16 => VK_F16,
        Code::F17 => VK_F17,
        Code::F18 => VK_F18,
        Code::F19 => VK_F19,
        Code::F20 => VK_F20,
        Code::F21 => VK_F21,
        Code::F22 => VK_F22,
        Code::F23 => VK_F23,
        Code::F24 => VK_F24,

        Code::ArrowUp => VK_UP,
        Code::ArrowDown => VK_DOWN,
        Code::ArrowLeft => VK_LEFT,
        Code::ArrowRight => VK_RIGHT,
        Code::Home => VK_HOME,
        Code::End => VK_END,
        Code::PageUp => VK_PRIOR,
        Code::PageDown => VK_NEXT,
        Code::Insert => VK_INSERT,
        Code::Delete => VK_DELETE,

        Code::Space => VK_SPACE,
        Code::Tab => VK_TAB,
        Code::Enter => VK_RETURN,
        Code::Escape => VK_ESCAPE,
        Code::Backspace => VK_BACK,
        Code::CapsLock => VK_CAPITAL,
        Code::NumLock => VK_NUMLOCK,
        Code::ScrollLock => VK_SCROLL,
        Code::Pause => VK_PAUSE,
        Code::PrintScreen => VK_SNAPSHOT,
        Code::ContextMenu => VK_APPS,

        Code::Semicolon => VK_OEM_1,
        Code::Equal => VK_OEM_PLUS,
        Code::Comma => VK_OEM_COMMA,
        Code::Minus => VK_OEM_MINUS,
        Code::Period => VK_OEM_PERIOD,
        Code::Slash => VK_OEM_2,
        Code::Backquote => VK_OEM_3,
        Code::BracketLeft => VK_OEM_4,
        Code::Backslash => VK_OEM_5,
        Code::BracketRight => VK_OEM_6,
        Code::Quote => VK_OEM_7,

        Code::Numpad0 => VK_NUMPAD0,
        Code::Numpad1 => VK_NUMPAD1,
        Code::Numpad2 => VK_NUMPAD2,
        Code::Numpad3 => VK_NUMPAD3,
        Code::Numpad4 => VK_NUMPAD4,
        Code::Numpad5 => VK_NUMPAD5,
        Code::Numpad6 => VK_NUMPAD6,
        Code::Numpad7 => VK_NUMPAD7,
        Code::Numpad8 => VK_NUMPAD8,
        Code::Numpad9 => VK_NUMPAD9,
        Code::NumpadAdd => VK_ADD,
        Code::NumpadSubtract => VK_SUBTRACT,
        Code::NumpadMultiply => VK_MULTIPLY,
        Code::NumpadDivide => VK_DIVIDE,
        Code::NumpadDecimal => VK_DECIMAL,

        Code::AudioVolumeMute => VK_VOLUME_MUTE,
        Code::AudioVolumeDown => VK_VOLUME_DOWN,
        Code::AudioVolumeUp => VK_VOLUME_UP,
        Code::MediaTrackNext => VK_MEDIA_NEXT_TRACK,
        Code::MediaTrackPrevious => VK_MEDIA_PREV_TRACK,
        Code::MediaStop => VK_MEDIA_STOP,
        Code::MediaPlayPause => VK_MEDIA_PLAY_PAUSE,

        _ => return None,
    })
}

/// Chord for a stored combination, or the reason it has none.
pub fn parse_chord(combination: &str) -> Result<KeyChord, String> {
    let shortcut = to_shortcut(combination)?;
    let vk = virtual_key(shortcut.key)
        .ok_or_else(|| format!("no virtual key for {:?}", shortcut.key))?;
    Ok(KeyChord {
        modifiers: hotkey_modifiers(shortcut.mods),
        vk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings_parse() {
        let insert = parse_chord("Insert").unwrap();
        assert_eq!(insert.vk, VK_INSERT);
        assert_eq!(insert.modifiers, MOD_NOREPEAT);

        let up = parse_chord("Control+Up").unwrap();
        assert_eq!(up.vk, VK_UP);
        assert_eq!(up.modifiers, MOD_NOREPEAT | MOD_CONTROL);
    }

    #[test]
    fn test_plugin_key_names_are_understood() {
        assert_eq!(parse_chord("Control+Equal").unwrap().vk, VK_OEM_PLUS);
        assert_eq!(parse_chord("Control+KeyK").unwrap().vk, VK_K);
        assert_eq!(parse_chord("Alt+Digit1").unwrap().vk, VK_1);
        assert_eq!(parse_chord("Control+Comma").unwrap().vk, VK_OEM_COMMA);
        assert_eq!(parse_chord("Shift+Backquote").unwrap().vk, VK_OEM_3);
    }

    #[test]
    fn test_modifier_aliases() {
        let chord = parse_chord("Ctrl+Shift+Alt+Meta+F5").unwrap();
        assert_eq!(
            chord.modifiers,
            MOD_NOREPEAT | MOD_CONTROL | MOD_SHIFT | MOD_ALT | MOD_WIN
        );
        assert_eq!(chord.vk, VK_F5);
    }

    #[test]
    fn test_unparseable_combination_is_an_error() {
        assert!(parse_chord("Control+Banana").is_err());
        assert!(parse_chord("").is_err());
    }
}
