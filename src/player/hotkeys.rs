use serde::{Deserialize, Serialize};

use crate::constants::{ARROW_SKIP_SECS, JL_SKIP_SECS};

/// Keyboard key as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Space,
    ArrowLeft,
    ArrowRight,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HotkeyAction {
    TogglePlay,
    ToggleFullscreen,
    ToggleMute,
    ToggleTheater,
    Skip(f64),
}

/// Maps a key press to a player action. Keys typed into a text field are ignored.
pub fn map_key(key: Key, text_input_focused: bool) -> Option<HotkeyAction> {
    if text_input_focused {
        return None;
    }

    match key {
        Key::Space => Some(HotkeyAction::TogglePlay),
        Key::ArrowLeft => Some(HotkeyAction::Skip(-ARROW_SKIP_SECS)),
        Key::ArrowRight => Some(HotkeyAction::Skip(ARROW_SKIP_SECS)),
        Key::Char(c) => match c.to_ascii_lowercase() {
            'k' => Some(HotkeyAction::TogglePlay),
            'f' => Some(HotkeyAction::ToggleFullscreen),
            'm' => Some(HotkeyAction::ToggleMute),
            't' => Some(HotkeyAction::ToggleTheater),
            'j' => Some(HotkeyAction::Skip(-JL_SKIP_SECS)),
            'l' => Some(HotkeyAction::Skip(JL_SKIP_SECS)),
            _ => None,
        },
    }
}
