//! Argument codes carried by `CommandBlock::Misc` and `CommandBlock::Toggle`
//! commands. Opaque to the key-table compiler; meaningful only to the
//! handler that owns the range.

pub const HELP_SCREEN: u16 = 0;
pub const SHOW_TIME: u16 = 1;
pub const RESTART: u16 = 2;
pub const REFRESH: u16 = 3;

pub const PREFERENCES_MENU: u16 = 10;
pub const PREFERENCES_SAVE: u16 = 11;
pub const PREFERENCES_LOAD: u16 = 12;
pub const PREFERENCES_RESET: u16 = 13;

pub const CLIPBOARD_CUT: u16 = 20;
pub const CLIPBOARD_APPEND: u16 = 21;
pub const CLIPBOARD_PASTE: u16 = 22;
pub const CLIPBOARD_PASTE_HISTORY: u16 = 23;

pub const PAN_LEFT: u16 = 30;
pub const PAN_RIGHT: u16 = 31;
pub const TOGGLE_CURSOR_TRACKING: u16 = 32;

pub const TOGGLE_SKIP_BLANK_WINDOWS: u16 = 40;
pub const TOGGLE_HIDE_CURSOR: u16 = 41;
