//! Terminal mode flags
//!
//! Mode numbers as they appear in `CSI Ps h` (ANSI) and `CSI ? Ps h` (DEC
//! private), and the flags they control.

use serde::{Deserialize, Serialize};

use crate::sink::Mode;

/// Mouse reporting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseMode {
    /// No mouse reporting
    #[default]
    None,
    /// Normal tracking mode - report button press and release
    Normal,
    /// Button-event tracking - report press, release, and motion while button pressed
    ButtonMotion,
    /// Any-event tracking - report all motion events
    AnyMotion,
}

/// Mouse encoding format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseEncoding {
    /// Default X10 encoding (limited to 223 columns/rows)
    #[default]
    X10,
    /// UTF-8 encoding (extends range)
    Utf8,
    /// SGR encoding (CSI < ... M/m)
    Sgr,
    /// URXVT encoding
    Urxvt,
}

/// What a DEC private mode number controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecMode {
    /// A flag reported to the sink
    Flag(Mode),
    /// ?47: switch screens
    AlternateScreen,
    /// ?1047: switch screens, clearing the alternate one on exit
    AlternateScreenClear,
    /// ?1048: save (set) or restore (reset) the cursor
    SaveCursor,
    /// ?1049: save cursor and switch to a cleared alternate screen
    AlternateScreenSaveCursor,
}

impl DecMode {
    pub fn from_number(n: i64) -> Option<Self> {
        let mode = match n {
            1 => DecMode::Flag(Mode::CursorKeys),
            3 => DecMode::Flag(Mode::Column132),
            5 => DecMode::Flag(Mode::ReverseVideo),
            6 => DecMode::Flag(Mode::Origin),
            7 => DecMode::Flag(Mode::Wraparound),
            25 => DecMode::Flag(Mode::CursorVisible),
            45 => DecMode::Flag(Mode::ReverseWraparound),
            47 => DecMode::AlternateScreen,
            1000 => DecMode::Flag(Mode::MouseNormal),
            1002 => DecMode::Flag(Mode::MouseButtonEvent),
            1003 => DecMode::Flag(Mode::MouseAnyEvent),
            1004 => DecMode::Flag(Mode::FocusReporting),
            1005 => DecMode::Flag(Mode::MouseUtf8),
            1006 => DecMode::Flag(Mode::MouseSgr),
            1015 => DecMode::Flag(Mode::MouseUrxvt),
            1047 => DecMode::AlternateScreenClear,
            1048 => DecMode::SaveCursor,
            1049 => DecMode::AlternateScreenSaveCursor,
            2004 => DecMode::Flag(Mode::BracketedPaste),
            _ => return None,
        };
        Some(mode)
    }
}

/// ANSI mode number (`CSI Ps h`)
pub fn ansi_mode(n: i64) -> Option<Mode> {
    match n {
        4 => Some(Mode::Insert),
        20 => Some(Mode::LineFeedNewLine),
        _ => None,
    }
}

/// Terminal mode flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalModes {
    /// IRM - Insert/Replace mode
    pub insert: bool,
    /// LNM - Line feed/new line mode
    /// When enabled, LF also performs CR
    pub linefeed_newline: bool,
    /// DECCKM - Cursor key mode
    pub cursor_keys_application: bool,
    /// DECCOLM - tracked, never resizes by itself
    pub column_132: bool,
    /// DECSCNM - Screen mode (reverse video)
    pub reverse_video: bool,
    /// DECOM - Origin mode
    /// When enabled, cursor positions are relative to the scroll region
    pub origin: bool,
    /// DECAWM - Auto wrap mode
    pub wraparound: bool,
    /// DECTCEM
    pub cursor_visible: bool,
    /// BS at column 0 moves to the end of the previous wrapped row
    pub reverse_wraparound: bool,
    /// DECKPAM/DECKPNM - Keypad mode
    pub keypad_application: bool,
    pub mouse_mode: MouseMode,
    pub mouse_encoding: MouseEncoding,
    /// Focus reporting (DECSET 1004)
    pub focus_reporting: bool,
    /// Bracketed paste mode (DECSET 2004)
    pub bracketed_paste: bool,
}

impl Default for TerminalModes {
    fn default() -> Self {
        Self {
            insert: false,
            linefeed_newline: false,
            cursor_keys_application: false,
            column_132: false,
            reverse_video: false,
            origin: false,
            wraparound: true,
            cursor_visible: true,
            reverse_wraparound: false,
            keypad_application: false,
            mouse_mode: MouseMode::None,
            mouse_encoding: MouseEncoding::X10,
            focus_reporting: false,
            bracketed_paste: false,
        }
    }
}

impl TerminalModes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a flag
    pub fn get(&self, mode: Mode) -> bool {
        match mode {
            Mode::Insert => self.insert,
            Mode::LineFeedNewLine => self.linefeed_newline,
            Mode::CursorKeys => self.cursor_keys_application,
            Mode::Column132 => self.column_132,
            Mode::ReverseVideo => self.reverse_video,
            Mode::Origin => self.origin,
            Mode::Wraparound => self.wraparound,
            Mode::CursorVisible => self.cursor_visible,
            Mode::ReverseWraparound => self.reverse_wraparound,
            Mode::KeypadApplication => self.keypad_application,
            Mode::MouseNormal => self.mouse_mode == MouseMode::Normal,
            Mode::MouseButtonEvent => self.mouse_mode == MouseMode::ButtonMotion,
            Mode::MouseAnyEvent => self.mouse_mode == MouseMode::AnyMotion,
            Mode::FocusReporting => self.focus_reporting,
            Mode::MouseUtf8 => self.mouse_encoding == MouseEncoding::Utf8,
            Mode::MouseSgr => self.mouse_encoding == MouseEncoding::Sgr,
            Mode::MouseUrxvt => self.mouse_encoding == MouseEncoding::Urxvt,
            Mode::BracketedPaste => self.bracketed_paste,
        }
    }

    /// Set a flag. Mouse modes and encodings are exclusive: enabling one
    /// replaces the other, disabling the active one turns it off.
    pub fn set(&mut self, mode: Mode, enabled: bool) {
        match mode {
            Mode::Insert => self.insert = enabled,
            Mode::LineFeedNewLine => self.linefeed_newline = enabled,
            Mode::CursorKeys => self.cursor_keys_application = enabled,
            Mode::Column132 => self.column_132 = enabled,
            Mode::ReverseVideo => self.reverse_video = enabled,
            Mode::Origin => self.origin = enabled,
            Mode::Wraparound => self.wraparound = enabled,
            Mode::CursorVisible => self.cursor_visible = enabled,
            Mode::ReverseWraparound => self.reverse_wraparound = enabled,
            Mode::KeypadApplication => self.keypad_application = enabled,
            Mode::MouseNormal => self.set_mouse_mode(MouseMode::Normal, enabled),
            Mode::MouseButtonEvent => self.set_mouse_mode(MouseMode::ButtonMotion, enabled),
            Mode::MouseAnyEvent => self.set_mouse_mode(MouseMode::AnyMotion, enabled),
            Mode::FocusReporting => self.focus_reporting = enabled,
            Mode::MouseUtf8 => self.set_mouse_encoding(MouseEncoding::Utf8, enabled),
            Mode::MouseSgr => self.set_mouse_encoding(MouseEncoding::Sgr, enabled),
            Mode::MouseUrxvt => self.set_mouse_encoding(MouseEncoding::Urxvt, enabled),
            Mode::BracketedPaste => self.bracketed_paste = enabled,
        }
    }

    fn set_mouse_mode(&mut self, mode: MouseMode, enabled: bool) {
        if enabled {
            self.mouse_mode = mode;
        } else if self.mouse_mode == mode {
            self.mouse_mode = MouseMode::None;
        }
    }

    fn set_mouse_encoding(&mut self, encoding: MouseEncoding, enabled: bool) {
        if enabled {
            self.mouse_encoding = encoding;
        } else if self.mouse_encoding == encoding {
            self.mouse_encoding = MouseEncoding::X10;
        }
    }
}
