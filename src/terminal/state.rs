//! Terminal state
//!
//! Everything the state machine remembers between tokens that is not
//! screen content: modes, charsets, the current rendition, saved cursors,
//! the encoding pair and keyboard reporting flags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::modes::TerminalModes;
use crate::core::{CharsetState, GraphicRendition};
use crate::parser::Encoding;

/// Deepest the key reporting flag stack may grow; older entries are evicted
pub const KEY_FLAGS_STACK_LIMIT: usize = 16;

bitflags! {
    /// Progressive keyboard enhancement flags (`CSI > flags u`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyReportingFlags: u8 {
        const DISAMBIGUATE = 1;
        const REPORT_EVENT_TYPES = 1 << 1;
        const REPORT_ALTERNATE_KEYS = 1 << 2;
        const REPORT_ALL_KEYS = 1 << 3;
        const REPORT_TEXT = 1 << 4;
    }
}

/// DECSC snapshot. Restoring it reproduces exactly this tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedCursor {
    pub x: usize,
    pub y: usize,
    pub charsets: CharsetState,
    pub rendition: GraphicRendition,
    pub origin: bool,
}

/// xterm key modifier resources set by `CSI > Ps ; Pm m`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModifyKeys {
    /// modifyKeyboard (0), modifyCursorKeys (1), modifyFunctionKeys (2),
    /// modifyKeypadKeys (3), modifyOtherKeys (4); `None` is disabled
    pub resources: [Option<i64>; 5],
}

impl ModifyKeys {
    pub fn set(&mut self, resource: usize, value: Option<i64>) {
        if let Some(slot) = self.resources.get_mut(resource) {
            *slot = value;
        }
    }

    pub fn get(&self, resource: usize) -> Option<i64> {
        self.resources.get(resource).copied().flatten()
    }

    pub fn modify_other_keys(&self) -> Option<i64> {
        self.get(4)
    }
}

/// Session state of the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalState {
    pub modes: TerminalModes,
    pub charsets: CharsetState,
    pub rendition: GraphicRendition,
    /// DECSC slot for the primary screen
    pub saved_primary: Option<SavedCursor>,
    /// DECSC slot for the alternate screen
    pub saved_alternate: Option<SavedCursor>,
    pub using_alternate: bool,
    /// Encoding configured for the session
    pub canonical_encoding: Encoding,
    /// Encoding in effect; `ESC % G` switches it to UTF-8 until `ESC % @`
    pub active_encoding: Encoding,
    pub key_flags: KeyReportingFlags,
    pub key_flags_stack: Vec<KeyReportingFlags>,
    pub modify_keys: ModifyKeys,
    /// Last printed graphic character, repeated by REP
    pub last_printed: Option<char>,
}

impl TerminalState {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            modes: TerminalModes::default(),
            charsets: CharsetState::new(),
            rendition: GraphicRendition::default(),
            saved_primary: None,
            saved_alternate: None,
            using_alternate: false,
            canonical_encoding: encoding,
            active_encoding: encoding,
            key_flags: KeyReportingFlags::empty(),
            key_flags_stack: Vec::new(),
            modify_keys: ModifyKeys::default(),
            last_printed: None,
        }
    }

    /// The DECSC slot of the active screen
    pub fn saved_cursor(&self) -> Option<&SavedCursor> {
        if self.using_alternate {
            self.saved_alternate.as_ref()
        } else {
            self.saved_primary.as_ref()
        }
    }

    pub fn set_saved_cursor(&mut self, saved: SavedCursor) {
        if self.using_alternate {
            self.saved_alternate = Some(saved);
        } else {
            self.saved_primary = Some(saved);
        }
    }

    /// RIS: back to power-on state, keeping the configured encoding
    pub fn hard_reset(&mut self) {
        *self = Self::new(self.canonical_encoding);
    }

    /// DECSTR: modes and rendition only. Running it twice changes nothing
    /// further.
    pub fn soft_reset(&mut self) {
        let modes = &mut self.modes;
        modes.insert = false;
        modes.origin = false;
        modes.wraparound = true;
        modes.cursor_visible = true;
        modes.reverse_wraparound = false;
        modes.cursor_keys_application = false;
        modes.keypad_application = false;
        self.charsets = CharsetState::new();
        self.rendition = GraphicRendition::default();
        let home = SavedCursor::default();
        self.saved_primary = Some(home);
        self.saved_alternate = Some(home);
    }

    /// Turn off features that belong to the program that was running,
    /// leaving what is displayed alone
    pub fn relaunch_reset(&mut self) {
        let modes = &mut self.modes;
        modes.bracketed_paste = false;
        modes.focus_reporting = false;
        modes.mouse_mode = Default::default();
        modes.mouse_encoding = Default::default();
        modes.cursor_keys_application = false;
        modes.keypad_application = false;
        self.key_flags = KeyReportingFlags::empty();
        self.key_flags_stack.clear();
        self.modify_keys = ModifyKeys::default();
        self.active_encoding = self.canonical_encoding;
    }

    /// `CSI > flags u`
    pub fn push_key_flags(&mut self, flags: KeyReportingFlags) {
        if self.key_flags_stack.len() == KEY_FLAGS_STACK_LIMIT {
            self.key_flags_stack.remove(0);
        }
        self.key_flags_stack.push(self.key_flags);
        self.key_flags = flags;
    }

    /// `CSI < n u`
    pub fn pop_key_flags(&mut self, count: usize) {
        for _ in 0..count {
            match self.key_flags_stack.pop() {
                Some(flags) => self.key_flags = flags,
                None => {
                    self.key_flags = KeyReportingFlags::empty();
                    break;
                }
            }
        }
    }

    /// `CSI = flags ; mode u`: 1 replaces, 2 adds, 3 removes
    pub fn set_key_flags(&mut self, flags: KeyReportingFlags, mode: i64) {
        match mode {
            2 => self.key_flags |= flags,
            3 => self.key_flags -= flags,
            _ => self.key_flags = flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Charset, Color};

    #[test]
    fn test_soft_reset_is_idempotent() {
        let mut state = TerminalState::new(Encoding::Utf8);
        state.modes.insert = true;
        state.modes.origin = true;
        state.rendition.fg = Color::Indexed(3);
        state.charsets.designate(0, Charset::DecSpecialGraphics);

        state.soft_reset();
        let once = state.clone();
        state.soft_reset();
        assert_eq!(state, once);
        assert!(!state.modes.insert);
        assert_eq!(state.rendition, GraphicRendition::default());
        assert_eq!(state.charsets.current(), Charset::Ascii);
    }

    #[test]
    fn test_hard_reset_keeps_canonical_encoding() {
        let mut state = TerminalState::new(Encoding::ShiftJis);
        state.active_encoding = Encoding::Utf8;
        state.modes.wraparound = false;
        state.hard_reset();
        assert_eq!(state.active_encoding, Encoding::ShiftJis);
        assert!(state.modes.wraparound);
    }

    #[test]
    fn test_relaunch_reset_only_touches_session_features() {
        let mut state = TerminalState::new(Encoding::Utf8);
        state.modes.bracketed_paste = true;
        state.modes.origin = true;
        state.rendition.bold = true;
        state.push_key_flags(KeyReportingFlags::DISAMBIGUATE);
        state.relaunch_reset();
        assert!(!state.modes.bracketed_paste);
        assert!(state.modes.origin);
        assert!(state.rendition.bold);
        assert!(state.key_flags.is_empty());
    }

    #[test]
    fn test_key_flag_stack() {
        let mut state = TerminalState::new(Encoding::Utf8);
        state.push_key_flags(KeyReportingFlags::DISAMBIGUATE);
        state.push_key_flags(KeyReportingFlags::REPORT_ALL_KEYS);
        state.set_key_flags(KeyReportingFlags::REPORT_TEXT, 2);
        assert_eq!(
            state.key_flags,
            KeyReportingFlags::REPORT_ALL_KEYS | KeyReportingFlags::REPORT_TEXT
        );
        state.pop_key_flags(1);
        assert_eq!(state.key_flags, KeyReportingFlags::DISAMBIGUATE);
        state.pop_key_flags(5);
        assert!(state.key_flags.is_empty());
    }

    #[test]
    fn test_key_flag_stack_is_bounded() {
        let mut state = TerminalState::new(Encoding::Utf8);
        for _ in 0..KEY_FLAGS_STACK_LIMIT + 10 {
            state.push_key_flags(KeyReportingFlags::DISAMBIGUATE);
        }
        assert_eq!(state.key_flags_stack.len(), KEY_FLAGS_STACK_LIMIT);
    }

    #[test]
    fn test_saved_cursor_per_screen() {
        let mut state = TerminalState::new(Encoding::Utf8);
        state.set_saved_cursor(SavedCursor {
            x: 3,
            ..Default::default()
        });
        state.using_alternate = true;
        assert!(state.saved_cursor().is_none());
        state.using_alternate = false;
        assert_eq!(state.saved_cursor().map(|s| s.x), Some(3));
    }
}
