//! Tokens produced by the tokenizer
//!
//! A token is ephemeral: it is produced, executed by the state machine and
//! dropped. Tokens never reference the byte stream they came from.

use super::params::Params;

/// One unit of terminal input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A C0 control byte (BEL, BS, HT, LF, VT, FF, CR, SO, SI, ...)
    Control(u8),
    /// A non-CSI escape sequence
    Esc(EscAction),
    /// A control sequence: `ESC [ [marker] params [intermediates] final`
    Csi(CsiSequence),
    /// Operating system command payload (between `ESC ]` and BEL/ST)
    Osc(String),
    /// Device control string payload (between `ESC P` and ST)
    Dcs(String),
    /// A run of printable characters
    Text(String),
}

/// Control sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsiSequence {
    pub params: Params,
    /// Intermediate bytes (0x20-0x2F)
    pub intermediates: Vec<u8>,
    /// Final byte (0x40-0x7E)
    pub final_byte: u8,
    /// Private marker (`?`, `>`, `<`, `=`)
    pub marker: Option<u8>,
}

impl CsiSequence {
    /// Count-style parameter accessor, see [`Params::param`]
    pub fn param(&self, index: usize, default: i64) -> i64 {
        self.params.param(index, default)
    }

    /// True for sequences with this final byte and no marker or intermediates
    pub fn is(&self, final_byte: u8) -> bool {
        self.final_byte == final_byte && self.marker.is_none() && self.intermediates.is_empty()
    }

    pub fn intermediate(&self) -> Option<u8> {
        self.intermediates.first().copied()
    }
}

/// Decoded escape sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscAction {
    /// DECSC - ESC 7
    SaveCursor,
    /// DECRC - ESC 8
    RestoreCursor,
    /// IND - ESC D
    Index,
    /// NEL - ESC E
    NextLine,
    /// HTS - ESC H
    TabSet,
    /// RI - ESC M
    ReverseIndex,
    /// RIS - ESC c
    FullReset,
    /// DECKPAM - ESC =
    KeypadApplication,
    /// DECKPNM - ESC >
    KeypadNumeric,
    /// Designate a character set into G0-G3: `ESC ( B`, `ESC ) 0`, ...
    DesignateCharset { slot: u8, charset: u8 },
    /// DECALN - ESC # 8
    AlignmentTest,
    /// SS2 / SS3 - ESC N, ESC O
    SingleShift(u8),
    /// LS2 / LS3 - ESC n, ESC o
    LockingShift(u8),
    /// ESC % G
    SelectUtf8,
    /// ESC % @
    SelectDefaultEncoding,
}

impl EscAction {
    /// Decode an escape sequence from its intermediates and final byte
    pub fn from_bytes(intermediates: &[u8], final_byte: u8) -> Option<Self> {
        let action = match (intermediates, final_byte) {
            ([], b'7') => EscAction::SaveCursor,
            ([], b'8') => EscAction::RestoreCursor,
            ([], b'D') => EscAction::Index,
            ([], b'E') => EscAction::NextLine,
            ([], b'H') => EscAction::TabSet,
            ([], b'M') => EscAction::ReverseIndex,
            ([], b'c') => EscAction::FullReset,
            ([], b'=') => EscAction::KeypadApplication,
            ([], b'>') => EscAction::KeypadNumeric,
            ([], b'N') => EscAction::SingleShift(2),
            ([], b'O') => EscAction::SingleShift(3),
            ([], b'n') => EscAction::LockingShift(2),
            ([], b'o') => EscAction::LockingShift(3),
            ([b'#'], b'8') => EscAction::AlignmentTest,
            ([b'%'], b'G') => EscAction::SelectUtf8,
            ([b'%'], b'@') => EscAction::SelectDefaultEncoding,
            ([designator], charset) => {
                let slot = match designator {
                    b'(' => 0,
                    b')' | b'-' => 1,
                    b'*' | b'.' => 2,
                    b'+' | b'/' => 3,
                    _ => return None,
                };
                EscAction::DesignateCharset { slot, charset }
            }
            _ => return None,
        };
        Some(action)
    }
}
