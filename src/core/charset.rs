//! Character sets
//!
//! Four designation slots (G0-G3), a locking shift selecting which slot is
//! mapped into GL, and an optional single shift for the next character.

use serde::{Deserialize, Serialize};

/// Character sets a slot can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Charset {
    #[default]
    Ascii,
    /// DEC Special Graphics (line drawing)
    DecSpecialGraphics,
    /// United Kingdom: `#` is the pound sign
    Uk,
}

impl Charset {
    /// Charset named by the final byte of a designation sequence.
    /// Unknown designators fall back to ASCII.
    pub fn from_designator(byte: u8) -> Self {
        match byte {
            b'0' | b'2' => Charset::DecSpecialGraphics,
            b'A' => Charset::Uk,
            _ => Charset::Ascii,
        }
    }

    /// Map a character through this set
    pub fn translate(self, c: char) -> char {
        match self {
            Charset::Ascii => c,
            Charset::Uk if c == '#' => '£',
            Charset::Uk => c,
            Charset::DecSpecialGraphics => {
                let code = c as u32;
                if (0x5F..=0x7E).contains(&code) {
                    DEC_SPECIAL_GRAPHICS[(code - 0x5F) as usize]
                } else {
                    c
                }
            }
        }
    }
}

/// DEC Special Graphics for 0x5F..=0x7E
const DEC_SPECIAL_GRAPHICS: [char; 32] = [
    ' ', '◆', '▒', '␉', '␌', '␍', '␊', '°', '±', '␤', '␋', '┘', '┐', '┌', '└', '┼', '⎺', '⎻', '─',
    '⎼', '⎽', '├', '┤', '┴', '┬', '│', '≤', '≥', 'π', '≠', '£', '·',
];

/// G0-G3 designations plus shift state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharsetState {
    pub slots: [Charset; 4],
    /// Slot invoked into GL by SI/SO/LS2/LS3
    pub active: u8,
    /// Slot used for the next character only (SS2/SS3)
    pub single_shift: Option<u8>,
}

impl CharsetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn designate(&mut self, slot: u8, charset: Charset) {
        if let Some(s) = self.slots.get_mut(slot as usize) {
            *s = charset;
        }
    }

    /// Locking shift: SI selects G0, SO G1, LS2 G2, LS3 G3
    pub fn lock(&mut self, slot: u8) {
        if slot < 4 {
            self.active = slot;
            self.single_shift = None;
        }
    }

    pub fn single_shift(&mut self, slot: u8) {
        if slot < 4 {
            self.single_shift = Some(slot);
        }
    }

    /// Charset in effect for the next character
    pub fn current(&self) -> Charset {
        let slot = self.single_shift.unwrap_or(self.active);
        self.slots[slot as usize % 4]
    }

    /// Translate one printed character, consuming any single shift
    pub fn translate(&mut self, c: char) -> char {
        let out = self.current().translate(c);
        self.single_shift = None;
        out
    }

    /// Fast path: true when nothing would be translated
    pub fn is_identity(&self) -> bool {
        self.single_shift.is_none() && self.current() == Charset::Ascii
    }
}
