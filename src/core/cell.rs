//! Packed cell representation
//!
//! A cell is a small `Copy` record: the character code, foreground and
//! background colors, attribute bits, underline style and an external
//! attribute index. Its binary form ([`Cell::to_bytes`]) is a stable
//! 16-byte little-endian record used by persisted sessions:
//!
//! | bytes  | field                                              |
//! |--------|----------------------------------------------------|
//! | 0..4   | code (u32)                                         |
//! | 4..8   | foreground: 3 value bytes + mode                   |
//! | 8..12  | background: 3 value bytes + mode                   |
//! | 12..14 | attribute flags (bits 0..12), underline style (12..16) |
//! | 14..16 | external attribute index (u16)                     |
//!
//! The external attribute index is a key into the screen's
//! [`ExternalAttributeTable`](super::attributes::ExternalAttributeTable);
//! 0 means the cell has none.
//!
//! The code is a Unicode scalar value, a key into the screen's complex
//! character table when [`CellFlags::COMPLEX`] is set, or one of the
//! sentinels below.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::color::Color;

/// Right half of a double-width character that was wrapped to the next line
pub const DWC_SKIP: u32 = 0xf000;
/// Cells skipped by a tab; the last one holds a literal `\t`
pub const TAB_FILLER: u32 = 0xf001;
/// Rendered as `?`
pub const BOGUS_CHAR: u32 = 0xf002;
/// Right half of a double-width character
pub const DWC_RIGHT: u32 = 0xf003;

/// Size of the packed binary record
pub const CELL_RECORD_SIZE: usize = 16;

const UNDERLINE_SHIFT: u16 = 12;
const FLAG_BITS: u16 = (1 << UNDERLINE_SHIFT) - 1;

bitflags! {
    /// Attribute bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u16 {
        const BOLD = 1 << 0;
        const FAINT = 1 << 1;
        const ITALIC = 1 << 2;
        const BLINK = 1 << 3;
        const UNDERLINE = 1 << 4;
        const STRIKETHROUGH = 1 << 5;
        const INVERSE = 1 << 6;
        const INVISIBLE = 1 << 7;
        /// `code` is a complex character key
        const COMPLEX = 1 << 8;
    }
}

/// Underline style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnderlineStyle {
    #[default]
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

impl UnderlineStyle {
    fn to_bits(self) -> u16 {
        match self {
            UnderlineStyle::Single => 0,
            UnderlineStyle::Double => 1,
            UnderlineStyle::Curly => 2,
            UnderlineStyle::Dotted => 3,
            UnderlineStyle::Dashed => 4,
        }
    }

    fn from_bits(bits: u16) -> Self {
        match bits {
            1 => UnderlineStyle::Double,
            2 => UnderlineStyle::Curly,
            3 => UnderlineStyle::Dotted,
            4 => UnderlineStyle::Dashed,
            _ => UnderlineStyle::Single,
        }
    }
}

/// How a row ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineEnd {
    /// Explicit end of line
    #[default]
    Hard,
    /// Soft wrap: the logical line continues on the next row
    Soft,
    /// Soft wrap forced by a double-width character that did not fit;
    /// the last column holds [`DWC_SKIP`]
    Dwc,
}

impl LineEnd {
    /// Numeric code (hard 0, soft 1, double-width 2)
    pub fn code(self) -> u8 {
        match self {
            LineEnd::Hard => 0,
            LineEnd::Soft => 1,
            LineEnd::Dwc => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(LineEnd::Hard),
            1 => Some(LineEnd::Soft),
            2 => Some(LineEnd::Dwc),
            _ => None,
        }
    }

    /// True when the logical line continues on the next row
    pub fn continues(self) -> bool {
        self != LineEnd::Hard
    }
}

/// A single character cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    /// Character code, complex key or sentinel; 0 means never written
    pub code: u32,
    pub fg: Color,
    pub bg: Color,
    pub flags: CellFlags,
    /// Meaningful only when [`CellFlags::UNDERLINE`] is set
    pub underline: UnderlineStyle,
    /// External attribute key, 0 for none
    pub external: u16,
}

impl Cell {
    /// A never-written cell with default colors
    pub const EMPTY: Cell = Cell {
        code: 0,
        fg: Color::Default,
        bg: Color::Default,
        flags: CellFlags::empty(),
        underline: UnderlineStyle::Single,
        external: 0,
    };

    /// A default-attribute cell holding `c`
    pub fn new(c: char) -> Self {
        Self {
            code: c as u32,
            ..Self::EMPTY
        }
    }

    /// Copy of this cell with another code, keeping colors and attributes
    pub fn with_code(self, code: u32) -> Self {
        Self {
            code,
            flags: self.flags - CellFlags::COMPLEX,
            ..self
        }
    }

    /// Blank (never-written) cell carrying this cell's background
    pub fn blank(self) -> Self {
        Self {
            bg: self.bg,
            ..Self::EMPTY
        }
    }

    /// Never written
    pub fn is_empty(&self) -> bool {
        self.code == 0 && !self.is_complex()
    }

    pub fn is_complex(&self) -> bool {
        self.flags.contains(CellFlags::COMPLEX)
    }

    pub fn is_dwc_right(&self) -> bool {
        !self.is_complex() && self.code == DWC_RIGHT
    }

    pub fn is_dwc_skip(&self) -> bool {
        !self.is_complex() && self.code == DWC_SKIP
    }

    pub fn is_tab_filler(&self) -> bool {
        !self.is_complex() && self.code == TAB_FILLER
    }

    /// True for sentinel codes that carry no character of their own
    pub fn is_sentinel(&self) -> bool {
        !self.is_complex() && (DWC_SKIP..=DWC_RIGHT).contains(&self.code)
    }

    /// The character for simple cells; `None` for empty, complex and
    /// sentinel cells (except [`BOGUS_CHAR`], which reads as `?`)
    pub fn char(&self) -> Option<char> {
        if self.is_complex() || self.code == 0 {
            return None;
        }
        match self.code {
            BOGUS_CHAR => Some('?'),
            DWC_SKIP | TAB_FILLER | DWC_RIGHT => None,
            code => char::from_u32(code),
        }
    }

    /// Pack into the stable binary record
    pub fn to_bytes(&self) -> [u8; CELL_RECORD_SIZE] {
        let mut out = [0u8; CELL_RECORD_SIZE];
        out[0..4].copy_from_slice(&self.code.to_le_bytes());
        out[4..8].copy_from_slice(&self.fg.to_bytes());
        out[8..12].copy_from_slice(&self.bg.to_bytes());
        let packed = self.flags.bits() | (self.underline.to_bits() << UNDERLINE_SHIFT);
        out[12..14].copy_from_slice(&packed.to_le_bytes());
        out[14..16].copy_from_slice(&self.external.to_le_bytes());
        out
    }

    /// Unpack a record produced by [`Cell::to_bytes`]
    pub fn from_bytes(bytes: &[u8; CELL_RECORD_SIZE]) -> Self {
        let packed = u16::from_le_bytes([bytes[12], bytes[13]]);
        Self {
            code: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            fg: Color::from_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            bg: Color::from_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            flags: CellFlags::from_bits_truncate(packed & FLAG_BITS),
            underline: UnderlineStyle::from_bits(packed >> UNDERLINE_SHIFT),
            external: u16::from_le_bytes([bytes[14], bytes[15]]),
        }
    }
}

/// Pack a run of cells into consecutive records
pub fn pack_cells(cells: &[Cell]) -> Vec<u8> {
    cells.iter().flat_map(|c| c.to_bytes()).collect()
}

/// Unpack consecutive records; `None` if the length is not a multiple of the record size
pub fn unpack_cells(bytes: &[u8]) -> Option<Vec<Cell>> {
    if bytes.len() % CELL_RECORD_SIZE != 0 {
        return None;
    }
    bytes
        .chunks_exact(CELL_RECORD_SIZE)
        .map(|chunk| chunk.try_into().ok().map(Cell::from_bytes))
        .collect()
}
