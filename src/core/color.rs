//! Cell colors
//!
//! A color is the terminal default, an index into the 256-color palette
//! (0-15 are the ANSI colors set by SGR 30-37/90-97), or 24-bit RGB.

use serde::{Deserialize, Serialize};

/// Color mode discriminants used by the packed cell layout
const MODE_DEFAULT: u8 = 0;
const MODE_INDEXED: u8 = 1;
const MODE_RGB: u8 = 2;

/// Color of a cell's foreground, background or underline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    /// Default terminal color
    #[default]
    Default,
    /// Palette index: 0-7 standard, 8-15 bright, 16-231 cube, 232-255 grayscale
    Indexed(u8),
    /// 24-bit color
    Rgb { r: u8, g: u8, b: u8 },
}

impl Color {
    pub const BLACK: u8 = 0;
    pub const RED: u8 = 1;
    pub const GREEN: u8 = 2;
    pub const YELLOW: u8 = 3;
    pub const BLUE: u8 = 4;
    pub const MAGENTA: u8 = 5;
    pub const CYAN: u8 = 6;
    pub const WHITE: u8 = 7;

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }

    /// Pack into the 4-byte cell representation: three value bytes and a mode
    pub fn to_bytes(self) -> [u8; 4] {
        match self {
            Color::Default => [0, 0, 0, MODE_DEFAULT],
            Color::Indexed(i) => [i, 0, 0, MODE_INDEXED],
            Color::Rgb { r, g, b } => [r, g, b, MODE_RGB],
        }
    }

    /// Unpack from [`Color::to_bytes`]; unknown modes decode as default
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        match bytes[3] {
            MODE_INDEXED => Color::Indexed(bytes[0]),
            MODE_RGB => Color::Rgb {
                r: bytes[0],
                g: bytes[1],
                b: bytes[2],
            },
            _ => Color::Default,
        }
    }

    /// Resolve to RGB with the xterm palette; `default` stands in for `Default`
    pub fn to_rgb(self, default: (u8, u8, u8)) -> (u8, u8, u8) {
        match self {
            Color::Default => default,
            Color::Indexed(idx) => index_to_rgb(idx),
            Color::Rgb { r, g, b } => (r, g, b),
        }
    }
}

fn index_to_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0 => (0, 0, 0),
        1 => (205, 0, 0),
        2 => (0, 205, 0),
        3 => (205, 205, 0),
        4 => (0, 0, 238),
        5 => (205, 0, 205),
        6 => (0, 205, 205),
        7 => (229, 229, 229),
        8 => (127, 127, 127),
        9 => (255, 0, 0),
        10 => (0, 255, 0),
        11 => (255, 255, 0),
        12 => (92, 92, 255),
        13 => (255, 0, 255),
        14 => (0, 255, 255),
        15 => (255, 255, 255),
        16..=231 => {
            let idx = index - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            (level(idx / 36), level((idx % 36) / 6), level(idx % 6))
        }
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            (gray, gray, gray)
        }
    }
}
