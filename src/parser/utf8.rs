//! UTF-8 decoding
//!
//! Decoding follows a three-way contract on the bytes at the head of the
//! input (see [`sequence_length`]):
//!
//! - a positive N: the first N bytes form one legal code point
//! - a negative N: the first `|N|` bytes are illegal and are replaced by a
//!   single U+FFFD, the input still advances by `|N|`
//! - zero: the bytes are a valid prefix of a sequence that is not complete yet
//!
//! Illegal sequences are measured as the maximal valid prefix, so a stray
//! continuation byte or a lead byte followed by a non-continuation costs
//! exactly one replacement character.

/// Replacement character emitted for illegal input
pub const REPLACEMENT: char = '\u{FFFD}';

/// Result of decoding one code point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Step {
    /// A legal character spanning this many bytes
    Char(char, usize),
    /// This many bytes are illegal; emit one U+FFFD
    Invalid(usize),
    /// Valid so far, more bytes needed
    Incomplete,
}

/// Classify the sequence at the head of `bytes`.
///
/// Returns the signed length described in the module docs.
pub fn sequence_length(bytes: &[u8]) -> isize {
    let Some(&lead) = bytes.first() else {
        return 0;
    };

    // Expected length and the allowed range of the second byte, which
    // excludes overlong forms, surrogates and values past U+10FFFF.
    let (len, lo, hi) = match lead {
        0x00..=0x7F => return 1,
        0xC2..=0xDF => (2, 0x80, 0xBF),
        0xE0 => (3, 0xA0, 0xBF),
        0xE1..=0xEC | 0xEE..=0xEF => (3, 0x80, 0xBF),
        0xED => (3, 0x80, 0x9F),
        0xF0 => (4, 0x90, 0xBF),
        0xF1..=0xF3 => (4, 0x80, 0xBF),
        0xF4 => (4, 0x80, 0x8F),
        _ => return -1,
    };

    for i in 1..len {
        let Some(&b) = bytes.get(i) else {
            return 0;
        };
        let (lo, hi) = if i == 1 { (lo, hi) } else { (0x80, 0xBF) };
        if !(lo..=hi).contains(&b) {
            return -(i as isize);
        }
    }

    len as isize
}

/// Decode the code point at the head of `bytes`
pub fn decode(bytes: &[u8]) -> Utf8Step {
    let n = sequence_length(bytes);
    if n == 0 {
        return Utf8Step::Incomplete;
    }
    if n < 0 {
        return Utf8Step::Invalid(n.unsigned_abs());
    }

    let n = n as usize;
    let cp = match n {
        1 => bytes[0] as u32,
        2 => ((bytes[0] as u32 & 0x1F) << 6) | (bytes[1] as u32 & 0x3F),
        3 => {
            ((bytes[0] as u32 & 0x0F) << 12)
                | ((bytes[1] as u32 & 0x3F) << 6)
                | (bytes[2] as u32 & 0x3F)
        }
        _ => {
            ((bytes[0] as u32 & 0x07) << 18)
                | ((bytes[1] as u32 & 0x3F) << 12)
                | ((bytes[2] as u32 & 0x3F) << 6)
                | (bytes[3] as u32 & 0x3F)
        }
    };

    match char::from_u32(cp) {
        Some(c) => Utf8Step::Char(c, n),
        None => Utf8Step::Invalid(n),
    }
}
