//! Character encodings understood by the tokenizer
//!
//! UTF-8 is decoded by [`super::utf8`]. The legacy double-byte encodings
//! are grouped by lead-byte predicates: a lead byte plus its trail byte form
//! one unit, which is decoded to a single character.

use serde::{Deserialize, Serialize};

/// Character printed for a legacy unit that cannot be decoded
pub const UNKNOWN_CHAR: char = '?';

/// Encoding of the byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    /// UTF-8
    #[default]
    Utf8,
    /// ISO-8859-1; every byte is one character
    Latin1,
    /// Simplified Chinese (EUC-CN / GB2312, decoded as GBK)
    EucCn,
    /// Traditional Chinese
    Big5,
    /// Japanese
    ShiftJis,
    /// Korean
    EucKr,
    /// Korean, Unified Hangul Code
    Cp949,
}

type BytePredicate = fn(u8) -> bool;

/// Lead-byte and trail-byte predicates for each double-byte encoding
const DOUBLE_BYTE_TABLE: [(Encoding, BytePredicate, BytePredicate); 5] = [
    (Encoding::EucCn, is_euc_cn_lead, is_euc_trail),
    (Encoding::Big5, is_big5_lead, is_big5_trail),
    (Encoding::ShiftJis, is_sjis_lead, is_sjis_trail),
    (Encoding::EucKr, is_euc_kr_lead, is_euc_trail),
    (Encoding::Cp949, is_cp949_lead, is_cp949_trail),
];

fn is_euc_cn_lead(b: u8) -> bool {
    (0xA1..=0xF7).contains(&b)
}

fn is_euc_kr_lead(b: u8) -> bool {
    (0xA1..=0xFE).contains(&b)
}

fn is_euc_trail(b: u8) -> bool {
    (0xA1..=0xFE).contains(&b)
}

fn is_big5_lead(b: u8) -> bool {
    (0x81..=0xFE).contains(&b)
}

fn is_big5_trail(b: u8) -> bool {
    (0x40..=0x7E).contains(&b) || (0xA1..=0xFE).contains(&b)
}

fn is_sjis_lead(b: u8) -> bool {
    (0x81..=0x9F).contains(&b) || (0xE0..=0xFC).contains(&b)
}

fn is_sjis_trail(b: u8) -> bool {
    (0x40..=0x7E).contains(&b) || (0x80..=0xFC).contains(&b)
}

fn is_cp949_lead(b: u8) -> bool {
    (0x81..=0xFE).contains(&b)
}

fn is_cp949_trail(b: u8) -> bool {
    (0x41..=0x5A).contains(&b) || (0x61..=0x7A).contains(&b) || (0x81..=0xFE).contains(&b)
}

impl Encoding {
    /// Parse an encoding name such as `utf-8`, `shift_jis` or `cp949`
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "utf8" => Some(Encoding::Utf8),
            "latin1" | "iso88591" => Some(Encoding::Latin1),
            "euccn" | "gb2312" | "gbk" => Some(Encoding::EucCn),
            "big5" => Some(Encoding::Big5),
            "shiftjis" | "sjis" => Some(Encoding::ShiftJis),
            "euckr" => Some(Encoding::EucKr),
            "cp949" | "uhc" => Some(Encoding::Cp949),
            _ => None,
        }
    }

    /// Canonical display name
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "iso-8859-1",
            Encoding::EucCn => "euc-cn",
            Encoding::Big5 => "big5",
            Encoding::ShiftJis => "shift_jis",
            Encoding::EucKr => "euc-kr",
            Encoding::Cp949 => "cp949",
        }
    }

    fn predicates(self) -> Option<(BytePredicate, BytePredicate)> {
        DOUBLE_BYTE_TABLE
            .iter()
            .find(|(encoding, _, _)| *encoding == self)
            .map(|&(_, lead, trail)| (lead, trail))
    }

    /// Whether `byte` starts a multi-byte character in this encoding
    pub fn is_lead_byte(self, byte: u8) -> bool {
        match self {
            Encoding::Utf8 => byte >= 0xC2 && byte <= 0xF4,
            Encoding::Latin1 => false,
            other => other.predicates().is_some_and(|(lead, _)| lead(byte)),
        }
    }

    /// Number of bytes forming one unit at the head of `bytes` for the
    /// double-byte and single-byte encodings. Zero means more input is needed.
    ///
    /// UTF-8 goes through [`super::utf8::sequence_length`] instead.
    pub fn unit_length(self, bytes: &[u8]) -> usize {
        let Some(&first) = bytes.first() else {
            return 0;
        };
        let Some((lead, trail)) = self.predicates() else {
            return 1;
        };
        if !lead(first) {
            return 1;
        }
        match bytes.get(1) {
            None => 0,
            Some(&second) if trail(second) => 2,
            // A lead byte without a valid trail is decoded on its own.
            Some(_) => 1,
        }
    }

    /// Decode one unit produced by [`Encoding::unit_length`]
    pub fn decode_unit(self, unit: &[u8]) -> char {
        let codec = match self {
            Encoding::Utf8 => {
                return std::str::from_utf8(unit)
                    .ok()
                    .and_then(|s| s.chars().next())
                    .unwrap_or(super::utf8::REPLACEMENT);
            }
            Encoding::Latin1 => {
                return unit.first().map(|&b| b as char).unwrap_or(UNKNOWN_CHAR);
            }
            Encoding::EucCn => encoding_rs::GBK,
            Encoding::Big5 => encoding_rs::BIG5,
            Encoding::ShiftJis => encoding_rs::SHIFT_JIS,
            // encoding_rs implements EUC-KR as its windows-949 superset
            Encoding::EucKr | Encoding::Cp949 => encoding_rs::EUC_KR,
        };

        let (decoded, had_errors) = codec.decode_without_bom_handling(unit);
        if had_errors {
            return UNKNOWN_CHAR;
        }
        let mut chars = decoded.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => UNKNOWN_CHAR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Encoding::from_name("UTF-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::from_name("Shift_JIS"), Some(Encoding::ShiftJis));
        assert_eq!(Encoding::from_name("cp949"), Some(Encoding::Cp949));
        assert_eq!(Encoding::from_name("klingon"), None);
    }

    #[test]
    fn test_lead_byte_predicates() {
        assert!(Encoding::ShiftJis.is_lead_byte(0x82));
        assert!(!Encoding::ShiftJis.is_lead_byte(0xB1)); // half-width katakana
        assert!(Encoding::Big5.is_lead_byte(0xA4));
        assert!(Encoding::EucKr.is_lead_byte(0xB0));
        assert!(!Encoding::EucKr.is_lead_byte(0x81));
        assert!(Encoding::Cp949.is_lead_byte(0x81));
        assert!(!Encoding::Latin1.is_lead_byte(0xE9));
    }

    #[test]
    fn test_unit_length() {
        assert_eq!(Encoding::ShiftJis.unit_length(&[0x82, 0xA0]), 2);
        assert_eq!(Encoding::ShiftJis.unit_length(&[0x82]), 0);
        assert_eq!(Encoding::ShiftJis.unit_length(&[0x82, 0x0A]), 1);
        assert_eq!(Encoding::ShiftJis.unit_length(&[0xB1]), 1);
        assert_eq!(Encoding::Latin1.unit_length(&[0xE9]), 1);
    }

    #[test]
    fn test_decode_units() {
        // Hiragana A in Shift-JIS
        assert_eq!(Encoding::ShiftJis.decode_unit(&[0x82, 0xA0]), 'あ');
        // Half-width katakana A
        assert_eq!(Encoding::ShiftJis.decode_unit(&[0xB1]), 'ｱ');
        // "中" in GB2312 and Big5
        assert_eq!(Encoding::EucCn.decode_unit(&[0xD6, 0xD0]), '中');
        assert_eq!(Encoding::Big5.decode_unit(&[0xA4, 0xA4]), '中');
        // Hangul GA in EUC-KR
        assert_eq!(Encoding::EucKr.decode_unit(&[0xB0, 0xA1]), '가');
        assert_eq!(Encoding::Latin1.decode_unit(&[0xE9]), 'é');
    }

    #[test]
    fn test_undecodable_unit() {
        assert_eq!(Encoding::EucKr.decode_unit(&[0x80]), UNKNOWN_CHAR);
    }
}
