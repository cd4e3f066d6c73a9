//! Tokenizer
//!
//! Turns buffered bytes into [`Token`]s. Unlike a byte-at-a-time state
//! machine, every call rescans the unconsumed head of the buffer from the
//! start of the next token. When the head holds an incomplete sequence
//! nothing is consumed and `None` is returned, so feeding the remainder later
//! produces the same tokens as feeding everything at once. This holds even
//! when the split falls inside a multi-byte character.
//!
//! Framing follows the VT500 model:
//!
//! ```text
//! Ground -> Escape -> CSI params* -> CSI final
//!                  -> OSC string -> ST | BEL
//!                  -> DCS string -> ST
//! ```
//!
//! A sequence that grows past the framing cap is abandoned: the capped
//! prefix is discarded and scanning resumes in Ground.

use super::byte_stream::ByteStream;
use super::encoding::Encoding;
use super::params::Params;
use super::token::{CsiSequence, EscAction, Token};
use super::utf8::{self, Utf8Step, REPLACEMENT};

/// Default cap on the length of a single escape sequence
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 65536;

/// Smallest accepted framing cap
pub const MIN_MAX_SEQUENCE_LENGTH: usize = 64;

const ESC: u8 = 0x1B;
const BEL: u8 = 0x07;
const CAN: u8 = 0x18;
const SUB: u8 = 0x1A;
const DEL: u8 = 0x7F;

/// Outcome of scanning the head of the buffer
#[derive(Debug)]
enum Scan {
    /// A token spanning this many bytes
    Token(Token, usize),
    /// This many bytes carry nothing to execute
    Skip(usize),
    /// The head is an incomplete sequence
    NeedMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    Osc,
    Dcs,
    /// SOS, PM and APC: framed, then dropped
    Ignored,
}

/// Rescanning tokenizer over a [`ByteStream`]
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stream: ByteStream,
    encoding: Encoding,
    max_sequence_length: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    /// Create a UTF-8 tokenizer
    pub fn new() -> Self {
        Self::with_encoding(Encoding::Utf8)
    }

    /// Create a tokenizer for a specific encoding
    pub fn with_encoding(encoding: Encoding) -> Self {
        Self {
            stream: ByteStream::new(),
            encoding,
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Switch encodings; takes effect for the next token
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    pub fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }

    pub fn set_max_sequence_length(&mut self, max: usize) {
        self.max_sequence_length = max.max(MIN_MAX_SEQUENCE_LENGTH);
    }

    /// Append bytes from the PTY
    pub fn feed(&mut self, bytes: &[u8]) {
        self.stream.append(bytes);
    }

    /// Number of buffered bytes not yet turned into tokens
    pub fn pending(&self) -> usize {
        self.stream.len()
    }

    /// Discard buffered input
    pub fn clear(&mut self) {
        self.stream.clear();
    }

    /// Produce the next token, or `None` when the buffer is exhausted or
    /// holds only an incomplete sequence
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            match self.scan(self.stream.unconsumed()) {
                Scan::Token(token, len) => {
                    self.stream.consume(len);
                    return Some(token);
                }
                Scan::Skip(len) => self.stream.consume(len),
                Scan::NeedMore => return None,
            }
        }
    }

    /// Feed bytes and collect every token that is complete
    pub fn tokenize(&mut self, bytes: &[u8]) -> Vec<Token> {
        self.feed(bytes);
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn scan(&self, bytes: &[u8]) -> Scan {
        let Some(&first) = bytes.first() else {
            return Scan::NeedMore;
        };

        match first {
            ESC => self.scan_escape(bytes),
            // NUL is padding
            0x00 | DEL => Scan::Skip(1),
            0x01..=0x1F => Scan::Token(Token::Control(first), 1),
            _ => self.scan_text(bytes),
        }
    }

    fn scan_text(&self, bytes: &[u8]) -> Scan {
        let mut text = String::new();
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            if b < 0x20 || b == DEL {
                break;
            }
            if b < 0x80 {
                text.push(b as char);
                i += 1;
                continue;
            }

            match self.encoding {
                Encoding::Utf8 => match utf8::decode(&bytes[i..]) {
                    Utf8Step::Char(c, len) => {
                        text.push(c);
                        i += len;
                    }
                    Utf8Step::Invalid(len) => {
                        text.push(REPLACEMENT);
                        i += len;
                    }
                    Utf8Step::Incomplete => break,
                },
                encoding => {
                    let len = encoding.unit_length(&bytes[i..]);
                    if len == 0 {
                        break;
                    }
                    text.push(encoding.decode_unit(&bytes[i..i + len]));
                    i += len;
                }
            }
        }

        if i == 0 {
            Scan::NeedMore
        } else {
            Scan::Token(Token::Text(text), i)
        }
    }

    fn scan_escape(&self, bytes: &[u8]) -> Scan {
        let Some(&next) = bytes.get(1) else {
            return Scan::NeedMore;
        };

        match next {
            b'[' => self.scan_csi(bytes),
            b']' => self.scan_string(bytes, StringKind::Osc),
            b'P' => self.scan_string(bytes, StringKind::Dcs),
            b'X' | b'^' | b'_' => self.scan_string(bytes, StringKind::Ignored),
            CAN | SUB => Scan::Skip(2),
            // ESC ESC, ESC followed by a control: abandon this ESC and let the
            // next byte be scanned on its own.
            0x00..=0x1F => Scan::Skip(1),
            0x20..=0x2F => self.scan_esc_intermediates(bytes),
            0x30..=0x7E => self.esc_token(&[], next, 2),
            _ => Scan::Skip(1),
        }
    }

    fn scan_esc_intermediates(&self, bytes: &[u8]) -> Scan {
        let mut i = 1;
        while i < bytes.len() && (0x20..=0x2F).contains(&bytes[i]) {
            i += 1;
            if i >= self.max_sequence_length {
                tracing::trace!("escape sequence exceeded {} bytes, ignored", i);
                return Scan::Skip(i);
            }
        }
        let Some(&final_byte) = bytes.get(i) else {
            return Scan::NeedMore;
        };
        if (0x30..=0x7E).contains(&final_byte) {
            self.esc_token(&bytes[1..i], final_byte, i + 1)
        } else {
            Scan::Skip(i)
        }
    }

    fn esc_token(&self, intermediates: &[u8], final_byte: u8, len: usize) -> Scan {
        match EscAction::from_bytes(intermediates, final_byte) {
            Some(action) => Scan::Token(Token::Esc(action), len),
            None => {
                tracing::debug!(
                    "Unknown escape sequence: ESC {:?} {}",
                    String::from_utf8_lossy(intermediates),
                    final_byte as char
                );
                Scan::Skip(len)
            }
        }
    }

    fn scan_csi(&self, bytes: &[u8]) -> Scan {
        let mut i = 2;
        let mut marker = None;
        if let Some(&b) = bytes.get(i) {
            if (0x3C..=0x3F).contains(&b) {
                marker = Some(b);
                i += 1;
            }
        }

        let mut param_bytes = Vec::new();
        let mut intermediates = Vec::new();
        let mut malformed = false;

        loop {
            if i >= self.max_sequence_length {
                tracing::trace!("CSI sequence exceeded {} bytes, ignored", i);
                return Scan::Skip(i);
            }
            let Some(&b) = bytes.get(i) else {
                return Scan::NeedMore;
            };
            match b {
                0x30..=0x3B => {
                    if intermediates.is_empty() {
                        param_bytes.push(b);
                    } else {
                        malformed = true;
                    }
                }
                0x3C..=0x3F => malformed = true,
                0x20..=0x2F => intermediates.push(b),
                0x40..=0x7E => {
                    if malformed {
                        tracing::debug!("Malformed CSI sequence ending in {}", b as char);
                        return Scan::Skip(i + 1);
                    }
                    let csi = CsiSequence {
                        params: Params::parse(&param_bytes),
                        intermediates,
                        final_byte: b,
                        marker,
                    };
                    return Scan::Token(Token::Csi(csi), i + 1);
                }
                CAN | SUB => return Scan::Skip(i + 1),
                ESC => return Scan::Skip(i),
                // Embedded C0 controls and DEL are dropped.
                0x00..=0x1F | DEL => {}
                _ => malformed = true,
            }
            i += 1;
        }
    }

    fn scan_string(&self, bytes: &[u8], kind: StringKind) -> Scan {
        let mut i = 2;
        loop {
            if i >= self.max_sequence_length {
                tracing::trace!("{:?} string exceeded {} bytes, ignored", kind, i);
                return Scan::Skip(i);
            }
            let Some(&b) = bytes.get(i) else {
                return Scan::NeedMore;
            };
            match b {
                BEL if kind == StringKind::Osc => return string_token(kind, &bytes[2..i], i + 1),
                ESC => {
                    return match bytes.get(i + 1) {
                        None => Scan::NeedMore,
                        Some(b'\\') => string_token(kind, &bytes[2..i], i + 2),
                        // Any other escape terminates the string and starts anew.
                        Some(_) => string_token(kind, &bytes[2..i], i),
                    };
                }
                CAN | SUB => return Scan::Skip(i + 1),
                _ => {}
            }
            i += 1;
        }
    }
}

fn string_token(kind: StringKind, payload: &[u8], len: usize) -> Scan {
    let payload = String::from_utf8_lossy(payload).into_owned();
    match kind {
        StringKind::Osc => Scan::Token(Token::Osc(payload), len),
        StringKind::Dcs => Scan::Token(Token::Dcs(payload), len),
        StringKind::Ignored => Scan::Skip(len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token> {
        Tokenizer::new().tokenize(input)
    }

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    #[test]
    fn test_tokenizer_text_run() {
        assert_eq!(tokens(b"Hello"), vec![text("Hello")]);
    }

    #[test]
    fn test_tokenizer_controls() {
        assert_eq!(
            tokens(b"a\r\nb"),
            vec![text("a"), Token::Control(b'\r'), Token::Control(b'\n'), text("b")]
        );
    }

    #[test]
    fn test_tokenizer_nul_and_del_dropped() {
        assert_eq!(tokens(b"a\x00b\x7f"), vec![text("a"), text("b")]);
    }

    #[test]
    fn test_tokenizer_csi() {
        let result = tokens(b"\x1b[1;31m");
        assert_eq!(result.len(), 1);
        if let Token::Csi(csi) = &result[0] {
            assert_eq!(csi.final_byte, b'm');
            assert_eq!(csi.params.get(0), Some(1));
            assert_eq!(csi.params.get(1), Some(31));
            assert_eq!(csi.marker, None);
        } else {
            panic!("Expected CSI token");
        }
    }

    #[test]
    fn test_tokenizer_csi_private() {
        let result = tokens(b"\x1b[?1049h");
        if let Token::Csi(csi) = &result[0] {
            assert_eq!(csi.marker, Some(b'?'));
            assert_eq!(csi.params.get(0), Some(1049));
            assert_eq!(csi.final_byte, b'h');
        } else {
            panic!("Expected CSI token");
        }
    }

    #[test]
    fn test_tokenizer_csi_intermediate() {
        let result = tokens(b"\x1b[2 q");
        if let Token::Csi(csi) = &result[0] {
            assert_eq!(csi.intermediates, vec![b' ']);
            assert_eq!(csi.final_byte, b'q');
        } else {
            panic!("Expected CSI token");
        }
    }

    #[test]
    fn test_tokenizer_malformed_csi_dropped() {
        assert_eq!(tokens(b"\x1b[1?2hX"), vec![text("X")]);
    }

    #[test]
    fn test_tokenizer_csi_cancelled() {
        assert_eq!(tokens(b"\x1b[12\x18X"), vec![text("X")]);
    }

    #[test]
    fn test_tokenizer_esc() {
        assert_eq!(tokens(b"\x1b7"), vec![Token::Esc(EscAction::SaveCursor)]);
        assert_eq!(
            tokens(b"\x1b(0"),
            vec![Token::Esc(EscAction::DesignateCharset { slot: 0, charset: b'0' })]
        );
    }

    #[test]
    fn test_tokenizer_unknown_esc_dropped() {
        assert_eq!(tokens(b"\x1bZok"), vec![text("ok")]);
    }

    #[test]
    fn test_tokenizer_osc_bel_and_st() {
        assert_eq!(tokens(b"\x1b]0;title\x07"), vec![Token::Osc("0;title".into())]);
        assert_eq!(tokens(b"\x1b]2;t\x1b\\"), vec![Token::Osc("2;t".into())]);
    }

    #[test]
    fn test_tokenizer_dcs() {
        assert_eq!(tokens(b"\x1bPtmux;x\x1b\\"), vec![Token::Dcs("tmux;x".into())]);
    }

    #[test]
    fn test_tokenizer_apc_dropped() {
        assert_eq!(tokens(b"\x1b_payload\x1b\\z"), vec![text("z")]);
    }

    #[test]
    fn test_tokenizer_need_more_keeps_bytes() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.feed(b"\x1b[3");
        assert_eq!(tokenizer.next_token(), None);
        assert_eq!(tokenizer.pending(), 3);

        tokenizer.feed(b"1m");
        assert!(matches!(tokenizer.next_token(), Some(Token::Csi(_))));
        assert_eq!(tokenizer.pending(), 0);
    }

    #[test]
    fn test_tokenizer_split_utf8() {
        let bytes = "a中".as_bytes();
        let mut tokenizer = Tokenizer::new();
        tokenizer.feed(&bytes[..2]);
        assert_eq!(tokenizer.next_token(), Some(text("a")));
        assert_eq!(tokenizer.next_token(), None);

        tokenizer.feed(&bytes[2..]);
        assert_eq!(tokenizer.next_token(), Some(text("中")));
    }

    #[test]
    fn test_tokenizer_invalid_utf8() {
        assert_eq!(tokens(b"a\xffb"), vec![text("a\u{FFFD}b")]);
        assert_eq!(tokens(b"\xe4\xb8z"), vec![text("\u{FFFD}z")]);
    }

    #[test]
    fn test_tokenizer_runaway_osc_abandoned() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.set_max_sequence_length(MIN_MAX_SEQUENCE_LENGTH);
        let mut input = b"\x1b]0;".to_vec();
        input.extend(std::iter::repeat(b'x').take(200));

        let result = tokenizer.tokenize(&input);
        assert!(result.iter().all(|t| !matches!(t, Token::Osc(_))));
        assert_eq!(tokenizer.pending(), 0);
    }

    #[test]
    fn test_tokenizer_shift_jis() {
        let mut tokenizer = Tokenizer::with_encoding(Encoding::ShiftJis);
        tokenizer.feed(&[b'a', 0x82]);
        assert_eq!(tokenizer.next_token(), Some(text("a")));
        assert_eq!(tokenizer.next_token(), None);

        tokenizer.feed(&[0xA0]);
        assert_eq!(tokenizer.next_token(), Some(text("あ")));
    }
}
