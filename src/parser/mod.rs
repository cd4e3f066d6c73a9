//! Terminal input tokenizer
//!
//! Converts raw PTY bytes into tokens: control bytes, escape and control
//! sequences, OSC/DCS strings and runs of printable text. Based on the
//! VT500-series framing model from <https://vt100.net/emu/dec_ansi_parser>

mod byte_stream;
mod encoding;
mod params;
mod token;
mod tokenizer;
pub mod utf8;

pub use byte_stream::{ByteStream, DEFAULT_CAPACITY};
pub use encoding::{Encoding, UNKNOWN_CHAR};
pub use params::{Param, Params, MAX_PARAMS, MAX_PARAM_VALUE, MAX_SUBPARAMS};
pub use token::{CsiSequence, EscAction, Token};
pub use tokenizer::{Tokenizer, DEFAULT_MAX_SEQUENCE_LENGTH, MIN_MAX_SEQUENCE_LENGTH};
