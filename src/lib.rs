//! VT Terminal Emulation Core
//!
//! Platform-independent terminal emulation: bytes in, screen state out.
//!
//! - `parser`: byte stream, encodings and the tokenizer
//! - `terminal`: the state machine executing tokens
//! - `sink`: the interface the state machine drives
//! - `core`: grid, copy-on-write scrollback and the default [`Screen`] sink
//! - `session`: the three wired together behind `feed(bytes)`
//!
//! There is no windowing, PTY or rendering code here; an embedding
//! application implements or wraps [`ScreenSink`] to observe changes.

pub mod config;
pub mod core;
pub mod error;
pub mod parser;
pub mod session;
pub mod sink;
pub mod terminal;

pub use crate::config::Config;
pub use crate::core::{Screen, ScreenSnapshot, TextSnapshot};
pub use crate::error::{Error, Result};
pub use crate::parser::{Token, Tokenizer};
pub use crate::session::Session;
pub use crate::sink::ScreenSink;
pub use crate::terminal::{PromptPolicy, Terminal};
