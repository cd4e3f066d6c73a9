//! Terminal state machine
//!
//! Turns tokens into calls on a [`ScreenSink`](crate::sink::ScreenSink):
//! - [`TerminalState`]: modes, charsets, rendition and saved cursors
//! - [`apply_sgr`]: table-driven SGR
//! - [`Terminal`]: dispatch of controls, escapes, CSI, OSC and DCS

mod machine;
mod modes;
mod sgr;
mod state;

pub use machine::{PromptPolicy, Terminal};
pub use modes::{ansi_mode, DecMode, MouseEncoding, MouseMode, TerminalModes};
pub use sgr::{apply_sgr, sgr_effect, SgrEffect, EXTENDED_COLOR_FORMS};
pub use state::{
    KeyReportingFlags, ModifyKeys, SavedCursor, TerminalState, KEY_FLAGS_STACK_LIMIT,
};
