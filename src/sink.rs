//! Screen sink
//!
//! The state machine never touches cells directly. Everything that changes
//! visible content goes through [`ScreenSink`], which [`Screen`] implements
//! and which an embedding application may wrap or replace.
//!
//! [`Screen`]: crate::core::Screen

use serde::{Deserialize, Serialize};

use crate::core::GraphicRendition;

/// Modes reported through [`ScreenSink::on_mode_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// IRM (ANSI 4)
    Insert,
    /// LNM (ANSI 20)
    LineFeedNewLine,
    /// DECCKM (?1)
    CursorKeys,
    /// DECCOLM (?3)
    Column132,
    /// DECSCNM (?5)
    ReverseVideo,
    /// DECOM (?6)
    Origin,
    /// DECAWM (?7)
    Wraparound,
    /// DECTCEM (?25)
    CursorVisible,
    /// Reverse wraparound (?45)
    ReverseWraparound,
    /// DECKPAM / DECKPNM
    KeypadApplication,
    /// ?1000
    MouseNormal,
    /// ?1002
    MouseButtonEvent,
    /// ?1003
    MouseAnyEvent,
    /// ?1004
    FocusReporting,
    /// ?1005
    MouseUtf8,
    /// ?1006
    MouseSgr,
    /// ?1015
    MouseUrxvt,
    /// ?2004
    BracketedPaste,
}

/// ED parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseDisplay {
    /// From the cursor to the end of the screen
    Below,
    /// From the start of the screen to the cursor
    Above,
    All,
    /// ED 3: scrollback only
    Scrollback,
}

/// EL parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseLine {
    Right,
    Left,
    All,
}

/// TBC parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabClear {
    Current,
    All,
}

/// Which title an OSC sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleTarget {
    Window,
    Icon,
    Both,
}

/// xterm title stack operation (`CSI 22 t`, `CSI 23 t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStackOp {
    Push,
    Pop,
}

/// Receiver of screen-mutating calls from the state machine.
///
/// Coordinates are 0-based and absolute (origin mode is resolved by the
/// caller). Methods with a default body are notifications the core does
/// not need to act on.
pub trait ScreenSink {
    /// Print one character with the given rendition at the cursor
    fn on_print(&mut self, c: char, rendition: &GraphicRendition);
    fn on_backspace(&mut self);
    /// Advance to the `count`th next tab stop
    fn on_tab(&mut self, count: usize);
    fn on_back_tab(&mut self, count: usize);
    fn on_linefeed(&mut self);
    fn on_carriage_return(&mut self);
    fn on_reverse_index(&mut self);
    fn on_cursor_move(&mut self, x: usize, y: usize);
    fn on_erase_display(&mut self, mode: EraseDisplay, rendition: &GraphicRendition);
    fn on_erase_line(&mut self, mode: EraseLine, rendition: &GraphicRendition);
    fn on_erase_chars(&mut self, count: usize, rendition: &GraphicRendition);
    fn on_insert_chars(&mut self, count: usize, rendition: &GraphicRendition);
    fn on_delete_chars(&mut self, count: usize, rendition: &GraphicRendition);
    fn on_insert_lines(&mut self, count: usize, rendition: &GraphicRendition);
    fn on_delete_lines(&mut self, count: usize, rendition: &GraphicRendition);
    /// Scroll the region: positive moves content up (SU), negative down (SD)
    fn on_scroll(&mut self, lines: isize);
    /// Inclusive 0-based rows; the caller has validated `top < bottom`
    fn on_set_scroll_region(&mut self, top: usize, bottom: usize);
    fn on_set_tab_stop(&mut self);
    fn on_clear_tab_stop(&mut self, mode: TabClear);
    fn on_alternate_screen(&mut self, enable: bool, clear: bool);
    fn on_clear_scrollback(&mut self);
    /// Full reset of screen contents; optionally keep the cursor's line
    fn on_full_reset(&mut self, preserve_prompt: bool);
    /// DECALN
    fn on_alignment_test(&mut self);

    /// Cursor `(x, y)`
    fn cursor_position(&self) -> (usize, usize);
    /// `(columns, rows)`
    fn dimensions(&self) -> (usize, usize);
    /// Inclusive `(top, bottom)`
    fn scroll_region(&self) -> (usize, usize);

    fn on_resize_request(&mut self, _columns: usize, _rows: usize) {}
    fn on_set_title(&mut self, _target: TitleTarget, _title: &str) {}
    fn on_title_stack(&mut self, _op: TitleStackOp) {}
    fn on_mode_change(&mut self, _mode: Mode, _enabled: bool) {}
    fn on_bell(&mut self) {}
    /// Register an OSC 8 target and return its id
    fn register_hyperlink(&mut self, _params: &str, _uri: &str) -> Option<u32> {
        None
    }
    /// Register an OSC 1337 block name and return its id
    fn register_block(&mut self, _name: &str) -> Option<u32> {
        None
    }
    /// A C0 control the terminal does not act on, sent only when control
    /// codes are shown
    fn on_control_code(&mut self, _code: u8, _rendition: &GraphicRendition) {}
    fn on_set_directory(&mut self, _path: &str) {}
    fn on_set_mark(&mut self) {}
    /// OSC 52; `data` is passed through undecoded
    fn on_clipboard(&mut self, _selection: &str, _data: &str) {}
    /// Opaque DCS payload
    fn on_dcs(&mut self, _payload: &str) {}
    /// DECSCUSR
    fn on_cursor_style(&mut self, _style: u16) {}
}
