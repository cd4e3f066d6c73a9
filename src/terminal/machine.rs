//! Terminal state machine
//!
//! Executes tokens against a [`ScreenSink`]. Everything here is a short,
//! non-blocking transition: a token is applied completely or, if it is not
//! understood, dropped with a debug log. Replies to queries (DSR, DA) are
//! queued and drained by the caller with [`Terminal::take_responses`].

use std::fmt;

use super::modes::{ansi_mode, DecMode, TerminalModes};
use super::sgr::apply_sgr;
use super::state::{KeyReportingFlags, ModifyKeys, SavedCursor, TerminalState};
use crate::core::{Charset, GraphicRendition};
use crate::parser::{CsiSequence, Encoding, EscAction, Token};
use crate::sink::{
    EraseDisplay, EraseLine, Mode, ScreenSink, TabClear, TitleStackOp, TitleTarget,
};

/// Primary device attributes: VT100 with advanced video option
const PRIMARY_DA: &[u8] = b"\x1b[?1;2c";
/// Secondary device attributes
const SECONDARY_DA: &[u8] = b"\x1b[>0;95;0c";

/// Modes compared when a reset needs to report what changed
const REPORTED_MODES: [Mode; 18] = [
    Mode::Insert,
    Mode::LineFeedNewLine,
    Mode::CursorKeys,
    Mode::Column132,
    Mode::ReverseVideo,
    Mode::Origin,
    Mode::Wraparound,
    Mode::CursorVisible,
    Mode::ReverseWraparound,
    Mode::KeypadApplication,
    Mode::MouseNormal,
    Mode::MouseButtonEvent,
    Mode::MouseAnyEvent,
    Mode::FocusReporting,
    Mode::MouseUtf8,
    Mode::MouseSgr,
    Mode::MouseUrxvt,
    Mode::BracketedPaste,
];

/// What a user-requested reset does with the line the cursor is on
pub enum PromptPolicy {
    /// Clear everything
    Discard,
    /// Keep the cursor's line at the top of the cleared screen
    Preserve,
    /// Decide at reset time
    Ask(Box<dyn FnMut() -> bool + Send>),
}

impl PromptPolicy {
    fn preserve(&mut self) -> bool {
        match self {
            PromptPolicy::Discard => false,
            PromptPolicy::Preserve => true,
            PromptPolicy::Ask(ask) => ask(),
        }
    }
}

impl Default for PromptPolicy {
    fn default() -> Self {
        PromptPolicy::Discard
    }
}

impl fmt::Debug for PromptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptPolicy::Discard => f.write_str("Discard"),
            PromptPolicy::Preserve => f.write_str("Preserve"),
            PromptPolicy::Ask(_) => f.write_str("Ask(..)"),
        }
    }
}

/// The terminal state machine
#[derive(Debug)]
pub struct Terminal {
    state: TerminalState,
    responses: Vec<u8>,
    prompt_policy: PromptPolicy,
    show_control_codes: bool,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new(Encoding::Utf8)
    }
}

impl Terminal {
    /// Create a state machine for a session using `encoding`
    pub fn new(encoding: Encoding) -> Self {
        Self {
            state: TerminalState::new(encoding),
            responses: Vec::new(),
            prompt_policy: PromptPolicy::default(),
            show_control_codes: false,
        }
    }

    pub fn state(&self) -> &TerminalState {
        &self.state
    }

    pub fn modes(&self) -> &TerminalModes {
        &self.state.modes
    }

    /// The rendition new text is printed with
    pub fn rendition(&self) -> &GraphicRendition {
        &self.state.rendition
    }

    /// Encoding the tokenizer should decode with
    pub fn active_encoding(&self) -> Encoding {
        self.state.active_encoding
    }

    pub fn key_flags(&self) -> KeyReportingFlags {
        self.state.key_flags
    }

    pub fn modify_keys(&self) -> &ModifyKeys {
        &self.state.modify_keys
    }

    pub fn set_prompt_policy(&mut self, policy: PromptPolicy) {
        self.prompt_policy = policy;
    }

    /// Send unhandled C0 controls to [`ScreenSink::on_control_code`]
    pub fn set_show_control_codes(&mut self, enabled: bool) {
        self.show_control_codes = enabled;
    }

    /// Drain bytes queued for the application (DSR and DA replies)
    pub fn take_responses(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.responses)
    }

    /// Apply one token
    pub fn execute(&mut self, token: Token, sink: &mut dyn ScreenSink) {
        match token {
            Token::Text(text) => self.print(&text, sink),
            Token::Control(byte) => self.execute_control(byte, sink),
            Token::Esc(action) => self.execute_esc(action, sink),
            Token::Csi(csi) => self.execute_csi(&csi, sink),
            Token::Osc(payload) => self.execute_osc(&payload, sink),
            Token::Dcs(payload) => sink.on_dcs(&payload),
        }
    }

    /// RIS. Modes that change are reported after the screen is cleared.
    pub fn hard_reset(&mut self, sink: &mut dyn ScreenSink) {
        let before = self.state.modes.clone();
        self.state.hard_reset();
        sink.on_full_reset(false);
        report_mode_changes(&before, &self.state.modes, sink);
    }

    /// Reset requested by the user. Like RIS, but the prompt line may be
    /// kept according to the installed [`PromptPolicy`].
    pub fn user_reset(&mut self, sink: &mut dyn ScreenSink) {
        let preserve = self.prompt_policy.preserve();
        let before = self.state.modes.clone();
        self.state.hard_reset();
        sink.on_full_reset(preserve);
        report_mode_changes(&before, &self.state.modes, sink);
    }

    /// DECSTR
    pub fn soft_reset(&mut self, sink: &mut dyn ScreenSink) {
        self.state.soft_reset();
        for (mode, enabled) in [
            (Mode::Insert, false),
            (Mode::Origin, false),
            (Mode::Wraparound, true),
            (Mode::CursorVisible, true),
            (Mode::ReverseWraparound, false),
            (Mode::CursorKeys, false),
            (Mode::KeypadApplication, false),
        ] {
            sink.on_mode_change(mode, enabled);
        }
        let (_, rows) = sink.dimensions();
        if rows > 1 {
            sink.on_set_scroll_region(0, rows - 1);
        }
    }

    /// The program in the session was restarted: turn off the features it
    /// asked for without touching the display
    pub fn relaunch_reset(&mut self, sink: &mut dyn ScreenSink) {
        let before = self.state.modes.clone();
        self.state.relaunch_reset();
        report_mode_changes(&before, &self.state.modes, sink);
    }

    fn print(&mut self, text: &str, sink: &mut dyn ScreenSink) {
        let rendition = self.state.rendition;
        for c in text.chars() {
            let c = self.state.charsets.translate(c);
            sink.on_print(c, &rendition);
            self.state.last_printed = Some(c);
        }
    }

    fn execute_control(&mut self, byte: u8, sink: &mut dyn ScreenSink) {
        match byte {
            0x07 => sink.on_bell(),
            0x08 => sink.on_backspace(),
            0x09 => sink.on_tab(1),
            0x0A | 0x0B | 0x0C => {
                // LF, VT and FF are the same; LNM adds a carriage return
                sink.on_linefeed();
                if self.state.modes.linefeed_newline {
                    sink.on_carriage_return();
                }
            }
            0x0D => sink.on_carriage_return(),
            0x0E => self.state.charsets.lock(1),
            0x0F => self.state.charsets.lock(0),
            0x01..=0x1F if self.show_control_codes => {
                sink.on_control_code(byte, &self.state.rendition);
            }
            _ => tracing::debug!(byte, "ignored control"),
        }
    }

    fn execute_esc(&mut self, action: EscAction, sink: &mut dyn ScreenSink) {
        match action {
            EscAction::SaveCursor => self.save_cursor(sink),
            EscAction::RestoreCursor => self.restore_cursor(sink),
            EscAction::Index => sink.on_linefeed(),
            EscAction::NextLine => {
                sink.on_carriage_return();
                sink.on_linefeed();
            }
            EscAction::TabSet => sink.on_set_tab_stop(),
            EscAction::ReverseIndex => sink.on_reverse_index(),
            EscAction::FullReset => self.hard_reset(sink),
            EscAction::KeypadApplication => self.set_mode(Mode::KeypadApplication, true, sink),
            EscAction::KeypadNumeric => self.set_mode(Mode::KeypadApplication, false, sink),
            EscAction::DesignateCharset { slot, charset } => {
                self.state
                    .charsets
                    .designate(slot, Charset::from_designator(charset));
            }
            EscAction::AlignmentTest => {
                self.state.modes.origin = false;
                sink.on_alignment_test();
            }
            EscAction::SingleShift(slot) => self.state.charsets.single_shift(slot),
            EscAction::LockingShift(slot) => self.state.charsets.lock(slot),
            EscAction::SelectUtf8 => self.state.active_encoding = Encoding::Utf8,
            EscAction::SelectDefaultEncoding => {
                self.state.active_encoding = self.state.canonical_encoding;
            }
        }
    }

    fn execute_csi(&mut self, csi: &CsiSequence, sink: &mut dyn ScreenSink) {
        match (csi.marker, csi.intermediate()) {
            (None, None) => self.execute_csi_plain(csi, sink),
            (Some(marker), None) => self.execute_csi_marked(marker, csi, sink),
            (None, Some(b'!')) if csi.final_byte == b'p' => self.soft_reset(sink),
            (None, Some(b' ')) if csi.final_byte == b'q' => {
                let style = csi.param(0, 0).clamp(0, 6) as u16;
                sink.on_cursor_style(style);
            }
            _ => unhandled(csi),
        }
    }

    fn execute_csi_plain(&mut self, csi: &CsiSequence, sink: &mut dyn ScreenSink) {
        let rendition = self.state.rendition;
        match csi.final_byte {
            // Cursor movement
            b'A' => {
                // CUU
                let n = count(csi, 0);
                self.cursor_up(n, sink);
            }
            b'B' | b'e' => {
                // CUD, VPR
                let n = count(csi, 0);
                self.cursor_down(n, sink);
            }
            b'C' | b'a' => {
                // CUF, HPR
                let (x, y) = sink.cursor_position();
                let (columns, _) = sink.dimensions();
                sink.on_cursor_move(x.saturating_add(count(csi, 0)).min(columns - 1), y);
            }
            b'D' => {
                // CUB
                let (x, y) = sink.cursor_position();
                sink.on_cursor_move(x.saturating_sub(count(csi, 0)), y);
            }
            b'E' => {
                // CNL
                self.cursor_down(count(csi, 0), sink);
                sink.on_carriage_return();
            }
            b'F' => {
                // CPL
                self.cursor_up(count(csi, 0), sink);
                sink.on_carriage_return();
            }
            b'G' | b'`' => {
                // CHA, HPA
                let (_, y) = sink.cursor_position();
                let (columns, _) = sink.dimensions();
                sink.on_cursor_move((count(csi, 0) - 1).min(columns - 1), y);
            }
            b'd' => {
                // VPA
                let (x, _) = sink.cursor_position();
                let y = self.resolve_row(count(csi, 0) - 1, sink);
                sink.on_cursor_move(x, y);
            }
            b'H' | b'f' => {
                // CUP, HVP
                let (columns, _) = sink.dimensions();
                let y = self.resolve_row(count(csi, 0) - 1, sink);
                let x = (count(csi, 1) - 1).min(columns - 1);
                sink.on_cursor_move(x, y);
            }

            // Erasing
            b'J' => {
                let mode = match csi.param(0, 0) {
                    0 => EraseDisplay::Below,
                    1 => EraseDisplay::Above,
                    2 => EraseDisplay::All,
                    3 => EraseDisplay::Scrollback,
                    _ => return unhandled(csi),
                };
                sink.on_erase_display(mode, &rendition);
            }
            b'K' => {
                let mode = match csi.param(0, 0) {
                    0 => EraseLine::Right,
                    1 => EraseLine::Left,
                    2 => EraseLine::All,
                    _ => return unhandled(csi),
                };
                sink.on_erase_line(mode, &rendition);
            }
            b'X' => sink.on_erase_chars(count(csi, 0), &rendition),

            // Editing
            b'@' => sink.on_insert_chars(count(csi, 0), &rendition),
            b'P' => sink.on_delete_chars(count(csi, 0), &rendition),
            b'L' => sink.on_insert_lines(count(csi, 0), &rendition),
            b'M' => sink.on_delete_lines(count(csi, 0), &rendition),
            b'S' => sink.on_scroll(count(csi, 0).min(isize::MAX as usize) as isize),
            b'T' if csi.params.len() <= 1 => {
                sink.on_scroll(-(count(csi, 0).min(isize::MAX as usize) as isize));
            }

            // Tabs
            b'I' => sink.on_tab(count(csi, 0)),
            b'Z' => sink.on_back_tab(count(csi, 0)),
            b'g' => match csi.param(0, 0) {
                0 => sink.on_clear_tab_stop(TabClear::Current),
                3 => sink.on_clear_tab_stop(TabClear::All),
                _ => unhandled(csi),
            },

            b'b' => {
                // REP, bounded by the screen size
                if let Some(c) = self.state.last_printed {
                    let (columns, rows) = sink.dimensions();
                    let n = count(csi, 0).min(columns * rows);
                    for _ in 0..n {
                        sink.on_print(c, &rendition);
                    }
                }
            }

            b'r' => self.set_scroll_region(csi, sink),
            b's' => self.save_cursor(sink),
            b'u' => self.restore_cursor(sink),

            b'h' | b'l' => {
                let enable = csi.final_byte == b'h';
                for value in csi.params.iter().filter_map(|p| p.value()) {
                    match ansi_mode(value) {
                        Some(mode) => self.set_mode(mode, enable, sink),
                        None => tracing::debug!(mode = value, enable, "unknown ANSI mode"),
                    }
                }
            }
            b'm' => apply_sgr(&csi.params, &mut self.state.rendition),

            // Reports
            b'n' => match csi.param(0, 0) {
                5 => self.responses.extend_from_slice(b"\x1b[0n"),
                6 => {
                    let (x, y) = sink.cursor_position();
                    let (top, _) = sink.scroll_region();
                    let row = if self.state.modes.origin {
                        y.saturating_sub(top)
                    } else {
                        y
                    };
                    self.respond(format!("\x1b[{};{}R", row + 1, x + 1));
                }
                _ => unhandled(csi),
            },
            b'c' if csi.param(0, 0) == 0 => self.responses.extend_from_slice(PRIMARY_DA),

            b't' => self.window_op(csi, sink),
            _ => unhandled(csi),
        }
    }

    fn execute_csi_marked(&mut self, marker: u8, csi: &CsiSequence, sink: &mut dyn ScreenSink) {
        match (marker, csi.final_byte) {
            (b'?', b'h') | (b'?', b'l') => {
                let enable = csi.final_byte == b'h';
                for value in csi.params.iter().filter_map(|p| p.value()) {
                    self.set_dec_mode(value, enable, sink);
                }
            }
            (b'?', b'u') => {
                let flags = self.state.key_flags.bits();
                self.respond(format!("\x1b[?{flags}u"));
            }
            (b'>', b'c') => self.responses.extend_from_slice(SECONDARY_DA),
            (b'>', b'm') => {
                // xterm modifyKeys resources: `CSI > Ps ; Pm m`, Pm omitted disables
                let Some(resource) = csi.params.get(0) else {
                    self.state.modify_keys = ModifyKeys::default();
                    return;
                };
                let value = csi.params.get(1);
                self.state
                    .modify_keys
                    .set(usize::try_from(resource).unwrap_or(usize::MAX), value);
            }
            (b'>', b'n') => {
                let resource = csi.params.get(0).unwrap_or(0);
                self.state
                    .modify_keys
                    .set(usize::try_from(resource).unwrap_or(usize::MAX), None);
            }
            (b'>', b'u') => {
                let flags = key_flags(csi.params.get(0).unwrap_or(0));
                self.state.push_key_flags(flags);
            }
            (b'<', b'u') => self.state.pop_key_flags(count(csi, 0)),
            (b'=', b'u') => {
                let flags = key_flags(csi.params.get(0).unwrap_or(0));
                self.state.set_key_flags(flags, csi.param(1, 1));
            }
            _ => unhandled(csi),
        }
    }

    fn execute_osc(&mut self, payload: &str, sink: &mut dyn ScreenSink) {
        let (command, rest) = payload.split_once(';').unwrap_or((payload, ""));
        match command {
            "0" => sink.on_set_title(TitleTarget::Both, rest),
            "1" => sink.on_set_title(TitleTarget::Icon, rest),
            "2" => sink.on_set_title(TitleTarget::Window, rest),
            "7" => sink.on_set_directory(directory_from_url(rest)),
            "8" => {
                let (params, uri) = rest.split_once(';').unwrap_or((rest, ""));
                self.state.rendition.hyperlink_id = sink.register_hyperlink(params, uri);
            }
            "52" => {
                let (selection, data) = rest.split_once(';').unwrap_or(("", rest));
                sink.on_clipboard(selection, data);
            }
            "1337" => {
                if rest == "SetMark" {
                    sink.on_set_mark();
                } else if let Some(path) = rest.strip_prefix("CurrentDir=") {
                    sink.on_set_directory(path);
                } else if let Some(args) = rest.strip_prefix("Block=") {
                    self.update_block(args, sink);
                } else {
                    tracing::debug!(payload = rest, "unhandled OSC 1337");
                }
            }
            _ => tracing::debug!(command, "unhandled OSC"),
        }
    }

    /// `Block=id=NAME;attr=start` opens a block, `attr=end` closes it.
    /// Text printed while a block is open carries its id.
    fn update_block(&mut self, args: &str, sink: &mut dyn ScreenSink) {
        let mut name = None;
        let mut attr = None;
        for (key, value) in args.split(';').filter_map(|kv| kv.split_once('=')) {
            match key {
                "id" => name = Some(value),
                "attr" => attr = Some(value),
                _ => {}
            }
        }
        match (name, attr) {
            (Some(name), Some("start")) => {
                self.state.rendition.block_id = sink.register_block(name);
            }
            (Some(_), Some("end")) => self.state.rendition.block_id = None,
            _ => tracing::debug!(args, "malformed OSC 1337 Block"),
        }
    }

    fn set_mode(&mut self, mode: Mode, enable: bool, sink: &mut dyn ScreenSink) {
        self.state.modes.set(mode, enable);
        sink.on_mode_change(mode, enable);
        if mode == Mode::Origin {
            self.home(sink);
        }
    }

    fn set_dec_mode(&mut self, value: i64, enable: bool, sink: &mut dyn ScreenSink) {
        let Some(mode) = DecMode::from_number(value) else {
            tracing::debug!(mode = value, enable, "unknown DEC mode");
            return;
        };
        match mode {
            DecMode::Flag(flag) => self.set_mode(flag, enable, sink),
            DecMode::AlternateScreen => self.switch_screen(enable, false, sink),
            DecMode::AlternateScreenClear => self.switch_screen(enable, !enable, sink),
            DecMode::SaveCursor => {
                if enable {
                    self.save_cursor(sink);
                } else {
                    self.restore_cursor(sink);
                }
            }
            DecMode::AlternateScreenSaveCursor => {
                if enable {
                    if !self.state.using_alternate {
                        self.save_cursor(sink);
                    }
                    self.switch_screen(true, true, sink);
                } else if self.state.using_alternate {
                    self.switch_screen(false, false, sink);
                    self.restore_cursor(sink);
                }
            }
        }
    }

    fn switch_screen(&mut self, enable: bool, clear: bool, sink: &mut dyn ScreenSink) {
        self.state.using_alternate = enable;
        sink.on_alternate_screen(enable, clear);
    }

    fn save_cursor(&mut self, sink: &mut dyn ScreenSink) {
        let (x, y) = sink.cursor_position();
        let saved = SavedCursor {
            x,
            y,
            charsets: self.state.charsets,
            rendition: self.state.rendition,
            origin: self.state.modes.origin,
        };
        self.state.set_saved_cursor(saved);
    }

    /// DECRC. With nothing saved the cursor goes home with default
    /// attributes.
    fn restore_cursor(&mut self, sink: &mut dyn ScreenSink) {
        let saved = self.state.saved_cursor().copied().unwrap_or_default();
        self.state.charsets = saved.charsets;
        self.state.rendition = saved.rendition;
        if self.state.modes.origin != saved.origin {
            self.state.modes.origin = saved.origin;
            sink.on_mode_change(Mode::Origin, saved.origin);
        }
        let (columns, rows) = sink.dimensions();
        sink.on_cursor_move(saved.x.min(columns - 1), saved.y.min(rows - 1));
    }

    fn set_scroll_region(&mut self, csi: &CsiSequence, sink: &mut dyn ScreenSink) {
        let (_, rows) = sink.dimensions();
        let top = count(csi, 0) - 1;
        let bottom = (csi.param(1, rows as i64).max(1) as usize).min(rows) - 1;
        if top >= bottom {
            tracing::debug!(top, bottom, "ignored DECSTBM");
            return;
        }
        sink.on_set_scroll_region(top, bottom);
        self.home(sink);
    }

    fn window_op(&mut self, csi: &CsiSequence, sink: &mut dyn ScreenSink) {
        match csi.param(0, 0) {
            8 => {
                let (columns, rows) = sink.dimensions();
                let rows = positive(csi.params.get(1)).unwrap_or(rows);
                let columns = positive(csi.params.get(2)).unwrap_or(columns);
                sink.on_resize_request(columns, rows);
            }
            22 => sink.on_title_stack(TitleStackOp::Push),
            23 => sink.on_title_stack(TitleStackOp::Pop),
            _ => unhandled(csi),
        }
    }

    /// Home position, which is the top of the scroll region in origin mode
    fn home(&self, sink: &mut dyn ScreenSink) {
        let y = self.resolve_row(0, sink);
        sink.on_cursor_move(0, y);
    }

    /// Absolute row for a 0-based row parameter, honouring origin mode
    fn resolve_row(&self, row: usize, sink: &dyn ScreenSink) -> usize {
        let (_, rows) = sink.dimensions();
        if self.state.modes.origin {
            let (top, bottom) = sink.scroll_region();
            top.saturating_add(row).min(bottom)
        } else {
            row.min(rows - 1)
        }
    }

    /// CUU stops at the top margin when starting inside the region
    fn cursor_up(&self, n: usize, sink: &mut dyn ScreenSink) {
        let (x, y) = sink.cursor_position();
        let (top, _) = sink.scroll_region();
        let limit = if y >= top { top } else { 0 };
        sink.on_cursor_move(x, y.saturating_sub(n).max(limit));
    }

    fn cursor_down(&self, n: usize, sink: &mut dyn ScreenSink) {
        let (x, y) = sink.cursor_position();
        let (_, rows) = sink.dimensions();
        let (_, bottom) = sink.scroll_region();
        let limit = if y <= bottom { bottom } else { rows - 1 };
        sink.on_cursor_move(x, y.saturating_add(n).min(limit));
    }

    fn respond(&mut self, reply: String) {
        self.responses.extend_from_slice(reply.as_bytes());
    }
}

/// Count parameter: omitted or zero means one
fn count(csi: &CsiSequence, index: usize) -> usize {
    usize::try_from(csi.param(index, 1).max(1)).unwrap_or(usize::MAX)
}

fn positive(value: Option<i64>) -> Option<usize> {
    value
        .filter(|&v| v > 0)
        .and_then(|v| usize::try_from(v).ok())
}

fn key_flags(value: i64) -> KeyReportingFlags {
    KeyReportingFlags::from_bits_truncate(u8::try_from(value.clamp(0, 255)).unwrap_or(0))
}

/// `file://host/path` to `/path`; anything else is passed through
fn directory_from_url(url: &str) -> &str {
    match url.strip_prefix("file://") {
        Some(rest) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => url,
    }
}

fn report_mode_changes(before: &TerminalModes, after: &TerminalModes, sink: &mut dyn ScreenSink) {
    for mode in REPORTED_MODES {
        let enabled = after.get(mode);
        if before.get(mode) != enabled {
            sink.on_mode_change(mode, enabled);
        }
    }
}

fn unhandled(csi: &CsiSequence) {
    tracing::debug!(
        params = ?csi.params,
        intermediates = ?csi.intermediates,
        marker = ?csi.marker.map(char::from),
        "unhandled CSI {}",
        char::from(csi.final_byte)
    );
}
