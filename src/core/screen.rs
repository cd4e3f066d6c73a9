//! Screen model implementation
//!
//! The screen owns the primary and alternate grids, the scrollback and the
//! per-screen tables (complex characters, external attributes, hyperlinks,
//! blocks). It is the default
//! [`ScreenSink`]: the state machine drives it only through that trait.
//!
//! Resize reflows: the visible rows are pushed into the scrollback as
//! unwrapped lines and popped back out at the new width, so wrap points are
//! always derived by the same rule the scrollback uses for display.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

use super::attributes::{ExternalAttribute, ExternalAttributeTable};
use super::cell::{Cell, CellFlags, LineEnd, DWC_RIGHT, DWC_SKIP, TAB_FILLER};
use super::complex::ComplexChars;
use super::grid::{dwc_skip, Grid, GridCursor, Row};
use super::line_block::{ScrollbackLine, DEFAULT_BLOCK_SIZE};
use super::line_buffer::LineBuffer;
use super::rendition::GraphicRendition;
use super::snapshot::{ScreenSnapshot, TextSnapshot, SNAPSHOT_VERSION};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sink::{EraseDisplay, EraseLine, Mode, ScreenSink, TabClear, TitleStackOp, TitleTarget};

/// Deepest the xterm title stack may grow
const TITLE_STACK_LIMIT: usize = 10;

/// A registered OSC 8 target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hyperlink {
    /// The `id=` parameter, if the application gave one
    pub id: Option<String>,
    pub uri: String,
}

/// Mode flags the screen itself acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenModes {
    /// IRM
    pub insert: bool,
    /// DECAWM
    pub wraparound: bool,
    pub reverse_wraparound: bool,
    /// DECTCEM
    pub cursor_visible: bool,
    /// DECSCNM
    pub reverse_video: bool,
}

impl Default for ScreenModes {
    fn default() -> Self {
        Self {
            insert: false,
            wraparound: true,
            reverse_wraparound: false,
            cursor_visible: true,
            reverse_video: false,
        }
    }
}

/// The main screen structure
#[derive(Debug)]
pub struct Screen {
    primary: Grid,
    alternate: Grid,
    using_alternate: bool,
    /// History of the primary screen; the alternate screen has none
    scrollback: LineBuffer,
    complex: ComplexChars,
    externals: ExternalAttributeTable,
    /// Hyperlink id `n` is `hyperlinks[n - 1]`
    hyperlinks: Vec<Hyperlink>,
    hyperlink_ids: HashMap<Hyperlink, u32>,
    /// Block id `n` is `blocks[n - 1]`
    blocks: Vec<String>,
    modes: ScreenModes,
    ambiguous_is_double_width: bool,
    title: String,
    icon_title: String,
    title_stack: Vec<(String, String)>,
    current_directory: Option<String>,
    /// Absolute line numbers of marks (OSC 1337 SetMark)
    marks: Vec<usize>,
    bell_count: usize,
    clipboard: Option<(String, String)>,
    resize_request: Option<(usize, usize)>,
    cursor_style: u16,
    last_dcs: Option<String>,
}

impl Screen {
    /// Create a screen; `scrollback_lines` of `None` keeps everything
    pub fn new(columns: usize, rows: usize, scrollback_lines: Option<usize>) -> Result<Self> {
        Self::with_block_size(columns, rows, scrollback_lines, DEFAULT_BLOCK_SIZE)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let mut screen = Self::with_block_size(
            config.columns,
            config.rows,
            config.scrollback_limit(),
            config.block_size,
        )?;
        screen.ambiguous_is_double_width = config.ambiguous_is_double_width;
        Ok(screen)
    }

    fn with_block_size(
        columns: usize,
        rows: usize,
        scrollback_lines: Option<usize>,
        block_size: usize,
    ) -> Result<Self> {
        Ok(Self {
            primary: Grid::new(columns, rows)?,
            alternate: Grid::new(columns, rows)?,
            using_alternate: false,
            scrollback: LineBuffer::new(block_size, scrollback_lines),
            complex: ComplexChars::new(),
            externals: ExternalAttributeTable::new(),
            hyperlinks: Vec::new(),
            hyperlink_ids: HashMap::new(),
            blocks: Vec::new(),
            modes: ScreenModes::default(),
            ambiguous_is_double_width: false,
            title: String::new(),
            icon_title: String::new(),
            title_stack: Vec::new(),
            current_directory: None,
            marks: Vec::new(),
            bell_count: 0,
            clipboard: None,
            resize_request: None,
            cursor_style: 0,
            last_dcs: None,
        })
    }

    pub fn columns(&self) -> usize {
        self.primary.width()
    }

    pub fn rows(&self) -> usize {
        self.primary.height()
    }

    /// The active grid
    pub fn grid(&self) -> &Grid {
        if self.using_alternate {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn grid_mut(&mut self) -> &mut Grid {
        if self.using_alternate {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    pub fn primary(&self) -> &Grid {
        &self.primary
    }

    pub fn alternate(&self) -> &Grid {
        &self.alternate
    }

    pub fn is_alternate(&self) -> bool {
        self.using_alternate
    }

    pub fn cursor(&self) -> GridCursor {
        self.grid().cursor()
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        self.grid().cell(x, y)
    }

    pub fn scrollback(&self) -> &LineBuffer {
        &self.scrollback
    }

    /// Copy-on-write copy of the history for another thread
    pub fn fork_scrollback(&self) -> LineBuffer {
        self.scrollback.fork()
    }

    pub fn modes(&self) -> &ScreenModes {
        &self.modes
    }

    pub fn complex_chars(&self) -> &ComplexChars {
        &self.complex
    }

    /// External attribute a cell's key refers to
    pub fn external_attribute(&self, cell: &Cell) -> Option<&ExternalAttribute> {
        self.externals.get(cell.external)
    }

    pub fn external_attributes(&self) -> &ExternalAttributeTable {
        &self.externals
    }

    /// Name of a block registered through OSC 1337 Block
    pub fn block_name(&self, id: u32) -> Option<&str> {
        (id as usize)
            .checked_sub(1)
            .and_then(|i| self.blocks.get(i))
            .map(String::as_str)
    }

    pub fn hyperlink(&self, id: u32) -> Option<&Hyperlink> {
        (id as usize)
            .checked_sub(1)
            .and_then(|i| self.hyperlinks.get(i))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn icon_title(&self) -> &str {
        &self.icon_title
    }

    pub fn current_directory(&self) -> Option<&str> {
        self.current_directory.as_deref()
    }

    pub fn marks(&self) -> &[usize] {
        &self.marks
    }

    pub fn bell_count(&self) -> usize {
        self.bell_count
    }

    /// Last OSC 52 request as `(selection, data)`
    pub fn clipboard(&self) -> Option<(&str, &str)> {
        self.clipboard
            .as_ref()
            .map(|(selection, data)| (selection.as_str(), data.as_str()))
    }

    /// Last size the application asked for; the embedder decides whether to honor it
    pub fn resize_request(&self) -> Option<(usize, usize)> {
        self.resize_request
    }

    pub fn cursor_style(&self) -> u16 {
        self.cursor_style
    }

    pub fn last_dcs(&self) -> Option<&str> {
        self.last_dcs.as_deref()
    }

    pub fn ambiguous_is_double_width(&self) -> bool {
        self.ambiguous_is_double_width
    }

    pub fn set_ambiguous_is_double_width(&mut self, enabled: bool) {
        self.ambiguous_is_double_width = enabled;
    }

    /// Drain dirty ranges of the active grid
    pub fn take_dirty(&mut self) -> Vec<(usize, std::ops::Range<usize>)> {
        self.grid_mut().take_dirty()
    }

    // Printing

    fn char_width(&self, c: char) -> Option<usize> {
        if self.ambiguous_is_double_width {
            c.width_cjk()
        } else {
            c.width()
        }
    }

    /// Cell for `c`. Characters that collide with sentinel codes go through
    /// the complex table so they cannot be mistaken for layout markers.
    fn make_cell(&mut self, c: char, rendition: &GraphicRendition) -> Cell {
        let code = c as u32;
        if (DWC_SKIP..=DWC_RIGHT).contains(&code) {
            let key = self.complex.intern(c.encode_utf8(&mut [0; 4]));
            let mut cell = rendition.template().with_code(key);
            cell.flags |= CellFlags::COMPLEX;
            cell
        } else {
            rendition.template().with_code(code)
        }
    }

    /// Text a cell displays, `None` for empty cells and sentinels
    fn cell_string(&self, cell: &Cell) -> Option<String> {
        if cell.is_complex() {
            return self.complex.get(cell.code).map(str::to_string);
        }
        cell.char().map(String::from)
    }

    /// Cell a combining mark attaches to
    fn combining_target(&self) -> Option<(usize, usize)> {
        let grid = self.grid();
        let cursor = grid.cursor();
        let (mut x, y) = if cursor.pending_wrap {
            (cursor.x, cursor.y)
        } else if cursor.x > 0 {
            (cursor.x - 1, cursor.y)
        } else if cursor.y > 0 && grid.row(cursor.y - 1)?.eol.continues() {
            (grid.width() - 1, cursor.y - 1)
        } else {
            return None;
        };
        while x > 0 {
            let cell = grid.cell(x, y)?;
            if !(cell.is_dwc_right() || cell.is_dwc_skip()) {
                break;
            }
            x -= 1;
        }
        Some((x, y))
    }

    fn attach_combining(&mut self, mark: char) {
        let Some((x, y)) = self.combining_target() else {
            return;
        };
        let Some(base) = self.grid().cell(x, y).copied() else {
            return;
        };
        let Some(mut text) = self.cell_string(&base) else {
            return;
        };
        text.push(mark);
        let key = self.complex.intern(&text);
        let mut cell = base.with_code(key);
        cell.flags |= CellFlags::COMPLEX;
        self.grid_mut().replace_cell(x, y, cell);
    }

    /// Move to column 0 of the next row, scrolling if needed
    fn wrap_to_next_line(&mut self) {
        self.index();
        let y = self.grid().cursor().y;
        self.grid_mut().set_cursor(0, y);
    }

    /// Move down one row, scrolling the region at its bottom margin
    fn index(&mut self) {
        let cursor = self.grid().cursor();
        let (_, bottom) = self.grid().scroll_region();
        if cursor.y == bottom {
            self.scroll_region_up(1, Cell::EMPTY);
            self.grid_mut().set_cursor(cursor.x, cursor.y);
        } else if cursor.y + 1 < self.rows() {
            self.grid_mut().set_cursor(cursor.x, cursor.y + 1);
        } else {
            self.grid_mut().set_cursor(cursor.x, cursor.y);
        }
    }

    // Scrolling

    fn scroll_region_up(&mut self, n: usize, fill: Cell) {
        let (top, bottom) = self.grid().scroll_region();
        let removed = self.grid_mut().scroll_up(top, bottom, n, fill);
        if self.using_alternate || top != 0 {
            self.break_line_above(top);
            return;
        }
        self.push_to_scrollback(&removed);
    }

    fn scroll_region_down(&mut self, n: usize, fill: Cell) {
        let (top, bottom) = self.grid().scroll_region();
        self.grid_mut().scroll_down(top, bottom, n, fill);
        self.break_line_above(top);
        self.grid_mut().set_eol(bottom, LineEnd::Hard);
    }

    /// Row `y` no longer continues whatever was above it. At row 0 that is
    /// the last scrollback line.
    fn break_line_above(&mut self, y: usize) {
        if y > 0 {
            self.grid_mut().set_eol(y - 1, LineEnd::Hard);
        } else if !self.using_alternate {
            self.scrollback.end_partial_line();
        }
    }

    fn push_to_scrollback(&mut self, rows: &[Row]) {
        if self.scrollback.max_lines() == Some(0) {
            return;
        }
        for row in rows {
            let cells = row.logical_cells();
            let mut attributes = row.attributes.clone();
            attributes.truncate(cells.len());
            self.scrollback.push_line(cells, &attributes, row.eol);
        }
        let dropped = self.scrollback.drop_excess_lines(self.primary.width());
        if dropped > 0 {
            tracing::trace!(dropped, "scrollback trimmed");
        }
    }

    /// Absolute line number of the cursor, counting dropped history
    fn absolute_cursor_line(&self) -> usize {
        self.scrollback.dropped_lines()
            + self.scrollback.num_lines(self.columns())
            + self.primary.cursor().y
    }

    // Resize

    /// Change dimensions, reflowing the primary screen with its scrollback.
    /// Zero dimensions are rejected and nothing changes.
    pub fn resize(&mut self, columns: usize, rows: usize) -> Result<()> {
        if columns == 0 || rows == 0 {
            tracing::warn!(columns, rows, "rejected resize");
            return Err(Error::InvalidDimensions { columns, rows });
        }
        if columns == self.columns() && rows == self.rows() {
            return Ok(());
        }

        let primary = reflow(&self.primary, &mut self.scrollback, columns, rows)?;
        let alternate = reflow(&self.alternate, &mut LineBuffer::unlimited(), columns, rows)?;
        self.primary = primary;
        self.alternate = alternate;
        self.scrollback.drop_excess_lines(columns);
        tracing::debug!(columns, rows, "resized");
        Ok(())
    }

    // Text extraction

    fn cells_text(&self, cells: &[Cell]) -> String {
        let mut text = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if cell.is_complex() {
                if let Some(s) = self.complex.get(cell.code) {
                    text.push_str(s);
                }
                continue;
            }
            if cell.is_tab_filler() {
                let tab_follows = cells[i + 1..]
                    .iter()
                    .find(|c| !c.is_tab_filler())
                    .is_some_and(|c| c.char() == Some('\t'));
                if !tab_follows {
                    text.push(' ');
                }
                continue;
            }
            match cell.char() {
                Some(c) => text.push(c),
                None if cell.is_empty() => text.push(' '),
                None => {}
            }
        }
        text
    }

    /// Text of visible row `y`, trailing blanks trimmed
    pub fn row_text(&self, y: usize) -> String {
        self.grid()
            .row(y)
            .map(|row| self.cells_text(&row.cells).trim_end_matches(' ').to_string())
            .unwrap_or_default()
    }

    /// Visible rows, one per line, trailing empty rows dropped
    pub fn screen_text(&self) -> String {
        let mut lines: Vec<String> = (0..self.rows()).map(|y| self.row_text(y)).collect();
        while lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        lines.join("\n")
    }

    /// Scrollback followed by the primary screen as logical lines: soft
    /// wraps are joined, trailing empty lines dropped
    pub fn scrollback_text(&self) -> String {
        let width = self.columns();
        let history = self
            .scrollback
            .lines(width)
            .map(|line| (self.cells_text(line.cells), line.eol));
        let visible = self
            .primary
            .rows()
            .iter()
            .map(|row| (self.cells_text(row.logical_cells()), row.eol));

        let mut lines = Vec::new();
        let mut current = String::new();
        for (text, eol) in history.chain(visible) {
            current.push_str(&text);
            if !eol.continues() {
                lines.push(current.trim_end_matches(' ').to_string());
                current.clear();
            }
        }
        if !current.is_empty() {
            lines.push(current.trim_end_matches(' ').to_string());
        }
        while lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        lines.join("\n")
    }

    // Persistence

    pub fn snapshot(&self) -> ScreenSnapshot {
        ScreenSnapshot {
            version: SNAPSHOT_VERSION,
            columns: self.columns(),
            rows: self.rows(),
            primary: self.primary.to_record(),
            alternate: self.alternate.to_record(),
            using_alternate: self.using_alternate,
            scrollback: self.scrollback.to_record(),
            complex_chars: self.complex.clone(),
            external_attributes: self.externals.clone(),
            hyperlinks: self.hyperlinks.clone(),
            blocks: self.blocks.clone(),
            modes: self.modes,
            title: self.title.clone(),
            icon_title: self.icon_title.clone(),
            current_directory: self.current_directory.clone(),
            ambiguous_is_double_width: self.ambiguous_is_double_width,
        }
    }

    /// Rebuild a screen from a snapshot
    pub fn restore(snapshot: &ScreenSnapshot) -> Result<Self> {
        let result = Self::restore_inner(snapshot);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "failed to restore screen");
        }
        result
    }

    fn restore_inner(snapshot: &ScreenSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Corrupt(format!(
                "snapshot version {} does not match {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        let primary = Grid::from_record(&snapshot.primary)?;
        let alternate = Grid::from_record(&snapshot.alternate)?;
        for grid in [&primary, &alternate] {
            if grid.width() != snapshot.columns || grid.height() != snapshot.rows {
                return Err(Error::Corrupt(format!(
                    "grid is {}x{}, snapshot says {}x{}",
                    grid.width(),
                    grid.height(),
                    snapshot.columns,
                    snapshot.rows
                )));
            }
        }

        let mut screen = Self::new(snapshot.columns, snapshot.rows, None)?;
        screen.primary = primary;
        screen.alternate = alternate;
        screen.using_alternate = snapshot.using_alternate;
        screen.scrollback = LineBuffer::from_record(&snapshot.scrollback)?;
        screen.complex = snapshot.complex_chars.clone();
        screen.complex.reindex();
        screen.externals = snapshot.external_attributes.clone();
        screen.externals.reindex();
        screen.hyperlinks = snapshot.hyperlinks.clone();
        screen.hyperlink_ids = screen
            .hyperlinks
            .iter()
            .enumerate()
            .map(|(i, link)| (link.clone(), i as u32 + 1))
            .collect();
        screen.blocks = snapshot.blocks.clone();
        screen.modes = snapshot.modes;
        screen.title = snapshot.title.clone();
        screen.icon_title = snapshot.icon_title.clone();
        screen.current_directory = snapshot.current_directory.clone();
        screen.ambiguous_is_double_width = snapshot.ambiguous_is_double_width;
        Ok(screen)
    }

    /// Plain-text view for debugging and golden tests
    pub fn text_snapshot(&self) -> TextSnapshot {
        TextSnapshot {
            columns: self.columns(),
            rows: self.rows(),
            cursor: self.cursor(),
            cursor_visible: self.modes.cursor_visible,
            lines: (0..self.rows()).map(|y| self.row_text(y)).collect(),
            title: self.title.clone(),
            alternate_screen: self.using_alternate,
            scrollback_lines: self.scrollback.num_lines(self.columns()),
        }
    }
}

/// Rewrap `old` at a new size. Its used rows are appended to `history`,
/// then the last lines at the new width are popped back out as the new
/// grid. Lines above the new grid stay in `history`.
fn reflow(old: &Grid, history: &mut LineBuffer, columns: usize, rows: usize) -> Result<Grid> {
    let cursor = old.cursor();
    let mut cursor_raw = (0, 0);
    for (y, row) in old.rows()[..old.used_height()].iter().enumerate() {
        if y == cursor.y {
            let (raw, base) = if history.has_partial() {
                (history.num_raw_lines() - 1, history.last_raw_line_len())
            } else {
                (history.num_raw_lines(), 0)
            };
            cursor_raw = (raw, base + cursor.x + usize::from(cursor.pending_wrap));
        }
        let cells = row.logical_cells();
        let mut attributes = row.attributes.clone();
        attributes.truncate(cells.len());
        history.push_line(cells, &attributes, row.eol);
    }
    history.end_partial_line();

    let total = history.num_lines(columns);
    let (cursor_line, cursor_x) = history
        .position_of(cursor_raw.0, cursor_raw.1, columns)
        .unwrap_or((total.saturating_sub(1), 0));

    // Lines below the cursor that no longer fit are lost
    let below = total.saturating_sub(cursor_line + 1);
    let keep_below = below.min(rows - 1);
    for _ in keep_below..below {
        history.pop_last_line(columns);
    }
    let total = total - (below - keep_below);

    let visible = total.min(rows);
    let mut new_rows: Vec<Row> = (0..visible)
        .filter_map(|_| history.pop_last_line(columns))
        .map(|line| row_from_line(line, columns))
        .collect();
    new_rows.reverse();
    new_rows.resize_with(rows, || Row::new(columns));

    let mut grid = Grid::new(columns, rows)?;
    grid.set_rows(new_rows);
    grid.inherit_tab_stops(old);

    let cursor_y = cursor_line.saturating_sub(total - visible);
    if cursor_x >= columns {
        grid.set_cursor(columns - 1, cursor_y);
        grid.set_pending_wrap(cursor_x == columns);
    } else {
        grid.set_cursor(cursor_x, cursor_y);
    }
    Ok(grid)
}

fn row_from_line(line: ScrollbackLine, columns: usize) -> Row {
    let mut cells = line.cells;
    if line.eol == LineEnd::Dwc {
        cells.push(dwc_skip(Cell::EMPTY));
    }
    cells.resize(columns, Cell::EMPTY);
    let mut attributes = line.attributes;
    attributes.truncate(columns);
    Row {
        cells,
        eol: line.eol,
        attributes,
    }
}

/// Parse the `id=` key out of OSC 8 parameters (`key=value:key=value`)
fn hyperlink_id_param(params: &str) -> Option<String> {
    params
        .split(':')
        .filter_map(|kv| kv.split_once('='))
        .find(|(key, _)| *key == "id")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

impl Screen {
    /// Print `c` at the cursor, tagging it with `attr`
    fn print_with(&mut self, c: char, rendition: &GraphicRendition, attr: &ExternalAttribute) {
        let Some(width) = self.char_width(c) else {
            return;
        };
        if width == 0 {
            self.attach_combining(c);
            return;
        }
        let width = width.min(2);
        let columns = self.columns();
        let wraparound = self.modes.wraparound;

        if self.grid().cursor().pending_wrap {
            if wraparound {
                let y = self.grid().cursor().y;
                self.grid_mut().set_eol(y, LineEnd::Soft);
                self.wrap_to_next_line();
            } else {
                self.grid_mut().set_pending_wrap(false);
            }
        }
        if width > columns {
            return;
        }

        let mut cursor = self.grid().cursor();
        if width == 2 && cursor.x + 1 >= columns {
            if wraparound {
                let fill = dwc_skip(rendition.erase_cell());
                let grid = self.grid_mut();
                grid.write_cell(cursor.x, cursor.y, fill);
                let none = ExternalAttribute::default();
                grid.set_attributes(cursor.y, cursor.x..cursor.x + 1, &none);
                grid.set_eol(cursor.y, LineEnd::Dwc);
                self.wrap_to_next_line();
            } else {
                self.grid_mut().set_cursor(columns - 2, cursor.y);
            }
            cursor = self.grid().cursor();
        }

        let (x, y) = (cursor.x, cursor.y);
        if self.modes.insert {
            self.grid_mut().insert_blanks(x, y, width, rendition.erase_cell());
        }
        let external = self.externals.intern(attr);
        let cell = Cell {
            external,
            ..self.make_cell(c, rendition)
        };
        let grid = self.grid_mut();
        grid.write_cell(x, y, cell);
        if width == 2 {
            let right = Cell {
                external,
                ..rendition.template().with_code(DWC_RIGHT)
            };
            grid.write_cell(x + 1, y, right);
        }
        grid.set_attributes(y, x..x + width, attr);

        let next = x + width;
        if next >= columns {
            grid.set_cursor(columns - 1, y);
            grid.set_pending_wrap(wraparound);
        } else {
            grid.set_cursor(next, y);
        }
    }
}

impl ScreenSink for Screen {
    fn on_print(&mut self, c: char, rendition: &GraphicRendition) {
        self.print_with(c, rendition, &rendition.external_attribute());
    }

    /// Shown in caret notation (`^A` as `A`); the code itself is kept in
    /// the cell's external attribute
    fn on_control_code(&mut self, code: u8, rendition: &GraphicRendition) {
        let attr = ExternalAttribute {
            control_code: Some(code),
            ..rendition.external_attribute()
        };
        self.print_with(char::from(code ^ 0x40), rendition, &attr);
    }

    fn on_backspace(&mut self) {
        let cursor = self.grid().cursor();
        if cursor.x > 0 {
            self.grid_mut().set_cursor(cursor.x - 1, cursor.y);
            return;
        }
        let previous_continues = cursor.y > 0
            && self
                .grid()
                .row(cursor.y - 1)
                .is_some_and(|row| row.eol.continues());
        if self.modes.reverse_wraparound && previous_continues {
            let x = self.columns() - 1;
            self.grid_mut().set_cursor(x, cursor.y - 1);
        } else {
            self.grid_mut().set_cursor(0, cursor.y);
        }
    }

    fn on_tab(&mut self, count: usize) {
        for _ in 0..count.max(1) {
            let cursor = self.grid().cursor();
            let stop = self.grid().next_tab_stop(cursor.x);
            if stop <= cursor.x {
                self.grid_mut().set_cursor(cursor.x, cursor.y);
                break;
            }
            let y = cursor.y;
            let skipped_blank = self
                .grid()
                .row(y)
                .is_some_and(|row| row.cells[cursor.x..stop].iter().all(Cell::is_empty));
            let grid = self.grid_mut();
            if skipped_blank {
                for x in cursor.x..stop - 1 {
                    grid.replace_cell(x, y, Cell::EMPTY.with_code(TAB_FILLER));
                }
                grid.replace_cell(stop - 1, y, Cell::new('\t'));
            }
            grid.set_cursor(stop, y);
        }
    }

    fn on_back_tab(&mut self, count: usize) {
        for _ in 0..count.max(1) {
            let cursor = self.grid().cursor();
            let stop = self.grid().prev_tab_stop(cursor.x);
            self.grid_mut().set_cursor(stop, cursor.y);
        }
    }

    fn on_linefeed(&mut self) {
        self.index();
    }

    fn on_carriage_return(&mut self) {
        let y = self.grid().cursor().y;
        self.grid_mut().set_cursor(0, y);
    }

    fn on_reverse_index(&mut self) {
        let cursor = self.grid().cursor();
        let (top, _) = self.grid().scroll_region();
        if cursor.y == top {
            self.scroll_region_down(1, Cell::EMPTY);
            self.grid_mut().set_cursor(cursor.x, cursor.y);
        } else if cursor.y > 0 {
            self.grid_mut().set_cursor(cursor.x, cursor.y - 1);
        }
    }

    fn on_cursor_move(&mut self, x: usize, y: usize) {
        self.grid_mut().set_cursor(x, y);
    }

    fn on_erase_display(&mut self, mode: EraseDisplay, rendition: &GraphicRendition) {
        let fill = rendition.erase_cell();
        let cursor = self.grid().cursor();
        let (columns, rows) = (self.columns(), self.rows());
        match mode {
            EraseDisplay::Below => {
                let grid = self.grid_mut();
                grid.fill_range(cursor.y, cursor.x..columns, fill);
                for y in cursor.y + 1..rows {
                    grid.clear_row(y, fill);
                }
            }
            EraseDisplay::Above => {
                let grid = self.grid_mut();
                for y in 0..cursor.y {
                    grid.clear_row(y, fill);
                }
                grid.fill_range(cursor.y, 0..cursor.x + 1, fill);
                self.break_line_above(0);
            }
            EraseDisplay::All => {
                self.grid_mut().clear(fill);
                self.break_line_above(0);
            }
            EraseDisplay::Scrollback => self.on_clear_scrollback(),
        }
    }

    fn on_erase_line(&mut self, mode: EraseLine, rendition: &GraphicRendition) {
        let fill = rendition.erase_cell();
        let cursor = self.grid().cursor();
        let columns = self.columns();
        let range = match mode {
            EraseLine::Right => cursor.x..columns,
            EraseLine::Left => 0..cursor.x + 1,
            EraseLine::All => 0..columns,
        };
        self.grid_mut().fill_range(cursor.y, range, fill);
    }

    fn on_erase_chars(&mut self, count: usize, rendition: &GraphicRendition) {
        let cursor = self.grid().cursor();
        let end = cursor.x.saturating_add(count.max(1));
        self.grid_mut()
            .fill_range(cursor.y, cursor.x..end, rendition.erase_cell());
    }

    fn on_insert_chars(&mut self, count: usize, rendition: &GraphicRendition) {
        let cursor = self.grid().cursor();
        let grid = self.grid_mut();
        grid.insert_blanks(cursor.x, cursor.y, count.max(1), rendition.erase_cell());
        grid.set_cursor(cursor.x, cursor.y);
    }

    fn on_delete_chars(&mut self, count: usize, rendition: &GraphicRendition) {
        let cursor = self.grid().cursor();
        let grid = self.grid_mut();
        grid.delete_cells(cursor.x, cursor.y, count.max(1), rendition.erase_cell());
        grid.set_cursor(cursor.x, cursor.y);
    }

    fn on_insert_lines(&mut self, count: usize, rendition: &GraphicRendition) {
        let cursor = self.grid().cursor();
        let (top, bottom) = self.grid().scroll_region();
        if cursor.y < top || cursor.y > bottom {
            return;
        }
        self.grid_mut()
            .scroll_down(cursor.y, bottom, count.max(1), rendition.erase_cell());
        self.break_line_above(cursor.y);
        let grid = self.grid_mut();
        grid.set_eol(bottom, LineEnd::Hard);
        grid.set_cursor(0, cursor.y);
    }

    fn on_delete_lines(&mut self, count: usize, rendition: &GraphicRendition) {
        let cursor = self.grid().cursor();
        let (top, bottom) = self.grid().scroll_region();
        if cursor.y < top || cursor.y > bottom {
            return;
        }
        self.grid_mut()
            .scroll_up(cursor.y, bottom, count.max(1), rendition.erase_cell());
        self.break_line_above(cursor.y);
        self.grid_mut().set_cursor(0, cursor.y);
    }

    fn on_scroll(&mut self, lines: isize) {
        let n = lines.unsigned_abs();
        if lines > 0 {
            self.scroll_region_up(n, Cell::EMPTY);
        } else if lines < 0 {
            self.scroll_region_down(n, Cell::EMPTY);
        }
    }

    fn on_set_scroll_region(&mut self, top: usize, bottom: usize) {
        if !self.grid_mut().set_scroll_region(top, bottom) {
            tracing::debug!(top, bottom, "ignored scroll region");
        }
    }

    fn on_set_tab_stop(&mut self) {
        let x = self.grid().cursor().x;
        self.grid_mut().set_tab_stop(x);
    }

    fn on_clear_tab_stop(&mut self, mode: TabClear) {
        let x = self.grid().cursor().x;
        match mode {
            TabClear::Current => self.grid_mut().clear_tab_stop(x),
            TabClear::All => self.grid_mut().clear_all_tab_stops(),
        }
    }

    fn on_alternate_screen(&mut self, enable: bool, clear: bool) {
        if enable == self.using_alternate {
            if enable && clear {
                self.alternate.clear(Cell::EMPTY);
            }
            return;
        }
        if enable {
            let cursor = self.primary.cursor();
            if clear {
                self.alternate.clear(Cell::EMPTY);
            }
            self.alternate.set_cursor(cursor.x, cursor.y);
            self.alternate.reset_scroll_region();
        } else if clear {
            self.alternate.clear(Cell::EMPTY);
        }
        self.using_alternate = enable;
        self.grid_mut().mark_all_dirty();
    }

    fn on_clear_scrollback(&mut self) {
        self.scrollback.clear();
        self.marks.clear();
    }

    fn on_full_reset(&mut self, preserve_prompt: bool) {
        let cursor = self.primary.cursor();
        let prompt = if preserve_prompt {
            self.primary.row(cursor.y).cloned()
        } else {
            None
        };
        if prompt.is_some() {
            let above: Vec<Row> = self.primary.rows()[..cursor.y].to_vec();
            self.push_to_scrollback(&above);
        }

        self.using_alternate = false;
        for grid in [&mut self.primary, &mut self.alternate] {
            grid.clear(Cell::EMPTY);
            grid.reset_scroll_region();
            grid.reset_tab_stops();
            grid.set_cursor(0, 0);
        }
        self.scrollback.end_partial_line();
        self.modes = ScreenModes::default();

        if let Some(mut row) = prompt {
            row.eol = LineEnd::Hard;
            self.primary.replace_row(0, row);
            self.primary.set_cursor(cursor.x, 0);
        }
    }

    fn on_alignment_test(&mut self) {
        let grid = self.grid_mut();
        grid.fill_all(Cell::new('E'));
        grid.reset_scroll_region();
        grid.set_cursor(0, 0);
    }

    fn cursor_position(&self) -> (usize, usize) {
        let cursor = self.grid().cursor();
        (cursor.x, cursor.y)
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.columns(), self.rows())
    }

    fn scroll_region(&self) -> (usize, usize) {
        self.grid().scroll_region()
    }

    fn on_resize_request(&mut self, columns: usize, rows: usize) {
        self.resize_request = Some((columns, rows));
    }

    fn on_set_title(&mut self, target: TitleTarget, title: &str) {
        match target {
            TitleTarget::Window => self.title = title.to_string(),
            TitleTarget::Icon => self.icon_title = title.to_string(),
            TitleTarget::Both => {
                self.title = title.to_string();
                self.icon_title = title.to_string();
            }
        }
    }

    fn on_title_stack(&mut self, op: TitleStackOp) {
        match op {
            TitleStackOp::Push => {
                if self.title_stack.len() == TITLE_STACK_LIMIT {
                    self.title_stack.remove(0);
                }
                self.title_stack
                    .push((self.title.clone(), self.icon_title.clone()));
            }
            TitleStackOp::Pop => {
                if let Some((title, icon)) = self.title_stack.pop() {
                    self.title = title;
                    self.icon_title = icon;
                }
            }
        }
    }

    fn on_mode_change(&mut self, mode: Mode, enabled: bool) {
        match mode {
            Mode::Insert => self.modes.insert = enabled,
            Mode::Wraparound => {
                self.modes.wraparound = enabled;
                if !enabled {
                    self.grid_mut().set_pending_wrap(false);
                }
            }
            Mode::ReverseWraparound => self.modes.reverse_wraparound = enabled,
            Mode::CursorVisible => self.modes.cursor_visible = enabled,
            Mode::ReverseVideo => {
                if self.modes.reverse_video != enabled {
                    self.modes.reverse_video = enabled;
                    self.grid_mut().mark_all_dirty();
                }
            }
            _ => {}
        }
    }

    fn on_bell(&mut self) {
        self.bell_count += 1;
    }

    fn register_hyperlink(&mut self, params: &str, uri: &str) -> Option<u32> {
        if uri.is_empty() {
            return None;
        }
        let link = Hyperlink {
            id: hyperlink_id_param(params),
            uri: uri.to_string(),
        };
        if let Some(&id) = self.hyperlink_ids.get(&link) {
            return Some(id);
        }
        let id = u32::try_from(self.hyperlinks.len() + 1).ok()?;
        self.hyperlinks.push(link.clone());
        self.hyperlink_ids.insert(link, id);
        Some(id)
    }

    fn register_block(&mut self, name: &str) -> Option<u32> {
        if name.is_empty() {
            return None;
        }
        if let Some(i) = self.blocks.iter().position(|block| block == name) {
            return Some(i as u32 + 1);
        }
        let id = u32::try_from(self.blocks.len() + 1).ok()?;
        self.blocks.push(name.to_string());
        Some(id)
    }

    fn on_set_directory(&mut self, path: &str) {
        self.current_directory = Some(path.to_string());
    }

    fn on_set_mark(&mut self) {
        if !self.using_alternate {
            let line = self.absolute_cursor_line();
            self.marks.push(line);
        }
    }

    fn on_clipboard(&mut self, selection: &str, data: &str) {
        self.clipboard = Some((selection.to_string(), data.to_string()));
    }

    fn on_dcs(&mut self, payload: &str) {
        self.last_dcs = Some(payload.to_string());
    }

    fn on_cursor_style(&mut self, style: u16) {
        self.cursor_style = style;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::color::Color;

    fn screen(columns: usize, rows: usize) -> Screen {
        Screen::new(columns, rows, Some(100)).unwrap()
    }

    fn print(screen: &mut Screen, s: &str) {
        let rendition = GraphicRendition::default();
        for c in s.chars() {
            match c {
                '\n' => {
                    screen.on_carriage_return();
                    screen.on_linefeed();
                }
                c => screen.on_print(c, &rendition),
            }
        }
    }

    fn row_eols(screen: &Screen) -> Vec<LineEnd> {
        screen.grid().rows().iter().map(|r| r.eol).collect()
    }

    #[test]
    fn test_print_and_cursor() {
        let mut s = screen(10, 3);
        print(&mut s, "Hello");
        assert_eq!(s.row_text(0), "Hello");
        assert_eq!(s.cursor_position(), (5, 0));
    }

    #[test]
    fn test_autowrap_marks_soft_end() {
        let mut s = screen(10, 5);
        print(&mut s, &"a".repeat(25));
        assert_eq!(s.row_text(0), "a".repeat(10));
        assert_eq!(s.row_text(1), "a".repeat(10));
        assert_eq!(s.row_text(2), "a".repeat(5));
        assert_eq!(
            &row_eols(&s)[..3],
            &[LineEnd::Soft, LineEnd::Soft, LineEnd::Hard]
        );
        assert_eq!(s.cursor_position(), (5, 2));
    }

    #[test]
    fn test_pending_wrap_at_margin() {
        let mut s = screen(5, 2);
        print(&mut s, "abcde");
        assert_eq!(s.cursor(), GridCursor { x: 4, y: 0, pending_wrap: true });
        print(&mut s, "f");
        assert_eq!(s.row_text(1), "f");
    }

    #[test]
    fn test_no_wraparound_overwrites_last_cell() {
        let mut s = screen(5, 2);
        s.on_mode_change(Mode::Wraparound, false);
        print(&mut s, "abcdefg");
        assert_eq!(s.row_text(0), "abcdg");
        assert_eq!(s.cursor_position(), (4, 0));
    }

    #[test]
    fn test_wide_char_straddling_margin() {
        let mut s = screen(10, 3);
        print(&mut s, "123456789");
        print(&mut s, "\u{4e2d}");
        let skip = s.cell(9, 0).unwrap();
        assert!(skip.is_dwc_skip());
        assert_eq!(s.grid().row(0).unwrap().eol, LineEnd::Dwc);
        assert_eq!(s.cell(0, 1).unwrap().char(), Some('\u{4e2d}'));
        assert!(s.cell(1, 1).unwrap().is_dwc_right());
        assert_eq!(s.row_text(0), "123456789");
    }

    #[test]
    fn test_overwriting_wide_char_half_blanks_other_half() {
        let mut s = screen(10, 2);
        print(&mut s, "\u{4e2d}");
        s.on_cursor_move(1, 0);
        print(&mut s, "x");
        assert!(s.cell(0, 0).unwrap().is_empty());
        assert_eq!(s.cell(1, 0).unwrap().char(), Some('x'));
    }

    #[test]
    fn test_ambiguous_width_config() {
        let mut s = screen(10, 2);
        print(&mut s, "\u{3b1}");
        assert_eq!(s.cursor_position(), (1, 0));

        let mut s = screen(10, 2);
        s.set_ambiguous_is_double_width(true);
        print(&mut s, "\u{3b1}");
        assert_eq!(s.cursor_position(), (2, 0));
    }

    #[test]
    fn test_combining_mark_makes_complex_cell() {
        let mut s = screen(10, 2);
        print(&mut s, "e\u{301}x");
        let cell = s.cell(0, 0).unwrap();
        assert!(cell.is_complex());
        assert_eq!(s.complex_chars().get(cell.code), Some("e\u{301}"));
        assert_eq!(s.row_text(0), "e\u{301}x");
        assert_eq!(s.cursor_position(), (2, 0));
    }

    #[test]
    fn test_combining_mark_at_line_start_is_dropped() {
        let mut s = screen(10, 2);
        print(&mut s, "\u{301}");
        assert!(s.cell(0, 0).unwrap().is_empty());
        assert!(s.complex_chars().is_empty());
    }

    #[test]
    fn test_sentinel_codepoint_is_not_a_marker() {
        let mut s = screen(10, 2);
        print(&mut s, "\u{f000}");
        let cell = s.cell(0, 0).unwrap();
        assert!(!cell.is_dwc_skip());
        assert!(cell.is_complex());
    }

    #[test]
    fn test_rendition_copied_into_cell() {
        let mut s = screen(10, 2);
        let red = GraphicRendition {
            fg: Color::Indexed(1),
            ..Default::default()
        };
        s.on_print('H', &red);
        s.on_print('i', &GraphicRendition::default());
        assert_eq!(s.cell(0, 0).unwrap().fg, Color::Indexed(1));
        assert_eq!(s.cell(1, 0).unwrap().fg, Color::Default);
    }

    #[test]
    fn test_erase_display_all_and_home() {
        let mut s = screen(10, 3);
        print(&mut s, "abc\ndef\nghi");
        s.on_erase_display(EraseDisplay::All, &GraphicRendition::default());
        s.on_cursor_move(0, 0);
        assert!(s.grid().rows().iter().all(|r| r.cells.iter().all(|c| c.code == 0)));
        assert_eq!(s.cursor_position(), (0, 0));
    }

    #[test]
    fn test_erase_line_modes() {
        let mut s = screen(10, 1);
        print(&mut s, "abcdefghij");
        s.on_cursor_move(4, 0);
        s.on_erase_line(EraseLine::Right, &GraphicRendition::default());
        assert_eq!(s.row_text(0), "abcd");
        s.on_cursor_move(1, 0);
        s.on_erase_line(EraseLine::Left, &GraphicRendition::default());
        assert_eq!(s.row_text(0), "  cd");
    }

    #[test]
    fn test_erase_uses_background() {
        let mut s = screen(5, 1);
        let blue_bg = GraphicRendition {
            bg: Color::Indexed(4),
            bold: true,
            ..Default::default()
        };
        s.on_erase_line(EraseLine::All, &blue_bg);
        let cell = s.cell(2, 0).unwrap();
        assert_eq!(cell.bg, Color::Indexed(4));
        assert!(cell.is_empty());
    }

    #[test]
    fn test_linefeed_scrolls_into_scrollback() {
        let mut s = screen(10, 2);
        print(&mut s, "one\ntwo\nthree");
        assert_eq!(s.row_text(0), "two");
        assert_eq!(s.row_text(1), "three");
        assert_eq!(s.scrollback().num_lines(10), 1);
        assert_eq!(s.scrollback_text(), "one\ntwo\nthree");
    }

    #[test]
    fn test_interior_region_discards_scrolled_rows() {
        let mut s = screen(10, 4);
        print(&mut s, "a\nb\nc\nd");
        s.on_set_scroll_region(1, 2);
        s.on_cursor_move(0, 2);
        s.on_linefeed();
        assert_eq!(s.row_text(1), "c");
        assert_eq!(s.row_text(2), "");
        assert_eq!(s.row_text(3), "d");
        assert!(s.scrollback().is_empty());
    }

    #[test]
    fn test_scrollback_disabled() {
        let mut s = Screen::new(10, 2, Some(0)).unwrap();
        print(&mut s, "one\ntwo\nthree");
        assert!(s.scrollback().is_empty());
    }

    #[test]
    fn test_scrollback_cap() {
        let mut s = Screen::new(10, 2, Some(3)).unwrap();
        for i in 0..10 {
            print(&mut s, &format!("{}\n", i));
        }
        assert_eq!(s.scrollback().num_lines(10), 3);
        assert_eq!(s.scrollback().dropped_lines(), 6);
    }

    #[test]
    fn test_reverse_index_at_top_scrolls_down() {
        let mut s = screen(10, 3);
        print(&mut s, "a\nb\nc");
        s.on_cursor_move(0, 0);
        s.on_reverse_index();
        assert_eq!(s.row_text(0), "");
        assert_eq!(s.row_text(1), "a");
        assert_eq!(s.row_text(2), "b");
    }

    #[test]
    fn test_insert_and_delete_lines() {
        let mut s = screen(10, 4);
        print(&mut s, "a\nb\nc\nd");
        s.on_cursor_move(3, 1);
        s.on_insert_lines(1, &GraphicRendition::default());
        assert_eq!(s.row_text(1), "");
        assert_eq!(s.row_text(2), "b");
        assert_eq!(s.row_text(3), "c");
        assert_eq!(s.cursor_position(), (0, 1));

        s.on_delete_lines(2, &GraphicRendition::default());
        assert_eq!(s.row_text(1), "c");
        assert_eq!(s.row_text(2), "");
    }

    #[test]
    fn test_insert_mode_shifts_right() {
        let mut s = screen(10, 1);
        print(&mut s, "abc");
        s.on_cursor_move(1, 0);
        s.on_mode_change(Mode::Insert, true);
        print(&mut s, "X");
        assert_eq!(s.row_text(0), "aXbc");
    }

    #[test]
    fn test_tab_writes_fillers() {
        let mut s = screen(20, 1);
        print(&mut s, "ab");
        s.on_tab(1);
        print(&mut s, "c");
        assert_eq!(s.cursor_position(), (9, 0));
        assert!(s.cell(2, 0).unwrap().is_tab_filler());
        assert_eq!(s.cell(7, 0).unwrap().char(), Some('\t'));
        assert_eq!(s.row_text(0), "ab\tc");
    }

    #[test]
    fn test_tab_over_text_only_moves() {
        let mut s = screen(20, 1);
        print(&mut s, "abcdefghij");
        s.on_cursor_move(0, 0);
        s.on_tab(1);
        assert_eq!(s.cursor_position(), (8, 0));
        assert_eq!(s.row_text(0), "abcdefghij");
    }

    #[test]
    fn test_back_tab_and_tab_stop_clear() {
        let mut s = screen(30, 1);
        s.on_cursor_move(20, 0);
        s.on_back_tab(1);
        assert_eq!(s.cursor_position(), (16, 0));
        s.on_clear_tab_stop(TabClear::All);
        s.on_cursor_move(0, 0);
        s.on_tab(1);
        assert_eq!(s.cursor_position(), (29, 0));
    }

    #[test]
    fn test_reverse_wraparound_backspace() {
        let mut s = screen(5, 2);
        print(&mut s, "abcdefg");
        s.on_carriage_return();
        s.on_backspace();
        assert_eq!(s.cursor_position(), (0, 1));

        s.on_mode_change(Mode::ReverseWraparound, true);
        s.on_backspace();
        assert_eq!(s.cursor_position(), (4, 0));
    }

    #[test]
    fn test_alternate_screen_keeps_primary() {
        let mut s = screen(10, 3);
        print(&mut s, "primary");
        s.on_alternate_screen(true, true);
        assert!(s.is_alternate());
        assert_eq!(s.row_text(0), "");
        print(&mut s, "alt\nalt\nalt\nalt");
        assert!(s.scrollback().is_empty());
        s.on_alternate_screen(false, false);
        assert_eq!(s.row_text(0), "primary");
    }

    #[test]
    fn test_alignment_test() {
        let mut s = screen(4, 2);
        s.on_set_scroll_region(0, 0);
        s.on_alignment_test();
        assert_eq!(s.row_text(0), "EEEE");
        assert_eq!(s.row_text(1), "EEEE");
        assert_eq!(s.scroll_region(), (0, 1));
        assert_eq!(s.cursor_position(), (0, 0));
    }

    #[test]
    fn test_full_reset_preserving_prompt() {
        let mut s = screen(10, 4);
        print(&mut s, "output\nmore\n$ ls");
        s.on_full_reset(true);
        assert_eq!(s.row_text(0), "$ ls");
        assert_eq!(s.row_text(1), "");
        assert_eq!(s.cursor_position(), (4, 0));
        assert_eq!(s.scrollback_text(), "output\nmore\n$ ls");
    }

    #[test]
    fn test_full_reset_clears_screen() {
        let mut s = screen(10, 4);
        print(&mut s, "text");
        s.on_mode_change(Mode::Wraparound, false);
        s.on_full_reset(false);
        assert_eq!(s.screen_text(), "");
        assert_eq!(s.cursor_position(), (0, 0));
        assert!(s.modes().wraparound);
    }

    #[test]
    fn test_resize_reflows_wrapped_line() {
        let mut s = screen(10, 6);
        print(&mut s, &"a".repeat(25));
        s.resize(5, 6).unwrap();
        for y in 0..5 {
            assert_eq!(s.row_text(y), "aaaaa");
        }
        assert_eq!(
            &row_eols(&s)[..5],
            &[LineEnd::Soft, LineEnd::Soft, LineEnd::Soft, LineEnd::Soft, LineEnd::Hard]
        );
        assert_eq!(s.cursor(), GridCursor { x: 4, y: 4, pending_wrap: true });

        s.resize(10, 6).unwrap();
        assert_eq!(s.row_text(0), "a".repeat(10));
        assert_eq!(s.row_text(1), "a".repeat(10));
        assert_eq!(s.row_text(2), "a".repeat(5));
        assert_eq!(s.cursor(), GridCursor { x: 5, y: 2, pending_wrap: false });
    }

    #[test]
    fn test_resize_pushes_overflow_into_scrollback() {
        let mut s = screen(10, 4);
        print(&mut s, "1\n2\n3\n4");
        s.resize(10, 2).unwrap();
        assert_eq!(s.row_text(0), "3");
        assert_eq!(s.row_text(1), "4");
        assert_eq!(s.scrollback().num_lines(10), 2);

        s.resize(10, 4).unwrap();
        assert_eq!(s.row_text(0), "1");
        assert_eq!(s.row_text(3), "4");
        assert!(s.scrollback().is_empty());
    }

    #[test]
    fn test_resize_moves_wide_char_whole() {
        let mut s = screen(6, 3);
        print(&mut s, "abcd\u{4e2d}");
        s.resize(5, 3).unwrap();
        assert_eq!(s.row_text(0), "abcd");
        assert_eq!(s.grid().row(0).unwrap().eol, LineEnd::Dwc);
        assert!(s.cell(4, 0).unwrap().is_dwc_skip());
        assert_eq!(s.cell(0, 1).unwrap().char(), Some('\u{4e2d}'));

        s.resize(6, 3).unwrap();
        assert_eq!(s.row_text(0), "abcd\u{4e2d}");
        assert_eq!(s.grid().row(0).unwrap().eol, LineEnd::Hard);
    }

    #[test]
    fn test_resize_round_trip_keeps_erased_background() {
        let mut s = screen(10, 3);
        let blue_bg = GraphicRendition {
            bg: Color::Indexed(4),
            ..Default::default()
        };
        s.on_erase_line(EraseLine::All, &blue_bg);
        s.resize(12, 3).unwrap();
        assert_eq!(s.cell(5, 0).unwrap().bg, Color::Indexed(4));
        assert_eq!(s.cell(11, 0).unwrap().bg, Color::Default);
        s.resize(10, 3).unwrap();
        assert!(s.grid().row(0).unwrap().cells.iter().all(|c| c.bg == Color::Indexed(4)));
        assert_eq!(s.cursor_position(), (0, 0));
    }

    #[test]
    fn test_scrollback_keeps_erased_background() {
        let mut s = screen(10, 2);
        let red_bg = GraphicRendition {
            bg: Color::Indexed(1),
            ..Default::default()
        };
        print(&mut s, "ab");
        s.on_erase_line(EraseLine::Right, &red_bg);
        print(&mut s, "\n\n\n");

        let line = s.scrollback().wrapped_line(0, 10).unwrap();
        assert_eq!(line.cells.len(), 10);
        assert_eq!(line.cells[0].char(), Some('a'));
        assert_eq!(line.cells[1].bg, Color::Default);
        assert!(line.cells[2..].iter().all(|c| c.bg == Color::Indexed(1) && c.code == 0));
        assert_eq!(s.scrollback_text(), "ab");
    }

    #[test]
    fn test_resize_rejects_zero() {
        let mut s = screen(10, 3);
        print(&mut s, "keep");
        assert!(matches!(
            s.resize(0, 3),
            Err(Error::InvalidDimensions { columns: 0, rows: 3 })
        ));
        assert_eq!(s.dimensions(), (10, 3));
        assert_eq!(s.row_text(0), "keep");
    }

    #[test]
    fn test_hyperlink_registration() {
        let mut s = screen(10, 1);
        let a = s.register_hyperlink("id=x", "https://example.com").unwrap();
        let b = s.register_hyperlink("id=x", "https://example.com").unwrap();
        let c = s.register_hyperlink("", "https://example.com").unwrap();
        let d = s.register_hyperlink("id=x", "https://example.org").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(s.register_hyperlink("", "https://example.com"), Some(c));
        assert_eq!(s.hyperlink(a).unwrap().uri, "https://example.com");
        assert_eq!(s.register_hyperlink("", ""), None);
    }

    #[test]
    fn test_repeated_hyperlinks_share_one_entry() {
        let mut s = screen(10, 2);
        for _ in 0..5000 {
            let id = s.register_hyperlink("", "https://example.com/file");
            let pen = GraphicRendition {
                hyperlink_id: id,
                ..Default::default()
            };
            s.on_print('x', &pen);
            s.on_carriage_return();
            s.on_linefeed();
        }
        assert!(s.hyperlink(1).is_some());
        assert!(s.hyperlink(2).is_none());
        assert_eq!(s.external_attributes().len(), 1);
    }

    #[test]
    fn test_cell_key_resolves_to_line_attribute() {
        let mut s = screen(6, 2);
        let pen = GraphicRendition {
            underline_color: Some(Color::Indexed(3)),
            hyperlink_id: s.register_hyperlink("", "https://example.com"),
            ..Default::default()
        };
        s.on_print('a', &pen);
        s.on_print('中', &pen);
        s.on_print('b', &GraphicRendition::default());

        let row = s.grid().row(0).unwrap();
        for x in 0..3 {
            let cell = s.cell(x, 0).unwrap();
            assert_ne!(cell.external, 0);
            assert_eq!(s.external_attribute(cell), row.attributes.get(x));
        }
        assert_eq!(s.cell(3, 0).unwrap().external, 0);
        assert_eq!(row.attributes.get(3), None);

        s.on_cursor_move(0, 0);
        s.on_erase_chars(1, &GraphicRendition::default());
        assert_eq!(s.cell(0, 0).unwrap().external, 0);
        assert_eq!(s.grid().row(0).unwrap().attributes.get(0), None);

        s.resize(3, 3).unwrap();
        s.resize(6, 2).unwrap();
        let cell = s.cell(1, 0).unwrap();
        assert_eq!(s.external_attribute(cell), s.grid().row(0).unwrap().attributes.get(1));
        assert_eq!(
            s.external_attribute(cell).and_then(|attr| attr.underline_color),
            Some(Color::Indexed(3))
        );
    }

    #[test]
    fn test_control_code_shown_in_caret_notation() {
        let mut s = screen(10, 2);
        s.on_control_code(0x01, &GraphicRendition::default());
        s.on_control_code(0x1b, &GraphicRendition::default());
        assert_eq!(s.row_text(0), "A[");
        assert_eq!(s.cursor_position(), (2, 0));
        let attr = s.external_attribute(s.cell(0, 0).unwrap()).unwrap();
        assert_eq!(attr.control_code, Some(0x01));
        let attr = s.grid().row(0).unwrap().attributes.get(1).unwrap();
        assert_eq!(attr.control_code, Some(0x1b));
    }

    #[test]
    fn test_block_registration() {
        let mut s = screen(10, 1);
        let a = s.register_block("build").unwrap();
        assert_eq!(s.register_block("build"), Some(a));
        let b = s.register_block("test").unwrap();
        assert_ne!(a, b);
        assert_eq!(s.block_name(a), Some("build"));
        assert_eq!(s.block_name(b), Some("test"));
        assert_eq!(s.block_name(0), None);
        assert_eq!(s.register_block(""), None);

        let pen = GraphicRendition {
            block_id: Some(b),
            ..Default::default()
        };
        s.on_print('x', &pen);
        let attr = s.external_attribute(s.cell(0, 0).unwrap()).unwrap();
        assert_eq!(attr.block_id, Some(b));
    }

    #[test]
    fn test_title_stack() {
        let mut s = screen(10, 1);
        s.on_set_title(TitleTarget::Both, "one");
        s.on_title_stack(TitleStackOp::Push);
        s.on_set_title(TitleTarget::Window, "two");
        assert_eq!(s.title(), "two");
        s.on_title_stack(TitleStackOp::Pop);
        assert_eq!(s.title(), "one");
        assert_eq!(s.icon_title(), "one");
    }

    #[test]
    fn test_marks_use_absolute_lines() {
        let mut s = screen(10, 2);
        print(&mut s, "a\nb\nc");
        s.on_set_mark();
        assert_eq!(s.marks(), &[2]);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut s = screen(10, 3);
        s.take_dirty();
        print(&mut s, "ab");
        let dirty = s.take_dirty();
        assert_eq!(dirty, vec![(0, 0..2)]);
        assert!(s.take_dirty().is_empty());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut s = screen(10, 3);
        print(&mut s, "one\ntwo\nthree\nfour e\u{301}");
        s.on_set_title(TitleTarget::Window, "t");
        let restored = Screen::restore(&s.snapshot()).unwrap();
        assert_eq!(restored.screen_text(), s.screen_text());
        assert_eq!(restored.scrollback_text(), s.scrollback_text());
        assert_eq!(restored.cursor(), s.cursor());
        assert_eq!(restored.title(), "t");
    }
}
