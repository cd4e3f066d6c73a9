//! Terminal Grid
//!
//! The fixed-size visible window: rows of cells, the cursor, the scroll
//! region, tab stops and per-row dirty ranges. The grid knows nothing about
//! scrollback; rows scrolled off the top are handed back to the caller.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::attributes::{ExternalAttribute, ExternalAttributeIndex};
use super::cell::{pack_cells, unpack_cells, Cell, LineEnd, DWC_SKIP};
use crate::error::{Error, Result};

/// Default tab stop interval
pub const TAB_WIDTH: usize = 8;

/// A row of cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
    /// How this row continues onto the next one
    pub eol: LineEnd,
    pub attributes: ExternalAttributeIndex,
}

impl Row {
    pub fn new(cols: usize) -> Self {
        Self::filled(cols, Cell::EMPTY)
    }

    pub fn filled(cols: usize, fill: Cell) -> Self {
        Self {
            cells: vec![fill; cols],
            eol: LineEnd::Hard,
            attributes: ExternalAttributeIndex::new(),
        }
    }

    /// Length of content, excluding trailing cells that are exactly
    /// [`Cell::EMPTY`]. An erased cell that kept a background color counts
    /// as content.
    pub fn content_len(&self) -> usize {
        self.cells
            .iter()
            .rposition(|c| *c != Cell::EMPTY)
            .map_or(0, |i| i + 1)
    }

    pub fn is_blank(&self) -> bool {
        self.content_len() == 0 && self.eol == LineEnd::Hard
    }

    /// Cells that belong in scrollback: hard rows lose trailing empty
    /// cells, double-width breaks lose their skip sentinel
    pub fn logical_cells(&self) -> &[Cell] {
        match self.eol {
            LineEnd::Hard => &self.cells[..self.content_len()],
            LineEnd::Soft => &self.cells,
            LineEnd::Dwc => match self.cells.last() {
                Some(last) if last.is_dwc_skip() => &self.cells[..self.cells.len() - 1],
                _ => &self.cells,
            },
        }
    }
}

/// Cursor position within the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridCursor {
    pub x: usize,
    pub y: usize,
    /// The last column was written; the next print wraps first
    pub pending_wrap: bool,
}

/// Serialized row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    pub cells: Vec<u8>,
    pub eol: LineEnd,
    #[serde(default)]
    pub attributes: ExternalAttributeIndex,
}

/// Serialized grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRecord {
    pub width: usize,
    pub height: usize,
    pub cursor: GridCursor,
    pub scroll_top: usize,
    pub scroll_bottom: usize,
    pub tab_stops: Vec<usize>,
    pub rows: Vec<RowRecord>,
}

/// The visible grid
#[derive(Debug, Clone)]
pub struct Grid {
    rows: Vec<Row>,
    width: usize,
    height: usize,
    cursor: GridCursor,
    scroll_top: usize,
    scroll_bottom: usize,
    tab_stops: Vec<bool>,
    dirty: Vec<Option<Range<usize>>>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions {
                columns: width,
                rows: height,
            });
        }
        Ok(Self {
            rows: (0..height).map(|_| Row::new(width)).collect(),
            width,
            height,
            cursor: GridCursor::default(),
            scroll_top: 0,
            scroll_bottom: height - 1,
            tab_stops: default_tab_stops(width),
            dirty: vec![Some(0..width); height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cursor(&self) -> GridCursor {
        self.cursor
    }

    /// Move the cursor, clamped to the grid; clears any pending wrap
    pub fn set_cursor(&mut self, x: usize, y: usize) {
        self.cursor = GridCursor {
            x: x.min(self.width - 1),
            y: y.min(self.height - 1),
            pending_wrap: false,
        };
    }

    pub fn set_pending_wrap(&mut self, pending: bool) {
        self.cursor.pending_wrap = pending;
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        self.rows.get(y).and_then(|r| r.cells.get(x))
    }

    pub fn row(&self, y: usize) -> Option<&Row> {
        self.rows.get(y)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn set_eol(&mut self, y: usize, eol: LineEnd) {
        if let Some(row) = self.rows.get_mut(y) {
            row.eol = eol;
        }
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    /// Set the inclusive scroll region; rejects `top >= bottom`
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) -> bool {
        let bottom = bottom.min(self.height - 1);
        if top >= bottom {
            return false;
        }
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        true
    }

    pub fn reset_scroll_region(&mut self) {
        self.scroll_top = 0;
        self.scroll_bottom = self.height - 1;
    }

    /// Rows that hold content or the cursor
    pub fn used_height(&self) -> usize {
        let last_content = self
            .rows
            .iter()
            .rposition(|r| !r.is_blank())
            .map_or(0, |i| i + 1);
        last_content.max(self.cursor.y + 1)
    }

    // Dirty tracking

    pub fn mark_dirty(&mut self, y: usize, range: Range<usize>) {
        let Some(slot) = self.dirty.get_mut(y) else {
            return;
        };
        let range = range.start.min(self.width)..range.end.min(self.width);
        if range.is_empty() {
            return;
        }
        *slot = Some(match slot.take() {
            Some(old) => old.start.min(range.start)..old.end.max(range.end),
            None => range,
        });
    }

    pub fn mark_row_dirty(&mut self, y: usize) {
        self.mark_dirty(y, 0..self.width);
    }

    pub fn mark_all_dirty(&mut self) {
        let width = self.width;
        for slot in &mut self.dirty {
            *slot = Some(0..width);
        }
    }

    fn mark_rows_dirty(&mut self, rows: Range<usize>) {
        for y in rows {
            self.mark_row_dirty(y);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.iter().any(Option::is_some)
    }

    /// Drain dirty ranges as `(row, columns)`
    pub fn take_dirty(&mut self) -> Vec<(usize, Range<usize>)> {
        self.dirty
            .iter_mut()
            .enumerate()
            .filter_map(|(y, slot)| slot.take().map(|r| (y, r)))
            .collect()
    }

    // Cell writes

    /// Blank the other half of any double-width glyph that `x` splits
    fn clear_orphan_at(&mut self, x: usize, y: usize) {
        let width = self.width;
        let row = &mut self.rows[y];
        if row.cells[x].is_dwc_right() && x > 0 {
            row.cells[x - 1] = row.cells[x - 1].blank();
            row.attributes.erase(x - 1..x);
            self.mark_dirty(y, x - 1..x);
        } else if x + 1 < width && row.cells[x + 1].is_dwc_right() {
            row.cells[x + 1] = row.cells[x + 1].blank();
            row.attributes.erase(x + 1..x + 2);
            self.mark_dirty(y, x + 1..x + 2);
        }
    }

    /// Write one cell. Writing over half of a double-width glyph blanks the
    /// other half.
    pub fn write_cell(&mut self, x: usize, y: usize, cell: Cell) {
        if x >= self.width || y >= self.height {
            return;
        }
        if cell.is_dwc_right() {
            if x + 1 < self.width && self.rows[y].cells[x + 1].is_dwc_right() {
                self.rows[y].cells[x + 1] = self.rows[y].cells[x + 1].blank();
            }
        } else {
            self.clear_orphan_at(x, y);
        }
        self.rows[y].cells[x] = cell;
        self.mark_dirty(y, x..x + 1);
    }

    /// Set the external attribute of `range`; an empty attribute clears it
    pub fn set_attributes(&mut self, y: usize, range: Range<usize>, attr: &ExternalAttribute) {
        if let Some(row) = self.rows.get_mut(y) {
            if attr.is_empty() && row.attributes.is_empty() {
                return;
            }
            row.attributes.set(range, attr);
        }
    }

    /// Overwrite `range` of row `y` with `fill`, dropping attributes.
    /// Filling through the last column ends the row hard.
    pub fn fill_range(&mut self, y: usize, range: Range<usize>, fill: Cell) {
        if y >= self.height {
            return;
        }
        let start = range.start.min(self.width);
        let end = range.end.min(self.width);
        if start >= end {
            return;
        }
        let width = self.width;
        let row = &mut self.rows[y];
        let mut erased = start..end;
        if start > 0 && row.cells[start].is_dwc_right() {
            row.cells[start - 1] = row.cells[start - 1].blank();
            erased.start -= 1;
        }
        if end < width && row.cells[end].is_dwc_right() {
            row.cells[end] = row.cells[end].blank();
            erased.end += 1;
        }
        row.cells[start..end].fill(fill);
        row.attributes.erase(erased);
        if end == width {
            row.eol = LineEnd::Hard;
        }
        self.mark_dirty(y, start.saturating_sub(1)..end + 1);
    }

    /// Replace row `y` entirely
    pub fn clear_row(&mut self, y: usize, fill: Cell) {
        if let Some(row) = self.rows.get_mut(y) {
            *row = Row::filled(self.width, fill);
            self.mark_row_dirty(y);
        }
    }

    pub fn clear(&mut self, fill: Cell) {
        for y in 0..self.height {
            self.clear_row(y, fill);
        }
    }

    /// Fill every cell with `c` (DECALN)
    pub fn fill_all(&mut self, cell: Cell) {
        for row in &mut self.rows {
            *row = Row::filled(self.width, cell);
        }
        self.mark_all_dirty();
    }

    /// Insert `n` blanks at `x`, shifting the rest of the row right
    pub fn insert_blanks(&mut self, x: usize, y: usize, n: usize, fill: Cell) {
        if x >= self.width || y >= self.height || n == 0 {
            return;
        }
        let width = self.width;
        let n = n.min(width - x);
        let row = &mut self.rows[y];
        if x > 0 && row.cells[x].is_dwc_right() {
            row.cells[x - 1] = row.cells[x - 1].blank();
        }
        // A glyph whose right half is about to fall off the end
        let cut = width - n;
        if cut > x && row.cells[cut].is_dwc_right() {
            row.cells[cut - 1] = row.cells[cut - 1].blank();
        }
        row.cells.truncate(cut);
        row.cells.splice(x..x, std::iter::repeat(fill).take(n));
        row.attributes.insert(x, n, width);
        self.mark_dirty(y, x.saturating_sub(1)..width);
    }

    /// Delete `n` cells at `x`, shifting the rest left and filling the end
    pub fn delete_cells(&mut self, x: usize, y: usize, n: usize, fill: Cell) {
        if x >= self.width || y >= self.height || n == 0 {
            return;
        }
        let width = self.width;
        let n = n.min(width - x);
        let row = &mut self.rows[y];
        if x > 0 && row.cells[x].is_dwc_right() {
            row.cells[x - 1] = row.cells[x - 1].blank();
        }
        if x + n < width && row.cells[x + n].is_dwc_right() {
            row.cells[x + n] = row.cells[x + n].blank();
        }
        row.cells.drain(x..x + n);
        row.cells.extend(std::iter::repeat(fill).take(n));
        row.attributes.remove(x, n);
        self.mark_dirty(y, x.saturating_sub(1)..width);
    }

    /// Scroll `top..=bottom` up by `n`, returning the rows removed from the top
    pub fn scroll_up(&mut self, top: usize, bottom: usize, n: usize, fill: Cell) -> Vec<Row> {
        let bottom = bottom.min(self.height - 1);
        if top > bottom || n == 0 {
            return Vec::new();
        }
        let n = n.min(bottom - top + 1);
        let width = self.width;
        let removed: Vec<Row> = self.rows.drain(top..top + n).collect();
        let at = bottom + 1 - n;
        self.rows
            .splice(at..at, std::iter::repeat_with(|| Row::filled(width, fill)).take(n));
        self.mark_rows_dirty(top..bottom + 1);
        removed
    }

    /// Scroll `top..=bottom` down by `n`; rows pushed off the bottom are lost
    pub fn scroll_down(&mut self, top: usize, bottom: usize, n: usize, fill: Cell) {
        let bottom = bottom.min(self.height - 1);
        if top > bottom || n == 0 {
            return;
        }
        let n = n.min(bottom - top + 1);
        let width = self.width;
        self.rows.drain(bottom + 1 - n..bottom + 1);
        self.rows
            .splice(top..top, std::iter::repeat_with(|| Row::filled(width, fill)).take(n));
        self.mark_rows_dirty(top..bottom + 1);
    }

    /// Replace all rows (used by reflow and restore)
    pub(crate) fn set_rows(&mut self, rows: Vec<Row>) {
        debug_assert_eq!(rows.len(), self.height);
        self.rows = rows;
        self.mark_all_dirty();
    }

    /// Overwrite one cell in place, leaving its neighbours alone
    pub(crate) fn replace_cell(&mut self, x: usize, y: usize, cell: Cell) {
        if let Some(slot) = self.rows.get_mut(y).and_then(|r| r.cells.get_mut(x)) {
            *slot = cell;
            self.mark_dirty(y, x..x + 1);
        }
    }

    /// Swap in a whole row, resized to the grid width
    pub(crate) fn replace_row(&mut self, y: usize, mut row: Row) {
        if y >= self.height {
            return;
        }
        row.cells.resize(self.width, Cell::EMPTY);
        row.attributes.truncate(self.width);
        self.rows[y] = row;
        self.mark_row_dirty(y);
    }

    // Tab stops

    pub fn next_tab_stop(&self, x: usize) -> usize {
        (x + 1..self.width)
            .find(|&i| self.tab_stops[i])
            .unwrap_or(self.width - 1)
    }

    pub fn prev_tab_stop(&self, x: usize) -> usize {
        (1..x).rev().find(|&i| self.tab_stops[i]).unwrap_or(0)
    }

    pub fn set_tab_stop(&mut self, x: usize) {
        if let Some(stop) = self.tab_stops.get_mut(x) {
            *stop = true;
        }
    }

    pub fn clear_tab_stop(&mut self, x: usize) {
        if let Some(stop) = self.tab_stops.get_mut(x) {
            *stop = false;
        }
    }

    pub fn clear_all_tab_stops(&mut self) {
        self.tab_stops.fill(false);
    }

    pub fn reset_tab_stops(&mut self) {
        self.tab_stops = default_tab_stops(self.width);
    }

    pub fn tab_stops(&self) -> impl Iterator<Item = usize> + '_ {
        self.tab_stops
            .iter()
            .enumerate()
            .filter_map(|(i, &set)| set.then_some(i))
    }

    /// Copy tab stops from another grid, defaults past its width
    pub(crate) fn inherit_tab_stops(&mut self, other: &Grid) {
        let shared = self.width.min(other.width);
        self.tab_stops[..shared].copy_from_slice(&other.tab_stops[..shared]);
    }

    // Persistence

    pub fn to_record(&self) -> GridRecord {
        GridRecord {
            width: self.width,
            height: self.height,
            cursor: self.cursor,
            scroll_top: self.scroll_top,
            scroll_bottom: self.scroll_bottom,
            tab_stops: self.tab_stops().collect(),
            rows: self
                .rows
                .iter()
                .map(|row| RowRecord {
                    cells: pack_cells(&row.cells),
                    eol: row.eol,
                    attributes: row.attributes.clone(),
                })
                .collect(),
        }
    }

    pub fn from_record(record: &GridRecord) -> Result<Self> {
        let mut grid = Grid::new(record.width, record.height)?;
        if record.rows.len() != record.height {
            return Err(Error::Corrupt(format!(
                "grid has {} rows, expected {}",
                record.rows.len(),
                record.height
            )));
        }
        let rows = record
            .rows
            .iter()
            .map(|r| {
                let cells = unpack_cells(&r.cells)
                    .filter(|cells| cells.len() == record.width)
                    .ok_or_else(|| Error::Corrupt("row width does not match grid".into()))?;
                Ok(Row {
                    cells,
                    eol: r.eol,
                    attributes: r.attributes.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        grid.set_rows(rows);

        grid.clear_all_tab_stops();
        for &x in &record.tab_stops {
            grid.set_tab_stop(x);
        }
        if !grid.set_scroll_region(record.scroll_top, record.scroll_bottom) {
            grid.reset_scroll_region();
        }
        grid.set_cursor(record.cursor.x, record.cursor.y);
        grid.cursor.pending_wrap = record.cursor.pending_wrap;
        Ok(grid)
    }
}

fn default_tab_stops(width: usize) -> Vec<bool> {
    (0..width).map(|i| i > 0 && i % TAB_WIDTH == 0).collect()
}

/// A skip sentinel carrying `fill`'s background
pub(crate) fn dwc_skip(fill: Cell) -> Cell {
    fill.blank().with_code(DWC_SKIP)
}
