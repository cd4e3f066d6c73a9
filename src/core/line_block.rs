//! Scrollback storage block
//!
//! A `LineBlock` holds many logical (unwrapped) lines concatenated in one
//! cell buffer, with a cumulative end-offset index so the nth raw line is
//! found without scanning. Wrapping is computed on demand for a given width
//! and cached; the cache is dropped, not recomputed, when the buffer changes.
//!
//! # Sharing
//!
//! The cell buffer sits behind an [`Arc`]. [`LineBlock::fork`] only clones
//! the `Arc`, so a reader (render, search) gets a consistent snapshot
//! without copying anything. Every mutation goes through [`Arc::make_mut`]:
//! while any fork is alive the mutator deep-copies the buffer first, and the
//! two handles are independent from then on. The last handle alive frees
//! the buffer. Dropping lines from the front only moves this handle's start
//! offset and never touches the shared buffer.

use std::cell::RefCell;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use super::attributes::ExternalAttributeIndex;
use super::cell::{pack_cells, unpack_cells, Cell, LineEnd};
use crate::error::{Error, Result};

/// Default number of cells per block
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

#[derive(Debug, Clone, Default)]
struct BlockStorage {
    cells: Vec<Cell>,
    /// Cumulative end offset of each raw line. Non-decreasing; empty lines
    /// repeat the previous value.
    line_ends: Vec<usize>,
    /// External attributes of each raw line, columns relative to its start
    attributes: Vec<ExternalAttributeIndex>,
    /// The last raw line continues with the next append
    partial: bool,
    /// How the partial line breaks when displayed (soft or double-width)
    partial_end: LineEnd,
    may_have_dwc: bool,
}

/// Cumulative wrapped-line counts of the live raw lines at one width
#[derive(Debug, Clone)]
struct WrapIndex {
    width: usize,
    cumulative: Vec<usize>,
}

/// A wrapped line borrowed from a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedLine<'a> {
    pub cells: &'a [Cell],
    pub eol: LineEnd,
    pub attributes: ExternalAttributeIndex,
}

impl WrappedLine<'_> {
    pub fn to_owned_line(&self) -> ScrollbackLine {
        ScrollbackLine {
            cells: self.cells.to_vec(),
            eol: self.eol,
            attributes: self.attributes.clone(),
        }
    }
}

/// A wrapped line removed from scrollback
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrollbackLine {
    pub cells: Vec<Cell>,
    pub eol: LineEnd,
    pub attributes: ExternalAttributeIndex,
}

/// Serialized form of a block (live content only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineBlockRecord {
    pub capacity: usize,
    /// Packed cell records, see [`Cell::to_bytes`]
    pub cells: Vec<u8>,
    pub line_lengths: Vec<usize>,
    pub attributes: Vec<ExternalAttributeIndex>,
    pub partial: bool,
    pub partial_end: LineEnd,
}

/// End of the wrapped piece of `line` starting at `start`.
///
/// A double-width character that would straddle the right edge moves whole
/// to the next piece and the break is reported as [`LineEnd::Dwc`]. The final
/// piece reports [`LineEnd::Hard`]; callers substitute the raw line's ending.
pub fn next_wrap(line: &[Cell], start: usize, width: usize) -> (usize, LineEnd) {
    let width = width.max(1);
    if line.len().saturating_sub(start) <= width {
        return (line.len(), LineEnd::Hard);
    }
    let end = start + width;
    if !line[end].is_dwc_right() {
        return (end, LineEnd::Soft);
    }
    if end - 1 > start {
        return (end - 1, LineEnd::Dwc);
    }
    // Narrower than one glyph: keep the pair together regardless.
    let end = start + 2;
    if end >= line.len() {
        (line.len(), LineEnd::Hard)
    } else {
        (end, LineEnd::Soft)
    }
}

/// Number of wrapped lines `line` occupies at `width` (at least one)
pub fn count_wraps(line: &[Cell], width: usize, may_have_dwc: bool) -> usize {
    let width = width.max(1);
    if line.is_empty() {
        return 1;
    }
    if !may_have_dwc {
        return (line.len() + width - 1) / width;
    }
    let mut count = 0;
    let mut start = 0;
    while start < line.len() {
        start = next_wrap(line, start, width).0;
        count += 1;
    }
    count
}

/// Offset of the `k`th wrapped piece of `line`
fn piece_start(line: &[Cell], k: usize, width: usize, may_have_dwc: bool) -> usize {
    let width = width.max(1);
    if !may_have_dwc {
        return (k * width).min(line.len());
    }
    let mut start = 0;
    for _ in 0..k {
        if start >= line.len() {
            break;
        }
        start = next_wrap(line, start, width).0;
    }
    start
}

/// One block of scrollback
#[derive(Debug)]
pub struct LineBlock {
    storage: Arc<BlockStorage>,
    /// Buffer this handle was forked from
    progenitor: Weak<BlockStorage>,
    capacity: usize,
    /// Index of the first live raw line
    first_entry: usize,
    /// Cell offset of the first live cell
    start_offset: usize,
    wrap_cache: RefCell<Option<WrapIndex>>,
}

impl LineBlock {
    /// Create an empty block holding up to `capacity` cells
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: Arc::new(BlockStorage::default()),
            progenitor: Weak::new(),
            capacity: capacity.max(1),
            first_entry: 0,
            start_offset: 0,
            wrap_cache: RefCell::new(None),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cells held in the buffer, including dropped ones not yet reclaimed
    pub fn used(&self) -> usize {
        self.storage.cells.len()
    }

    pub fn num_raw_lines(&self) -> usize {
        self.storage.line_ends.len() - self.first_entry
    }

    pub fn is_empty(&self) -> bool {
        self.num_raw_lines() == 0
    }

    /// The last raw line continues with the next append
    pub fn has_partial(&self) -> bool {
        self.storage.partial && !self.is_empty()
    }

    pub fn may_have_double_width_character(&self) -> bool {
        self.storage.may_have_dwc
    }

    /// Number of other handles sharing this buffer
    pub fn client_count(&self) -> usize {
        Arc::strong_count(&self.storage) - 1
    }

    /// True while this handle still aliases the buffer it was forked from
    /// and some other handle still holds it
    pub fn is_synchronized_with_progenitor(&self) -> bool {
        Arc::strong_count(&self.storage) > 1
            && self
                .progenitor
                .upgrade()
                .is_some_and(|p| Arc::ptr_eq(&p, &self.storage))
    }

    /// Copy-on-write fork; no cells are copied
    pub fn fork(&self) -> LineBlock {
        LineBlock {
            storage: Arc::clone(&self.storage),
            progenitor: Arc::downgrade(&self.storage),
            capacity: self.capacity,
            first_entry: self.first_entry,
            start_offset: self.start_offset,
            wrap_cache: RefCell::new(self.wrap_cache.borrow().clone()),
        }
    }

    fn storage_mut(&mut self) -> &mut BlockStorage {
        *self.wrap_cache.get_mut() = None;
        Arc::make_mut(&mut self.storage)
    }

    /// Original start offset of raw line `abs` (absolute index)
    fn raw_start(&self, abs: usize) -> usize {
        if abs == 0 {
            0
        } else {
            self.storage.line_ends[abs - 1]
        }
    }

    /// Live cell bounds of live raw line `n`
    fn bounds(&self, n: usize) -> (usize, usize) {
        let abs = self.first_entry + n;
        let start = if n == 0 {
            self.start_offset
        } else {
            self.storage.line_ends[abs - 1]
        };
        (start, self.storage.line_ends[abs])
    }

    /// Cells of live raw line `n`
    pub fn raw_line(&self, n: usize) -> Option<&[Cell]> {
        if n >= self.num_raw_lines() {
            return None;
        }
        let (start, end) = self.bounds(n);
        Some(&self.storage.cells[start..end])
    }

    /// Length of the last raw line
    pub fn last_raw_line_len(&self) -> Option<usize> {
        let n = self.num_raw_lines().checked_sub(1)?;
        let (start, end) = self.bounds(n);
        Some(end - start)
    }

    /// Live raw line holding the cell at `offset` (counted from the first
    /// live cell), by binary search over the cumulative index
    pub fn raw_line_containing(&self, offset: usize) -> Option<usize> {
        let target = self.start_offset + offset;
        let live = &self.storage.line_ends[self.first_entry..];
        let n = live.partition_point(|&end| end <= target);
        (n < live.len()).then_some(n)
    }

    /// Append a raw line, or extend the last one if it is partial.
    ///
    /// `continuation` tells whether the line goes on in the next append.
    /// Returns false without changing anything when the block is full.
    pub fn append_line(
        &mut self,
        cells: &[Cell],
        attributes: &ExternalAttributeIndex,
        continuation: LineEnd,
    ) -> bool {
        let used = self.used();
        if used > 0 && used + cells.len() > self.capacity {
            return false;
        }

        let continues = self.has_partial();
        let last_start = self
            .storage
            .line_ends
            .len()
            .checked_sub(1)
            .map_or(0, |i| self.raw_start(i));

        let storage = self.storage_mut();
        if continues {
            let offset = storage.cells.len() - last_start;
            storage.cells.extend_from_slice(cells);
            let len = storage.cells.len();
            if let Some(end) = storage.line_ends.last_mut() {
                *end = len;
            }
            if let Some(attrs) = storage.attributes.last_mut() {
                attrs.append(attributes, offset);
            }
        } else {
            storage.cells.extend_from_slice(cells);
            let len = storage.cells.len();
            storage.line_ends.push(len);
            storage.attributes.push(attributes.clone());
        }

        storage.partial = continuation.continues();
        if continuation.continues() {
            storage.partial_end = continuation;
        }
        if cells.iter().any(Cell::is_dwc_right) {
            storage.may_have_dwc = true;
        }
        true
    }

    /// Close a partial last line so the next append starts a new one
    pub fn end_partial(&mut self) {
        if self.has_partial() {
            self.storage_mut().partial = false;
        }
    }

    fn build_wrap_index(&self, width: usize) -> WrapIndex {
        let mut total = 0;
        let cumulative = (0..self.num_raw_lines())
            .map(|n| {
                let (start, end) = self.bounds(n);
                total += count_wraps(
                    &self.storage.cells[start..end],
                    width,
                    self.storage.may_have_dwc,
                );
                total
            })
            .collect();
        WrapIndex { width, cumulative }
    }

    fn with_wrap_index<R>(&self, width: usize, f: impl FnOnce(&[usize]) -> R) -> R {
        let mut cache = self.wrap_cache.borrow_mut();
        if cache.as_ref().map_or(true, |c| c.width != width) {
            *cache = Some(self.build_wrap_index(width));
        }
        match cache.as_ref() {
            Some(index) => f(&index.cumulative),
            None => f(&[]),
        }
    }

    /// Number of wrapped lines at `width`
    pub fn num_lines(&self, width: usize) -> usize {
        let width = width.max(1);
        self.with_wrap_index(width, |cum| cum.last().copied().unwrap_or(0))
    }

    fn final_eol(&self, n: usize) -> LineEnd {
        if n + 1 == self.num_raw_lines() && self.storage.partial {
            self.storage.partial_end
        } else {
            LineEnd::Hard
        }
    }

    /// The `index`th wrapped line at `width`
    pub fn wrapped_line(&self, index: usize, width: usize) -> Option<WrappedLine<'_>> {
        let width = width.max(1);
        let (n, prior) = self.with_wrap_index(width, |cum| {
            let n = cum.partition_point(|&c| c <= index);
            let prior = if n == 0 { 0 } else { cum[n - 1] };
            (n, prior)
        });
        if n >= self.num_raw_lines() {
            return None;
        }

        let (start, end) = self.bounds(n);
        let line = &self.storage.cells[start..end];
        let piece = piece_start(line, index - prior, width, self.storage.may_have_dwc);
        let (piece_end, mut eol) = next_wrap(line, piece, width);
        if piece_end == line.len() {
            eol = self.final_eol(n);
        }

        let abs = self.first_entry + n;
        let skew = start - self.raw_start(abs);
        let attributes = self.storage.attributes[abs].subrange(piece + skew..piece_end + skew);
        Some(WrappedLine {
            cells: &line[piece..piece_end],
            eol,
            attributes,
        })
    }

    /// Wrapped line index within this block and column of `offset` (counted
    /// from the first live cell) in live raw line `n`. An offset at a wrap
    /// point belongs to the following line.
    pub fn position_of(&self, n: usize, offset: usize, width: usize) -> Option<(usize, usize)> {
        let width = width.max(1);
        if n >= self.num_raw_lines() {
            return None;
        }
        let prior = self.with_wrap_index(width, |cum| if n == 0 { 0 } else { cum[n - 1] });
        let (start, end) = self.bounds(n);
        let line = &self.storage.cells[start..end];

        let mut piece = 0;
        let mut k = 0;
        loop {
            let (piece_end, _) = next_wrap(line, piece, width);
            if offset < piece_end || piece_end >= line.len() {
                return Some((prior + k, offset - piece));
            }
            piece = piece_end;
            k += 1;
        }
    }

    /// Drop up to `n` wrapped lines (at `width`) from the front.
    /// Returns how many were dropped.
    pub fn drop_lines(&mut self, n: usize, width: usize) -> usize {
        let width = width.max(1);
        let mut dropped = 0;
        while dropped < n && !self.is_empty() {
            let (start, end) = self.bounds(0);
            let line = &self.storage.cells[start..end];
            let count = count_wraps(line, width, self.storage.may_have_dwc);
            let remaining = n - dropped;
            if count <= remaining {
                dropped += count;
                self.first_entry += 1;
                self.start_offset = end;
            } else {
                let piece = piece_start(line, remaining, width, self.storage.may_have_dwc);
                self.start_offset = start + piece;
                dropped += remaining;
            }
        }
        *self.wrap_cache.get_mut() = None;
        dropped
    }

    /// Remove and return the last wrapped line at `width`. The rest of its
    /// raw line becomes partial.
    pub fn pop_last_line(&mut self, width: usize) -> Option<ScrollbackLine> {
        let width = width.max(1);
        let n = self.num_raw_lines().checked_sub(1)?;
        let (start, end) = self.bounds(n);
        let abs = self.first_entry + n;
        let orig = self.raw_start(abs);
        let skew = start - orig;
        let dwc = self.storage.may_have_dwc;

        let line = &self.storage.cells[start..end];
        let count = count_wraps(line, width, dwc);
        let piece = piece_start(line, count - 1, width, dwc);
        let previous_break = if count > 1 {
            let prev = piece_start(line, count - 2, width, dwc);
            next_wrap(line, prev, width).1
        } else {
            LineEnd::Hard
        };
        let popped = ScrollbackLine {
            cells: line[piece..].to_vec(),
            eol: self.final_eol(n),
            attributes: self.storage.attributes[abs].subrange(piece + skew..end - orig),
        };

        let storage = self.storage_mut();
        if piece == 0 {
            storage.cells.truncate(orig);
            storage.line_ends.pop();
            storage.attributes.pop();
            storage.partial = false;
            if n == 0 {
                self.start_offset = orig;
            }
        } else {
            storage.cells.truncate(start + piece);
            if let Some(last) = storage.line_ends.last_mut() {
                *last = start + piece;
            }
            if let Some(attrs) = storage.attributes.last_mut() {
                attrs.truncate(piece + skew);
            }
            storage.partial = true;
            storage.partial_end = previous_break;
        }
        Some(popped)
    }

    /// Remove the last raw line, returning its live cells and attributes
    pub fn remove_last_raw_line(&mut self) -> Option<(Vec<Cell>, ExternalAttributeIndex)> {
        let n = self.num_raw_lines().checked_sub(1)?;
        let (start, end) = self.bounds(n);
        let abs = self.first_entry + n;
        let orig = self.raw_start(abs);
        let cells = self.storage.cells[start..end].to_vec();
        let attributes = self.storage.attributes[abs].subrange(start - orig..end - orig);

        let storage = self.storage_mut();
        storage.cells.truncate(orig);
        storage.line_ends.pop();
        storage.attributes.pop();
        storage.partial = false;
        if n == 0 {
            self.start_offset = orig;
        }
        Some((cells, attributes))
    }

    /// Serializable copy of the live content
    pub fn to_record(&self) -> LineBlockRecord {
        let mut line_lengths = Vec::with_capacity(self.num_raw_lines());
        let mut attributes = Vec::with_capacity(self.num_raw_lines());
        for n in 0..self.num_raw_lines() {
            let (start, end) = self.bounds(n);
            let abs = self.first_entry + n;
            let orig = self.raw_start(abs);
            line_lengths.push(end - start);
            attributes.push(self.storage.attributes[abs].subrange(start - orig..end - orig));
        }
        let live_end = self
            .storage
            .line_ends
            .last()
            .copied()
            .unwrap_or(self.start_offset)
            .max(self.start_offset);

        LineBlockRecord {
            capacity: self.capacity,
            cells: pack_cells(&self.storage.cells[self.start_offset..live_end]),
            line_lengths,
            attributes,
            partial: self.has_partial(),
            partial_end: self.storage.partial_end,
        }
    }

    /// Rebuild a block from [`LineBlock::to_record`]
    pub fn from_record(record: &LineBlockRecord) -> Result<Self> {
        let cells = unpack_cells(&record.cells)
            .ok_or_else(|| Error::Corrupt("cell data is not a whole number of records".into()))?;
        if record.line_lengths.iter().sum::<usize>() != cells.len() {
            return Err(Error::Corrupt("line lengths do not match cell data".into()));
        }
        if record.attributes.len() != record.line_lengths.len() {
            return Err(Error::Corrupt("attribute count does not match line count".into()));
        }

        let line_ends = record
            .line_lengths
            .iter()
            .scan(0, |total, len| {
                *total += len;
                Some(*total)
            })
            .collect();
        let storage = BlockStorage {
            may_have_dwc: cells.iter().any(Cell::is_dwc_right),
            cells,
            line_ends,
            attributes: record.attributes.clone(),
            partial: record.partial,
            partial_end: record.partial_end,
        };

        Ok(Self {
            storage: Arc::new(storage),
            capacity: record.capacity.max(1),
            ..Self::new(record.capacity)
        })
    }
}
