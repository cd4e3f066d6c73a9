//! Scrollback
//!
//! A sequence of [`LineBlock`]s with an optional cap on the number of
//! wrapped lines. A raw line never spans two blocks: when a block fills up
//! while its last line is still partial, that line moves to the new block.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::attributes::ExternalAttributeIndex;
use super::cell::{Cell, LineEnd};
use super::line_block::{
    LineBlock, LineBlockRecord, ScrollbackLine, WrappedLine, DEFAULT_BLOCK_SIZE,
};
use crate::error::Result;

/// Serialized form of a [`LineBuffer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineBufferRecord {
    pub block_size: usize,
    pub max_lines: Option<usize>,
    pub dropped_lines: usize,
    pub blocks: Vec<LineBlockRecord>,
}

/// Scrollback history
#[derive(Debug)]
pub struct LineBuffer {
    blocks: VecDeque<LineBlock>,
    block_size: usize,
    /// Cap on wrapped lines; `None` is unlimited
    max_lines: Option<usize>,
    /// Wrapped lines dropped since creation
    dropped_lines: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, None)
    }
}

impl LineBuffer {
    pub fn new(block_size: usize, max_lines: Option<usize>) -> Self {
        Self {
            blocks: VecDeque::new(),
            block_size: block_size.max(1),
            max_lines,
            dropped_lines: 0,
        }
    }

    /// Unlimited buffer, used as scratch space while reflowing
    pub fn unlimited() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, None)
    }

    pub fn max_lines(&self) -> Option<usize> {
        self.max_lines
    }

    pub fn set_max_lines(&mut self, max_lines: Option<usize>) {
        self.max_lines = max_lines;
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(LineBlock::is_empty)
    }

    pub fn num_raw_lines(&self) -> usize {
        self.blocks.iter().map(LineBlock::num_raw_lines).sum()
    }

    /// The last raw line is waiting for its continuation
    pub fn has_partial(&self) -> bool {
        self.blocks.back().is_some_and(LineBlock::has_partial)
    }

    /// Length of the last raw line, 0 when empty
    pub fn last_raw_line_len(&self) -> usize {
        self.blocks
            .back()
            .and_then(LineBlock::last_raw_line_len)
            .unwrap_or(0)
    }

    /// Append one row's worth of cells without enforcing the cap.
    ///
    /// An `eol` that continues ([`LineEnd::Soft`], [`LineEnd::Dwc`]) leaves
    /// the raw line open so the next push extends it.
    pub fn push_line(&mut self, cells: &[Cell], attributes: &ExternalAttributeIndex, eol: LineEnd) {
        if let Some(block) = self.blocks.back_mut() {
            if block.append_line(cells, attributes, eol) {
                return;
            }
        }

        let mut carried = None;
        if let Some(block) = self.blocks.back_mut() {
            if block.has_partial() {
                carried = block.remove_last_raw_line();
                if block.is_empty() {
                    self.blocks.pop_back();
                }
            }
        }

        let needed = carried.as_ref().map_or(0, |(c, _)| c.len()) + cells.len();
        let mut block = LineBlock::new(self.block_size.max(needed));
        if let Some((carried_cells, carried_attrs)) = carried {
            block.append_line(&carried_cells, &carried_attrs, LineEnd::Soft);
        }
        block.append_line(cells, attributes, eol);
        self.blocks.push_back(block);
    }

    /// Close the last raw line; the next push starts a new one
    pub fn end_partial_line(&mut self) {
        if let Some(block) = self.blocks.back_mut() {
            block.end_partial();
        }
    }

    /// Append a row and drop whatever exceeds the cap at `width`.
    /// Returns the number of wrapped lines dropped.
    pub fn append_line(
        &mut self,
        cells: &[Cell],
        attributes: &ExternalAttributeIndex,
        eol: LineEnd,
        width: usize,
    ) -> usize {
        self.push_line(cells, attributes, eol);
        self.drop_excess_lines(width)
    }

    /// Number of wrapped lines at `width`
    pub fn num_lines(&self, width: usize) -> usize {
        self.blocks.iter().map(|b| b.num_lines(width)).sum()
    }

    /// The `index`th wrapped line at `width`, oldest first
    pub fn wrapped_line(&self, index: usize, width: usize) -> Option<WrappedLine<'_>> {
        let mut index = index;
        for block in &self.blocks {
            let count = block.num_lines(width);
            if index < count {
                return block.wrapped_line(index, width);
            }
            index -= count;
        }
        None
    }

    /// Remove the newest wrapped line at `width`
    pub fn pop_last_line(&mut self, width: usize) -> Option<ScrollbackLine> {
        loop {
            let block = self.blocks.back_mut()?;
            if block.is_empty() {
                self.blocks.pop_back();
                continue;
            }
            let line = block.pop_last_line(width);
            if block.is_empty() {
                self.blocks.pop_back();
            }
            return line;
        }
    }

    /// Drop the oldest lines until the cap is met at `width`.
    /// Returns how many wrapped lines were dropped.
    pub fn drop_excess_lines(&mut self, width: usize) -> usize {
        let Some(max) = self.max_lines else {
            return 0;
        };
        let total = self.num_lines(width);
        if total <= max {
            return 0;
        }

        let mut excess = total - max;
        let mut dropped = 0;
        while excess > 0 {
            let Some(block) = self.blocks.front_mut() else {
                break;
            };
            let n = block.drop_lines(excess, width);
            dropped += n;
            excess -= n;
            if block.is_empty() {
                self.blocks.pop_front();
            } else if n == 0 {
                break;
            }
        }
        self.dropped_lines += dropped;
        dropped
    }

    /// Drop all history
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Wrapped line and column at `width` of `offset` into raw line `raw`
    /// (counted from the oldest retained raw line)
    pub fn position_of(&self, raw: usize, offset: usize, width: usize) -> Option<(usize, usize)> {
        let mut raw = raw;
        let mut lines_before = 0;
        for block in &self.blocks {
            let n = block.num_raw_lines();
            if raw < n {
                let (line, x) = block.position_of(raw, offset, width)?;
                return Some((lines_before + line, x));
            }
            raw -= n;
            lines_before += block.num_lines(width);
        }
        None
    }

    /// Read-only copy sharing every block's storage
    pub fn fork(&self) -> LineBuffer {
        LineBuffer {
            blocks: self.blocks.iter().map(LineBlock::fork).collect(),
            block_size: self.block_size,
            max_lines: self.max_lines,
            dropped_lines: self.dropped_lines,
        }
    }

    /// Iterate over wrapped lines at `width`, oldest first
    pub fn lines(&self, width: usize) -> impl Iterator<Item = WrappedLine<'_>> + '_ {
        self.blocks.iter().flat_map(move |block| {
            (0..block.num_lines(width)).filter_map(move |i| block.wrapped_line(i, width))
        })
    }

    pub fn to_record(&self) -> LineBufferRecord {
        LineBufferRecord {
            block_size: self.block_size,
            max_lines: self.max_lines,
            dropped_lines: self.dropped_lines,
            blocks: self
                .blocks
                .iter()
                .filter(|b| !b.is_empty())
                .map(LineBlock::to_record)
                .collect(),
        }
    }

    pub fn from_record(record: &LineBufferRecord) -> Result<Self> {
        let blocks = record
            .blocks
            .iter()
            .map(LineBlock::from_record)
            .collect::<Result<VecDeque<_>>>()?;
        Ok(Self {
            blocks,
            block_size: record.block_size.max(1),
            max_lines: record.max_lines,
            dropped_lines: record.dropped_lines,
        })
    }
}
