//! External attributes
//!
//! Attributes too large for the packed cell (hyperlinks, underline color,
//! block ids, control codes) live in a per-line side table. The table is
//! run-length compressed by column: runs never overlap, are kept in column
//! order and adjacent equal runs are merged, so a line with no attributes
//! costs nothing.
//!
//! Each distinct attribute is also interned in a per-screen
//! [`ExternalAttributeTable`], and its 16-bit key is stored in the cell so
//! a single cell can be resolved without its line.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::color::Color;

/// Per-cell attributes stored outside the packed cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ExternalAttribute {
    /// Underline color distinct from the foreground (SGR 58)
    pub underline_color: Option<Color>,
    /// Hyperlink registered with the screen (OSC 8)
    pub hyperlink_id: Option<u32>,
    /// Shell-integration block registered with the screen (OSC 1337 Block)
    pub block_id: Option<u32>,
    /// Control code shown in place of a character
    pub control_code: Option<u8>,
}

impl ExternalAttribute {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.underline_color.is_none()
            && self.hyperlink_id.is_none()
            && self.block_id.is_none()
            && self.control_code.is_none()
    }

    pub fn has_underline_color(&self) -> bool {
        self.underline_color.is_some()
    }
}

/// Interned external attributes, keyed by the 16-bit index cells carry.
///
/// Key 0 is reserved for "no attribute". Keys are never reused, so a cell
/// in history keeps resolving to the attribute it was written with. Once
/// every key is taken, new attributes get 0 and are only found through
/// the line's [`ExternalAttributeIndex`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalAttributeTable {
    /// Key `n` is `entries[n - 1]`
    entries: Vec<ExternalAttribute>,
    #[serde(skip)]
    keys: HashMap<ExternalAttribute, u16>,
}

impl ExternalAttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key for `attr`, adding it if needed; 0 for the empty attribute or
    /// when the table is full
    pub fn intern(&mut self, attr: &ExternalAttribute) -> u16 {
        if attr.is_empty() {
            return 0;
        }
        if let Some(&key) = self.keys.get(attr) {
            return key;
        }
        let Ok(key) = u16::try_from(self.entries.len() + 1) else {
            tracing::debug!("external attribute table full");
            return 0;
        };
        self.entries.push(attr.clone());
        self.keys.insert(attr.clone(), key);
        key
    }

    /// Attribute for a cell's key
    pub fn get(&self, key: u16) -> Option<&ExternalAttribute> {
        usize::from(key)
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
    }

    /// Rebuild the lookup map after deserializing
    pub fn reindex(&mut self) {
        self.keys = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, attr)| Some((attr.clone(), u16::try_from(i + 1).ok()?)))
            .collect();
    }
}

impl PartialEq for ExternalAttributeTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for ExternalAttributeTable {}

/// A run of columns sharing one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRun {
    pub start: usize,
    pub len: usize,
    pub attr: ExternalAttribute,
}

impl AttributeRun {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Sparse column-keyed attribute table for one line
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalAttributeIndex {
    runs: Vec<AttributeRun>,
}

impl ExternalAttributeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Runs in column order
    pub fn runs(&self) -> &[AttributeRun] {
        &self.runs
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// Attribute covering `col`
    pub fn get(&self, col: usize) -> Option<&ExternalAttribute> {
        let idx = self.runs.partition_point(|run| run.end() <= col);
        self.runs
            .get(idx)
            .filter(|run| run.start <= col)
            .map(|run| &run.attr)
    }

    /// Set `range` to `attr`; an empty attribute erases the range
    pub fn set(&mut self, range: Range<usize>, attr: &ExternalAttribute) {
        if range.start >= range.end {
            return;
        }
        self.erase(range.clone());
        if attr.is_empty() {
            return;
        }
        let pos = self.runs.partition_point(|run| run.start < range.start);
        self.runs.insert(
            pos,
            AttributeRun {
                start: range.start,
                len: range.end - range.start,
                attr: attr.clone(),
            },
        );
        self.merge_adjacent();
    }

    /// Remove attributes from `range`, splitting runs that straddle it
    pub fn erase(&mut self, range: Range<usize>) {
        if range.start >= range.end || self.runs.is_empty() {
            return;
        }
        let mut out = Vec::with_capacity(self.runs.len() + 1);
        for run in self.runs.drain(..) {
            if run.end() <= range.start || run.start >= range.end {
                out.push(run);
                continue;
            }
            if run.start < range.start {
                out.push(AttributeRun {
                    start: run.start,
                    len: range.start - run.start,
                    attr: run.attr.clone(),
                });
            }
            if run.end() > range.end {
                out.push(AttributeRun {
                    start: range.end,
                    len: run.end() - range.end,
                    attr: run.attr,
                });
            }
        }
        self.runs = out;
    }

    /// Open a gap of `count` columns at `at`, shifting later columns right;
    /// anything pushed past `limit` is discarded
    pub fn insert(&mut self, at: usize, count: usize, limit: usize) {
        if count == 0 {
            return;
        }
        let mut out = Vec::with_capacity(self.runs.len() + 1);
        for run in self.runs.drain(..) {
            if run.end() <= at {
                out.push(run);
            } else if run.start >= at {
                out.push(AttributeRun {
                    start: run.start + count,
                    ..run
                });
            } else {
                out.push(AttributeRun {
                    start: run.start,
                    len: at - run.start,
                    attr: run.attr.clone(),
                });
                out.push(AttributeRun {
                    start: at + count,
                    len: run.end() - at,
                    attr: run.attr,
                });
            }
        }
        self.runs = out;
        self.truncate(limit);
    }

    /// Delete `count` columns at `at`, shifting later columns left
    pub fn remove(&mut self, at: usize, count: usize) {
        if count == 0 {
            return;
        }
        self.erase(at..at + count);
        for run in &mut self.runs {
            if run.start >= at + count {
                run.start -= count;
            }
        }
        self.merge_adjacent();
    }

    /// Drop everything at or past `len`
    pub fn truncate(&mut self, len: usize) {
        self.erase(len..usize::MAX);
    }

    /// Copy of the attributes in `range`, rebased to start at column 0
    pub fn subrange(&self, range: Range<usize>) -> Self {
        let runs = self
            .runs
            .iter()
            .filter(|run| run.end() > range.start && run.start < range.end)
            .map(|run| {
                let start = run.start.max(range.start);
                let end = run.end().min(range.end);
                AttributeRun {
                    start: start - range.start,
                    len: end - start,
                    attr: run.attr.clone(),
                }
            })
            .collect();
        Self { runs }
    }

    /// Append `other`, shifted right by `offset` columns
    pub fn append(&mut self, other: &Self, offset: usize) {
        if other.is_empty() {
            return;
        }
        self.truncate(offset);
        self.runs.extend(other.runs.iter().map(|run| AttributeRun {
            start: run.start + offset,
            ..run.clone()
        }));
        self.merge_adjacent();
    }

    fn merge_adjacent(&mut self) {
        let mut out: Vec<AttributeRun> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match out.last_mut() {
                Some(last) if last.end() == run.start && last.attr == run.attr => {
                    last.len += run.len;
                }
                _ => out.push(run),
            }
        }
        self.runs = out;
        debug_assert!(self.is_well_formed());
    }

    /// Runs are non-empty, ordered and non-overlapping
    pub fn is_well_formed(&self) -> bool {
        self.runs.iter().all(|run| run.len > 0)
            && self.runs.windows(2).all(|w| w[0].end() <= w[1].start)
    }
}
