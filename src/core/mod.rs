//! Terminal Core Module
//!
//! Platform-independent screen state. This module contains:
//! - Packed cells, colors and the per-line external attribute index
//! - The visible grid with cursor, scroll region and tab stops
//! - Copy-on-write scrollback blocks and the multi-block line buffer
//! - The screen (primary and alternate grids plus scrollback)
//! - Persisted and text snapshots
//!
//! Given the same sequence of sink calls, the core always ends up in the
//! same state.

mod attributes;
mod cell;
mod charset;
mod color;
mod complex;
mod grid;
mod line_block;
mod line_buffer;
mod rendition;
mod screen;
mod snapshot;

pub use attributes::{
    AttributeRun, ExternalAttribute, ExternalAttributeIndex, ExternalAttributeTable,
};
pub use cell::{
    pack_cells, unpack_cells, Cell, CellFlags, LineEnd, UnderlineStyle, BOGUS_CHAR,
    CELL_RECORD_SIZE, DWC_RIGHT, DWC_SKIP, TAB_FILLER,
};
pub use charset::{Charset, CharsetState};
pub use color::Color;
pub use complex::ComplexChars;
pub use grid::{Grid, GridCursor, GridRecord, Row, RowRecord, TAB_WIDTH};
pub use line_block::{
    count_wraps, next_wrap, LineBlock, LineBlockRecord, ScrollbackLine, WrappedLine,
    DEFAULT_BLOCK_SIZE,
};
pub use line_buffer::{LineBuffer, LineBufferRecord};
pub use rendition::GraphicRendition;
pub use screen::{Hyperlink, Screen, ScreenModes};
pub use snapshot::{ScreenSnapshot, TextSnapshot, SNAPSHOT_VERSION};
