//! Snapshots
//!
//! [`ScreenSnapshot`] is the persisted form of a [`Screen`]: everything
//! needed to rebuild it after a restart. [`TextSnapshot`] is a lossy,
//! human-readable view used by the headless runner and golden tests.
//!
//! [`Screen`]: super::Screen

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::attributes::ExternalAttributeTable;
use super::complex::ComplexChars;
use super::grid::{GridCursor, GridRecord};
use super::line_buffer::LineBufferRecord;
use super::screen::{Hyperlink, ScreenModes};
use crate::error::Result;

/// Current persisted format version. Version 2 packs the external
/// attribute key into the cell record; older snapshots are rejected.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Complete persisted screen state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    pub version: u32,
    pub columns: usize,
    pub rows: usize,
    pub primary: GridRecord,
    pub alternate: GridRecord,
    pub using_alternate: bool,
    pub scrollback: LineBufferRecord,
    pub complex_chars: ComplexChars,
    /// Resolves the external attribute key stored in each cell
    #[serde(default)]
    pub external_attributes: ExternalAttributeTable,
    #[serde(default)]
    pub hyperlinks: Vec<Hyperlink>,
    /// OSC 1337 block names
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub modes: ScreenModes,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub icon_title: String,
    #[serde(default)]
    pub current_directory: Option<String>,
    #[serde(default)]
    pub ambiguous_is_double_width: bool,
}

impl ScreenSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write to `path` as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Plain-text view of the visible screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSnapshot {
    pub columns: usize,
    pub rows: usize,
    pub cursor: GridCursor,
    pub cursor_visible: bool,
    /// One entry per row, trailing blanks trimmed
    pub lines: Vec<String>,
    pub title: String,
    pub alternate_screen: bool,
    /// Wrapped scrollback lines at the current width
    pub scrollback_lines: usize,
}

impl TextSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rows joined by newlines, trailing empty rows removed
    pub fn to_text(&self) -> String {
        let end = self
            .lines
            .iter()
            .rposition(|line| !line.is_empty())
            .map_or(0, |i| i + 1);
        let mut result = self.lines[..end].join("\n");
        result.push('\n');
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GraphicRendition, Screen};
    use crate::error::Error;
    use crate::sink::ScreenSink;

    fn sample_screen() -> Screen {
        let mut screen = Screen::new(8, 3, Some(50)).unwrap();
        let rendition = GraphicRendition::default();
        for (i, line) in ["first", "second", "third", "fourth"].iter().enumerate() {
            if i > 0 {
                screen.on_carriage_return();
                screen.on_linefeed();
            }
            for c in line.chars() {
                screen.on_print(c, &rendition);
            }
        }
        screen
    }

    #[test]
    fn test_text_snapshot_to_text() {
        let snapshot = sample_screen().text_snapshot();
        assert_eq!(snapshot.to_text(), "second\nthird\nfourth\n");
        assert_eq!(snapshot.scrollback_lines, 1);
        assert_eq!(snapshot.cursor.y, 2);
    }

    #[test]
    fn test_text_snapshot_trims_empty_rows() {
        let mut screen = Screen::new(8, 4, None).unwrap();
        screen.on_print('x', &GraphicRendition::default());
        assert_eq!(screen.text_snapshot().to_text(), "x\n");
    }

    #[test]
    fn test_text_snapshot_json() {
        let snapshot = sample_screen().text_snapshot();
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"fourth\""));
        assert_eq!(TextSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_screen_snapshot_file_round_trip() {
        let screen = sample_screen();
        let snapshot = screen.snapshot();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.json");
        snapshot.save(&path).unwrap();

        let loaded = ScreenSnapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
        let restored = Screen::restore(&loaded).unwrap();
        assert_eq!(restored.scrollback_text(), "first\nsecond\nthird\nfourth");
    }

    #[test]
    fn test_restore_rejects_mismatched_grid() {
        let mut snapshot = sample_screen().snapshot();
        snapshot.columns = 9;
        assert!(matches!(Screen::restore(&snapshot), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(ScreenSnapshot::load(&path), Err(Error::Json(_))));
    }
}
