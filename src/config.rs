//! Configuration
//!
//! Everything the core needs to know up front is passed in through
//! [`Config`] at construction time. There is no global configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::DEFAULT_BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::parser::{Encoding, DEFAULT_MAX_SEQUENCE_LENGTH, MIN_MAX_SEQUENCE_LENGTH};

/// Emulator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial width in columns
    pub columns: usize,
    /// Initial height in rows
    pub rows: usize,
    /// Maximum scrollback lines
    pub scrollback_lines: usize,
    /// Never drop scrollback; overrides `scrollback_lines`
    pub unlimited_scrollback: bool,
    /// East Asian ambiguous-width characters take two cells
    pub ambiguous_is_double_width: bool,
    /// Canonical input encoding
    pub encoding: Encoding,
    /// Longest CSI/OSC/DCS accepted before it is abandoned
    pub max_sequence_length: usize,
    /// Cells per scrollback block
    pub block_size: usize,
    /// Print unhandled C0 controls in caret notation instead of dropping them
    pub show_control_codes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            columns: 80,
            rows: 24,
            scrollback_lines: 10000,
            unlimited_scrollback: false,
            ambiguous_is_double_width: false,
            encoding: Encoding::Utf8,
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            block_size: DEFAULT_BLOCK_SIZE,
            show_control_codes: false,
        }
    }
}

impl Config {
    /// Scrollback cap, `None` when unlimited
    pub fn scrollback_limit(&self) -> Option<usize> {
        (!self.unlimited_scrollback).then_some(self.scrollback_lines)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 || self.rows == 0 {
            return Err(Error::InvalidDimensions {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self.block_size == 0 {
            return Err(Error::InvalidConfig("block_size must be positive".into()));
        }
        if self.max_sequence_length < MIN_MAX_SEQUENCE_LENGTH {
            return Err(Error::InvalidConfig(format!(
                "max_sequence_length must be at least {}",
                MIN_MAX_SEQUENCE_LENGTH
            )));
        }
        Ok(())
    }
}
