//! Error type
//!
//! Only construction, resize and persistence return errors. Tokenizing and
//! executing input never fail: malformed input is dropped where it is found.

/// Crate error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid dimensions: {columns}x{rows}")]
    InvalidDimensions { columns: usize, rows: usize },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt persisted data: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;
