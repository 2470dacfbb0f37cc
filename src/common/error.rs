//! Unified error types for Loquat.
//!
//! All four shapefile components (.shp, .dbf, .shx, .cpg) surface the same
//! error taxonomy: OS-level I/O failures, and parse failures for malformed or
//! truncated binary input.
use thiserror::Error;

/// Main error type for Loquat operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or truncated binary input
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Build a parse error from anything printable.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }
}

/// Result type for Loquat operations.
pub type Result<T> = std::result::Result<T, Error>;
