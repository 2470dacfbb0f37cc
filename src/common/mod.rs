//! Common types and utilities shared across the four shapefile components.

// Submodule declarations
pub mod binary;
pub mod error;
pub mod geom;

// Re-exports for convenience
pub use error::{Error, Result};
pub use geom::{Coordinate, MapRect};
