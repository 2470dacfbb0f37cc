//! Loquat - A Rust library for reading the Esri Shapefile format
//!
//! This library decodes the four sibling files that make up a shapefile
//! dataset and merges them into in-memory geographic feature records:
//!
//! - **.shp** — the geometry stream (mixed-endian binary shape records)
//! - **.dbf** — the dBase attribute table (fixed-width typed records)
//! - **.shx** — the geometry index (byte offsets per feature)
//! - **.cpg** — the text-encoding hint (a single code-page token)
//!
//! # Features
//!
//! - **All 14 shape subtypes**: points, polylines, polygons, multipoints,
//!   their Z/M variants and multipatch
//! - **Typed attribute values**: pattern-match on [`FieldValue`] instead of
//!   runtime-casting strings
//! - **Corruption tolerance**: header-declared lengths are treated as hints
//!   and recomputed from the actual data; one malformed record never aborts
//!   a whole load
//!
//! # Example - Loading a shapefile
//!
//! ```no_run
//! use loquat::Shapefile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut shapefile = Shapefile::open("coastline.shp")?;
//! shapefile.load_shapes();
//!
//! for shape in shapefile.shapes() {
//!     println!("{:?} with {} vertices", shape.shape_type, shape.coordinates.len());
//!     if let Some(name) = shape.info.get("NAME") {
//!         println!("  name: {:?}", name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Low-level component access
//!
//! ```no_run
//! use std::fs::File;
//! use loquat::dbf::DbfFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("coastline.dbf")?;
//! let mut dbf = DbfFile::open(file, encoding_rs::UTF_8)?;
//!
//! println!("{} records, updated {}", dbf.record_count(), dbf.last_update());
//! for record in dbf.all_records()? {
//!     println!("{record:?}");
//! }
//! # Ok(())
//! # }
//! ```

/// Shared infrastructure: errors, endian-explicit binary readers, and the
/// opaque geographic value types.
pub mod common;

/// Text-encoding hint (.cpg) resolver.
pub mod cpg;

/// Attribute table (.dbf) decoder.
pub mod dbf;

/// Shape type catalog and decoded geometry features.
pub mod shape;

/// Shapefile orchestrator joining the four components.
pub mod shapefile;

/// Geometry stream (.shp) decoder.
pub mod shp;

/// Geometry index (.shx) provider.
pub mod shx;

// Re-export commonly used types for convenience
pub use common::error::{Error, Result};
pub use common::geom::{Coordinate, MapRect};
pub use cpg::{CodePage, CpgFile};
pub use dbf::{DbfFile, DbfRecord, FieldDescriptor, FieldType, FieldValue};
pub use shape::{Shape, ShapeType};
pub use shapefile::Shapefile;
pub use shp::ShpFile;
pub use shx::ShxFile;
