//! Shapefile orchestrator.
//!
//! Owns the four sibling components (.shp, .dbf, .shx, .cpg), drives the
//! lazy full-table load and zips geometry with attribute records by
//! positional index. A failure while decoding one record is logged and the
//! index skipped; the overall load never aborts on a single bad record.

use crate::common::error::Result;
use crate::common::geom::MapRect;
use crate::cpg::{self, CpgFile};
use crate::dbf::{self, DbfFile, DbfRecord, FieldDescriptor};
use crate::shape::{Shape, ShapeType};
use crate::shp::{self, ShpFile};
use crate::shx::{self, ShxFile};
use chrono::NaiveDate;
use log::{debug, warn};
use std::fs::File;
use std::path::Path;

/// Whether the feature table has been materialized yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Unloaded,
    Loaded,
}

/// A shapefile: four sibling files sharing a base name, merged into one
/// feature sequence.
///
/// Construction opens and validates all four components; call
/// [`Shapefile::load_shapes`] to materialize the features.
pub struct Shapefile {
    file_name: String,
    shp: ShpFile<File>,
    dbf: DbfFile<File>,
    shx: ShxFile,
    state: LoadState,
    shapes: Vec<Shape>,
}

impl Shapefile {
    /// Open the shapefile rooted at the given path.
    ///
    /// The path may carry any of the sibling extensions (or none); siblings
    /// are derived from its base name. A missing `.cpg` hint falls back to
    /// Windows-1252, the dBase OEM convention; a present but unrecognized
    /// one is fatal.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base = path.as_ref().with_extension("");
        let file_name = base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let encoding = match File::open(base.with_extension(cpg::PATH_EXTENSION)) {
            Ok(file) => CpgFile::open(file)?,
            Err(_) => {
                debug!("{file_name}: no .cpg sibling, defaulting to windows-1252");
                encoding_rs::WINDOWS_1252
            },
        };

        let shp = ShpFile::open(File::open(base.with_extension(shp::PATH_EXTENSION))?)?;
        let dbf = DbfFile::open(
            File::open(base.with_extension(dbf::PATH_EXTENSION))?,
            encoding,
        )?;
        let shx = ShxFile::open(File::open(base.with_extension(shx::PATH_EXTENSION))?)?;

        Ok(Shapefile {
            file_name,
            shp,
            dbf,
            shx,
            state: LoadState::Unloaded,
            shapes: Vec::new(),
        })
    }

    /// Base name shared by the four sibling files.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Shape type declared by the attribute table header.
    ///
    /// The geometry header carries its own declaration which may disagree;
    /// it is surfaced separately as [`Shapefile::geometry_shape_type`].
    pub fn shape_type(&self) -> ShapeType {
        self.dbf.shape_type()
    }

    /// Shape type declared by the geometry header.
    pub fn geometry_shape_type(&self) -> ShapeType {
        self.shp.shape_type()
    }

    /// Last-update stamp of the attribute table.
    pub fn last_update(&self) -> NaiveDate {
        self.dbf.last_update()
    }

    /// Bounding rectangle of the geometry store.
    pub fn bounding_map_rect(&self) -> MapRect {
        self.shp.bounding_rect()
    }

    /// Attribute schema, with the synthetic `DeletionFlag` at index 0.
    pub fn fields(&self) -> &[FieldDescriptor] {
        self.dbf.fields()
    }

    /// Decoded features; empty until [`Shapefile::load_shapes`] runs.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Materialize the full feature sequence.
    ///
    /// Idempotent: the first call performs the pass, subsequent calls are
    /// no-ops. For each index the geometry record is decoded at the offset
    /// the index file provides, the matching attribute record is decoded,
    /// and field names are zipped with values into the shape's `info` map.
    /// Deleted attribute records keep their geometry with an empty map.
    pub fn load_shapes(&mut self) {
        if self.state == LoadState::Loaded {
            return;
        }
        self.state = LoadState::Loaded;

        for i in 0..self.shx.shape_count() {
            let Some(offset) = self.shx.offset(i) else {
                continue;
            };

            let mut shape = match self.shp.shape_at_offset(offset) {
                Ok(Some(shape)) => shape,
                Ok(None) => {
                    warn!("{}: index {i} points at the end of the geometry store", self.file_name);
                    continue;
                },
                Err(e) => {
                    warn!("{}: skipping shape {i}: {e}", self.file_name);
                    continue;
                },
            };

            match self.dbf.record_at(i) {
                Ok(DbfRecord::Active(values)) => {
                    shape.info = self
                        .dbf
                        .field_names()
                        .map(str::to_owned)
                        .zip(values)
                        .collect();
                },
                // Tombstoned row: keep the geometry, merge nothing.
                Ok(DbfRecord::Deleted) => {},
                Err(e) => {
                    warn!("{}: skipping record {i}: {e}", self.file_name);
                    continue;
                },
            }

            self.shapes.push(shape);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::geom::Coordinate;
    use crate::dbf::FieldValue;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn le_f64s(values: &[f64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Point record: 8-byte record header + type code + coordinate pair.
    fn point_record(number: i32, x: f64, y: f64) -> Vec<u8> {
        let mut r = Vec::with_capacity(28);
        r.extend_from_slice(&number.to_be_bytes());
        r.extend_from_slice(&10i32.to_be_bytes()); // content length in words
        r.extend_from_slice(&1i32.to_le_bytes());
        r.extend_from_slice(&le_f64s(&[x, y]));
        r
    }

    fn shp_bytes(records: &[Vec<u8>]) -> Vec<u8> {
        let mut data = vec![0u8; 100];
        data[0..4].copy_from_slice(&9994i32.to_be_bytes());
        data[28..32].copy_from_slice(&1000i32.to_le_bytes());
        data[32..36].copy_from_slice(&1i32.to_le_bytes());
        for (i, v) in [-10.0f64, -5.0, 30.0, 25.0].iter().enumerate() {
            data[36 + i * 8..44 + i * 8].copy_from_slice(&v.to_le_bytes());
        }
        for r in records {
            data.extend_from_slice(r);
        }
        let words = (data.len() / 2) as i32;
        data[24..28].copy_from_slice(&words.to_be_bytes());
        data
    }

    fn shx_bytes(offsets_and_lengths: &[(i32, i32)]) -> Vec<u8> {
        let mut data = vec![0u8; 100];
        data[0..4].copy_from_slice(&9994i32.to_be_bytes());
        let words = ((100 + offsets_and_lengths.len() * 8) / 2) as i32;
        data[24..28].copy_from_slice(&words.to_be_bytes());
        for (offset, length) in offsets_and_lengths {
            data.extend_from_slice(&offset.to_be_bytes());
            data.extend_from_slice(&length.to_be_bytes());
        }
        data
    }

    fn dbf_bytes(fields: &[(&str, u8, u8)], rows: &[&[u8]]) -> Vec<u8> {
        let header_length = (32 + 32 * fields.len() + 1) as u16;
        let record_length = 1 + fields.iter().map(|f| f.2 as u16).sum::<u16>();

        let mut data = vec![3u8, 24, 3, 15];
        data.extend_from_slice(&(rows.len() as u32).to_le_bytes());
        data.extend_from_slice(&header_length.to_le_bytes());
        data.extend_from_slice(&record_length.to_le_bytes());
        data.extend_from_slice(&[0u8; 20]);
        for (name, type_byte, length) in fields {
            let mut descriptor = [0u8; 32];
            descriptor[..name.len()].copy_from_slice(name.as_bytes());
            descriptor[11] = *type_byte;
            descriptor[16] = *length;
            data.extend_from_slice(&descriptor);
        }
        data.push(b'\r');
        for row in rows {
            data.extend_from_slice(row);
        }
        data
    }

    fn write_siblings(
        dir: &TempDir,
        shp: &[u8],
        dbf: &[u8],
        shx: &[u8],
        cpg: Option<&[u8]>,
    ) -> PathBuf {
        let base = dir.path().join("places");
        std::fs::write(base.with_extension("shp"), shp).unwrap();
        std::fs::write(base.with_extension("dbf"), dbf).unwrap();
        std::fs::write(base.with_extension("shx"), shx).unwrap();
        if let Some(cpg) = cpg {
            std::fs::write(base.with_extension("cpg"), cpg).unwrap();
        }
        base.with_extension("shp")
    }

    #[test]
    fn test_end_to_end_two_points() {
        let dir = TempDir::new().unwrap();
        let path = write_siblings(
            &dir,
            &shp_bytes(&[point_record(1, 2.5, 48.25), point_record(2, -0.1, 51.5)]),
            &dbf_bytes(
                &[("NAME", b'C', 10)],
                &[b" Alpha     ", b" Beta      "],
            ),
            &shx_bytes(&[(50, 10), (64, 10)]),
            Some(b"UTF-8\n"),
        );

        let mut shapefile = Shapefile::open(&path).unwrap();
        assert_eq!(shapefile.file_name(), "places");
        assert_eq!(shapefile.last_update(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(
            shapefile.bounding_map_rect(),
            MapRect::from_extents(-10.0, -5.0, 30.0, 25.0)
        );
        // The attribute header byte wins the public property; the geometry
        // header value stays available.
        assert_eq!(shapefile.shape_type(), ShapeType::PolyLine);
        assert_eq!(shapefile.geometry_shape_type(), ShapeType::Point);
        assert!(shapefile.shapes().is_empty());

        shapefile.load_shapes();
        let shapes = shapefile.shapes();
        assert_eq!(shapes.len(), 2);

        assert_eq!(shapes[0].coordinates, vec![Coordinate::new(48.25, 2.5)]);
        assert_eq!(
            shapes[0].info.get("NAME"),
            Some(&FieldValue::String("Alpha".to_string()))
        );
        assert_eq!(shapes[1].coordinates, vec![Coordinate::new(51.5, -0.1)]);
        assert_eq!(
            shapes[1].info.get("NAME"),
            Some(&FieldValue::String("Beta".to_string()))
        );
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_siblings(
            &dir,
            &shp_bytes(&[point_record(1, 1.0, 2.0)]),
            &dbf_bytes(&[("NAME", b'C', 10)], &[b" Solo      "]),
            &shx_bytes(&[(50, 10)]),
            None, // exercises the missing-.cpg fallback too
        );

        let mut shapefile = Shapefile::open(&path).unwrap();
        shapefile.load_shapes();
        shapefile.load_shapes();
        assert_eq!(shapefile.shapes().len(), 1);
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_siblings(
            &dir,
            &shp_bytes(&[
                point_record(1, 1.0, 1.0),
                point_record(2, 2.0, 2.0),
                point_record(3, 3.0, 3.0),
            ]),
            &dbf_bytes(
                &[("RATE", b'F', 8)],
                &[b"     1.25", b"    bogus", b"     3.75"],
            ),
            &shx_bytes(&[(50, 10), (64, 10), (78, 10)]),
            None,
        );

        let mut shapefile = Shapefile::open(&path).unwrap();
        shapefile.load_shapes();

        // The middle record has an unparsable Floating value; only that
        // index is dropped.
        let shapes = shapefile.shapes();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].info.get("RATE"), Some(&FieldValue::Float(1.25)));
        assert_eq!(shapes[1].info.get("RATE"), Some(&FieldValue::Float(3.75)));
    }

    #[test]
    fn test_deleted_record_keeps_geometry_without_attributes() {
        let dir = TempDir::new().unwrap();
        let path = write_siblings(
            &dir,
            &shp_bytes(&[point_record(1, 1.0, 1.0), point_record(2, 2.0, 2.0)]),
            &dbf_bytes(
                &[("NAME", b'C', 10)],
                &[b"*Gone      ", b" Kept      "],
            ),
            &shx_bytes(&[(50, 10), (64, 10)]),
            None,
        );

        let mut shapefile = Shapefile::open(&path).unwrap();
        shapefile.load_shapes();

        let shapes = shapefile.shapes();
        assert_eq!(shapes.len(), 2);
        assert!(shapes[0].info.is_empty());
        assert_eq!(
            shapes[1].info.get("NAME"),
            Some(&FieldValue::String("Kept".to_string()))
        );
    }

    #[test]
    fn test_unknown_cpg_token_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_siblings(
            &dir,
            &shp_bytes(&[]),
            &dbf_bytes(&[("NAME", b'C', 10)], &[]),
            &shx_bytes(&[]),
            Some(b"klingon"),
        );

        assert!(Shapefile::open(&path).is_err());
    }

    #[test]
    fn test_missing_sibling_is_fatal() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("orphan");
        std::fs::write(base.with_extension("shp"), shp_bytes(&[])).unwrap();

        assert!(Shapefile::open(base.with_extension("shp")).is_err());
    }
}
