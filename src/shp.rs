//! Geometry stream (.shp) decoder.
//!
//! The .shp file is a 100-byte header followed by variable-length shape
//! records. The header mixes byte orders: the file-length word at offset 24
//! is big-endian and counted in 16-bit words, while the version, shape type
//! and extents are little-endian. Record decoding is random-access: callers
//! supply a byte offset (normally taken from the .shx index) and get one
//! [`Shape`] back.

use crate::common::binary::{read_exact_or_parse, read_f64_le, read_i32_be, read_i32_le};
use crate::common::error::{Error, Result};
use crate::common::geom::{Coordinate, MapRect};
use crate::shape::{Shape, ShapeType};
use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};

/// File extension of the geometry stream.
pub const PATH_EXTENSION: &str = "shp";

/// Size of the fixed file header in bytes.
const HEADER_LEN: usize = 100;

/// Measure values below this are the format's "no data" sentinel.
const NO_DATA_SENTINEL: f64 = -1e38;

/// Random-access decoder for the shape-record store.
pub struct ShpFile<R: Read + Seek> {
    reader: R,
    shape_type: ShapeType,
    bounding_rect: MapRect,
    elevation_range: (f64, f64),
    measure_range: (f64, f64),
    /// Authoritative store length in bytes. The header-declared value is
    /// advisory only and is replaced by the measured stream size.
    shp_length: u64,
}

impl<R: Read + Seek> ShpFile<R> {
    /// Open the geometry store and parse its 100-byte header.
    pub fn open(mut reader: R) -> Result<Self> {
        let mut header = [0u8; HEADER_LEN];
        read_exact_or_parse(&mut reader, &mut header, "shp header")?;

        // File length is big-endian and expressed in 16-bit words.
        let length_words = read_i32_be(&header, 24)?;
        let declared_length = u64::try_from(length_words)
            .map_err(|_| Error::parse(format!("negative shp length word {length_words}")))?
            * 2;
        let _version = read_i32_le(&header, 28)?;
        let shape_type = ShapeType::from_code(read_i32_le(&header, 32)?);

        let x_min = read_f64_le(&header, 36)?;
        let y_min = read_f64_le(&header, 44)?;
        let x_max = read_f64_le(&header, 52)?;
        let y_max = read_f64_le(&header, 60)?;
        let bounding_rect = MapRect::from_extents(x_min, y_min, x_max, y_max);

        let elevation_range = (read_f64_le(&header, 68)?, read_f64_le(&header, 76)?);
        let measure_range = (read_f64_le(&header, 84)?, read_f64_le(&header, 92)?);

        // Don't trust the length declared in the header; the actual stream
        // size is authoritative.
        let actual_length = reader.seek(SeekFrom::End(0))?;
        let shp_length = if actual_length != declared_length {
            warn!(
                "actual shp length {actual_length} != length in header {declared_length}, using the actual one"
            );
            actual_length
        } else {
            declared_length
        };

        Ok(ShpFile {
            reader,
            shape_type,
            bounding_rect,
            elevation_range,
            measure_range,
            shp_length,
        })
    }

    /// Shape type declared in the geometry header.
    pub fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    /// Bounding rectangle of the whole store, from the header extents.
    pub fn bounding_rect(&self) -> MapRect {
        self.bounding_rect
    }

    /// Header-declared elevation (Z) range.
    pub fn elevation_range(&self) -> (f64, f64) {
        self.elevation_range
    }

    /// Header-declared measure (M) range.
    pub fn measure_range(&self) -> (f64, f64) {
        self.measure_range
    }

    /// Authoritative byte length of the store.
    pub fn len(&self) -> u64 {
        self.shp_length
    }

    /// Decode the shape record starting at the given byte offset.
    ///
    /// Returns `Ok(None)` when `offset` equals the store length, the
    /// standard end-of-store terminator. Every prior step must have produced
    /// a valid offset, so an offset past the end is a caller fault.
    pub fn shape_at_offset(&mut self, offset: u64) -> Result<Option<Shape>> {
        if offset == self.shp_length {
            return Ok(None);
        }
        debug_assert!(
            offset < self.shp_length,
            "trying to read shape at offset {offset}, but shp length is only {}",
            self.shp_length
        );
        if offset > self.shp_length {
            return Err(Error::parse(format!(
                "shape offset {offset} past end of store ({})",
                self.shp_length
            )));
        }

        // Skip the 8-byte record header; record number and content length
        // are redundant with the index entry.
        self.reader.seek(SeekFrom::Start(offset + 8))?;

        let shape_type = ShapeType::from_code(self.read_i32()?);
        let mut shape = Shape::new(shape_type);

        let mut n_parts = 0usize;
        let mut n_points = 0usize;

        if shape_type.has_bounding_box() {
            let extents = self.read_f64_array(4, "bounding box")?;
            shape.bounding_box = Some(MapRect::from_extents(
                extents[0], extents[1], extents[2], extents[3],
            ));
        }

        if shape_type.has_parts() {
            n_parts = self.read_count("part count")?;
        }

        if shape_type.has_points() {
            n_points = self.read_count("point count")?;
        }

        if n_parts > 0 {
            shape.parts = self.read_i32_array(n_parts, "parts")?;
        }

        if shape_type.is_multipatch() {
            shape.part_types = self.read_i32_array(n_parts, "part types")?;
        }

        let vertices = self.read_f64_array(n_points * 2, "coordinates")?;
        shape.coordinates = vertices
            .chunks_exact(2)
            .map(|xy| Coordinate::new(xy[1], xy[0]))
            .collect();

        if shape_type.has_z_values() {
            let z_min = self.read_f64("z range")?;
            let z_max = self.read_f64("z range")?;
            debug!("z range: {z_min}..{z_max}");
            shape.z = self.read_f64_array(n_points, "z values")?;
        }

        // Per-vertex measures only exist when the file-level M range is
        // non-degenerate; Z-less writers leave both bounds at zero.
        if shape_type.has_m_values() && self.measure_range.0 != 0.0 && self.measure_range.1 != 0.0 {
            let m_min = self.read_f64("m range")?;
            let m_max = self.read_f64("m range")?;
            debug!("m range: {m_min}..{m_max}");
            shape.m = self
                .read_f64_array(n_points, "m values")?
                .into_iter()
                .map(measure_from_raw)
                .collect();
        }

        if shape_type.has_single_point() {
            let xy = self.read_f64_array(2, "point")?;
            let coordinate = Coordinate::new(xy[1], xy[0]);
            shape.coordinates.push(coordinate);
            shape.bounding_box = Some(MapRect::at_coordinate(coordinate));
        }

        if shape_type.has_single_z() {
            let z = self.read_f64("z value")?;
            shape.z.push(z);
        }

        if shape_type.has_single_m() {
            let m = self.read_f64("m value")?;
            shape.m = vec![measure_from_raw(m)];
        }

        Ok(Some(shape))
    }

    fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        read_exact_or_parse(&mut self.reader, &mut buf, "i32")?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_count(&mut self, what: &str) -> Result<usize> {
        let n = self.read_i32()?;
        usize::try_from(n).map_err(|_| Error::parse(format!("negative {what}: {n}")))
    }

    fn read_f64(&mut self, what: &str) -> Result<f64> {
        let mut buf = [0u8; 8];
        read_exact_or_parse(&mut self.reader, &mut buf, what)?;
        Ok(f64::from_le_bytes(buf))
    }

    fn read_i32_array(&mut self, count: usize, what: &str) -> Result<Vec<i32>> {
        self.check_remaining(count as u64 * 4, what)?;
        let mut buf = vec![0u8; count * 4];
        read_exact_or_parse(&mut self.reader, &mut buf, what)?;
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            values.push(read_i32_le(&buf, i * 4)?);
        }
        Ok(values)
    }

    fn read_f64_array(&mut self, count: usize, what: &str) -> Result<Vec<f64>> {
        self.check_remaining(count as u64 * 8, what)?;
        let mut buf = vec![0u8; count * 8];
        read_exact_or_parse(&mut self.reader, &mut buf, what)?;
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            values.push(read_f64_le(&buf, i * 8)?);
        }
        Ok(values)
    }

    /// A corrupt record count must not drive the allocation; the bytes left
    /// in the store bound what any array read may ask for.
    fn check_remaining(&mut self, needed: u64, what: &str) -> Result<()> {
        let remaining = self
            .shp_length
            .saturating_sub(self.reader.stream_position()?);
        if needed > remaining {
            return Err(Error::parse(format!("Not enough data for {what}")));
        }
        Ok(())
    }
}

/// Apply the no-data sentinel rule to a raw measure value.
#[inline]
fn measure_from_raw(value: f64) -> Option<f64> {
    if value < NO_DATA_SENTINEL {
        None
    } else {
        Some(value)
    }
}
