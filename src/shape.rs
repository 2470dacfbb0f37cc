//! Shape type catalog and decoded geometry features.
//!
//! Every shape record starts with a 32-bit type code; the code determines
//! which optional binary segments (bounding box, parts, vertex array, Z and
//! M arrays) the record carries. [`ShapeType`] is the pure lookup from code
//! to variant plus capability set, and [`Shape`] is the decoded feature.

use crate::common::geom::{Coordinate, MapRect};
use crate::dbf::FieldValue;
use std::collections::HashMap;

/// Geometry subtype of a shape record.
///
/// The numeric codes are fixed by the Esri shapefile specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    NullShape,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
    MultiPatch,
}

impl ShapeType {
    /// Map a 32-bit type code to its variant.
    ///
    /// Unknown codes fail closed to [`ShapeType::NullShape`] so that an
    /// unrecognized extension does not abort an otherwise-valid file.
    pub fn from_code(code: i32) -> ShapeType {
        match code {
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            31 => ShapeType::MultiPatch,
            _ => ShapeType::NullShape,
        }
    }

    /// The record carries a 4-double bounding box.
    pub fn has_bounding_box(&self) -> bool {
        !matches!(
            self,
            ShapeType::NullShape | ShapeType::Point | ShapeType::PointZ | ShapeType::PointM
        )
    }

    /// The record carries a part count and a part-start-index array.
    pub fn has_parts(&self) -> bool {
        matches!(
            self,
            ShapeType::PolyLine
                | ShapeType::Polygon
                | ShapeType::PolyLineZ
                | ShapeType::PolygonZ
                | ShapeType::PolyLineM
                | ShapeType::PolygonM
                | ShapeType::MultiPatch
        )
    }

    /// The record carries a point count and a vertex array.
    pub fn has_points(&self) -> bool {
        self.has_parts()
    }

    /// The record carries a Z range followed by per-vertex Z values.
    pub fn has_z_values(&self) -> bool {
        matches!(
            self,
            ShapeType::PolyLineZ
                | ShapeType::PolygonZ
                | ShapeType::MultiPointZ
                | ShapeType::MultiPatch
        )
    }

    /// The record carries an M range followed by per-vertex measure values.
    pub fn has_m_values(&self) -> bool {
        matches!(
            self,
            ShapeType::PolyLineM | ShapeType::PolygonM | ShapeType::MultiPointM
        )
    }

    /// The record is a single coordinate pair.
    pub fn has_single_point(&self) -> bool {
        matches!(self, ShapeType::Point | ShapeType::PointZ | ShapeType::PointM)
    }

    /// The record carries one scalar Z value.
    pub fn has_single_z(&self) -> bool {
        matches!(self, ShapeType::PointZ)
    }

    /// The record carries one scalar measure value.
    pub fn has_single_m(&self) -> bool {
        matches!(self, ShapeType::PointM)
    }

    /// Multipatch records carry an extra per-part ring-type array.
    pub fn is_multipatch(&self) -> bool {
        matches!(self, ShapeType::MultiPatch)
    }
}

/// One decoded geometry feature.
///
/// Geometry fields are populated by the geometry decoder; `info` is filled
/// in later when the orchestrator merges the matching attribute record, and
/// the shape is not mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Geometry subtype of this record.
    pub shape_type: ShapeType,
    /// Axis-aligned bounding rectangle, when the subtype carries one.
    pub bounding_box: Option<MapRect>,
    /// Starting vertex index of each ring/segment.
    pub parts: Vec<i32>,
    /// Multipatch ring classification, one entry per part.
    pub part_types: Vec<i32>,
    /// Vertices in stream order.
    pub coordinates: Vec<Coordinate>,
    /// Per-vertex elevation values; a single element for `PointZ`.
    pub z: Vec<f64>,
    /// Per-vertex measure values; `None` encodes the no-data sentinel.
    pub m: Vec<Option<f64>>,
    /// Attribute values keyed by field name, merged from the .dbf table.
    pub info: HashMap<String, FieldValue>,
}

impl Shape {
    /// Construct an empty shape of the given subtype.
    pub fn new(shape_type: ShapeType) -> Self {
        Shape {
            shape_type,
            bounding_box: None,
            parts: Vec::new(),
            part_types: Vec::new(),
            coordinates: Vec::new(),
            z: Vec::new(),
            m: Vec::new(),
            info: HashMap::new(),
        }
    }

    /// First elevation value, when any is present.
    pub fn z_scalar(&self) -> Option<f64> {
        self.z.first().copied()
    }
}
