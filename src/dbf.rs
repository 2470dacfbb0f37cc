//! Attribute table (.dbf) decoder.
//!
//! The attribute table is a dBase III+ file (extended with the dBase IV 2.0
//! `F` type): a 32-byte little-endian header, one 32-byte descriptor per
//! field, a carriage-return terminator, then fixed-width records. Every
//! record is preceded by a 1-byte deletion flag; a synthetic `DeletionFlag`
//! descriptor is prepended to the schema so field widths line up with the
//! on-disk layout.

use crate::common::binary::read_exact_or_parse;
use crate::common::error::{Error, Result};
use crate::shape::ShapeType;
use chrono::NaiveDate;
use encoding_rs::Encoding;
use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};
use zerocopy::{FromBytes, LE, U16, U32};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// File extension of the attribute table.
pub const PATH_EXTENSION: &str = "dbf";

/// Raw dBase file header (32 bytes, little-endian).
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDbfHeader {
    /// Shape-type byte (dBase version slot, reused by shapefile writers)
    shape_type: u8,
    /// Last update date: year minus 1900 or 2000 (century pivot at 80)
    year: u8,
    month: u8,
    day: u8,
    /// Number of records in the table
    record_count: U32<LE>,
    /// Byte length of header plus descriptors plus terminator
    header_length: U16<LE>,
    /// Declared byte length of one record (advisory)
    record_length: U16<LE>,
    /// Reserved
    reserved: [u8; 20],
}

/// Raw field descriptor (32 bytes).
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawFieldDescriptor {
    /// Field name, NUL/blank padded
    name: [u8; 11],
    /// Type character: C, D, F, N, L or M
    field_type: u8,
    /// Reserved
    reserved1: [u8; 4],
    /// Field byte width
    length: u8,
    /// Decimal places for numeric fields
    decimal_count: u8,
    /// Reserved
    reserved2: [u8; 14],
}

/// dBase field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Character,
    Date,
    Floating,
    Numeric,
    Logical,
    Memo,
}

impl FieldType {
    /// Map the descriptor type byte to a variant.
    pub fn from_byte(byte: u8) -> Option<FieldType> {
        match byte {
            b'C' => Some(FieldType::Character),
            b'D' => Some(FieldType::Date),
            b'F' => Some(FieldType::Floating),
            b'N' => Some(FieldType::Numeric),
            b'L' => Some(FieldType::Logical),
            b'M' => Some(FieldType::Memo),
            _ => None,
        }
    }
}

/// Static schema entry for one attribute field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, trimmed of NUL/blank padding.
    pub name: String,
    /// Value type of the field.
    pub field_type: FieldType,
    /// Fixed byte width of the field within a record.
    pub length: usize,
    /// Decimal-place count for numeric fields.
    pub decimal_count: usize,
}

/// Name of the synthetic descriptor covering the per-record deletion byte.
pub const DELETION_FLAG: &str = "DeletionFlag";

impl FieldDescriptor {
    fn parse(data: &[u8]) -> Result<Self> {
        let raw = RawFieldDescriptor::read_from_bytes(data)
            .map_err(|_| Error::parse("Failed to read field descriptor"))?;

        let name_end = raw
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(raw.name.len());
        let name = String::from_utf8_lossy(&raw.name[..name_end])
            .trim_matches(|c: char| c.is_ascii_whitespace())
            .to_string();

        let field_type = FieldType::from_byte(raw.field_type).ok_or_else(|| {
            Error::parse(format!(
                "Unknown field type {:?} for field {name:?}",
                raw.field_type as char
            ))
        })?;

        Ok(FieldDescriptor {
            name,
            field_type,
            length: raw.length as usize,
            decimal_count: raw.decimal_count as usize,
        })
    }

    /// Synthetic field 0 aligning the schema with the on-disk deletion byte.
    fn deletion_flag() -> Self {
        FieldDescriptor {
            name: DELETION_FLAG.to_string(),
            field_type: FieldType::Character,
            length: 1,
            decimal_count: 0,
        }
    }
}

/// One decoded attribute cell.
///
/// A tagged union rather than an untyped container, so downstream consumers
/// pattern-match instead of runtime-casting.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Blank field, or a numeric field that held no parseable number
    Empty,
    /// Integer value of a Numeric field
    Int(i64),
    /// Floating value of a Numeric or Floating field
    Float(f64),
    /// Text value of a Character or Memo field, trimmed
    String(String),
    /// Date field in `YYYYMMDD` form
    Date(NaiveDate),
    /// Logical field; true iff the stored byte was one of `TtYy`
    Bool(bool),
}

/// Outcome of decoding one attribute record.
///
/// Deleted rows are distinct from decode failures: a tombstoned record comes
/// back as `Deleted`, while malformed bytes surface as [`Error::Parse`] from
/// [`DbfFile::record_at`].
#[derive(Debug, Clone, PartialEq)]
pub enum DbfRecord {
    /// Live record, one value per field excluding the deletion flag.
    Active(Vec<FieldValue>),
    /// Record tombstoned by a non-space deletion byte.
    Deleted,
}

/// Fixed-layout record-table decoder.
pub struct DbfFile<R: Read + Seek> {
    reader: R,
    encoding: &'static Encoding,
    shape_type: ShapeType,
    last_update: NaiveDate,
    record_count: u32,
    fields: Vec<FieldDescriptor>,
    header_length: u64,
    /// Authoritative record width: the sum of field widths, which overrides
    /// the header-declared value when they disagree.
    record_length: usize,
}

impl<R: Read + Seek> DbfFile<R> {
    /// Open the attribute table and parse header plus field descriptors.
    ///
    /// `encoding` is the text encoding resolved from the `.cpg` sibling and
    /// is applied to every character segment of every record.
    pub fn open(mut reader: R, encoding: &'static Encoding) -> Result<Self> {
        let mut header = [0u8; 32];
        read_exact_or_parse(&mut reader, &mut header, "dbf header")?;
        let raw = RawDbfHeader::read_from_bytes(&header)
            .map_err(|_| Error::parse("Failed to read dbf header"))?;

        let shape_type = ShapeType::from_code(raw.shape_type as i32);

        // Standard dBase century pivot.
        let year = if raw.year > 80 {
            1900 + raw.year as i32
        } else {
            2000 + raw.year as i32
        };
        let last_update =
            NaiveDate::from_ymd_opt(year, raw.month as u32, raw.day as u32).unwrap_or_default();

        let record_count = raw.record_count.get();
        let header_length = raw.header_length.get() as u64;
        let declared_record_length = raw.record_length.get() as usize;

        debug!("shape type: {shape_type:?}");
        debug!("last update: {last_update}");
        debug!("record count: {record_count}");

        if header_length < 33 {
            return Err(Error::parse(format!(
                "dbf header length {header_length} leaves no room for descriptors"
            )));
        }
        let field_count = (header_length as usize - 33) / 32;

        let mut fields = Vec::with_capacity(field_count + 1);
        for _ in 0..field_count {
            let mut descriptor = [0u8; 32];
            read_exact_or_parse(&mut reader, &mut descriptor, "field descriptor")?;
            fields.push(FieldDescriptor::parse(&descriptor)?);
        }

        let mut terminator = [0u8; 1];
        read_exact_or_parse(&mut reader, &mut terminator, "header terminator")?;
        debug_assert_eq!(terminator[0], b'\r', "unexpected header terminator");
        if terminator[0] != b'\r' {
            warn!("unexpected dbf header terminator byte {:#04x}", terminator[0]);
        }

        fields.insert(0, FieldDescriptor::deletion_flag());

        let total_width: usize = fields.iter().map(|f| f.length).sum();
        let record_length = if total_width != declared_record_length {
            warn!(
                "record length declared in header {declared_record_length} != sum of field widths {total_width}, using the computed one"
            );
            total_width
        } else {
            declared_record_length
        };

        Ok(DbfFile {
            reader,
            encoding,
            shape_type,
            last_update,
            record_count,
            fields,
            header_length,
            record_length,
        })
    }

    /// Shape type declared in the attribute header.
    pub fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    /// Last-update stamp from the header date bytes.
    pub fn last_update(&self) -> NaiveDate {
        self.last_update
    }

    /// Number of records declared by the header.
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Field descriptors, with the synthetic `DeletionFlag` at index 0.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Names of the value-bearing fields, deletion flag excluded.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().skip(1).map(|f| f.name.as_str())
    }

    /// Decode the record at the given positional index.
    pub fn record_at(&mut self, index: usize) -> Result<DbfRecord> {
        let offset = self.header_length + (index * self.record_length) as u64;
        self.reader.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; self.record_length];
        read_exact_or_parse(&mut self.reader, &mut buf, "dbf record")?;

        // Tombstone check: anything other than a single space means deleted.
        if buf[0] != b' ' {
            return Ok(DbfRecord::Deleted);
        }

        let mut values = Vec::with_capacity(self.fields.len() - 1);
        let mut pos = 0usize;
        for field in &self.fields {
            let segment = buf.get(pos..pos + field.length).ok_or_else(|| {
                Error::parse(format!(
                    "record too short for field {:?} at byte {pos}",
                    field.name
                ))
            })?;
            pos += field.length;

            if field.name == DELETION_FLAG {
                continue;
            }

            let (text, _, _) = self.encoding.decode(segment);
            let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
            values.push(Self::coerce(field, trimmed)?);
        }

        Ok(DbfRecord::Active(values))
    }

    /// Apply per-type value coercion to one trimmed field segment.
    fn coerce(field: &FieldDescriptor, trimmed: &str) -> Result<FieldValue> {
        // An all-blank segment is empty regardless of the declared type.
        if trimmed.is_empty() {
            return Ok(FieldValue::Empty);
        }

        let value = match field.field_type {
            // Number stored as a string, right justified and blank padded.
            FieldType::Numeric => {
                if let Ok(int) = trimmed.parse::<i64>() {
                    FieldValue::Int(int)
                } else if let Ok(float) = trimmed.parse::<f64>() {
                    FieldValue::Float(float)
                } else {
                    FieldValue::Empty
                }
            },
            // Float, since dBase IV 2.0.
            FieldType::Floating => {
                let float = trimmed.parse::<f64>().map_err(|_| {
                    Error::parse(format!(
                        "unparsable floating value {trimmed:?} in field {:?}",
                        field.name
                    ))
                })?;
                FieldValue::Float(float)
            },
            // Date stored as a string in the format YYYYMMDD.
            FieldType::Date => {
                let date = NaiveDate::parse_from_str(trimmed, "%Y%m%d").map_err(|_| {
                    Error::parse(format!(
                        "unparsable date {trimmed:?} in field {:?}",
                        field.name
                    ))
                })?;
                FieldValue::Date(date)
            },
            FieldType::Character | FieldType::Memo => FieldValue::String(trimmed.to_string()),
            // ? Y y N n T t F f, with ? when not initialized.
            FieldType::Logical => {
                FieldValue::Bool(matches!(trimmed, "T" | "t" | "Y" | "y"))
            },
        };
        Ok(value)
    }

    /// Iterate over every record in positional order.
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
            dbf: self,
            index: 0,
        }
    }

    /// Decode the whole table into memory.
    pub fn all_records(&mut self) -> Result<Vec<DbfRecord>> {
        self.records().collect()
    }
}

/// Iterator over all records of a [`DbfFile`].
pub struct Records<'a, R: Read + Seek> {
    dbf: &'a mut DbfFile<R>,
    index: usize,
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<DbfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.dbf.record_count as usize {
            return None;
        }
        let record = self.dbf.record_at(self.index);
        self.index += 1;
        Some(record)
    }
}
