//! Geometry index (.shx) provider.
//!
//! The index file shares the 100-byte header layout of the geometry stream
//! and is followed by one 8-byte big-endian entry per feature: the record
//! offset and content length, both counted in 16-bit words. Only the offset
//! table matters here; offsets are doubled into byte offsets at load time so
//! consumers never see word counts.

use crate::common::binary::{read_exact_or_parse, read_i32_be};
use crate::common::error::{Error, Result};
use log::warn;
use std::io::Read;

/// File extension of the geometry index.
pub const PATH_EXTENSION: &str = "shx";

/// Size of the fixed file header in bytes.
const HEADER_LEN: usize = 100;

/// Size of one index entry in bytes.
const ENTRY_LEN: usize = 8;

/// In-memory offset table for the geometry store.
pub struct ShxFile {
    offsets: Vec<u64>,
}

impl ShxFile {
    /// Load the whole offset table.
    ///
    /// The entry count is derived from the actual stream size, not from the
    /// header-declared file length; a mismatch is logged and ignored.
    pub fn open<R: Read>(mut reader: R) -> Result<Self> {
        let mut header = [0u8; HEADER_LEN];
        read_exact_or_parse(&mut reader, &mut header, "shx header")?;
        let length_words = read_i32_be(&header, 24)?;
        let declared_length = u64::try_from(length_words)
            .map_err(|_| Error::parse(format!("negative shx length word {length_words}")))?
            * 2;

        let mut table = Vec::new();
        reader.read_to_end(&mut table)?;

        let actual_length = (HEADER_LEN + table.len()) as u64;
        if actual_length != declared_length {
            warn!(
                "actual shx length {actual_length} != length in header {declared_length}, using the actual one"
            );
        }
        if table.len() % ENTRY_LEN != 0 {
            warn!(
                "shx entry table holds {} trailing bytes, ignoring the partial entry",
                table.len() % ENTRY_LEN
            );
        }

        let count = table.len() / ENTRY_LEN;
        let mut offsets = Vec::with_capacity(count);
        for i in 0..count {
            // Entry layout: offset word, content-length word; only the
            // offset is consumed.
            let offset_words = read_i32_be(&table, i * ENTRY_LEN)?;
            let offset_words = u64::try_from(offset_words).map_err(|_| {
                Error::parse(format!("negative offset word {offset_words} in shx entry {i}"))
            })?;
            offsets.push(offset_words * 2);
        }

        Ok(ShxFile { offsets })
    }

    /// Number of features indexed.
    pub fn shape_count(&self) -> usize {
        self.offsets.len()
    }

    /// Byte offsets into the geometry store, one per feature index.
    pub fn shape_offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Byte offset for one feature index.
    pub fn offset(&self, index: usize) -> Option<u64> {
        self.offsets.get(index).copied()
    }
}
