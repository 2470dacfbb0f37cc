use crate::common::error::{Error, Result};
use std::io::Read;
use zerocopy::{BE, F64, FromBytes, I32, LE};

/// Read a little-endian i32 from a byte slice at the given offset.
#[inline]
pub fn read_i32_le(data: &[u8], offset: usize) -> Result<i32> {
    if offset + 4 > data.len() {
        return Err(Error::parse("Not enough data for i32"));
    }
    I32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .or_else(|_| Err(Error::parse("Failed to read i32")))
}

/// Read a big-endian i32 from a byte slice at the given offset.
///
/// The shapefile family mixes byte orders within one stream: record headers,
/// index entries and the header file-length word are big-endian while every
/// other field group is little-endian, so the order is chosen per call site.
#[inline]
pub fn read_i32_be(data: &[u8], offset: usize) -> Result<i32> {
    if offset + 4 > data.len() {
        return Err(Error::parse("Not enough data for i32"));
    }
    I32::<BE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .or_else(|_| Err(Error::parse("Failed to read i32")))
}

/// Read a little-endian f64 from a byte slice at the given offset.
#[inline]
pub fn read_f64_le(data: &[u8], offset: usize) -> Result<f64> {
    if offset + 8 > data.len() {
        return Err(Error::parse("Not enough data for f64"));
    }
    F64::<LE>::read_from_bytes(&data[offset..offset + 8])
        .map(|v| v.get())
        .or_else(|_| Err(Error::parse("Failed to read f64")))
}

/// Fill `buf` from the reader, turning a premature end of stream into a
/// parse error naming what was being read.
///
/// Truncated input is a property of the file, not of the OS, so it surfaces
/// as [`Error::Parse`] rather than [`Error::Io`].
pub fn read_exact_or_parse<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::parse(format!("Not enough data for {what}"))
        } else {
            Error::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_i32_le() {
        let data = (-7i32).to_le_bytes();
        assert!(read_i32_le(&data, 0).is_ok_and(|v| v == -7));
    }

    #[test]
    fn test_read_i32_be() {
        // Same bytes, both orders: the call site picks.
        let data = [0x00, 0x00, 0x01, 0x02];
        assert!(read_i32_be(&data, 0).is_ok_and(|v| v == 0x0102));
        assert!(read_i32_le(&data, 0).is_ok_and(|v| v == 0x02010000));
        assert!(read_i32_be(&data, 1).is_err());
    }

    #[test]
    fn test_read_f64_le() {
        let data = 3.25f64.to_le_bytes();
        assert!(read_f64_le(&data, 0).is_ok_and(|v| v == 3.25));
        assert!(read_f64_le(&data, 1).is_err());
    }

    #[test]
    fn test_read_exact_or_parse_truncation() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        let mut buf = [0u8; 8];
        let err = read_exact_or_parse(&mut cursor, &mut buf, "test block").unwrap_err();
        assert!(matches!(err, Error::Parse(msg) if msg.contains("test block")));
    }
}
