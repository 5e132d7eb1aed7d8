//! Byte-level helpers shared by the parsers

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// Map an IO error from a fixed-size read, turning EOF into a format error.
pub(crate) fn map_eof(context: &str) -> impl FnOnce(io::Error) -> Error + '_ {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::truncated(context)
        } else {
            Error::Io(e)
        }
    }
}

/// Read exactly `N` bytes.
pub(crate) fn read_array<R: Read, const N: usize>(reader: &mut R, context: &str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(map_eof(context))?;
    Ok(buf)
}

/// Read exactly `len` bytes, refusing lengths past `limit`.
pub(crate) fn read_vec<R: Read>(reader: &mut R, len: u64, limit: u64, context: &str) -> Result<Vec<u8>> {
    if len > limit {
        return Err(Error::truncated(context));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).map_err(map_eof(context))?;
    Ok(buf)
}

/// `base + offset` for positions read from disk; overflow is a format error.
pub(crate) fn offset_add(base: u64, offset: u64, context: &str) -> Result<u64> {
    base.checked_add(offset)
        .ok_or_else(|| Error::InvalidFormat(format!("{context} at {base:#x} + {offset:#x} overflows")))
}

/// Total length of a seekable stream; leaves the position at the start.
pub(crate) fn stream_len<R: Seek>(reader: &mut R) -> Result<u64> {
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(len)
}

/// Decode a NUL-terminated string slot.
pub(crate) fn slot_to_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_slot_trims_at_nul() {
        assert_eq!(slot_to_string(b"image\0\0garbage"), "image");
        assert_eq!(slot_to_string(b"compfile"), "compfile");
    }

    #[test]
    fn test_short_read_is_truncation() {
        let mut cursor = Cursor::new(vec![1u8, 2]);
        let err = read_array::<_, 4>(&mut cursor, "header").unwrap_err();
        assert!(matches!(err, Error::TruncatedData { .. }));
    }

    #[test]
    fn test_offset_overflow_is_format_error() {
        assert_eq!(offset_add(0x10, 0x20, "records").unwrap(), 0x30);
        let err = offset_add(u64::MAX - 0x10, 0x7C, "records").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }
}
