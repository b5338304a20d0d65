//! Cursor over ROOT's big-endian serialization format.

use crate::error::{Result, RootError};

/// Byte-count flag on a streamer version word.
pub const K_BYTE_COUNT_MASK: u32 = 0x4000_0000;

/// A read cursor over a byte slice using ROOT's big-endian conventions.
pub struct RBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_be {
    ($name:ident, $ty:ty, $n:expr) => {
        /// Read a big-endian value, advancing the cursor.
        pub fn $name(&mut self) -> Result<$ty> {
            let b = self.take($n)?;
            let mut raw = [0u8; $n];
            raw.copy_from_slice(b);
            Ok(<$ty>::from_be_bytes(raw))
        }
    };
}

impl<'a> RBuffer<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a cursor positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Move the cursor to an absolute position.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Read `n` raw bytes, advancing the cursor.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.data.len()).ok_or(
            RootError::BufferUnderflow {
                offset: self.pos,
                need: n,
                have: self.data.len().saturating_sub(self.pos),
            },
        )?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    read_be!(read_u16, u16, 2);
    read_be!(read_i32, i32, 4);
    read_be!(read_u32, u32, 4);
    read_be!(read_i64, i64, 8);
    read_be!(read_u64, u64, 8);
    read_be!(read_f32, f32, 4);
    read_be!(read_f64, f64, 8);

    /// Read a ROOT-encoded string: a length byte (255 escapes to a u32
    /// length) followed by the bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let first = self.read_u8()?;
        let len = if first == 255 { self.read_u32()? as usize } else { first as usize };
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a null-terminated C string (class names in object tags).
    pub fn read_cstring(&mut self) -> Result<String> {
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos] != 0 {
            self.pos += 1;
        }
        if self.pos >= self.data.len() {
            return Err(RootError::Deserialization(format!(
                "unterminated C string at offset {start}"
            )));
        }
        let s = String::from_utf8_lossy(&self.data[start..self.pos]).into_owned();
        self.pos += 1; // terminator
        Ok(s)
    }

    /// Read a streamer version header.
    ///
    /// Returns `(version, end)` where `end` is the absolute position at
    /// which the streamed object finishes, when a byte count is present.
    /// The byte count spans from right after the leading u32 (so it
    /// includes the version u16 itself).
    pub fn read_version(&mut self) -> Result<(u16, Option<usize>)> {
        let start = self.pos;
        let word = self.read_u32()?;
        if word & K_BYTE_COUNT_MASK != 0 {
            let byte_count = (word & !K_BYTE_COUNT_MASK) as usize;
            let version = self.read_u16()?;
            Ok((version, Some(start + 4 + byte_count)))
        } else {
            // No byte count: the first two bytes were the version.
            self.pos = start + 2;
            Ok(((word >> 16) as u16, None))
        }
    }

    /// Skip over a versioned object using its byte count.
    pub fn skip_versioned(&mut self) -> Result<()> {
        let (_ver, end) = self.read_version()?;
        if let Some(end) = end {
            self.seek(end);
        }
        Ok(())
    }

    /// Read a TObject header (fUniqueID + fBits), skipping the reference
    /// pid when the object is flagged as referenced.
    pub fn read_tobject(&mut self) -> Result<()> {
        let _ver = self.read_u16()?;
        let _unique_id = self.read_u32()?;
        let bits = self.read_u32()?;
        if bits & 0x0800_0000 != 0 {
            self.skip(2)?; // kIsReferenced pid
        }
        Ok(())
    }

    /// Read a TNamed (TObject + name + title).
    pub fn read_tnamed(&mut self) -> Result<(String, String)> {
        let (_ver, _end) = self.read_version()?;
        self.read_tobject()?;
        let name = self.read_string()?;
        let title = self.read_string()?;
        Ok((name, title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_big_endian() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x0102_0304u32.to_be_bytes());
        data.extend_from_slice(&std::f64::consts::PI.to_be_bytes());
        let mut r = RBuffer::new(&data);
        assert_eq!(r.read_u32().unwrap(), 0x0102_0304);
        assert!((r.read_f64().unwrap() - std::f64::consts::PI).abs() < 1e-15);
        assert_eq!(r.pos(), 12);
    }

    #[test]
    fn short_string() {
        let data = [3, b'p', b't', b'_'];
        assert_eq!(RBuffer::new(&data).read_string().unwrap(), "pt_");
    }

    #[test]
    fn cstring_stops_at_nul() {
        let data = b"TBranch\0rest";
        let mut r = RBuffer::new(data);
        assert_eq!(r.read_cstring().unwrap(), "TBranch");
        assert_eq!(r.pos(), 8);
    }

    #[test]
    fn version_with_byte_count() {
        let mut data = Vec::new();
        data.extend_from_slice(&(K_BYTE_COUNT_MASK | 16).to_be_bytes());
        data.extend_from_slice(&3u16.to_be_bytes());
        data.extend_from_slice(&[0u8; 20]);
        let (ver, end) = RBuffer::new(&data).read_version().unwrap();
        assert_eq!(ver, 3);
        assert_eq!(end, Some(20));
    }

    #[test]
    fn version_without_byte_count() {
        let mut data = Vec::new();
        data.extend_from_slice(&5u16.to_be_bytes());
        data.extend_from_slice(&[0, 0]);
        let mut r = RBuffer::new(&data);
        let (ver, end) = r.read_version().unwrap();
        assert_eq!(ver, 5);
        assert!(end.is_none());
        assert_eq!(r.pos(), 2);
    }

    #[test]
    fn underflow_reports_position() {
        let data = [0u8; 3];
        let err = RBuffer::new(&data).read_u32().unwrap_err();
        match err {
            RootError::BufferUnderflow { offset, need, have } => {
                assert_eq!((offset, need, have), (0, 4, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
