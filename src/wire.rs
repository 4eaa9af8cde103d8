//! # Wire codec
//!
//! Big-endian byte-level reading and writing of the primitives the module
//! format is built out of: single bytes, four-byte unsigned integers, and
//! length-prefixed sequences of bytes. This module knows nothing about ADTs,
//! constants, or opcodes; it only understands these shapes.
//!
//! ## Design
//! - [`Reader`] wraps a borrowed byte slice and a cursor. Every read either
//!   advances the cursor and returns a value, or returns [`Error::ParseError`]
//!   without having advanced it (no partial commits).
//! - [`Writer`] wraps an owned `Vec<u8>` and only ever appends.
//! - Everything is big-endian, matching the file format in the module spec.

use crate::error::Error;

/// Cursor over a byte slice for sequential big-endian reads.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    /// Read a single unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::ParseError("unexpected end of stream reading u8".to_string()))?;
        self.pos += 1;
        Ok(b)
    }

    /// Read a big-endian four-byte unsigned integer.
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        if self.pos + 4 > self.data.len() {
            return Err(Error::ParseError(
                "unexpected end of stream reading u32".to_string(),
            ));
        }
        let bytes = [
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            self.data[self.pos + 3],
        ];
        self.pos += 4;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Read a big-endian four-byte two's-complement signed integer.
    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a single signed byte.
    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a length-prefixed sequence, applying `read_elem` once per element.
    ///
    /// Layout: `u32 n` followed by `n` elements in order.
    pub fn read_seq<T>(
        &mut self,
        mut read_elem: impl FnMut(&mut Self) -> Result<T, Error>,
    ) -> Result<Vec<T>, Error> {
        let n = self.read_u32()? as usize;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(read_elem(self)?);
        }
        Ok(out)
    }

    /// Whether the cursor has consumed the entire stream.
    pub fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }
}

/// Append-only byte buffer for big-endian writes.
#[derive(Default)]
pub struct Writer {
    data: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { data: Vec::new() }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.data.push(v as u8);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }

    /// Write a length-prefixed sequence, applying `write_elem` once per element.
    pub fn write_seq<T>(&mut self, items: &[T], mut write_elem: impl FnMut(&mut Self, &T)) {
        self.write_u32(items.len() as u32);
        for item in items {
            write_elem(self, item);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_u32_big_endian() {
        let mut w = Writer::new();
        w.write_u32(0xBADDCAFE);
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![0xBA, 0xDD, 0xCA, 0xFE]);

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 0xBADDCAFE);
        assert!(r.is_at_end());
    }

    #[test]
    fn read_seq_round_trips() {
        let mut w = Writer::new();
        w.write_seq(&[1u32, 2, 3], |w, v| w.write_u32(*v));
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        let vals = r.read_seq(|r| r.read_u32()).unwrap();
        assert_eq!(vals, vec![1, 2, 3]);
    }

    #[test]
    fn truncated_stream_is_parse_error() {
        let bytes = [0xBAu8, 0xDD];
        let mut r = Reader::new(&bytes);
        assert!(matches!(r.read_u32(), Err(Error::ParseError(_))));
    }
}
