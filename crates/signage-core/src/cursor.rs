//! Binary cursor: positioned big-endian reads and writes.
//!
//! [`Reader`] walks a borrowed byte slice, [`Writer`] appends to a growable
//! buffer. Neither knows anything about proposals; the wire codecs in
//! [`crate::identity`] and [`crate::frame`] are built on top of them.
//!
//! Strings are NUL-terminated UTF-8. Arbitrary-width integers (1 to 8 bytes)
//! are used for the 56-bit frame timestamp.

use crate::error::CursorError;

/// Initial size of a [`Writer`] buffer.
pub const INITIAL_CAPACITY: usize = 512;

/// Result type for cursor operations.
pub type Result<T> = std::result::Result<T, CursorError>;

/// A read cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move to an absolute position (at most the buffer length).
    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(CursorError::OutOfRange {
                position: pos,
                needed: 0,
                available: 0,
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes left between the position and the end.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether every byte has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Borrow `start..end` of the underlying buffer without moving.
    ///
    /// Used to hash the exact bytes a record was parsed from.
    pub fn slice(&self, start: usize, end: usize) -> Result<&'a [u8]> {
        if start > end || end > self.buf.len() {
            return Err(CursorError::OutOfRange {
                position: start,
                needed: end.saturating_sub(start),
                available: self.buf.len().saturating_sub(start),
            });
        }
        Ok(&self.buf[start..end])
    }

    /// Read exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(CursorError::OutOfRange {
                position: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.read_bytes(N)?);
        Ok(arr)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Read a big-endian unsigned integer of `width` bytes (1..=8).
    pub fn read_uint_be(&mut self, width: usize) -> Result<u64> {
        check_width(width)?;
        let bytes = self.read_bytes(width)?;
        let mut full = [0u8; 8];
        full[8 - width..].copy_from_slice(bytes);
        Ok(u64::from_be_bytes(full))
    }

    /// Read a big-endian two's-complement integer of `width` bytes (1..=8),
    /// sign-extended to 64 bits.
    pub fn read_int_be(&mut self, width: usize) -> Result<i64> {
        let raw = self.read_uint_be(width)?;
        let shift = 64 - 8 * width as u32;
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Read a NUL-terminated UTF-8 string. The terminator is consumed.
    pub fn read_cstr(&mut self) -> Result<String> {
        let start = self.pos;
        let rest = &self.buf[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(CursorError::MissingTerminator { position: start })?;

        let s = std::str::from_utf8(&rest[..nul])
            .map_err(|_| CursorError::InvalidUtf8 { position: start })?;
        self.pos += nul + 1;
        Ok(s.to_owned())
    }

    /// Consume and return everything from the position to the end.
    pub fn read_to_end(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    /// Return everything from the position to the end without moving.
    pub fn peek_remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

/// A write cursor over an owned, growable buffer.
///
/// The backing buffer grows geometrically (x1.75). [`Writer::take`] returns
/// exactly the bytes written, never the unused tail.
#[derive(Debug, Clone)]
pub struct Writer {
    buf: Vec<u8>,
    pos: usize,
}

impl Writer {
    /// Create a writer with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create a writer with a specific initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity.max(1)],
            pos: 0,
        }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Current size of the backing buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Borrow `start..position()` of the written bytes.
    pub fn written_since(&self, start: usize) -> Result<&[u8]> {
        if start > self.pos {
            return Err(CursorError::OutOfRange {
                position: start,
                needed: 0,
                available: self.pos,
            });
        }
        Ok(&self.buf[start..self.pos])
    }

    /// Copy out exactly the written bytes. The position is unchanged.
    pub fn take(&self) -> Vec<u8> {
        self.written().to_vec()
    }

    /// Consume the writer, returning exactly the written bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.pos);
        self.buf
    }

    fn ensure_capacity(&mut self, additional: usize) {
        let required = self.pos + additional;
        if required > self.buf.len() {
            let grown = self.buf.len() * 7 / 4;
            self.buf.resize(grown.max(required), 0);
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.ensure_capacity(bytes.len());
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_i8(&mut self, v: i8) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Write `value` as a big-endian unsigned integer of `width` bytes.
    pub fn write_uint_be(&mut self, value: u64, width: usize) -> Result<()> {
        check_width(width)?;
        if width < 8 && value >> (8 * width) != 0 {
            return Err(CursorError::ValueOutOfRange {
                value: value as i128,
                width,
            });
        }
        self.write_bytes(&value.to_be_bytes()[8 - width..]);
        Ok(())
    }

    /// Write `value` as a big-endian two's-complement integer of `width` bytes.
    pub fn write_int_be(&mut self, value: i64, width: usize) -> Result<()> {
        check_width(width)?;
        if width < 8 {
            let bits = 8 * width as u32;
            let min = -(1i64 << (bits - 1));
            let max = (1i64 << (bits - 1)) - 1;
            if value < min || value > max {
                return Err(CursorError::ValueOutOfRange {
                    value: value as i128,
                    width,
                });
            }
        }
        self.write_bytes(&value.to_be_bytes()[8 - width..]);
        Ok(())
    }

    /// Write a UTF-8 string followed by a NUL terminator.
    pub fn write_cstr(&mut self, s: &str) -> Result<()> {
        if s.as_bytes().contains(&0) {
            return Err(CursorError::EmbeddedNul);
        }
        self.write_bytes(s.as_bytes());
        self.write_u8(0);
        Ok(())
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

fn check_width(width: usize) -> Result<()> {
    if width == 0 || width > 8 {
        return Err(CursorError::InvalidWidth(width));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_width_big_endian() {
        let mut w = Writer::new();
        w.write_u8(0x01);
        w.write_u16(0x0203);
        w.write_u32(0x04050607);
        w.write_i16(-2);
        assert_eq!(w.written(), &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0xff, 0xfe]);

        let bytes = w.take();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u16().unwrap(), 0x0203);
        assert_eq!(r.read_u32().unwrap(), 0x04050607);
        assert_eq!(r.read_i16().unwrap(), -2);
        assert!(r.is_at_end());
    }

    #[test]
    fn test_56_bit_timestamp() {
        let ts: i64 = 1_736_870_400_000;
        let mut w = Writer::new();
        w.write_int_be(ts, 7).unwrap();
        w.write_int_be(-5, 7).unwrap();
        assert_eq!(w.position(), 14);

        let bytes = w.into_bytes();
        assert_eq!(&bytes[7..], &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfb]);

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_int_be(7).unwrap(), ts);
        assert_eq!(r.read_int_be(7).unwrap(), -5);
    }

    #[test]
    fn test_int_width_overflow_rejected() {
        let mut w = Writer::new();
        assert!(matches!(
            w.write_int_be(1i64 << 55, 7),
            Err(CursorError::ValueOutOfRange { width: 7, .. })
        ));
        assert!(matches!(
            w.write_uint_be(256, 1),
            Err(CursorError::ValueOutOfRange { .. })
        ));
        assert!(matches!(w.write_uint_be(1, 9), Err(CursorError::InvalidWidth(9))));
        assert_eq!(w.position(), 0);
    }

    #[test]
    fn test_read_past_end() {
        let bytes = [0u8; 3];
        let mut r = Reader::new(&bytes);
        assert!(matches!(
            r.read_u32(),
            Err(CursorError::OutOfRange {
                position: 0,
                needed: 4,
                available: 3
            })
        ));
        // A failed read does not move the cursor
        assert_eq!(r.position(), 0);
        assert!(r.read_bytes(3).is_ok());
        assert!(r.read_u8().is_err());
    }

    #[test]
    fn test_cstr() {
        let mut w = Writer::new();
        w.write_cstr("grüße").unwrap();
        w.write_cstr("").unwrap();
        let bytes = w.take();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_cstr().unwrap(), "grüße");
        assert_eq!(r.read_cstr().unwrap(), "");
        assert!(r.is_at_end());
    }

    #[test]
    fn test_cstr_errors() {
        let mut w = Writer::new();
        assert!(matches!(w.write_cstr("a\0b"), Err(CursorError::EmbeddedNul)));

        let mut r = Reader::new(b"no terminator");
        assert!(matches!(
            r.read_cstr(),
            Err(CursorError::MissingTerminator { position: 0 })
        ));

        let mut r = Reader::new(&[0xc3, 0x28, 0x00]);
        assert!(matches!(r.read_cstr(), Err(CursorError::InvalidUtf8 { .. })));
    }

    #[test]
    fn test_writer_growth() {
        let mut w = Writer::new();
        assert_eq!(w.capacity(), INITIAL_CAPACITY);

        w.write_bytes(&[7u8; 513]);
        assert_eq!(w.capacity(), 896);

        // A single large write grows straight to the required size
        w.write_bytes(&vec![1u8; 4000]);
        assert_eq!(w.capacity(), 4513);

        let taken = w.take();
        assert_eq!(taken.len(), 4513);
        assert_eq!(taken[512], 7);
    }

    #[test]
    fn test_read_to_end_and_slice() {
        let bytes = [1u8, 2, 3, 4, 5];
        let mut r = Reader::new(&bytes);
        r.read_u16().unwrap();
        assert_eq!(r.peek_remaining(), &[3, 4, 5]);
        assert_eq!(r.slice(0, 2).unwrap(), &[1, 2]);
        assert_eq!(r.read_to_end(), &[3, 4, 5]);
        assert!(r.is_at_end());
        assert!(r.slice(3, 9).is_err());
    }

    proptest! {
        #[test]
        fn test_int_be_sign_extension(value in any::<i64>(), width in 1usize..=8) {
            let bits = 8 * width as u32;
            let fits = width == 8
                || (value >= -(1i64 << (bits - 1)) && value < (1i64 << (bits - 1)));

            let mut w = Writer::new();
            let written = w.write_int_be(value, width);
            prop_assert_eq!(written.is_ok(), fits);

            if fits {
                let bytes = w.take();
                prop_assert_eq!(bytes.len(), width);
                let mut r = Reader::new(&bytes);
                prop_assert_eq!(r.read_int_be(width).unwrap(), value);
            }
        }
    }
}
