//! Byte cursors: position-tracked views used by every encode/decode call.
//!
//! [`ReadCursor`] is a forward-only view over a byte slice; [`WriteCursor`]
//! accumulates output. Both implement the `std::io` traits so the `byteorder`
//! extension methods apply directly.

use std::io::{self};

use crate::error::CodecError;

/// Forward-only, position-tracked view over a byte buffer.
#[derive(Debug)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ReadCursor { buf, pos: 0 }
    }

    /// Offset of the first unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The full underlying buffer, including bytes already consumed.
    pub fn bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Bounded sub-view: a child cursor over exactly the next `len` bytes.
    /// Constructing it advances this cursor past those bytes.
    pub fn take(&mut self, len: usize) -> Result<ReadCursor<'a>, CodecError> {
        if self.remaining() < len {
            return Err(CodecError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "sub-view of {} byte(s) exceeds remaining {}",
                    len,
                    self.remaining()
                ),
            )));
        }
        let view = ReadCursor {
            buf: &self.buf[self.pos..self.pos + len],
            pos: 0,
        };
        self.pos += len;
        Ok(view)
    }
}

impl io::Read for ReadCursor<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = out.len().min(self.remaining());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Growable output buffer; position is the number of bytes written so far.
#[derive(Debug, Default)]
pub struct WriteCursor {
    buf: Vec<u8>,
}

impl WriteCursor {
    pub fn new() -> Self {
        WriteCursor::default()
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl io::Write for WriteCursor {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

    #[test]
    fn read_cursor_tracks_position() {
        let data = [0x01, 0x02, 0x03];
        let mut r = ReadCursor::new(&data);
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_u8().expect("read"), 0x01);
        assert_eq!(r.read_u16::<BigEndian>().expect("read"), 0x0203);
        assert_eq!(r.position(), 3);
        assert!(r.is_empty());
    }

    #[test]
    fn read_past_end_is_unexpected_eof() {
        let mut r = ReadCursor::new(&[0x01]);
        let _ = r.read_u8().expect("first byte");
        let err = r.read_u8().expect_err("exhausted");
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn take_bounds_the_child_and_advances_the_parent() {
        let data = [0xaa, 0xbb, 0xcc, 0xdd];
        let mut r = ReadCursor::new(&data);
        let mut view = r.take(2).expect("take");
        assert_eq!(view.remaining(), 2);
        assert_eq!(view.read_u8().expect("read"), 0xaa);
        assert_eq!(r.position(), 2);
        assert!(r.take(3).is_err());
    }

    #[test]
    fn write_cursor_accumulates() {
        let mut w = WriteCursor::new();
        w.write_u8(0x01).expect("write");
        w.write_u16::<BigEndian>(0x012c).expect("write");
        assert_eq!(w.position(), 3);
        assert_eq!(w.into_bytes(), vec![0x01, 0x01, 0x2c]);
    }
}
