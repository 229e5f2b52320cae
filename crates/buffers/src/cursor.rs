//! Bounds-checked byte cursor with a latched range error.

use thiserror::Error;

/// Error produced when an operation would read or write past the end of the
/// backing buffer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("range error")]
pub struct RangeError;

/// A forward-only cursor over a fixed byte region.
///
/// All multi-byte accessors are big-endian. Every operation is bounds
/// checked; the first failed check latches a [`RangeError`] and every later
/// operation short-circuits with the same error, so a caller may run a whole
/// read or write sequence and inspect [`Cursor::err`] once at the end.
///
/// Reads take any `AsRef<[u8]>` backing; writes additionally require
/// `AsMut<[u8]>`. Borrowed byte views are available when the backing is a
/// shared slice.
pub struct Cursor<B> {
    buf: B,
    x: usize,
    err: Option<RangeError>,
}

impl<B: AsRef<[u8]>> Cursor<B> {
    pub fn new(buf: B) -> Self {
        Self {
            buf,
            x: 0,
            err: None,
        }
    }

    /// Current offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.x
    }

    /// Total length of the backing buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.as_ref().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.as_ref().is_empty()
    }

    /// Number of bytes between the offset and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len() - self.x
    }

    /// The latched error, if any operation has gone out of bounds.
    pub fn err(&self) -> Option<RangeError> {
        self.err
    }

    /// Verifies that `n` more bytes are available. Latches on failure.
    #[inline]
    fn check(&mut self, n: usize) -> Result<(), RangeError> {
        if let Some(err) = self.err {
            return Err(err);
        }
        if self.x + n > self.buf.as_ref().len() {
            self.err = Some(RangeError);
            return Err(RangeError);
        }
        Ok(())
    }

    /// Reads `N` bytes into an array and advances.
    #[inline]
    fn take<const N: usize>(&mut self) -> Result<[u8; N], RangeError> {
        self.check(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf.as_ref()[self.x..self.x + N]);
        self.x += N;
        Ok(out)
    }

    /// Reads the next byte without advancing.
    pub fn peek_u8(&mut self) -> Result<u8, RangeError> {
        self.check(1)?;
        Ok(self.buf.as_ref()[self.x])
    }

    /// Advances the offset by `n` bytes.
    pub fn discard(&mut self, n: usize) -> Result<(), RangeError> {
        self.check(n)?;
        self.x += n;
        Ok(())
    }

    #[inline]
    pub fn get_u8(&mut self) -> Result<u8, RangeError> {
        self.take().map(u8::from_be_bytes)
    }

    #[inline]
    pub fn get_i8(&mut self) -> Result<i8, RangeError> {
        self.take().map(i8::from_be_bytes)
    }

    #[inline]
    pub fn get_u16(&mut self) -> Result<u16, RangeError> {
        self.take().map(u16::from_be_bytes)
    }

    #[inline]
    pub fn get_i16(&mut self) -> Result<i16, RangeError> {
        self.take().map(i16::from_be_bytes)
    }

    #[inline]
    pub fn get_u32(&mut self) -> Result<u32, RangeError> {
        self.take().map(u32::from_be_bytes)
    }

    #[inline]
    pub fn get_i32(&mut self) -> Result<i32, RangeError> {
        self.take().map(i32::from_be_bytes)
    }

    #[inline]
    pub fn get_u64(&mut self) -> Result<u64, RangeError> {
        self.take().map(u64::from_be_bytes)
    }

    #[inline]
    pub fn get_i64(&mut self) -> Result<i64, RangeError> {
        self.take().map(i64::from_be_bytes)
    }

    #[inline]
    pub fn get_f32(&mut self) -> Result<f32, RangeError> {
        self.take().map(f32::from_be_bytes)
    }

    #[inline]
    pub fn get_f64(&mut self) -> Result<f64, RangeError> {
        self.take().map(f64::from_be_bytes)
    }
}

impl<'a> Cursor<&'a [u8]> {
    /// Reads `n` bytes and advances, returning a view that borrows from the
    /// backing slice rather than the cursor.
    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8], RangeError> {
        self.check(n)?;
        let start = self.x;
        self.x += n;
        Ok(&self.buf[start..self.x])
    }

    /// A view of `start..end` of the backing slice. Both offsets must have
    /// already been visited by the cursor.
    pub fn range(&self, start: usize, end: usize) -> &'a [u8] {
        &self.buf[start..end]
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Cursor<B> {
    /// Writes `N` bytes and advances. Out-of-bounds writes latch the error
    /// and are otherwise a no-op; callers check [`Cursor::err`] at the end
    /// of the sequence.
    #[inline]
    fn put<const N: usize>(&mut self, bytes: [u8; N]) {
        if self.check(N).is_err() {
            return;
        }
        self.buf.as_mut()[self.x..self.x + N].copy_from_slice(&bytes);
        self.x += N;
    }

    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.put(value.to_be_bytes());
    }

    #[inline]
    pub fn put_i8(&mut self, value: i8) {
        self.put(value.to_be_bytes());
    }

    #[inline]
    pub fn put_u16(&mut self, value: u16) {
        self.put(value.to_be_bytes());
    }

    #[inline]
    pub fn put_i16(&mut self, value: i16) {
        self.put(value.to_be_bytes());
    }

    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        self.put(value.to_be_bytes());
    }

    #[inline]
    pub fn put_i32(&mut self, value: i32) {
        self.put(value.to_be_bytes());
    }

    #[inline]
    pub fn put_u64(&mut self, value: u64) {
        self.put(value.to_be_bytes());
    }

    #[inline]
    pub fn put_i64(&mut self, value: i64) {
        self.put(value.to_be_bytes());
    }

    #[inline]
    pub fn put_f32(&mut self, value: f32) {
        self.put(value.to_be_bytes());
    }

    #[inline]
    pub fn put_f64(&mut self, value: f64) {
        self.put(value.to_be_bytes());
    }

    /// Copies `src` into the buffer at the current offset and advances.
    pub fn put_bytes(&mut self, src: &[u8]) {
        if self.check(src.len()).is_err() {
            return;
        }
        self.buf.as_mut()[self.x..self.x + src.len()].copy_from_slice(src);
        self.x += src.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_u8() {
        let data = [0x01u8, 0x02, 0x03];
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(cursor.get_u8(), Ok(0x01));
        assert_eq!(cursor.get_u8(), Ok(0x02));
        assert_eq!(cursor.get_u8(), Ok(0x03));
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_get_u16_u32_u64() {
        let data = [0x01u8, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(cursor.get_u16(), Ok(0x0102));
        assert_eq!(cursor.get_u32(), Ok(0x03040506));
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(cursor.get_u64(), Ok(0x0102030405060708));
    }

    #[test]
    fn test_signed_reads() {
        let data = [0xffu8, 0xfc, 0x18];
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(cursor.get_i8(), Ok(-1));
        assert_eq!(cursor.get_i16(), Ok(-1000));
    }

    #[test]
    fn test_float_roundtrip() {
        let mut buf = [0u8; 12];
        let mut w = Cursor::new(&mut buf[..]);
        w.put_f32(1.5);
        w.put_f64(std::f64::consts::PI);
        assert_eq!(w.err(), None);
        let mut r = Cursor::new(&buf[..]);
        assert_eq!(r.get_f32(), Ok(1.5));
        assert_eq!(r.get_f64(), Ok(std::f64::consts::PI));
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0x55u8];
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(cursor.peek_u8(), Ok(0x55));
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.get_u8(), Ok(0x55));
    }

    #[test]
    fn test_discard() {
        let data = [0x01u8, 0x02, 0x03, 0x04];
        let mut cursor = Cursor::new(&data[..]);
        cursor.discard(2).unwrap();
        assert_eq!(cursor.get_u8(), Ok(0x03));
    }

    #[test]
    fn test_get_bytes_borrows_from_backing() {
        let data = [1u8, 2, 3, 4, 5];
        let view;
        {
            let mut cursor = Cursor::new(&data[..]);
            view = cursor.get_bytes(3).unwrap();
            assert_eq!(cursor.position(), 3);
        }
        // The view outlives the cursor.
        assert_eq!(view, &[1, 2, 3]);
    }

    #[test]
    fn test_read_past_end_latches() {
        let data = [0x01u8];
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(cursor.get_u16(), Err(RangeError));
        // Offset did not advance.
        assert_eq!(cursor.position(), 0);
        // A read that would otherwise succeed now echoes the latched error.
        assert_eq!(cursor.get_u8(), Err(RangeError));
        assert_eq!(cursor.err(), Some(RangeError));
    }

    #[test]
    fn test_write_past_end_latches_and_stops() {
        let mut buf = [0u8; 2];
        let mut cursor = Cursor::new(&mut buf[..]);
        cursor.put_u8(0xaa);
        cursor.put_u32(0xdeadbeef);
        cursor.put_u8(0xbb);
        assert_eq!(cursor.err(), Some(RangeError));
        assert_eq!(cursor.position(), 1);
        assert_eq!(buf, [0xaa, 0x00]);
    }

    #[test]
    fn test_put_bytes() {
        let mut buf = [0u8; 4];
        let mut cursor = Cursor::new(&mut buf[..]);
        cursor.put_bytes(&[1, 2, 3]);
        assert_eq!(cursor.err(), None);
        assert_eq!(cursor.position(), 3);
        assert_eq!(buf, [1, 2, 3, 0]);
    }
}
