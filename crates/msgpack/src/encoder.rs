//! Single-pass MessagePack encoder over a caller-sized buffer.

use chrono::{DateTime, Utc};
use wirepack_buffers::Cursor;

use crate::codec::Writer;
use crate::constants::*;
use crate::error::MsgPackError;

/// Streaming MessagePack encoder.
///
/// Writes into a pre-allocated buffer without reallocation; the buffer is
/// normally sized by running the same call sequence through
/// [`Sizer`](crate::Sizer) first. An out-of-range write latches in the
/// cursor and turns every later write into a no-op, so the caller checks
/// [`Encoder::err`] once after the sequence. A correctly pre-sized encode
/// never produces a range error.
pub struct Encoder<'a> {
    cursor: Cursor<&'a mut [u8]>,
}

impl<'a> Encoder<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            cursor: Cursor::new(buffer),
        }
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    fn write_str_len(&mut self, length: u32) {
        if length < 32 {
            self.cursor.put_u8(length as u8 | FIXSTR);
        } else if length <= u8::MAX as u32 {
            self.cursor.put_u8(STR_8);
            self.cursor.put_u8(length as u8);
        } else if length <= u16::MAX as u32 {
            self.cursor.put_u8(STR_16);
            self.cursor.put_u16(length as u16);
        } else {
            self.cursor.put_u8(STR_32);
            self.cursor.put_u32(length);
        }
    }

    fn write_bin_len(&mut self, length: u32) {
        if length <= u8::MAX as u32 {
            self.cursor.put_u8(BIN_8);
            self.cursor.put_u8(length as u8);
        } else if length <= u16::MAX as u32 {
            self.cursor.put_u8(BIN_16);
            self.cursor.put_u16(length as u16);
        } else {
            self.cursor.put_u8(BIN_32);
            self.cursor.put_u32(length);
        }
    }

    fn write_ext_len(&mut self, length: u32) {
        match length {
            1 => self.cursor.put_u8(FIXEXT_1),
            2 => self.cursor.put_u8(FIXEXT_2),
            4 => self.cursor.put_u8(FIXEXT_4),
            8 => self.cursor.put_u8(FIXEXT_8),
            16 => self.cursor.put_u8(FIXEXT_16),
            _ => {
                if length <= u8::MAX as u32 {
                    self.cursor.put_u8(EXT_8);
                    self.cursor.put_u8(length as u8);
                } else if length <= u16::MAX as u32 {
                    self.cursor.put_u8(EXT_16);
                    self.cursor.put_u16(length as u16);
                } else {
                    self.cursor.put_u8(EXT_32);
                    self.cursor.put_u32(length);
                }
            }
        }
    }
}

/// Timestamp extension payload: 4 bytes when the instant fits 32-bit
/// seconds with zero nanoseconds, 8 bytes for packed 30-bit nanoseconds
/// plus 34-bit seconds, 12 bytes otherwise. Returns the scratch buffer and
/// the payload width. Shared with the sizer so both sides pick the same
/// width.
pub(crate) fn time_payload(tm: DateTime<Utc>) -> ([u8; 12], usize) {
    let mut buf = [0u8; 12];
    let secs = tm.timestamp() as u64;
    let nanos = tm.timestamp_subsec_nanos() as u64;
    if secs >> 34 == 0 {
        let data = nanos << 34 | secs;
        if data & 0xffff_ffff_0000_0000 == 0 {
            buf[..4].copy_from_slice(&(data as u32).to_be_bytes());
            (buf, 4)
        } else {
            buf[..8].copy_from_slice(&data.to_be_bytes());
            (buf, 8)
        }
    } else {
        buf[..4].copy_from_slice(&(nanos as u32).to_be_bytes());
        buf[4..].copy_from_slice(&secs.to_be_bytes());
        (buf, 12)
    }
}

impl Writer for Encoder<'_> {
    fn write_nil(&mut self) {
        self.cursor.put_u8(NIL);
    }

    fn write_bool(&mut self, value: bool) {
        self.cursor.put_u8(if value { TRUE } else { FALSE });
    }

    fn write_i8(&mut self, value: i8) {
        self.write_i64(value as i64);
    }

    fn write_i16(&mut self, value: i16) {
        self.write_i64(value as i64);
    }

    fn write_i32(&mut self, value: i32) {
        self.write_i64(value as i64);
    }

    /// Narrowest signed encoding: positive fixint for 0..128, negative
    /// fixint for -32..0, then int8/16/32/64.
    fn write_i64(&mut self, value: i64) {
        if (0..1 << 7).contains(&value) {
            self.cursor.put_u8(value as u8);
        } else if (-(1 << 5)..0).contains(&value) {
            self.cursor.put_u8(value as u8 | NEG_FIXINT);
        } else if i8::try_from(value).is_ok() {
            self.cursor.put_u8(INT_8);
            self.cursor.put_i8(value as i8);
        } else if i16::try_from(value).is_ok() {
            self.cursor.put_u8(INT_16);
            self.cursor.put_i16(value as i16);
        } else if i32::try_from(value).is_ok() {
            self.cursor.put_u8(INT_32);
            self.cursor.put_i32(value as i32);
        } else {
            self.cursor.put_u8(INT_64);
            self.cursor.put_i64(value);
        }
    }

    fn write_u8(&mut self, value: u8) {
        self.write_u64(value as u64);
    }

    fn write_u16(&mut self, value: u16) {
        self.write_u64(value as u64);
    }

    fn write_u32(&mut self, value: u32) {
        self.write_u64(value as u64);
    }

    /// Narrowest unsigned encoding: positive fixint for 0..128, then
    /// uint8/16/32/64.
    fn write_u64(&mut self, value: u64) {
        if value < 1 << 7 {
            self.cursor.put_u8(value as u8);
        } else if value <= u8::MAX as u64 {
            self.cursor.put_u8(UINT_8);
            self.cursor.put_u8(value as u8);
        } else if value <= u16::MAX as u64 {
            self.cursor.put_u8(UINT_16);
            self.cursor.put_u16(value as u16);
        } else if value <= u32::MAX as u64 {
            self.cursor.put_u8(UINT_32);
            self.cursor.put_u32(value as u32);
        } else {
            self.cursor.put_u8(UINT_64);
            self.cursor.put_u64(value);
        }
    }

    fn write_f32(&mut self, value: f32) {
        self.cursor.put_u8(FLOAT_32);
        self.cursor.put_f32(value);
    }

    fn write_f64(&mut self, value: f64) {
        self.cursor.put_u8(FLOAT_64);
        self.cursor.put_f64(value);
    }

    fn write_str(&mut self, value: &str) {
        self.write_str_len(value.len() as u32);
        self.cursor.put_bytes(value.as_bytes());
    }

    /// Zero-length input is still written as bin-8 with length 0, never as
    /// nil, so the binary type survives a round trip.
    fn write_bin(&mut self, value: &[u8]) {
        if value.is_empty() {
            self.cursor.put_u8(BIN_8);
            self.cursor.put_u8(0);
            return;
        }
        self.write_bin_len(value.len() as u32);
        self.cursor.put_bytes(value);
    }

    fn write_time(&mut self, value: DateTime<Utc>) {
        let (payload, len) = time_payload(value);
        self.write_ext_len(len as u32);
        self.cursor.put_i8(-1);
        self.cursor.put_bytes(&payload[..len]);
    }

    fn write_array_size(&mut self, length: u32) {
        if length < 16 {
            self.cursor.put_u8(length as u8 | FIXARRAY);
        } else if length <= u16::MAX as u32 {
            self.cursor.put_u8(ARRAY_16);
            self.cursor.put_u16(length as u16);
        } else {
            self.cursor.put_u8(ARRAY_32);
            self.cursor.put_u32(length);
        }
    }

    fn write_map_size(&mut self, length: u32) {
        if length < 16 {
            self.cursor.put_u8(length as u8 | FIXMAP);
        } else if length <= u16::MAX as u32 {
            self.cursor.put_u8(MAP_16);
            self.cursor.put_u16(length as u16);
        } else {
            self.cursor.put_u8(MAP_32);
            self.cursor.put_u32(length);
        }
    }

    fn write_raw(&mut self, value: &[u8]) {
        self.cursor.put_bytes(value);
    }

    fn err(&self) -> Result<(), MsgPackError> {
        match self.cursor.err() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
