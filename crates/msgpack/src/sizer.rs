//! Size predictor mirroring the encoder's width-class decisions.

use chrono::{DateTime, Utc};

use crate::codec::Writer;
use crate::encoder::time_payload;
use crate::error::MsgPackError;

/// Accumulates the exact encoded length of a write sequence without
/// writing anything.
///
/// Every operation counts the same bytes the encoder would emit for the
/// same call, tag byte included, so `vec![0u8; sizer.len() as usize]` is
/// always exactly the buffer the encoder needs. The sizer never errors.
#[derive(Default)]
pub struct Sizer {
    length: u32,
}

impl Sizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated length in bytes.
    pub fn len(&self) -> u32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl Writer for Sizer {
    fn write_nil(&mut self) {
        self.length += 1;
    }

    fn write_bool(&mut self, _value: bool) {
        self.length += 1;
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

    fn write_i64(&mut self, value: i64) {
        if (-(1 << 5)..1 << 7).contains(&value) {
            self.length += 1;
        } else if i8::try_from(value).is_ok() {
            self.length += 2;
        } else if i16::try_from(value).is_ok() {
            self.length += 3;
        } else if i32::try_from(value).is_ok() {
            self.length += 5;
        } else {
            self.length += 9;
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

    fn write_u64(&mut self, value: u64) {
        if value < 1 << 7 {
            self.length += 1;
        } else if value <= u8::MAX as u64 {
            self.length += 2;
        } else if value <= u16::MAX as u64 {
            self.length += 3;
        } else if value <= u32::MAX as u64 {
            self.length += 5;
        } else {
            self.length += 9;
        }
    }

    fn write_f32(&mut self, _value: f32) {
        self.length += 5;
    }

    fn write_f64(&mut self, _value: f64) {
        self.length += 9;
    }

    fn write_str(&mut self, value: &str) {
        let length = value.len() as u32;
        if length < 32 {
            self.length += 1;
        } else if length <= u8::MAX as u32 {
            self.length += 2;
        } else if length <= u16::MAX as u32 {
            self.length += 3;
        } else {
            self.length += 5;
        }
        self.length += length;
    }

    fn write_bin(&mut self, value: &[u8]) {
        let length = value.len() as u32;
        if length == 0 {
            // bin-8 header with a zero length byte
            self.length += 2;
            return;
        }
        if length <= u8::MAX as u32 {
            self.length += 2;
        } else if length <= u16::MAX as u32 {
            self.length += 3;
        } else {
            self.length += 5;
        }
        self.length += length;
    }

    fn write_time(&mut self, value: DateTime<Utc>) {
        let payload_len = time_payload(value).1 as u32;
        match payload_len {
            1 | 2 | 4 | 8 | 16 => self.length += 1,
            _ if payload_len <= u8::MAX as u32 => self.length += 2,
            _ if payload_len <= u16::MAX as u32 => self.length += 3,
            _ => self.length += 5,
        }
        // id byte plus payload
        self.length += 1 + payload_len;
    }

    fn write_array_size(&mut self, length: u32) {
        if length < 16 {
            self.length += 1;
        } else if length <= u16::MAX as u32 {
            self.length += 3;
        } else {
            self.length += 5;
        }
    }

    fn write_map_size(&mut self, length: u32) {
        if length < 16 {
            self.length += 1;
        } else if length <= u16::MAX as u32 {
            self.length += 3;
        } else {
            self.length += 5;
        }
    }

    fn write_raw(&mut self, value: &[u8]) {
        self.length += value.len() as u32;
    }

    fn err(&self) -> Result<(), MsgPackError> {
        Ok(())
    }
}
