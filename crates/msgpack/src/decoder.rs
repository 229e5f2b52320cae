//! Streaming MessagePack decoder with structural skip.

use chrono::{DateTime, Utc};
use wirepack_buffers::Cursor;

use crate::constants::*;
use crate::error::MsgPackError;
use crate::value::Value;

/// Streaming MessagePack decoder over a borrowed buffer.
///
/// Typed reads consume exactly one value each. String, binary and raw reads
/// return views that borrow from the input buffer; callers that need an
/// independent lifetime copy them out.
///
/// Range errors latch in the cursor and every later read echoes them. Typed
/// errors (bad prefix, overflow) do not latch.
pub struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
    lenient_str: bool,
}

impl<'a> Decoder<'a> {
    /// Decoder with the historical leniencies: array tags are accepted as
    /// string length tags.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(buffer),
            lenient_str: true,
        }
    }

    /// Decoder that rejects array tags in string length position.
    pub fn strict(buffer: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(buffer),
            lenient_str: false,
        }
    }

    /// Current offset into the buffer.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// The latched range error, if any read has run past the buffer end.
    pub fn err(&self) -> Result<(), MsgPackError> {
        match self.cursor.err() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Peeks at the next value; consumes it when it is nil.
    pub fn is_next_nil(&mut self) -> Result<bool, MsgPackError> {
        if self.cursor.peek_u8()? == NIL {
            self.cursor.discard(1)?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn read_bool(&mut self) -> Result<bool, MsgPackError> {
        match self.cursor.get_u8()? {
            TRUE => Ok(true),
            FALSE => Ok(false),
            _ => Err(MsgPackError::BadValue("bool")),
        }
    }

    pub fn read_i8(&mut self) -> Result<i8, MsgPackError> {
        let v = self.read_i64()?;
        i8::try_from(v).map_err(|_| MsgPackError::Overflow {
            value: v as i128,
            bits: 8,
        })
    }

    pub fn read_i16(&mut self) -> Result<i16, MsgPackError> {
        let v = self.read_i64()?;
        i16::try_from(v).map_err(|_| MsgPackError::Overflow {
            value: v as i128,
            bits: 16,
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, MsgPackError> {
        let v = self.read_i64()?;
        i32::try_from(v).map_err(|_| MsgPackError::Overflow {
            value: v as i128,
            bits: 32,
        })
    }

    /// Accepts both fixint families and the four signed widths. Unsigned
    /// tags are rejected even when the value would fit.
    pub fn read_i64(&mut self) -> Result<i64, MsgPackError> {
        let prefix = self.cursor.get_u8()?;
        if is_fixed_int(prefix) || is_neg_fixed_int(prefix) {
            return Ok(prefix as i8 as i64);
        }
        match prefix {
            INT_8 => Ok(self.cursor.get_i8()? as i64),
            INT_16 => Ok(self.cursor.get_i16()? as i64),
            INT_32 => Ok(self.cursor.get_i32()? as i64),
            INT_64 => Ok(self.cursor.get_i64()?),
            _ => Err(MsgPackError::BadPrefix("int")),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, MsgPackError> {
        let v = self.read_u64()?;
        u8::try_from(v).map_err(|_| MsgPackError::Overflow {
            value: v as i128,
            bits: 8,
        })
    }

    pub fn read_u16(&mut self) -> Result<u16, MsgPackError> {
        let v = self.read_u64()?;
        u16::try_from(v).map_err(|_| MsgPackError::Overflow {
            value: v as i128,
            bits: 16,
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, MsgPackError> {
        let v = self.read_u64()?;
        u32::try_from(v).map_err(|_| MsgPackError::Overflow {
            value: v as i128,
            bits: 32,
        })
    }

    /// Accepts positive fixint, the four unsigned widths, and any signed
    /// width whose concrete value is non-negative.
    pub fn read_u64(&mut self) -> Result<u64, MsgPackError> {
        let prefix = self.cursor.get_u8()?;
        if is_fixed_int(prefix) {
            return Ok(prefix as u64);
        }
        if is_neg_fixed_int(prefix) {
            return Err(MsgPackError::BadPrefix("uint"));
        }
        match prefix {
            UINT_8 => Ok(self.cursor.get_u8()? as u64),
            UINT_16 => Ok(self.cursor.get_u16()? as u64),
            UINT_32 => Ok(self.cursor.get_u32()? as u64),
            UINT_64 => Ok(self.cursor.get_u64()?),
            INT_8 => Self::non_negative(self.cursor.get_i8()? as i64),
            INT_16 => Self::non_negative(self.cursor.get_i16()? as i64),
            INT_32 => Self::non_negative(self.cursor.get_i32()? as i64),
            INT_64 => Self::non_negative(self.cursor.get_i64()?),
            _ => Err(MsgPackError::BadPrefix("uint")),
        }
    }

    fn non_negative(v: i64) -> Result<u64, MsgPackError> {
        u64::try_from(v).map_err(|_| MsgPackError::BadPrefix("uint"))
    }

    /// Accepts float32 or float64; the latter narrows and may lose
    /// precision.
    pub fn read_f32(&mut self) -> Result<f32, MsgPackError> {
        match self.cursor.get_u8()? {
            FLOAT_32 => Ok(self.cursor.get_f32()?),
            FLOAT_64 => Ok(self.cursor.get_f64()? as f32),
            _ => Err(MsgPackError::BadPrefix("float32")),
        }
    }

    pub fn read_f64(&mut self) -> Result<f64, MsgPackError> {
        match self.cursor.get_u8()? {
            FLOAT_64 => Ok(self.cursor.get_f64()?),
            _ => Err(MsgPackError::BadPrefix("float64")),
        }
    }

    /// Reads a string as a view into the input buffer.
    pub fn read_str(&mut self) -> Result<&'a str, MsgPackError> {
        let len = self.read_str_len()?;
        self.read_str_payload(len as usize)
    }

    fn read_str_payload(&mut self, len: usize) -> Result<&'a str, MsgPackError> {
        let bytes = self.cursor.get_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| MsgPackError::InvalidUtf8)
    }

    fn read_str_len(&mut self) -> Result<u32, MsgPackError> {
        let prefix = self.cursor.get_u8()?;
        if is_fixed_str(prefix) {
            return Ok((prefix & LOW_FIVE_BITS) as u32);
        }
        if self.lenient_str && is_fixed_array(prefix) {
            return Ok((prefix & LOW_FOUR_BITS) as u32);
        }
        match prefix {
            STR_8 => Ok(self.cursor.get_u8()? as u32),
            STR_16 => Ok(self.cursor.get_u16()? as u32),
            STR_32 => Ok(self.cursor.get_u32()?),
            ARRAY_16 if self.lenient_str => Ok(self.cursor.get_u16()? as u32),
            ARRAY_32 if self.lenient_str => Ok(self.cursor.get_u32()?),
            _ => Err(MsgPackError::BadPrefix("string length")),
        }
    }

    /// Reads a binary value as a view into the input buffer. Nil reads as
    /// an empty view.
    pub fn read_bin(&mut self) -> Result<&'a [u8], MsgPackError> {
        let len = self.read_bin_len()?;
        Ok(self.cursor.get_bytes(len as usize)?)
    }

    fn read_bin_len(&mut self) -> Result<u32, MsgPackError> {
        let prefix = self.cursor.get_u8()?;
        if is_fixed_array(prefix) {
            return Ok((prefix & LOW_FOUR_BITS) as u32);
        }
        match prefix {
            NIL => Ok(0),
            BIN_8 => Ok(self.cursor.get_u8()? as u32),
            BIN_16 => Ok(self.cursor.get_u16()? as u32),
            BIN_32 => Ok(self.cursor.get_u32()?),
            ARRAY_16 => Ok(self.cursor.get_u16()? as u32),
            ARRAY_32 => Ok(self.cursor.get_u32()?),
            _ => Err(MsgPackError::BadPrefix("binary length")),
        }
    }

    /// Number of elements in the array whose header is next. Nil reads as
    /// zero.
    pub fn read_array_size(&mut self) -> Result<u32, MsgPackError> {
        let prefix = self.cursor.get_u8()?;
        if is_fixed_array(prefix) {
            return Ok((prefix & LOW_FOUR_BITS) as u32);
        }
        match prefix {
            ARRAY_16 => Ok(self.cursor.get_u16()? as u32),
            ARRAY_32 => Ok(self.cursor.get_u32()?),
            NIL => Ok(0),
            _ => Err(MsgPackError::BadPrefix("array length")),
        }
    }

    /// Number of key-value pairs in the map whose header is next. Nil reads
    /// as zero.
    pub fn read_map_size(&mut self) -> Result<u32, MsgPackError> {
        let prefix = self.cursor.get_u8()?;
        if is_fixed_map(prefix) {
            return Ok((prefix & LOW_FOUR_BITS) as u32);
        }
        match prefix {
            MAP_16 => Ok(self.cursor.get_u16()? as u32),
            MAP_32 => Ok(self.cursor.get_u32()?),
            NIL => Ok(0),
            _ => Err(MsgPackError::BadPrefix("map length")),
        }
    }

    /// Reads an absolute instant.
    ///
    /// Accepts the timestamp extension under id -1, id 13 (emitted by some
    /// peers), or an RFC 3339 string with nanosecond precision. Results are
    /// in UTC.
    pub fn read_time(&mut self) -> Result<DateTime<Utc>, MsgPackError> {
        let prefix = self.cursor.peek_u8()?;
        if is_str_family(prefix) {
            let s = self.read_str()?;
            return DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| MsgPackError::TimeParse(s.to_string()));
        }
        self.cursor.discard(1)?;
        let (ext_id, ext_len) = self.ext_header(prefix)?;
        if ext_id != -1 && ext_id != 13 {
            return Err(MsgPackError::InvalidTimeExtId(ext_id));
        }
        self.decode_time(ext_len)
    }

    fn ext_header(&mut self, prefix: u8) -> Result<(i8, u32), MsgPackError> {
        let len = self.ext_len(prefix)?;
        let id = self.cursor.get_i8()?;
        Ok((id, len))
    }

    /// Extension payload length. Variable widths carry the length as raw
    /// big-endian bytes after the tag.
    fn ext_len(&mut self, prefix: u8) -> Result<u32, MsgPackError> {
        match prefix {
            FIXEXT_1 => Ok(1),
            FIXEXT_2 => Ok(2),
            FIXEXT_4 => Ok(4),
            FIXEXT_8 => Ok(8),
            FIXEXT_16 => Ok(16),
            EXT_8 => Ok(self.cursor.get_u8()? as u32),
            EXT_16 => Ok(self.cursor.get_u16()? as u32),
            EXT_32 => Ok(self.cursor.get_u32()?),
            _ => Err(MsgPackError::BadPrefix("ext length")),
        }
    }

    fn decode_time(&mut self, ext_len: u32) -> Result<DateTime<Utc>, MsgPackError> {
        let payload = self.cursor.get_bytes(ext_len as usize)?;
        let (secs, nanos) = match payload.len() {
            4 => {
                let secs = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                (secs as i64, 0)
            }
            8 => {
                let data = u64::from_be_bytes([
                    payload[0], payload[1], payload[2], payload[3], payload[4], payload[5],
                    payload[6], payload[7],
                ]);
                ((data & 0x0000_0003_ffff_ffff) as i64, (data >> 34) as u32)
            }
            12 => {
                let nanos = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                let secs = u64::from_be_bytes([
                    payload[4], payload[5], payload[6], payload[7], payload[8], payload[9],
                    payload[10], payload[11],
                ]) as i64;
                (secs, nanos)
            }
            _ => return Err(MsgPackError::InvalidTimeExtLen(ext_len)),
        };
        DateTime::from_timestamp(secs, nanos).ok_or(MsgPackError::BadValue("timestamp"))
    }

    /// Reads the next complete value as its raw encoded bytes.
    pub fn read_raw(&mut self) -> Result<&'a [u8], MsgPackError> {
        let start = self.cursor.position();
        self.skip()?;
        Ok(self.cursor.range(start, self.cursor.position()))
    }

    /// Advances past exactly one value, including all nested children.
    pub fn skip(&mut self) -> Result<(), MsgPackError> {
        let children = self.discard_value()?;
        for _ in 0..children {
            self.skip()?;
        }
        Ok(())
    }

    /// Consumes one value's tag and immediate payload and returns how many
    /// child values follow it.
    fn discard_value(&mut self) -> Result<u64, MsgPackError> {
        let prefix = self.cursor.get_u8()?;
        if is_fixed_int(prefix) || is_neg_fixed_int(prefix) {
            return Ok(0);
        }
        if is_fixed_str(prefix) {
            self.cursor.discard((prefix & LOW_FIVE_BITS) as usize)?;
            return Ok(0);
        }
        if is_fixed_array(prefix) {
            return Ok((prefix & LOW_FOUR_BITS) as u64);
        }
        if is_fixed_map(prefix) {
            return Ok(2 * (prefix & LOW_FOUR_BITS) as u64);
        }
        match prefix {
            NIL | TRUE | FALSE => Ok(0),
            STR_8 | BIN_8 => {
                let n = self.cursor.get_u8()? as usize;
                self.cursor.discard(n)?;
                Ok(0)
            }
            STR_16 | BIN_16 => {
                let n = self.cursor.get_u16()? as usize;
                self.cursor.discard(n)?;
                Ok(0)
            }
            STR_32 | BIN_32 => {
                let n = self.cursor.get_u32()? as usize;
                self.cursor.discard(n)?;
                Ok(0)
            }
            FLOAT_32 => {
                self.cursor.discard(4)?;
                Ok(0)
            }
            FLOAT_64 => {
                self.cursor.discard(8)?;
                Ok(0)
            }
            UINT_8 | INT_8 => {
                self.cursor.discard(1)?;
                Ok(0)
            }
            UINT_16 | INT_16 => {
                self.cursor.discard(2)?;
                Ok(0)
            }
            UINT_32 | INT_32 => {
                self.cursor.discard(4)?;
                Ok(0)
            }
            UINT_64 | INT_64 => {
                self.cursor.discard(8)?;
                Ok(0)
            }
            // payload plus the one-byte type id
            FIXEXT_1 => {
                self.cursor.discard(2)?;
                Ok(0)
            }
            FIXEXT_2 => {
                self.cursor.discard(3)?;
                Ok(0)
            }
            FIXEXT_4 => {
                self.cursor.discard(5)?;
                Ok(0)
            }
            FIXEXT_8 => {
                self.cursor.discard(9)?;
                Ok(0)
            }
            FIXEXT_16 => {
                self.cursor.discard(17)?;
                Ok(0)
            }
            EXT_8 => {
                let n = self.cursor.get_u8()? as usize;
                self.cursor.discard(n + 1)?;
                Ok(0)
            }
            EXT_16 => {
                let n = self.cursor.get_u16()? as usize;
                self.cursor.discard(n + 1)?;
                Ok(0)
            }
            EXT_32 => {
                let n = self.cursor.get_u32()? as usize;
                self.cursor.discard(n + 1)?;
                Ok(0)
            }
            ARRAY_16 => Ok(self.cursor.get_u16()? as u64),
            ARRAY_32 => Ok(self.cursor.get_u32()? as u64),
            MAP_16 => Ok(2 * self.cursor.get_u16()? as u64),
            MAP_32 => Ok(2 * self.cursor.get_u32()? as u64),
            _ => Err(MsgPackError::BadPrefix("value")),
        }
    }

    /// Reads any value, dispatching on the next tag. Decoded integers that
    /// fit i64 become [`Value::Int`]; timestamp extensions become
    /// [`Value::Time`].
    pub fn read_any(&mut self) -> Result<Value, MsgPackError> {
        let prefix = self.cursor.get_u8()?;
        if is_fixed_int(prefix) || is_neg_fixed_int(prefix) {
            return Ok(Value::Int(prefix as i8 as i64));
        }
        if is_fixed_str(prefix) {
            let len = (prefix & LOW_FIVE_BITS) as usize;
            return Ok(Value::Str(self.read_str_payload(len)?.to_string()));
        }
        if is_fixed_array(prefix) {
            return self.read_array_items((prefix & LOW_FOUR_BITS) as u32);
        }
        if is_fixed_map(prefix) {
            return self.read_map_pairs((prefix & LOW_FOUR_BITS) as u32);
        }
        match prefix {
            NIL => Ok(Value::Nil),
            TRUE => Ok(Value::Bool(true)),
            FALSE => Ok(Value::Bool(false)),
            INT_8 => Ok(Value::Int(self.cursor.get_i8()? as i64)),
            INT_16 => Ok(Value::Int(self.cursor.get_i16()? as i64)),
            INT_32 => Ok(Value::Int(self.cursor.get_i32()? as i64)),
            INT_64 => Ok(Value::Int(self.cursor.get_i64()?)),
            UINT_8 => Ok(Value::Int(self.cursor.get_u8()? as i64)),
            UINT_16 => Ok(Value::Int(self.cursor.get_u16()? as i64)),
            UINT_32 => Ok(Value::Int(self.cursor.get_u32()? as i64)),
            UINT_64 => {
                let v = self.cursor.get_u64()?;
                match i64::try_from(v) {
                    Ok(i) => Ok(Value::Int(i)),
                    Err(_) => Ok(Value::UInt(v)),
                }
            }
            FLOAT_32 => Ok(Value::F32(self.cursor.get_f32()?)),
            FLOAT_64 => Ok(Value::F64(self.cursor.get_f64()?)),
            STR_8 => {
                let n = self.cursor.get_u8()? as usize;
                Ok(Value::Str(self.read_str_payload(n)?.to_string()))
            }
            STR_16 => {
                let n = self.cursor.get_u16()? as usize;
                Ok(Value::Str(self.read_str_payload(n)?.to_string()))
            }
            STR_32 => {
                let n = self.cursor.get_u32()? as usize;
                Ok(Value::Str(self.read_str_payload(n)?.to_string()))
            }
            ARRAY_16 => {
                let n = self.cursor.get_u16()? as u32;
                self.read_array_items(n)
            }
            ARRAY_32 => {
                let n = self.cursor.get_u32()?;
                self.read_array_items(n)
            }
            MAP_16 => {
                let n = self.cursor.get_u16()? as u32;
                self.read_map_pairs(n)
            }
            MAP_32 => {
                let n = self.cursor.get_u32()?;
                self.read_map_pairs(n)
            }
            BIN_8 => {
                let n = self.cursor.get_u8()? as usize;
                Ok(Value::Bin(self.cursor.get_bytes(n)?.to_vec()))
            }
            BIN_16 => {
                let n = self.cursor.get_u16()? as usize;
                Ok(Value::Bin(self.cursor.get_bytes(n)?.to_vec()))
            }
            BIN_32 => {
                let n = self.cursor.get_u32()? as usize;
                Ok(Value::Bin(self.cursor.get_bytes(n)?.to_vec()))
            }
            FIXEXT_1 | FIXEXT_2 | FIXEXT_4 | FIXEXT_8 | FIXEXT_16 | EXT_8 | EXT_16 | EXT_32 => {
                let (ext_id, ext_len) = self.ext_header(prefix)?;
                if ext_id != -1 && ext_id != 13 {
                    return Err(MsgPackError::InvalidTimeExtId(ext_id));
                }
                self.decode_time(ext_len).map(Value::Time)
            }
            _ => Err(MsgPackError::BadPrefix("value")),
        }
    }

    fn read_array_items(&mut self, count: u32) -> Result<Value, MsgPackError> {
        let mut items = Vec::with_capacity(count.min(4096) as usize);
        for _ in 0..count {
            items.push(self.read_any()?);
        }
        Ok(Value::Array(items))
    }

    /// Reads `count` key-value pairs, key first.
    fn read_map_pairs(&mut self, count: u32) -> Result<Value, MsgPackError> {
        let mut pairs = Vec::with_capacity(count.min(4096) as usize);
        for _ in 0..count {
            let key = self.read_any()?;
            let val = self.read_any()?;
            pairs.push((key, val));
        }
        Ok(Value::Map(pairs))
    }

    pub fn read_opt_bool(&mut self) -> Result<Option<bool>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_bool().map(Some)
    }

    pub fn read_opt_i8(&mut self) -> Result<Option<i8>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_i8().map(Some)
    }

    pub fn read_opt_i16(&mut self) -> Result<Option<i16>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_i16().map(Some)
    }

    pub fn read_opt_i32(&mut self) -> Result<Option<i32>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_i32().map(Some)
    }

    pub fn read_opt_i64(&mut self) -> Result<Option<i64>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_i64().map(Some)
    }

    pub fn read_opt_u8(&mut self) -> Result<Option<u8>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_u8().map(Some)
    }

    pub fn read_opt_u16(&mut self) -> Result<Option<u16>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_u16().map(Some)
    }

    pub fn read_opt_u32(&mut self) -> Result<Option<u32>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_u32().map(Some)
    }

    pub fn read_opt_u64(&mut self) -> Result<Option<u64>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_u64().map(Some)
    }

    pub fn read_opt_f32(&mut self) -> Result<Option<f32>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_f32().map(Some)
    }

    pub fn read_opt_f64(&mut self) -> Result<Option<f64>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_f64().map(Some)
    }

    pub fn read_opt_str(&mut self) -> Result<Option<&'a str>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_str().map(Some)
    }

    pub fn read_opt_bin(&mut self) -> Result<Option<&'a [u8]>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_bin().map(Some)
    }

    pub fn read_opt_time(&mut self) -> Result<Option<DateTime<Utc>>, MsgPackError> {
        if self.is_next_nil()? {
            return Ok(None);
        }
        self.read_time().map(Some)
    }
}
