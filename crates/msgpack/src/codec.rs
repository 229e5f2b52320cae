//! Writer dispatch trait and the user-adapter codec traits.

use chrono::{DateTime, Utc};

use crate::decoder::Decoder;
use crate::error::MsgPackError;
use crate::value::Value;

/// The shared write surface implemented by both [`Encoder`] and [`Sizer`].
///
/// A codec adapter runs once against the sizer to learn the exact output
/// length, then again against the encoder to fill a buffer of that length.
/// Width-class decisions live behind this trait, so the two passes cannot
/// disagree.
///
/// Write operations do not return errors; the encoder latches the first
/// out-of-range write and [`Writer::err`] reports it after the sequence.
///
/// [`Encoder`]: crate::Encoder
/// [`Sizer`]: crate::Sizer
pub trait Writer {
    fn write_nil(&mut self);
    fn write_bool(&mut self, value: bool);
    fn write_i8(&mut self, value: i8);
    fn write_i16(&mut self, value: i16);
    fn write_i32(&mut self, value: i32);
    fn write_i64(&mut self, value: i64);
    fn write_u8(&mut self, value: u8);
    fn write_u16(&mut self, value: u16);
    fn write_u32(&mut self, value: u32);
    fn write_u64(&mut self, value: u64);
    fn write_f32(&mut self, value: f32);
    fn write_f64(&mut self, value: f64);
    fn write_str(&mut self, value: &str);
    fn write_bin(&mut self, value: &[u8]);
    fn write_time(&mut self, value: DateTime<Utc>);
    /// Writes only the array header; the caller must follow with exactly
    /// `length` values.
    fn write_array_size(&mut self, length: u32);
    /// Writes only the map header; the caller must follow with exactly
    /// `length` key-value pairs.
    fn write_map_size(&mut self, length: u32);
    /// Writes pre-encoded MessagePack bytes verbatim.
    fn write_raw(&mut self, value: &[u8]);
    /// The latched error, if any write has gone out of range.
    fn err(&self) -> Result<(), MsgPackError>;

    fn write_opt_bool(&mut self, value: Option<bool>) {
        match value {
            Some(v) => self.write_bool(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_i8(&mut self, value: Option<i8>) {
        match value {
            Some(v) => self.write_i8(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_i16(&mut self, value: Option<i16>) {
        match value {
            Some(v) => self.write_i16(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_i32(&mut self, value: Option<i32>) {
        match value {
            Some(v) => self.write_i32(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_i64(&mut self, value: Option<i64>) {
        match value {
            Some(v) => self.write_i64(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_u8(&mut self, value: Option<u8>) {
        match value {
            Some(v) => self.write_u8(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_u16(&mut self, value: Option<u16>) {
        match value {
            Some(v) => self.write_u16(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_u32(&mut self, value: Option<u32>) {
        match value {
            Some(v) => self.write_u32(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_u64(&mut self, value: Option<u64>) {
        match value {
            Some(v) => self.write_u64(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_f32(&mut self, value: Option<f32>) {
        match value {
            Some(v) => self.write_f32(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_f64(&mut self, value: Option<f64>) {
        match value {
            Some(v) => self.write_f64(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_str(&mut self, value: Option<&str>) {
        match value {
            Some(v) => self.write_str(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_bin(&mut self, value: Option<&[u8]>) {
        match value {
            Some(v) => self.write_bin(v),
            None => self.write_nil(),
        }
    }

    fn write_opt_time(&mut self, value: Option<DateTime<Utc>>) {
        match value {
            Some(v) => self.write_time(v),
            None => self.write_nil(),
        }
    }

    /// Writes any [`Value`]. Non-negative integers take the unsigned minimal
    /// encoding, so the narrowest legal tag is always chosen.
    fn write_any(&mut self, value: &Value) {
        match value {
            Value::Nil => self.write_nil(),
            Value::Bool(v) => self.write_bool(*v),
            Value::Int(v) => {
                if *v >= 0 {
                    self.write_u64(*v as u64);
                } else {
                    self.write_i64(*v);
                }
            }
            Value::UInt(v) => self.write_u64(*v),
            Value::F32(v) => self.write_f32(*v),
            Value::F64(v) => self.write_f64(*v),
            Value::Str(v) => self.write_str(v),
            Value::Bin(v) => self.write_bin(v),
            Value::Time(v) => self.write_time(*v),
            Value::Array(items) => {
                self.write_array_size(items.len() as u32);
                for item in items {
                    self.write_any(item);
                }
            }
            Value::Map(pairs) => {
                self.write_map_size(pairs.len() as u32);
                for (key, val) in pairs {
                    self.write_any(key);
                    self.write_any(val);
                }
            }
        }
    }
}

/// A type that knows how to write itself through a [`Writer`].
///
/// Implementations must perform the same call sequence regardless of which
/// writer they are handed; the two-pass encode flow depends on it.
pub trait Encode {
    fn encode(&self, writer: &mut dyn Writer) -> Result<(), MsgPackError>;
}

/// A type that knows how to read itself out of a [`Decoder`].
pub trait Decode: Sized {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, MsgPackError>;
}

impl Encode for Value {
    fn encode(&self, writer: &mut dyn Writer) -> Result<(), MsgPackError> {
        writer.write_any(self);
        writer.err()
    }
}

impl Decode for Value {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, MsgPackError> {
        decoder.read_any()
    }
}
