//! High-level composition over the sizer, encoder and decoder.

use std::collections::HashMap;
use std::hash::Hash;

use crate::codec::{Decode, Encode, Writer};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::MsgPackError;
use crate::sizer::Sizer;
use crate::value::Value;

/// Encodes a codec adapter into a buffer of exactly the right length.
///
/// The adapter runs twice: once against a [`Sizer`] to learn the output
/// length, then against an [`Encoder`] over a buffer of that length. A
/// range error here means the adapter did not perform the same call
/// sequence on both passes.
pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>, MsgPackError> {
    let mut sizer = Sizer::new();
    value.encode(&mut sizer)?;
    let mut buffer = vec![0u8; sizer.len() as usize];
    let mut encoder = Encoder::new(&mut buffer);
    value.encode(&mut encoder)?;
    encoder.err()?;
    Ok(buffer)
}

/// Encodes a [`Value`] graph.
pub fn marshal(value: &Value) -> Result<Vec<u8>, MsgPackError> {
    to_bytes(value)
}

/// Decodes one value of a [`Decode`] type from the front of `data`.
pub fn unmarshal<T: Decode>(data: &[u8]) -> Result<T, MsgPackError> {
    let mut decoder = Decoder::new(data);
    T::decode(&mut decoder)
}

/// Decodes one value of any shape from the front of `data`.
pub fn decode_value(data: &[u8]) -> Result<Value, MsgPackError> {
    Decoder::new(data).read_any()
}

/// Writes a slice as an array, encoding each element with `val_f`.
pub fn write_slice<W, T>(
    writer: &mut W,
    values: &[T],
    mut val_f: impl FnMut(&mut W, &T),
) -> Result<(), MsgPackError>
where
    W: Writer + ?Sized,
{
    writer.write_array_size(values.len() as u32);
    for item in values {
        val_f(writer, item);
    }
    writer.err()
}

/// Reads an array into a vector, decoding each element with `val_f`.
pub fn read_slice<'a, T>(
    decoder: &mut Decoder<'a>,
    mut val_f: impl FnMut(&mut Decoder<'a>) -> Result<T, MsgPackError>,
) -> Result<Vec<T>, MsgPackError> {
    let size = decoder.read_array_size()?;
    let mut values = Vec::with_capacity(size.min(4096) as usize);
    for _ in 0..size {
        values.push(val_f(decoder)?);
    }
    Ok(values)
}

/// Writes a map, encoding each key with `key_f` and each value with
/// `val_f`.
pub fn write_map<W, K, V>(
    writer: &mut W,
    map: &HashMap<K, V>,
    mut key_f: impl FnMut(&mut W, &K),
    mut val_f: impl FnMut(&mut W, &V),
) -> Result<(), MsgPackError>
where
    W: Writer + ?Sized,
{
    writer.write_map_size(map.len() as u32);
    for (key, val) in map {
        key_f(writer, key);
        val_f(writer, val);
    }
    writer.err()
}

/// Reads a map, decoding each key with `key_f` and each value with
/// `val_f`.
pub fn read_map<'a, K, V>(
    decoder: &mut Decoder<'a>,
    mut key_f: impl FnMut(&mut Decoder<'a>) -> Result<K, MsgPackError>,
    mut val_f: impl FnMut(&mut Decoder<'a>) -> Result<V, MsgPackError>,
) -> Result<HashMap<K, V>, MsgPackError>
where
    K: Eq + Hash,
{
    let size = decoder.read_map_size()?;
    let mut map = HashMap::with_capacity(size.min(4096) as usize);
    for _ in 0..size {
        let key = key_f(decoder)?;
        let val = val_f(decoder)?;
        map.insert(key, val);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_roundtrip() {
        let mut sizer = Sizer::new();
        let values = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        write_slice(&mut sizer, &values, |w, v| w.write_str(v)).unwrap();
        let mut buffer = vec![0u8; sizer.len() as usize];
        let mut encoder = Encoder::new(&mut buffer);
        write_slice(&mut encoder, &values, |w, v| w.write_str(v)).unwrap();
        assert_eq!(buffer, [0x93, 0xa1, b'a', 0xa1, b'b', 0xa1, b'c']);

        let mut decoder = Decoder::new(&buffer);
        let back = read_slice(&mut decoder, |d| d.read_str().map(str::to_string)).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn map_roundtrip() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1i64);
        map.insert("b".to_string(), 2i64);

        let mut sizer = Sizer::new();
        write_map(&mut sizer, &map, |w, k| w.write_str(k), |w, v| w.write_i64(*v)).unwrap();
        let mut buffer = vec![0u8; sizer.len() as usize];
        let mut encoder = Encoder::new(&mut buffer);
        write_map(&mut encoder, &map, |w, k| w.write_str(k), |w, v| w.write_i64(*v)).unwrap();

        let mut decoder = Decoder::new(&buffer);
        let back = read_map(
            &mut decoder,
            |d| d.read_str().map(str::to_string),
            |d| d.read_i64(),
        )
        .unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn marshal_then_decode_value() {
        let value = Value::Map(vec![(
            Value::Str("age".into()),
            Value::Int(30),
        )]);
        let bytes = marshal(&value).unwrap();
        assert_eq!(bytes, [0x81, 0xa3, b'a', b'g', b'e', 0x1e]);
        assert_eq!(decode_value(&bytes).unwrap(), value);
    }

    #[test]
    fn unmarshal_decodes_adapters() {
        struct Point {
            x: i32,
            y: i32,
            label: Option<String>,
        }

        impl Encode for Point {
            fn encode(&self, writer: &mut dyn Writer) -> Result<(), MsgPackError> {
                writer.write_array_size(3);
                writer.write_i32(self.x);
                writer.write_i32(self.y);
                writer.write_opt_str(self.label.as_deref());
                writer.err()
            }
        }

        impl Decode for Point {
            fn decode(decoder: &mut Decoder<'_>) -> Result<Self, MsgPackError> {
                let size = decoder.read_array_size()?;
                if size != 3 {
                    return Err(MsgPackError::BadValue("point"));
                }
                Ok(Point {
                    x: decoder.read_i32()?,
                    y: decoder.read_i32()?,
                    label: decoder.read_opt_str()?.map(str::to_string),
                })
            }
        }

        let point = Point {
            x: -5,
            y: 700,
            label: None,
        };
        let bytes = to_bytes(&point).unwrap();
        let back: Point = unmarshal(&bytes).unwrap();
        assert_eq!(back.x, -5);
        assert_eq!(back.y, 700);
        assert_eq!(back.label, None);

        let labeled = Point {
            label: Some("origin".into()),
            ..point
        };
        let bytes = to_bytes(&labeled).unwrap();
        let back: Point = unmarshal(&bytes).unwrap();
        assert_eq!(back.label.as_deref(), Some("origin"));
    }
}
