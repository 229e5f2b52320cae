//! [`Value`] — the closed sum type behind `write_any` and `read_any`.

use chrono::{DateTime, Utc};

/// A MessagePack value for the reflective fallback paths.
///
/// This is the whole domain of the value-oriented interface: schema-aware
/// callers go through the typed reads and writes instead. Map keys may be any
/// `Value`; pairs keep their wire order and no key hashing is imposed.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    /// Signed integer, also produced for any decoded integer that fits i64.
    Int(i64),
    /// Unsigned integer above `i64::MAX`.
    UInt(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    /// Absolute instant, carried as the timestamp extension on the wire.
    Time(DateTime<Utc>),
    Array(Vec<Value>),
    /// Key-value pairs in wire order.
    Map(Vec<(Value, Value)>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        if v <= i64::MAX as u64 {
            Value::Int(v as i64)
        } else {
            Value::UInt(v)
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bin(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bin(v.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(
                obj.into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Nil => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::json!(i),
            Value::UInt(u) => serde_json::json!(u),
            Value::F32(f) => serde_json::json!(f),
            Value::F64(f) => serde_json::json!(f),
            Value::Str(s) => serde_json::Value::String(s),
            Value::Bin(b) => {
                serde_json::Value::Array(b.into_iter().map(|x| serde_json::json!(x)).collect())
            }
            Value::Time(t) => serde_json::Value::String(t.to_rfc3339()),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(pairs) => serde_json::Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| {
                        let key = match k {
                            Value::Str(s) => s,
                            other => serde_json::Value::from(other).to_string(),
                        };
                        (key, serde_json::Value::from(v))
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_scalars() {
        assert_eq!(Value::from(json!(null)), Value::Nil);
        assert_eq!(Value::from(json!(true)), Value::Bool(true));
        assert_eq!(Value::from(json!(123)), Value::Int(123));
        assert_eq!(Value::from(json!(-7)), Value::Int(-7));
        assert_eq!(Value::from(json!(18446744073709551615u64)), Value::UInt(u64::MAX));
        assert_eq!(Value::from(json!(1.5)), Value::F64(1.5));
        assert_eq!(Value::from(json!("hi")), Value::Str("hi".into()));
    }

    #[test]
    fn from_json_containers() {
        let v = Value::from(json!({"a": [1, null, "x"]}));
        assert_eq!(
            v,
            Value::Map(vec![(
                Value::Str("a".into()),
                Value::Array(vec![
                    Value::Int(1),
                    Value::Nil,
                    Value::Str("x".into()),
                ]),
            )])
        );
    }

    #[test]
    fn into_json_roundtrip() {
        let cases = vec![
            json!(null),
            json!(true),
            json!(42),
            json!(-42),
            json!(1.25),
            json!("hello"),
            json!([1, 2, 3]),
            json!({"k": {"nested": [true, null]}}),
        ];
        for case in cases {
            let back: serde_json::Value = Value::from(case.clone()).into();
            assert_eq!(back, case);
        }
    }

    #[test]
    fn bin_becomes_number_array() {
        let json: serde_json::Value = Value::Bin(vec![1, 2, 255]).into();
        assert_eq!(json, json!([1, 2, 255]));
    }

    #[test]
    fn scalar_from_impls() {
        assert_eq!(Value::from(5i64), Value::Int(5));
        assert_eq!(Value::from(5u64), Value::Int(5));
        assert_eq!(Value::from(u64::MAX), Value::UInt(u64::MAX));
        assert_eq!(Value::from("s"), Value::Str("s".into()));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bin(vec![1, 2]));
    }
}
