use thiserror::Error;
use wirepack_buffers::RangeError;

/// Error type for MessagePack encoding and decoding operations.
///
/// `Range` is latched by the underlying cursor: once an operation runs past
/// the end of the buffer, every later operation echoes it. The typed errors
/// do not latch; the caller may recover and keep reading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MsgPackError {
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("bad prefix for {0}")]
    BadPrefix(&'static str),
    #[error("bad value for {0}")]
    BadValue(&'static str),
    #[error("integer overflow: value = {value}; bits = {bits}")]
    Overflow { value: i128, bits: u8 },
    #[error("invalid time ext id = {0}")]
    InvalidTimeExtId(i8),
    #[error("invalid time ext len = {0}")]
    InvalidTimeExtLen(u32),
    #[error("invalid rfc 3339 timestamp: {0}")]
    TimeParse(String),
    #[error("invalid utf-8 in string payload")]
    InvalidUtf8,
}
