//! Streaming MessagePack codec with exact pre-sizing.
//!
//! Built for constrained runtimes: no reflection over user types, no
//! reallocation during encode. Schema-aware callers implement [`Encode`]
//! and [`Decode`] adapters over the typed read/write surface; a
//! value-oriented fallback ([`Value`], [`marshal`], [`decode_value`])
//! covers the rest.
//!
//! Encoding is two-pass: the adapter runs once against a [`Sizer`] to
//! learn the exact output length, then against an [`Encoder`] writing into
//! a buffer of that length. [`to_bytes`] packages the flow.

pub mod constants;

mod codec;
mod decoder;
mod encoder;
mod error;
mod helpers;
mod sizer;
mod value;

pub use codec::{Decode, Encode, Writer};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::MsgPackError;
pub use helpers::{
    decode_value, marshal, read_map, read_slice, to_bytes, unmarshal, write_map, write_slice,
};
pub use sizer::Sizer;
pub use value::Value;

pub use wirepack_buffers::RangeError;
