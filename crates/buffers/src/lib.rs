//! Fixed-buffer byte cursor shared by the wirepack codecs.

mod cursor;

pub use cursor::{Cursor, RangeError};
