//! String transcoding between host text and bytes in linear memory.

mod utf8;

pub use utf8::{encode_string, Utf8Decoder};
