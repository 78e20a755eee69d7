//! Order-preserving key encoding and range predicates over encoded keys.

pub mod key;
pub mod key_range;

pub use key::{encode_row_key, encode_value, encode_values, Key};
pub use key_range::KeyRange;
