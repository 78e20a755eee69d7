//! # Big-Endian Key Encoding
//!
//! Byte-comparable key encoding for the index subsystem. Encoded keys
//! preserve value order under plain lexicographic byte comparison, so the
//! ordered index can compare keys with a single `memcmp` and range scans
//! need no type-specific logic.
//!
//! ## Type Prefix Scheme
//!
//! Each encoded value starts with a type prefix byte that fixes the sort
//! order between types:
//!
//! ```text
//! 0x01  NULL
//! 0x02  FALSE
//! 0x03  TRUE
//! 0x10  INT       (sign-flipped big-endian i64)
//! 0x11  FLOAT     (IEEE 754 bit-manipulated big-endian)
//! 0x18  DATETIME  (sign-flipped big-endian micros)
//! 0x20  TEXT      (escape-encoded, terminated)
//! 0x21  BYTES     (escape-encoded, terminated)
//! ```
//!
//! NULL sorts below everything, matching the NULLs-lowest rule of ORDER BY.
//!
//! ## Numeric Encoding
//!
//! Integers flip the sign bit (`i ^ i64::MIN`) and emit big-endian bytes,
//! mapping the signed order onto the unsigned byte order. Floats use the
//! usual IEEE trick: negative values invert all bits, non-negative values
//! flip the sign bit; this yields `-inf < ... < -0.0 == 0.0? < ... < +inf`
//! in byte order (negative zero encodes one below positive zero, which is
//! harmless for range semantics).
//!
//! A column declared `Number` may hold integer values; `encode_row_key`
//! coerces them to floats before encoding so one column never mixes the
//! two numeric encodings.
//!
//! ## Text / Bytes Encoding
//!
//! Variable-length values escape embedded terminator bytes:
//!
//! ```text
//! 0x00 -> 0x00 0xFF
//! 0xFF -> 0xFF 0x00
//! terminator: 0x00 0x00
//! ```
//!
//! Embedded NULs cannot terminate early, lexicographic order is preserved,
//! and in a composite key a shorter string sorts before its extensions.
//!
//! ## Composite Keys
//!
//! Multi-column keys are the concatenation of the component encodings;
//! the terminators make the concatenation order-correct.

use crate::error::type_mismatch;
use crate::row::Payload;
use crate::schema::ColumnDef;
use crate::types::{DataType, Value};
use eyre::Result;

pub type Key = Vec<u8>;

pub mod type_prefix {
    pub const NULL: u8 = 0x01;
    pub const FALSE: u8 = 0x02;
    pub const TRUE: u8 = 0x03;
    pub const INT: u8 = 0x10;
    pub const FLOAT: u8 = 0x11;
    pub const DATETIME: u8 = 0x18;
    pub const TEXT: u8 = 0x20;
    pub const BYTES: u8 = 0x21;
}

fn encode_escaped_to(bytes: &[u8], buf: &mut Key) {
    for &b in bytes {
        match b {
            0x00 => buf.extend_from_slice(&[0x00, 0xFF]),
            0xFF => buf.extend_from_slice(&[0xFF, 0x00]),
            _ => buf.push(b),
        }
    }
    buf.extend_from_slice(&[0x00, 0x00]);
}

fn encode_i64_to(prefix: u8, v: i64, buf: &mut Key) {
    buf.push(prefix);
    buf.extend_from_slice(&((v ^ i64::MIN) as u64).to_be_bytes());
}

fn encode_f64_to(v: f64, buf: &mut Key) {
    buf.push(type_prefix::FLOAT);
    let bits = v.to_bits();
    let ordered = if bits & (1 << 63) != 0 {
        !bits
    } else {
        bits ^ (1 << 63)
    };
    buf.extend_from_slice(&ordered.to_be_bytes());
}

pub fn encode_value_to(value: &Value, buf: &mut Key) {
    match value {
        Value::Null => buf.push(type_prefix::NULL),
        Value::Bool(false) => buf.push(type_prefix::FALSE),
        Value::Bool(true) => buf.push(type_prefix::TRUE),
        Value::Int(i) => encode_i64_to(type_prefix::INT, *i, buf),
        Value::Float(f) => encode_f64_to(*f, buf),
        Value::DateTime(t) => encode_i64_to(type_prefix::DATETIME, *t, buf),
        Value::Text(s) => {
            buf.push(type_prefix::TEXT);
            encode_escaped_to(s.as_bytes(), buf);
        }
        Value::Bytes(b) => {
            buf.push(type_prefix::BYTES);
            encode_escaped_to(b, buf);
        }
    }
}

/// Encodes a single value into a fresh key.
pub fn encode_value(value: &Value) -> Key {
    let mut buf = Key::new();
    encode_value_to(value, &mut buf);
    buf
}

/// Encodes a sequence of values as a composite key.
pub fn encode_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Key {
    let mut buf = Key::new();
    for value in values {
        encode_value_to(value, &mut buf);
    }
    buf
}

/// Coerces `value` to the column's declared type for encoding purposes.
/// The only real coercion is Int → Float on `Number` columns; anything
/// else that fails `accepts` is a TYPE error.
pub fn coerce_for_column(value: &Value, data_type: DataType) -> Result<Value> {
    if !data_type.accepts(value) {
        return Err(type_mismatch(format!(
            "value of type {} not valid for {} column",
            value.type_name(),
            data_type
        )));
    }
    match (data_type, value) {
        (DataType::Number, Value::Int(i)) => Ok(Value::Float(*i as f64)),
        _ => Ok(value.clone()),
    }
}

/// Encodes the key of `payload` over the given key columns. Missing
/// payload slots encode as NULL.
pub fn encode_row_key(columns: &[&ColumnDef], payload: &Payload) -> Result<Key> {
    let mut buf = Key::new();
    for col in columns {
        let value = payload.get(col.name()).unwrap_or(&Value::Null);
        let coerced = coerce_for_column(value, col.data_type())?;
        encode_value_to(&coerced, &mut buf);
    }
    Ok(buf)
}
