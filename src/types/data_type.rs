//! Column data types.
//!
//! The type system is deliberately small: six storable types plus NULL
//! (which is a value, not a type). `DataType` drives payload validation,
//! key encoding, and the coercions the builder applies to literals.

use crate::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Number,
    /// UTF-8 string.
    Text,
    /// Boolean.
    Bool,
    /// Microseconds since the Unix epoch.
    DateTime,
    /// Opaque byte string.
    Bytes,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Number => "number",
            DataType::Text => "text",
            DataType::Bool => "bool",
            DataType::DateTime => "datetime",
            DataType::Bytes => "bytes",
        }
    }

    /// Whether `value` is storable in a column of this type. NULL is
    /// accepted here; nullability is a per-column constraint checked by the
    /// schema layer, not a property of the type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (DataType::Integer, Value::Int(_)) => true,
            (DataType::Number, Value::Float(_)) | (DataType::Number, Value::Int(_)) => true,
            (DataType::Text, Value::Text(_)) => true,
            (DataType::Bool, Value::Bool(_)) => true,
            (DataType::DateTime, Value::DateTime(_)) => true,
            (DataType::Bytes, Value::Bytes(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_values() {
        assert!(DataType::Integer.accepts(&Value::Int(7)));
        assert!(DataType::Number.accepts(&Value::Float(7.5)));
        assert!(DataType::Number.accepts(&Value::Int(7)));
        assert!(DataType::Text.accepts(&Value::Text("x".into())));
        assert!(DataType::Bool.accepts(&Value::Bool(true)));
        assert!(DataType::DateTime.accepts(&Value::DateTime(0)));
        assert!(DataType::Bytes.accepts(&Value::Bytes(vec![1])));
    }

    #[test]
    fn rejects_mismatched_values() {
        assert!(!DataType::Integer.accepts(&Value::Text("7".into())));
        assert!(!DataType::Text.accepts(&Value::Int(7)));
        assert!(!DataType::Bool.accepts(&Value::Int(1)));
    }

    #[test]
    fn null_accepted_by_every_type() {
        for dt in [
            DataType::Integer,
            DataType::Number,
            DataType::Text,
            DataType::Bool,
            DataType::DateTime,
            DataType::Bytes,
        ] {
            assert!(dt.accepts(&Value::Null), "{dt} must accept NULL");
        }
    }
}
