//! Metadata entry codec.
//!
//! The `__metadata__` entry is an ordinary payload so it can travel the
//! adapter's `scan`/`write` surface: a `version` slot plus one
//! `hw:<table>` slot per table carrying the row-id high-water mark.

use crate::row::{Payload, RowId};
use crate::types::Value;
use hashbrown::HashMap;

pub const METADATA_ROW_ID: RowId = 0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreMetadata {
    pub version: u32,
    pub high_water: HashMap<String, RowId>,
}

pub fn encode_metadata(meta: &StoreMetadata) -> Payload {
    let mut payload = Payload::new();
    payload.insert("version".to_string(), Value::Int(meta.version as i64));
    for (table, mark) in &meta.high_water {
        payload.insert(format!("hw:{table}"), Value::Int(*mark as i64));
    }
    payload
}

pub fn decode_metadata(payload: &Payload) -> StoreMetadata {
    let version = match payload.get("version") {
        Some(Value::Int(v)) => *v as u32,
        _ => 0,
    };
    let mut high_water = HashMap::new();
    for (slot, value) in payload {
        if let (Some(table), Value::Int(mark)) = (slot.strip_prefix("hw:"), value) {
            high_water.insert(table.to_string(), *mark as RowId);
        }
    }
    StoreMetadata {
        version,
        high_water,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_survives_the_payload_codec() {
        let mut meta = StoreMetadata {
            version: 3,
            high_water: HashMap::new(),
        };
        meta.high_water.insert("users".into(), 42);
        meta.high_water.insert("orders".into(), 7);

        let decoded = decode_metadata(&encode_metadata(&meta));
        assert_eq!(decoded, meta);
    }

    #[test]
    fn missing_slots_decode_to_defaults() {
        let decoded = decode_metadata(&Payload::new());
        assert_eq!(decoded.version, 0);
        assert!(decoded.high_water.is_empty());
    }
}
