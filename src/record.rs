// Record trait for collections persisted under a fixed key

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

/// Core trait that any stored record must implement
pub trait Record: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync + 'static {
    /// Unique identifier for this record within its collection
    fn id(&self) -> &str;

    /// Replace the identifier; only used to repair colliding stored ids
    fn set_id(&mut self, id: String);

    /// Substrate key the whole collection is stored under
    fn storage_key() -> &'static str
    where
        Self: Sized;
}

/// Encode a collection as a JSON array, preserving order
pub fn encode_collection<T: Record>(records: &[T]) -> Result<String> {
    serde_json::to_string(records).with_context(|| format!("Failed to serialize collection {}", T::storage_key()))
}

/// Decode a collection previously written by `encode_collection`
///
/// Older data may repeat an id (ids were once derived from the creation
/// millisecond). The first record keeps the id; later ones get a fresh one.
pub fn decode_collection<T: Record>(json: &str) -> Result<Vec<T>> {
    let mut records: Vec<T> = serde_json::from_str(json)
        .with_context(|| format!("Malformed JSON stored under {}", T::storage_key()))?;

    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut duplicates = Vec::new();
    for (pos, record) in records.iter().enumerate() {
        if !seen.insert(record.id().to_string()) {
            duplicates.push(pos);
        }
    }

    for pos in duplicates {
        let id = fresh_id_in(&seen);
        warn!(
            key = T::storage_key(),
            duplicate = records[pos].id(),
            new_id = %id,
            "Duplicate id in stored collection, assigning a fresh id"
        );
        seen.insert(id.clone());
        records[pos].set_id(id);
    }

    Ok(records)
}

/// Time-ordered id not already used by any of `existing`
pub fn fresh_id<T: Record>(existing: &[T]) -> String {
    loop {
        let id = Uuid::now_v7().to_string();
        if !existing.iter().any(|r| r.id() == id) {
            return id;
        }
    }
}

fn fresh_id_in(taken: &HashSet<String>) -> String {
    loop {
        let id = Uuid::now_v7().to_string();
        if !taken.contains(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestRecord {
        id: String,
        name: String,
    }

    impl Record for TestRecord {
        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn storage_key() -> &'static str {
            "@test/records"
        }
    }

    fn rec(id: &str, name: &str) -> TestRecord {
        TestRecord {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_record_trait_implementation() {
        let record = rec("test-1", "Test");
        assert_eq!(record.id(), "test-1");
        assert_eq!(TestRecord::storage_key(), "@test/records");
    }

    #[test]
    fn test_collection_preserves_order() {
        let records = vec![rec("b", "second"), rec("a", "first")];
        let json = encode_collection(&records).unwrap();
        assert!(json.starts_with('['));

        let decoded: Vec<TestRecord> = decode_collection(&json).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_decode_reassigns_duplicate_ids() {
        let json = r#"[{"id":"x","name":"one"},{"id":"x","name":"two"},{"id":"y","name":"three"}]"#;
        let decoded = decode_collection::<TestRecord>(json).unwrap();

        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0], rec("x", "one"));
        assert_eq!(decoded[1].name, "two");
        assert_ne!(decoded[1].id, "x");
        assert_ne!(decoded[1].id, "y");
        assert_eq!(decoded[2], rec("y", "three"));
    }

    #[test]
    fn test_fresh_id_avoids_existing() {
        let existing = vec![rec("a", "one"), rec("b", "two")];
        let id = fresh_id(&existing);
        assert!(existing.iter().all(|r| r.id != id));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(decode_collection::<TestRecord>("{not json").is_err());
        assert!(decode_collection::<TestRecord>(r#"{"id":"x"}"#).is_err());
    }

    #[test]
    fn test_decode_empty_collection() {
        let decoded: Vec<TestRecord> = decode_collection("[]").unwrap();
        assert!(decoded.is_empty());
    }
}
