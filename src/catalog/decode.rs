//! Lenient decoding of catalog collection payloads
//!
//! The reference-data service is expected to answer collection endpoints
//! with a JSON array, but broken deployments have answered with `null`,
//! bare objects, or error strings under a 200 status. Rather than failing
//! the whole refresh, a non-array payload decodes as an empty collection
//! and malformed array elements are skipped, so one bad record cannot
//! blank the catalog.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Result of leniently decoding one collection payload
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCollection<T> {
    /// Records that decoded cleanly, in payload order
    pub records: Vec<T>,
    /// Array elements that failed to decode and were dropped
    pub skipped: usize,
}

impl<T> DecodedCollection<T> {
    /// Empty collection, used for non-array payloads
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// Decode a collection payload, coercing anything that is not an array
/// to an empty collection
///
/// `endpoint` only labels log lines; it does not affect decoding.
pub fn decode_collection<T: DeserializeOwned>(
    payload: Value,
    endpoint: &str,
) -> DecodedCollection<T> {
    let elements = match payload {
        Value::Array(elements) => elements,
        other => {
            warn!(
                endpoint = endpoint,
                payload_type = json_type_name(&other),
                "expected array payload, treating as empty collection"
            );
            return DecodedCollection::empty();
        }
    };

    let total = elements.len();
    let mut records = Vec::with_capacity(total);
    let mut skipped = 0usize;

    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<T>(element) {
            Ok(record) => records.push(record),
            Err(error) => {
                skipped += 1;
                warn!(
                    endpoint = endpoint,
                    index = index,
                    error = %error,
                    "skipping malformed collection element"
                );
            }
        }
    }

    if skipped > 0 {
        warn!(
            endpoint = endpoint,
            skipped = skipped,
            total = total,
            "collection decoded with malformed elements dropped"
        );
    }

    DecodedCollection { records, skipped }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Group, Item};
    use serde_json::json;

    #[test]
    fn test_array_payload_decodes_in_order() {
        let payload = json!([
            {"id": 1, "name": "Продажи"},
            {"id": 2, "name": "Аренда", "parent_group_id": 1}
        ]);
        let decoded: DecodedCollection<Group> = decode_collection(payload, "groups");
        assert_eq!(decoded.skipped, 0);
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].name, "Продажи");
        assert_eq!(decoded.records[1].parent_group_id, Some(1));
    }

    #[test]
    fn test_null_payload_coerces_to_empty() {
        let decoded: DecodedCollection<Group> = decode_collection(json!(null), "groups");
        assert!(decoded.records.is_empty());
        assert_eq!(decoded.skipped, 0);
    }

    #[test]
    fn test_object_payload_coerces_to_empty() {
        let payload = json!({"error": "internal failure"});
        let decoded: DecodedCollection<Item> = decode_collection(payload, "items");
        assert!(decoded.records.is_empty());
    }

    #[test]
    fn test_string_and_number_payloads_coerce_to_empty() {
        let from_string: DecodedCollection<Item> =
            decode_collection(json!("service offline"), "items");
        assert!(from_string.records.is_empty());

        let from_number: DecodedCollection<Item> = decode_collection(json!(42), "items");
        assert!(from_number.records.is_empty());
    }

    #[test]
    fn test_malformed_elements_are_skipped_not_fatal() {
        let payload = json!([
            {"id": 1, "name": "Аренда"},
            {"id": "not-a-number", "name": "broken"},
            {"name": "missing id"},
            {"id": 3, "name": "Опт", "group_id": 1}
        ]);
        let decoded: DecodedCollection<Item> = decode_collection(payload, "items");
        assert_eq!(decoded.skipped, 2);
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].id, 1);
        assert_eq!(decoded.records[1].id, 3);
    }

    #[test]
    fn test_empty_array_decodes_to_empty() {
        let decoded: DecodedCollection<Group> = decode_collection(json!([]), "groups");
        assert!(decoded.records.is_empty());
        assert_eq!(decoded.skipped, 0);
    }
}
