//! Rewrite applied to a record's serialized form right before it is sent to
//! the search index.
//!
//! The stored record is never touched: callers pass a serialized copy.

use serde_json::Value;

use crate::types::{DbId, JsonMap};

/// Field removed from indexed documents.
pub const STRIPPED_FIELD: &str = "keywords";

/// Derived field holding the number of contributors.
pub const CONTRIBUTORS_COUNT_FIELD: &str = "contributors_count";

/// Drop `keywords` and set `contributors_count`. Idempotent.
pub fn transform(doc: &mut JsonMap) {
    doc.remove(STRIPPED_FIELD);

    let count = doc
        .get("contributors")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    doc.insert(CONTRIBUTORS_COUNT_FIELD.to_string(), Value::from(count));
}

/// Serialize and transform in one step.
pub fn prepare_document(record: &JsonMap) -> JsonMap {
    let mut doc = record.clone();
    transform(&mut doc);
    doc
}

/// Concatenate every string leaf of the document as input for the
/// full-text vector.
pub fn searchable_text(doc: &JsonMap) -> String {
    let mut parts = Vec::new();
    for value in doc.values() {
        collect_strings(value, &mut parts);
    }
    parts.join(" ")
}

/// Owner recorded next to the document for permission filtering.
pub fn owner_of(doc: &JsonMap) -> Option<DbId> {
    doc.get("owner").and_then(Value::as_i64)
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}
