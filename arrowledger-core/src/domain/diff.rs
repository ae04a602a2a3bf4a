//! Field-level diff engine for audit annotations
//!
//! Pure helpers; never used for conflict resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single field's before/after values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub from: JsonValue,
    pub to: JsonValue,
}

/// Compute a shallow field-level diff between two JSON snapshots.
///
/// Emits an entry for every key present in `after` whose value differs from
/// `before` under strict inequality. A key missing from `before` compares as
/// JSON null. Keys only present in `before` are ignored, matching the
/// snapshot-based audit semantics: `after` is the authoritative shape.
pub fn diff_objects(before: &JsonValue, after: &JsonValue) -> BTreeMap<String, FieldChange> {
    let mut changes = BTreeMap::new();

    let after_map = match after.as_object() {
        Some(m) => m,
        None => return changes,
    };

    for (key, to) in after_map {
        let from = before.get(key).cloned().unwrap_or(JsonValue::Null);
        if &from != to {
            changes.insert(
                key.clone(),
                FieldChange {
                    from,
                    to: to.clone(),
                },
            );
        }
    }

    changes
}
