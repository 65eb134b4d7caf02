//! `basedOn` merge rules
//!
//! | field                          | rule                                  |
//! |--------------------------------|---------------------------------------|
//! | method, endpoint, expectedStatus | child overrides when present        |
//! | headers, query                 | shallow map merge, child wins         |
//! | save, fixtures                 | full replacement                      |
//! | payload                        | recursive object merge, arrays replaced |

use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::FixtureCall;

/// Recursively merges `child` over `parent`.
///
/// Objects merge key by key; any other pairing takes the child value whole,
/// so arrays are replaced rather than concatenated.
pub fn merge_json(parent: &Value, child: &Value) -> Value {
    match (parent, child) {
        (Value::Object(base), Value::Object(over)) => {
            let mut merged = base.clone();
            for (key, child_value) in over {
                let value = match base.get(key) {
                    Some(parent_value) => merge_json(parent_value, child_value),
                    None => child_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        _ => child.clone(),
    }
}

fn merge_maps<V: Clone>(
    parent: &Option<BTreeMap<String, V>>,
    child: &Option<BTreeMap<String, V>>,
) -> Option<BTreeMap<String, V>> {
    match (parent, child) {
        (Some(base), Some(over)) => {
            let mut merged = base.clone();
            merged.extend(over.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(merged)
        }
        (base, None) => base.clone(),
        (None, over) => over.clone(),
    }
}

fn merge_payload(parent: &Option<Value>, child: &Option<Value>) -> Option<Value> {
    match (parent, child) {
        (Some(base), Some(over)) => Some(merge_json(base, over)),
        (base, None) => base.clone(),
        (None, over) => over.clone(),
    }
}

impl FixtureCall {
    /// Produces the row obtained by applying `self` on top of `parent`.
    ///
    /// The result carries the child's name and no `basedOn`. Textual payloads
    /// must already be parsed by the caller for object merging to apply.
    pub fn merged_onto(&self, parent: &FixtureCall) -> FixtureCall {
        FixtureCall {
            name: self.name.clone(),
            based_on: None,
            method: self.method.clone().or_else(|| parent.method.clone()),
            endpoint: self.endpoint.clone().or_else(|| parent.endpoint.clone()),
            headers: merge_maps(&parent.headers, &self.headers),
            query: merge_maps(&parent.query, &self.query),
            payload: merge_payload(&parent.payload, &self.payload),
            expected_status: self
                .expected_status
                .clone()
                .or_else(|| parent.expected_status.clone()),
            save: self.save.clone().or_else(|| parent.save.clone()),
            fixtures: self.fixtures.clone().or_else(|| parent.fixtures.clone()),
        }
    }
}
