//! Structural change detection and merging for settings documents.
//!
//! Comparison is structural: two objects with the same members in a different
//! order are equal. Keys missing from the newer side are never reported as
//! removals, because a merge never deletes.

use crate::settings::redact::{display_value, is_sensitive_path};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One changed leaf, keyed by its dot-separated path in a [`ChangeSet`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    /// Previous value; `None` when the key was added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    pub new: Value,
}

impl Change {
    #[must_use]
    pub fn is_addition(&self) -> bool {
        self.old.is_none()
    }
}

/// Map of dot-separated key path to the change observed at that path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeMap<String, Change>);

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Change> {
        self.0.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Human-readable lines with sensitive values redacted.
    #[must_use]
    pub fn report(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(path, change)| {
                let sensitive = is_sensitive_path(path);
                let new = display_value(&change.new, sensitive);
                match &change.old {
                    Some(old) => format!("{path}: {} -> {new}", display_value(old, sensitive)),
                    None => format!("{path}: added {new}"),
                }
            })
            .collect()
    }
}

/// Compare `before` against `after`.
#[must_use]
pub fn diff(before: &Map<String, Value>, after: &Map<String, Value>) -> ChangeSet {
    let mut changes = BTreeMap::new();
    diff_into("", before, after, &mut changes);
    ChangeSet(changes)
}

fn diff_into(
    prefix: &str,
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    out: &mut BTreeMap<String, Change>,
) {
    for (key, new) in after {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match before.get(key) {
            None => {
                out.insert(
                    path,
                    Change {
                        old: None,
                        new: new.clone(),
                    },
                );
            }
            Some(Value::Object(old_map)) if new.is_object() => {
                if let Value::Object(new_map) = new {
                    diff_into(&path, old_map, new_map, out);
                }
            }
            Some(old) if old != new => {
                out.insert(
                    path,
                    Change {
                        old: Some(old.clone()),
                        new: new.clone(),
                    },
                );
            }
            Some(_) => {}
        }
    }
}

/// Merge `partial` over `base`. Nested objects merge per leaf; every other
/// value (arrays included) is replaced. Nothing is ever removed from `base`.
pub fn merge(base: &mut Map<String, Value>, partial: &Map<String, Value>) {
    for (key, incoming) in partial {
        if let (Some(Value::Object(existing)), Value::Object(incoming_map)) =
            (base.get_mut(key), incoming)
        {
            merge(existing, incoming_map);
            continue;
        }
        base.insert(key.clone(), incoming.clone());
    }
}
