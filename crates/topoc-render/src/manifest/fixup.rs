//! Structural normalization applied to every manifest document before
//! serialization.
//!
//! - `command` and `args` written as a list literal string (`"['run']"`)
//!   become real sequences.
//! - Numbers under a `value` key become strings; orchestrators reject
//!   numeric environment values.
//!
//! Normalization is idempotent.

use serde_yaml::{Sequence, Value};

/// Normalizes `node` and everything below it in place.
pub fn normalize(node: &mut Value) {
    match node {
        Value::Mapping(map) => {
            for (key, child) in map.iter_mut() {
                match key.as_str() {
                    Some("value") => stringify_number(child),
                    Some("command" | "args") => expand_list_literal(child),
                    _ => {}
                }
                normalize(child);
            }
        }
        Value::Sequence(seq) => seq.iter_mut().for_each(normalize),
        Value::Tagged(tagged) => normalize(&mut tagged.value),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

fn stringify_number(node: &mut Value) {
    if let Value::Number(n) = node {
        *node = Value::String(n.to_string());
    }
}

fn expand_list_literal(node: &mut Value) {
    let Value::String(text) = node else {
        return;
    };
    let trimmed = text.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return;
    }
    match serde_yaml::from_str::<Sequence>(trimmed) {
        Ok(items) => {
            *node = Value::Sequence(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Number(n) => Value::String(n.to_string()),
                        other => other,
                    })
                    .collect(),
            );
        }
        Err(e) => tracing::debug!(error = %e, "leaving unparsable list literal as text"),
    }
}
