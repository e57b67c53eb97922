//! Navigation helpers over `serde_yaml::Value` trees.
//!
//! Missing or null intermediate nodes are created as empty mappings or
//! sequences. A node of the wrong shape is a template error.

use serde_yaml::{Mapping, Sequence, Value};
use topoc_common::error::{Result, TopocError};

/// Returns the mapping at `path`, creating missing levels.
pub(crate) fn mapping_at<'a>(
    node: &'a mut Value,
    template: &str,
    path: &[&str],
) -> Result<&'a mut Mapping> {
    let mut current = node;
    for (depth, key) in path.iter().enumerate() {
        let map = as_mapping(current, template, &path[..depth])?;
        current = map.entry(Value::from(*key)).or_insert(Value::Null);
    }
    as_mapping(current, template, path)
}

/// Returns the sequence at `path`, creating it if missing.
pub(crate) fn sequence_at<'a>(
    node: &'a mut Value,
    template: &str,
    path: &[&str],
) -> Result<&'a mut Sequence> {
    let Some((last, parents)) = path.split_last() else {
        return Err(TopocError::template(template, "empty sequence path"));
    };
    let parent = mapping_at(node, template, parents)?;
    let slot = parent.entry(Value::from(*last)).or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Sequence(Sequence::new());
    }
    match slot {
        Value::Sequence(seq) => Ok(seq),
        _ => Err(shape_error(template, path, "a sequence")),
    }
}

/// Returns the first element of a sequence found at `path`.
pub(crate) fn first_at<'a>(
    node: &'a mut Value,
    template: &str,
    path: &[&str],
) -> Result<&'a mut Value> {
    sequence_at(node, template, path)?
        .first_mut()
        .ok_or_else(|| shape_error(template, path, "a non-empty sequence"))
}

/// Inserts or overwrites `key`, keeping the position of an existing key.
pub(crate) fn put(map: &mut Mapping, key: &str, value: impl Into<Value>) {
    let _ = map.insert(Value::from(key), value.into());
}

fn as_mapping<'a>(node: &'a mut Value, template: &str, path: &[&str]) -> Result<&'a mut Mapping> {
    if node.is_null() {
        *node = Value::Mapping(Mapping::new());
    }
    match node {
        Value::Mapping(map) => Ok(map),
        _ => Err(shape_error(template, path, "a mapping")),
    }
}

fn shape_error(template: &str, path: &[&str], expected: &str) -> TopocError {
    TopocError::template(template, format!("expected {expected} at `{}`", path.join(".")))
}
