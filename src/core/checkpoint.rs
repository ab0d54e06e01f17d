//! On-disk shape of a pipeline checkpoint.
//!
//! A checkpoint is a flat JSON object holding exactly [`PERSISTED_KEYS`].
//! Interactive `choices` never appear in it.

use crate::core::error::{CheckpointError, CheckpointResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type CheckpointMap = Map<String, Value>;

/// Opaque structured record (chapter overviews, transitions).
pub type Record = Map<String, Value>;

pub const PERSISTED_KEYS: [&str; 13] = [
    "expanded_plot",
    "chapters_overview",
    "chapters_full",
    "validation_text",
    "status_log",
    "next_chapter_index",
    "genre",
    "anpc",
    "plot",
    "num_chapters",
    "run_mode",
    "overview_validated",
    "pending_validation_index",
];

/// What to do with keys a checkpoint carries beyond [`PERSISTED_KEYS`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeyPolicy {
    /// Drop them with a warning.
    #[default]
    Lenient,
    /// Refuse the checkpoint.
    Strict,
}

/// Keys in `map` outside the persisted set, sorted.
pub fn unknown_keys(map: &CheckpointMap) -> Vec<String> {
    let mut keys: Vec<String> = map
        .keys()
        .filter(|k| !PERSISTED_KEYS.contains(&k.as_str()))
        .cloned()
        .collect();
    keys.sort();
    keys
}

pub fn encode(map: &CheckpointMap) -> serde_json::Result<String> {
    serde_json::to_string_pretty(map)
}

pub fn decode(bytes: &[u8]) -> CheckpointResult<CheckpointMap> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| CheckpointError::malformed("<document>", e))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CheckpointError::malformed(
            "<document>",
            format!("expected a JSON object, found {}", kind_of(&other)),
        )),
    }
}

/// Reads an optional field; absent and `null` both yield `None`.
pub(crate) fn optional<T: DeserializeOwned>(
    map: &CheckpointMap,
    key: &str,
) -> CheckpointResult<Option<T>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| CheckpointError::malformed(key, e)),
    }
}

/// Reads a defaulted field; `null` is rejected.
pub(crate) fn defaulted<T: DeserializeOwned + Default>(
    map: &CheckpointMap,
    key: &str,
) -> CheckpointResult<T> {
    match map.get(key) {
        None => Ok(T::default()),
        Some(Value::Null) => Err(CheckpointError::malformed(key, "null is not allowed here")),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| CheckpointError::malformed(key, e)),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
