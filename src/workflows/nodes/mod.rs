//! Node factories (spec §4.H), one module per category. Every node
//! function has the shape `fn(&Context, &Value) -> BoxFuture<'static, Result<Value>>`
//! required by [`registry::NodeFn`]: a thin synchronous wrapper clones
//! its two borrowed arguments and hands them to an `async` inner
//! function, since a bare `fn` pointer cannot close over captured
//! state the way a closure could.

pub mod combiner;
pub mod destination;
pub mod enricher;
pub mod filter;
pub mod registry;
pub mod selector;
pub mod sorter;
pub mod source;

use serde_json::Value as JsonValue;

use crate::domain::TrackList;
use crate::error::{AppError, Result};
use crate::workflows::context::{Context, Value};

/// Every node config arrives as `Value::Json(JsonValue::Object(_))`
/// (the engine resolves templates against raw JSON before dispatch).
pub(crate) fn config_object(config: &Value) -> Result<&serde_json::Map<String, JsonValue>> {
    config
        .as_json()
        .and_then(JsonValue::as_object)
        .ok_or_else(|| AppError::validation("node config must be a JSON object"))
}

pub(crate) fn require_str<'a>(config: &'a serde_json::Map<String, JsonValue>, field: &str) -> Result<&'a str> {
    config
        .get(field)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| AppError::validation(format!("config field '{field}' must be a string")))
}

pub(crate) fn optional_str<'a>(config: &'a serde_json::Map<String, JsonValue>, field: &str) -> Option<&'a str> {
    config.get(field).and_then(JsonValue::as_str)
}

pub(crate) fn optional_i64(config: &serde_json::Map<String, JsonValue>, field: &str) -> Option<i64> {
    config.get(field).and_then(JsonValue::as_i64)
}

pub(crate) fn require_i64(config: &serde_json::Map<String, JsonValue>, field: &str) -> Result<i64> {
    config
        .get(field)
        .and_then(JsonValue::as_i64)
        .ok_or_else(|| AppError::validation(format!("config field '{field}' must be an integer")))
}

pub(crate) fn optional_bool(config: &serde_json::Map<String, JsonValue>, field: &str, default: bool) -> bool {
    config.get(field).and_then(JsonValue::as_bool).unwrap_or(default)
}

pub(crate) fn str_array(config: &serde_json::Map<String, JsonValue>, field: &str) -> Vec<String> {
    config
        .get(field)
        .and_then(JsonValue::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Resolves a node's primary upstream tracklist. The engine stamps the
/// task's declared `upstream` ids into `config["_upstream"]` before
/// dispatch; a node may instead name an explicit `input` task id when
/// it has more than one upstream dependency and needs to disambiguate.
pub(crate) fn primary_input(ctx: &Context, config: &serde_json::Map<String, JsonValue>) -> Result<TrackList> {
    if let Some(input) = optional_str(config, "input") {
        return ctx.tracklist_of(input);
    }
    let upstream = config
        .get("_upstream")
        .and_then(JsonValue::as_array)
        .and_then(|ids| ids.first())
        .and_then(JsonValue::as_str)
        .ok_or_else(|| AppError::validation("node has no upstream task to read a tracklist from"))?;
    ctx.tracklist_of(upstream)
}
