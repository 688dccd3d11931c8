//! The engine's accumulating, immutable task-result store (spec §4.H/§4.I),
//! grounded on `original_source/narada/workflows/node_context.py`.
//!
//! Python nodes pass around an untyped dict; [`Value`] is the typed
//! stand-in a node's config and output both speak, and [`Context`] is
//! the accumulating `task_id -> Value` map threaded through the engine.
//! Nodes never mutate a `Context` — each step produces a new one via
//! [`Context::with_result`].

use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::domain::TrackList;
use crate::error::{AppError, Result};

/// A node's config input or output value. Python's dynamically-typed
/// dict entries map onto this enum's four cases: JSON leaves and
/// objects, a bare tracklist (source/filter/sorter/selector/combiner
/// nodes pass these directly rather than wrapping them in JSON), or
/// nothing at all.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Json(JsonValue),
    TrackList(TrackList),
    Object(HashMap<String, Value>),
}

impl Value {
    pub fn object(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Object(entries.into_iter().collect())
    }

    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_tracklist(&self) -> Option<&TrackList> {
        match self {
            Value::TrackList(tl) => Some(tl),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Stringifies a scalar the way template resolution needs
    /// (`resolve_templates` substitutes strings, never structured
    /// values, into `{dotted.path}` placeholders).
    pub fn as_display_string(&self) -> Option<String> {
        match self {
            Value::Json(JsonValue::String(s)) => Some(s.clone()),
            Value::Json(other) => Some(other.to_string()),
            _ => None,
        }
    }

    /// Looks up `path` (dot-separated) inside this value, descending
    /// through `Object` and `Json` object/array layers. Returns an
    /// owned value since a `Json` hop requires cloning out of the tree.
    pub fn get_path(&self, path: &str) -> Option<Value> {
        let mut current = self.clone();
        for segment in path.split('.') {
            current = match current {
                Value::Object(mut map) => map.remove(segment)?,
                Value::Json(json) => Value::Json(json_get(&json, segment)?.clone()),
                _ => return None,
            };
        }
        Some(current)
    }
}

fn json_get<'a>(value: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    match value {
        JsonValue::Object(map) => map.get(key),
        JsonValue::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Stringifies a JSON value for template substitution: a string stays
/// bare, anything else is serialized.
fn display_json(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Accumulated results of a workflow run, keyed by task id (and, when a
/// task names a `result_key`, also under that alias). Immutable by
/// convention: the engine replaces its `Context` each step rather than
/// mutating one in place.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub parameters: HashMap<String, JsonValue>,
    results: HashMap<String, Value>,
}

impl Context {
    pub fn new(parameters: HashMap<String, JsonValue>) -> Self {
        Self { parameters, results: HashMap::new() }
    }

    /// Returns a new `Context` with `task_id` (and `result_key`, if
    /// given) bound to `value`. Never mutates `self`.
    pub fn with_result(&self, task_id: &str, result_key: Option<&str>, value: Value) -> Self {
        let mut next = self.clone();
        next.results.insert(task_id.to_string(), value.clone());
        if let Some(alias) = result_key {
            next.results.insert(alias.to_string(), value);
        }
        next
    }

    pub fn task_result(&self, task_id: &str) -> Option<&Value> {
        self.results.get(task_id)
    }

    /// Resolves a `{dotted.path}` reference against `parameters` first
    /// task results second, matching the source's context lookup order.
    pub fn extract(&self, path: &str) -> Option<String> {
        let mut segments = path.splitn(2, '.');
        let head = segments.next()?;
        let rest = segments.next();

        if head == "parameters" {
            let param_key = rest?;
            return self.parameters.get(param_key).map(display_json);
        }

        let task_value = self.results.get(head)?;
        match rest {
            None => task_value.as_display_string(),
            Some(rest) => task_value.get_path(rest).and_then(Value::as_display_string),
        }
    }

    /// Extracts the `"tracklist"` field from `task_id`'s output,
    /// erroring (not panicking) when the task is unknown or carried no
    /// tracklist — the shape every enricher/filter/sorter/selector node
    /// expects from its upstream dependency.
    pub fn tracklist_of(&self, task_id: &str) -> Result<TrackList> {
        let value = self
            .results
            .get(task_id)
            .ok_or_else(|| AppError::dependency(task_id, format!("unknown upstream task '{task_id}'")))?;
        match value {
            Value::TrackList(tl) => Ok(tl.clone()),
            Value::Object(map) => match map.get("tracklist") {
                Some(Value::TrackList(tl)) => Ok(tl.clone()),
                _ => Err(AppError::dependency(task_id, "upstream task produced no tracklist")),
            },
            _ => Err(AppError::dependency(task_id, "upstream task produced no tracklist")),
        }
    }

    /// Resolves every task id in `task_ids` to its tracklist, in order
    /// — the shape combiner nodes need for `exclusion_source` lists and
    /// `concatenate`/`interleave`.
    pub fn collect_tracklists(&self, task_ids: &[String]) -> Result<Vec<TrackList>> {
        task_ids.iter().map(|id| self.tracklist_of(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Artist, Track};

    #[test]
    fn with_result_does_not_mutate_the_original() {
        let ctx = Context::new(HashMap::new());
        let next = ctx.with_result("t1", None, Value::Json(JsonValue::from(1)));
        assert!(ctx.task_result("t1").is_none());
        assert!(next.task_result("t1").is_some());
    }

    #[test]
    fn result_key_aliases_the_same_value() {
        let ctx = Context::new(HashMap::new());
        let next = ctx.with_result("t1", Some("alias"), Value::Json(JsonValue::from(7)));
        assert!(next.task_result("alias").is_some());
    }

    #[test]
    fn tracklist_of_errors_on_unknown_task() {
        let ctx = Context::new(HashMap::new());
        assert!(ctx.tracklist_of("missing").is_err());
    }

    #[test]
    fn tracklist_of_reads_the_object_field() {
        let track = Track::new("Title", vec![Artist::new("Artist").unwrap()]).unwrap();
        let tl = TrackList::new(vec![track]);
        let ctx = Context::new(HashMap::new()).with_result(
            "t1",
            None,
            Value::object([("tracklist".to_string(), Value::TrackList(tl))]),
        );
        assert_eq!(ctx.tracklist_of("t1").unwrap().len(), 1);
    }

    #[test]
    fn extract_resolves_parameters_before_task_results() {
        let mut parameters = HashMap::new();
        parameters.insert("user_id".to_string(), JsonValue::from("abc"));
        let ctx = Context::new(parameters);
        assert_eq!(ctx.extract("parameters.user_id"), Some("abc".to_string()));
    }
}
