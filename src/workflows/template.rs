//! Config template resolution (spec §4.I step 4), grounded on
//! `original_source/narada/workflows/prefect.py`'s `resolve_templates`:
//! a string matching `{dotted.path}` is replaced with the stringified
//! value at that path in the context; a path that fails to resolve is
//! left untouched rather than raising. Applied recursively through
//! JSON objects and arrays.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::workflows::context::Context;

static TEMPLATE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([\w.]+)\}").expect("static regex is valid"));

/// Resolves every `{dotted.path}` placeholder in `config` against
/// `context`, recursing through objects and arrays. Non-string leaves
/// pass through unchanged.
pub fn resolve_templates(config: &JsonValue, context: &Context) -> JsonValue {
    match config {
        JsonValue::String(s) => JsonValue::String(resolve_string(s, context)),
        JsonValue::Object(map) => {
            JsonValue::Object(map.iter().map(|(k, v)| (k.clone(), resolve_templates(v, context))).collect())
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(|v| resolve_templates(v, context)).collect()),
        other => other.clone(),
    }
}

fn resolve_string(template: &str, context: &Context) -> String {
    // A template that is *entirely* one placeholder resolves in place
    // without stringify-then-restringify round-tripping; anything with
    // surrounding text or multiple placeholders is substituted textually.
    if let Some(captures) = TEMPLATE_PATTERN.captures(template) {
        if captures.get(0).map(|m| m.as_str()) == Some(template) {
            let path = &captures[1];
            return context.extract(path).unwrap_or_else(|| template.to_string());
        }
    }

    TEMPLATE_PATTERN
        .replace_all(template, |captures: &regex::Captures| {
            let path = &captures[1];
            context.extract(path).unwrap_or_else(|| captures[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn resolves_a_parameter_reference() {
        let mut parameters = HashMap::new();
        parameters.insert("playlist_id".to_string(), json!("abc123"));
        let ctx = Context::new(parameters);
        let resolved = resolve_templates(&json!("{parameters.playlist_id}"), &ctx);
        assert_eq!(resolved, json!("abc123"));
    }

    #[test]
    fn leaves_unresolved_tokens_verbatim() {
        let ctx = Context::new(HashMap::new());
        let resolved = resolve_templates(&json!("{parameters.missing}"), &ctx);
        assert_eq!(resolved, json!("{parameters.missing}"));
    }

    #[test]
    fn recurses_through_objects_and_arrays() {
        let mut parameters = HashMap::new();
        parameters.insert("count".to_string(), json!(5));
        let ctx = Context::new(parameters);
        let config = json!({ "limit": "{parameters.count}", "tags": ["{parameters.count}", "static"] });
        let resolved = resolve_templates(&config, &ctx);
        assert_eq!(resolved["limit"], json!("5"));
        assert_eq!(resolved["tags"][0], json!("5"));
        assert_eq!(resolved["tags"][1], json!("static"));
    }
}
