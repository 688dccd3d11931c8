//! Combiner node factory (spec §4.H): reads several upstream
//! tracklists named in `sources` (a combiner has no single primary
//! input the way every other category does) and merges them via
//! [`transforms::concatenate`]/[`transforms::interleave`].

use futures::future::BoxFuture;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::transforms;
use crate::workflows::context::{Context, Value};
use crate::workflows::nodes::{config_object, optional_bool, str_array};

fn node(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    let ctx = ctx.clone();
    let config = config.clone();
    Box::pin(async move { dispatch(ctx, config).await })
}

pub fn merge_playlists(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}
pub fn concatenate_playlists(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}
pub fn interleave_playlists(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}

fn sources(ctx: &Context, fields: &serde_json::Map<String, serde_json::Value>) -> Result<Vec<crate::domain::TrackList>> {
    let task_ids = {
        let ids = str_array(fields, "sources");
        if !ids.is_empty() {
            ids
        } else {
            fields
                .get("_upstream")
                .and_then(serde_json::Value::as_array)
                .map(|ids| ids.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default()
        }
    };
    if task_ids.is_empty() {
        return Err(AppError::validation("combiner node requires a non-empty 'sources' list or upstream tasks"));
    }
    ctx.collect_tracklists(&task_ids)
}

async fn dispatch(ctx: Context, config: Value) -> Result<Value> {
    let fields = config_object(&config)?;
    let operation = fields
        .get("combiner_type")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| AppError::validation("config field 'combiner_type' must be a string"))?;

    let tracklists = sources(&ctx, fields)?;
    let source_count = tracklists.len();

    let result = match operation {
        "merge" => {
            let combined = transforms::concatenate(tracklists)?;
            transforms::filter_duplicates()(combined)?
        }
        "concatenate" => transforms::concatenate(tracklists)?,
        "interleave" => {
            let stop_on_empty = optional_bool(fields, "stop_on_empty", false);
            transforms::interleave(tracklists, stop_on_empty)?
        }
        other => return Err(AppError::validation(format!("unknown combiner_type '{other}'"))),
    };

    Ok(Value::object([
        ("tracklist".to_string(), Value::TrackList(result.clone())),
        ("operation".to_string(), Value::Json(json!("combine"))),
        ("tracks_count".to_string(), Value::Json(json!(result.len()))),
        ("source_count".to_string(), Value::Json(json!(source_count))),
    ]))
}
