//! Filter node factory (spec §4.H): dispatches on `filter_type` to
//! construct and run the corresponding [`crate::transforms`] primitive.

use futures::future::BoxFuture;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::transforms;
use crate::workflows::context::{Context, Value};
use crate::workflows::nodes::{config_object, optional_bool, primary_input, require_str};

fn node(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    let ctx = ctx.clone();
    let config = config.clone();
    Box::pin(async move { dispatch(ctx, config).await })
}

pub fn deduplicate(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}
pub fn by_release_date(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}
pub fn by_tracks(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}
pub fn by_artists(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}
pub fn by_metric(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}

async fn dispatch(ctx: Context, config: Value) -> Result<Value> {
    let fields = config_object(&config)?;
    let input = primary_input(&ctx, fields)?;
    let original_count = input.len();

    let transform = match require_str(fields, "filter_type")? {
        "deduplicate" => transforms::filter_duplicates(),
        "by_release_date" => {
            let min_age_days = fields.get("min_age_days").and_then(serde_json::Value::as_i64);
            let max_age_days = fields.get("max_age_days").and_then(serde_json::Value::as_i64);
            transforms::filter_by_release_date(max_age_days, min_age_days)
        }
        "by_tracks" => {
            let exclusion_source = require_str(fields, "exclusion_source")?;
            let reference = ctx.tracklist_of(exclusion_source)?;
            transforms::exclude_tracks(reference.tracks)
        }
        "by_artists" => {
            let exclusion_source = require_str(fields, "exclusion_source")?;
            let reference = ctx.tracklist_of(exclusion_source)?;
            let all_artists = optional_bool(fields, "all_artists", false);
            transforms::exclude_artists(reference.tracks, all_artists)
        }
        "by_metric" => {
            let metric_name = require_str(fields, "metric_name")?;
            let min = fields.get("min").and_then(serde_json::Value::as_f64);
            let max = fields.get("max").and_then(serde_json::Value::as_f64);
            let include_missing = optional_bool(fields, "include_missing", false);
            transforms::filter_by_metric_range(metric_name, min, max, include_missing)
        }
        other => return Err(AppError::validation(format!("unknown filter_type '{other}'"))),
    };

    let result = transform(input)?;
    Ok(Value::object([
        ("tracklist".to_string(), Value::TrackList(result.clone())),
        ("operation".to_string(), Value::Json(json!("filter"))),
        ("tracks_count".to_string(), Value::Json(json!(result.len()))),
        ("removed_count".to_string(), Value::Json(json!(original_count.saturating_sub(result.len())))),
    ]))
}
