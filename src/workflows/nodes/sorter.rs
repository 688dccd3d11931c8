//! Sorter node factory (spec §4.H): builds a [`transforms::SortKey`]
//! based on `sort_by` and runs [`transforms::sort_by_attribute`].

use futures::future::BoxFuture;
use serde_json::json;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::transforms::{self, SortKey};
use crate::workflows::context::{Context, Value};
use crate::workflows::nodes::{config_object, optional_bool, primary_input, require_str};

fn node(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    let ctx = ctx.clone();
    let config = config.clone();
    Box::pin(async move { dispatch(ctx, config).await })
}

pub fn by_user_plays(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}
pub fn by_spotify_popularity(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}
pub fn by_metric(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}
pub fn by_date(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    node(ctx, config)
}

async fn dispatch(ctx: Context, config: Value) -> Result<Value> {
    let fields = config_object(&config)?;
    let input = primary_input(&ctx, fields)?;
    let reverse = optional_bool(fields, "reverse", false);

    let (key, provenance_name): (SortKey, String) = match require_str(fields, "sort_by")? {
        "by_user_plays" => (SortKey::Metric("lastfm_user_playcount".to_string()), "lastfm_user_playcount".to_string()),
        "by_spotify_popularity" => (SortKey::Metric("spotify_popularity".to_string()), "spotify_popularity".to_string()),
        "by_metric" => {
            let metric_name = require_str(fields, "metric_name")?.to_string();
            (SortKey::Metric(metric_name.clone()), metric_name)
        }
        "by_date" => (
            SortKey::Attribute(Arc::new(|t: &crate::domain::Track| t.release_date.map(|d| d.timestamp() as f64))),
            "release_date".to_string(),
        ),
        other => return Err(AppError::validation(format!("unknown sort_by '{other}'"))),
    };

    let result = transforms::sort_by_attribute(key, provenance_name, reverse)(input)?;
    Ok(Value::object([
        ("tracklist".to_string(), Value::TrackList(result.clone())),
        ("operation".to_string(), Value::Json(json!("sort"))),
        ("tracks_count".to_string(), Value::Json(json!(result.len()))),
    ]))
}
