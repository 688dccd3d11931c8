//! Selector node factory (spec §4.H): runs [`transforms::select_by_method`].

use futures::future::BoxFuture;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::transforms::{self, SelectionMethod};
use crate::workflows::context::{Context, Value};
use crate::workflows::nodes::{config_object, optional_str, primary_input, require_i64};

pub fn limit_tracks(ctx: &Context, config: &Value) -> BoxFuture<'static, Result<Value>> {
    let ctx = ctx.clone();
    let config = config.clone();
    Box::pin(async move { dispatch(ctx, config).await })
}

async fn dispatch(ctx: Context, config: Value) -> Result<Value> {
    let fields = config_object(&config)?;
    let input = primary_input(&ctx, fields)?;
    let count = require_i64(fields, "count")?;
    if count < 0 {
        return Err(AppError::validation("selector.limit_tracks 'count' must not be negative"));
    }
    let method = match optional_str(fields, "method").unwrap_or("first") {
        "first" => SelectionMethod::First,
        "last" => SelectionMethod::Last,
        "random" => SelectionMethod::Random,
        other => return Err(AppError::validation(format!("unknown selection method '{other}'"))),
    };

    let result = transforms::select_by_method(count as usize, method)(input)?;
    Ok(Value::object([
        ("tracklist".to_string(), Value::TrackList(result.clone())),
        ("operation".to_string(), Value::Json(json!("select"))),
        ("tracks_count".to_string(), Value::Json(json!(result.len()))),
    ]))
}
