//! The workflow engine (spec §4.I step 4): walks a [`WorkflowDefinition`]
//! in topological order, resolving each task's config templates and its
//! upstream tracklist reference before dispatching to the registered
//! node, retrying transient node failures, and accumulating results in
//! a [`Context`].

use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::time::Duration;

use crate::batch::retry::{retry_with_backoff, RetryConfig};
use crate::error::Result;
use crate::workflows::context::{Context, Value};
use crate::workflows::definition::WorkflowDefinition;
use crate::workflows::nodes::registry::get_node;
use crate::workflows::template::resolve_templates;

/// Engine-level retry budget for a single node invocation (spec §4.I:
/// "3 attempts, 30s apart"). Exponential backoff collapses to a flat
/// 30s wait since `base_delay == max_delay`.
fn node_retry_config() -> RetryConfig {
    RetryConfig {
        retry_count: 2,
        base_delay: Duration::from_secs(30),
        max_delay: Duration::from_secs(30),
    }
}

/// `{event_type, workflow_id, task_id, ...}` progress event emitted at
/// each workflow/task boundary, the workflow-scoped analogue of
/// [`crate::batch::processor::ProgressEvent`].
#[derive(Debug, Clone)]
pub struct WorkflowEvent {
    pub event_type: &'static str,
    pub workflow_id: String,
    pub task_id: Option<String>,
    pub error: Option<String>,
}

impl WorkflowEvent {
    pub fn to_json(&self) -> JsonValue {
        json!({
            "event_type": self.event_type,
            "workflow_id": self.workflow_id,
            "task_id": self.task_id,
            "error": self.error,
        })
    }
}

pub struct Engine;

impl Engine {
    /// Runs every task in `definition` in dependency order, returning
    /// the final [`Context`]. `parameters` seeds `{parameters.X}`
    /// template references. `on_event` is invoked synchronously at
    /// `workflow_started`/`task_started`/`task_completed`/`task_failed`/
    /// `workflow_completed`.
    pub async fn run(
        definition: &WorkflowDefinition,
        parameters: HashMap<String, JsonValue>,
        mut on_event: Option<&mut dyn FnMut(WorkflowEvent)>,
    ) -> Result<Context> {
        let order = definition.execution_order()?;
        let mut ctx = Context::new(parameters);

        emit(&mut on_event, WorkflowEvent { event_type: "workflow_started", workflow_id: definition.id.clone(), task_id: None, error: None });

        for task in order {
            emit(
                &mut on_event,
                WorkflowEvent { event_type: "task_started", workflow_id: definition.id.clone(), task_id: Some(task.id.clone()), error: None },
            );

            let mut resolved = resolve_templates(&task.config, &ctx);
            stamp_upstream(&mut resolved, &task.upstream);
            let config = Value::Json(resolved);

            let (node_fn, _metadata) = match get_node(&task.node_type) {
                Ok(found) => found,
                Err(err) => {
                    emit(
                        &mut on_event,
                        WorkflowEvent {
                            event_type: "task_failed",
                            workflow_id: definition.id.clone(),
                            task_id: Some(task.id.clone()),
                            error: Some(err.to_string()),
                        },
                    );
                    return Err(err);
                }
            };

            let task_id_for_retry = task.id.clone();
            let result = retry_with_backoff(node_retry_config(), &task_id_for_retry, || {
                let ctx = ctx.clone();
                let config = config.clone();
                async move { node_fn(&ctx, &config).await }
            })
            .await;

            let value = match result {
                Ok(value) => value,
                Err(err) => {
                    emit(
                        &mut on_event,
                        WorkflowEvent {
                            event_type: "task_failed",
                            workflow_id: definition.id.clone(),
                            task_id: Some(task.id.clone()),
                            error: Some(err.to_string()),
                        },
                    );
                    return Err(err);
                }
            };

            ctx = ctx.with_result(&task.id, task.result_key.as_deref(), value);
            emit(
                &mut on_event,
                WorkflowEvent { event_type: "task_completed", workflow_id: definition.id.clone(), task_id: Some(task.id.clone()), error: None },
            );
        }

        emit(&mut on_event, WorkflowEvent { event_type: "workflow_completed", workflow_id: definition.id.clone(), task_id: None, error: None });
        Ok(ctx)
    }
}

fn emit(on_event: &mut Option<&mut dyn FnMut(WorkflowEvent)>, event: WorkflowEvent) {
    if let Some(on_event) = on_event.as_deref_mut() {
        on_event(event);
    }
}

/// Stamps the task's declared `upstream` ids into `config["_upstream"]`
/// so [`crate::workflows::nodes::primary_input`] can resolve a node's
/// default tracklist without the node itself knowing its own task id.
fn stamp_upstream(config: &mut JsonValue, upstream: &[String]) {
    if !config.is_object() {
        *config = json!({});
    }
    let ids: Vec<JsonValue> = upstream.iter().map(|id| json!(id)).collect();
    config.as_object_mut().expect("just coerced to an object").insert("_upstream".to_string(), JsonValue::Array(ids));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::definition::TaskDefinition;

    fn task(id: &str, node_type: &str, upstream: &[&str]) -> TaskDefinition {
        TaskDefinition {
            id: id.to_string(),
            node_type: node_type.to_string(),
            config: json!({}),
            upstream: upstream.iter().map(|s| s.to_string()).collect(),
            result_key: None,
        }
    }

    #[test]
    fn stamp_upstream_inserts_an_array_of_ids() {
        let mut config = json!({ "name": "test" });
        stamp_upstream(&mut config, &["a".to_string(), "b".to_string()]);
        assert_eq!(config["_upstream"], json!(["a", "b"]));
        assert_eq!(config["name"], json!("test"));
    }

    #[test]
    fn stamp_upstream_coerces_a_non_object_config() {
        let mut config = JsonValue::Null;
        stamp_upstream(&mut config, &["a".to_string()]);
        assert_eq!(config["_upstream"], json!(["a"]));
    }

    #[tokio::test]
    async fn run_fails_fast_on_an_unknown_node_type() {
        let definition = WorkflowDefinition {
            id: "wf".into(),
            name: "wf".into(),
            description: None,
            tasks: vec![task("a", "nonexistent.node", &[])],
        };
        let result = Engine::run(&definition, HashMap::new(), None).await;
        assert!(result.is_err());
    }
}
