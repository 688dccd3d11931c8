//! Workflow definition parsing and scheduling (spec §4.I), grounded on
//! `original_source/narada/workflows/prefect.py`'s `topological_sort`.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct TaskDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub config: JsonValue,
    #[serde(default)]
    pub upstream: Vec<String>,
    pub result_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tasks: Vec<TaskDefinition>,
}

impl WorkflowDefinition {
    pub fn parse(raw: &str) -> Result<Self> {
        let definition: WorkflowDefinition = serde_json::from_str(raw).map_err(AppError::from)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Ensures every task has a non-empty id/type and that every
    /// `upstream` reference names a task that exists in this
    /// definition (spec §4.I step 1).
    fn validate(&self) -> Result<()> {
        let ids: HashSet<&str> = self.tasks.iter().map(|t| t.id.as_str()).collect();
        if ids.len() != self.tasks.len() {
            return Err(AppError::validation(format!("workflow '{}' has duplicate task ids", self.id)));
        }
        for task in &self.tasks {
            if task.id.trim().is_empty() {
                return Err(AppError::validation(format!("workflow '{}' has a task with an empty id", self.id)));
            }
            if task.node_type.trim().is_empty() {
                return Err(AppError::validation(format!("task '{}' has an empty type", task.id)));
            }
            for upstream in &task.upstream {
                if !ids.contains(upstream.as_str()) {
                    return Err(AppError::validation(format!(
                        "task '{}' references unknown upstream task '{upstream}'",
                        task.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// The execution order for this definition's tasks (spec §4.I
    /// step 2).
    pub fn execution_order(&self) -> Result<Vec<&TaskDefinition>> {
        let by_id: HashMap<&str, &TaskDefinition> = self.tasks.iter().map(|t| (t.id.as_str(), t)).collect();
        let ordered_ids = topological_sort(&self.tasks)?;
        Ok(ordered_ids.into_iter().map(|id| by_id[id.as_str()]).collect())
    }
}

/// DFS-based topological sort, ties broken by insertion order (spec
/// §4.I step 2), grounded on `prefect.py`'s `topological_sort`. Unlike
/// the source, this tracks an explicit "currently visiting" set so a
/// cycle is reported as a validation error instead of recursing
/// forever.
pub fn topological_sort(tasks: &[TaskDefinition]) -> Result<Vec<String>> {
    let by_id: HashMap<&str, &TaskDefinition> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut visiting: HashSet<&str> = HashSet::new();
    let mut order: Vec<String> = Vec::with_capacity(tasks.len());

    fn visit<'a>(
        id: &'a str,
        by_id: &HashMap<&'a str, &'a TaskDefinition>,
        visited: &mut HashSet<&'a str>,
        visiting: &mut HashSet<&'a str>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if visited.contains(id) {
            return Ok(());
        }
        if visiting.contains(id) {
            return Err(AppError::validation(format!("workflow has a circular dependency involving task '{id}'")));
        }
        visiting.insert(id);
        if let Some(task) = by_id.get(id) {
            for upstream in &task.upstream {
                visit(upstream, by_id, visited, visiting, order)?;
            }
        }
        visiting.remove(id);
        visited.insert(id);
        order.push(id.to_string());
        Ok(())
    }

    for task in tasks {
        visit(&task.id, &by_id, &mut visited, &mut visiting, &mut order)?;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, upstream: &[&str]) -> TaskDefinition {
        TaskDefinition {
            id: id.to_string(),
            node_type: "source.spotify_playlist".to_string(),
            config: JsonValue::Null,
            upstream: upstream.iter().map(|s| s.to_string()).collect(),
            result_key: None,
        }
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let tasks = vec![task("b", &["a"]), task("a", &[]), task("c", &["a", "b"])];
        let order = topological_sort(&tasks).unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn independent_tasks_keep_insertion_order() {
        let tasks = vec![task("a", &[]), task("b", &[])];
        let order = topological_sort(&tasks).unwrap();
        assert_eq!(order, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn detects_a_circular_dependency() {
        let tasks = vec![task("a", &["b"]), task("b", &["a"])];
        assert!(topological_sort(&tasks).is_err());
    }

    #[test]
    fn validate_rejects_an_unknown_upstream_reference() {
        let definition = WorkflowDefinition {
            id: "wf".into(),
            name: "wf".into(),
            description: None,
            tasks: vec![task("a", &["ghost"])],
        };
        assert!(definition.validate().is_err());
    }
}
