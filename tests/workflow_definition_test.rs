//! Integration test parsing a full workflow definition file end to end
//! (spec §4.I step 1/2, §6's "workflow definition file format").

use narada::workflows::WorkflowDefinition;

const DISCOVER_WEEKLY_LIKE: &str = r#"
{
  "id": "discover-weekly-like",
  "name": "Like new Discover Weekly tracks",
  "description": "Pulls Discover Weekly, filters out already-heard tracks, saves the rest internally",
  "tasks": [
    {
      "id": "fetch",
      "type": "source.spotify_playlist",
      "config": { "access_token": "{parameters.access_token}", "playlist_id": "{parameters.playlist_id}" }
    },
    {
      "id": "dedupe",
      "type": "filter.deduplicate",
      "upstream": ["fetch"],
      "config": {}
    },
    {
      "id": "limit",
      "type": "selector.limit_tracks",
      "upstream": ["dedupe"],
      "config": { "count": 25 }
    },
    {
      "id": "save",
      "type": "destination.create_internal",
      "upstream": ["limit"],
      "config": { "name": "Discover Weekly Picks" }
    }
  ]
}
"#;

#[test]
fn parses_and_orders_a_realistic_workflow() {
    let definition = WorkflowDefinition::parse(DISCOVER_WEEKLY_LIKE).unwrap();
    let order = definition.execution_order().unwrap();
    let ids: Vec<&str> = order.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["fetch", "dedupe", "limit", "save"]);
}

#[test]
fn rejects_a_workflow_with_an_unknown_upstream_reference() {
    let broken = DISCOVER_WEEKLY_LIKE.replace(r#""upstream": ["fetch"]"#, r#""upstream": ["ghost"]"#);
    assert!(WorkflowDefinition::parse(&broken).is_err());
}

#[test]
fn rejects_a_workflow_with_duplicate_task_ids() {
    let raw = r#"
    {
      "id": "wf",
      "name": "wf",
      "tasks": [
        { "id": "a", "type": "filter.deduplicate", "config": {} },
        { "id": "a", "type": "filter.deduplicate", "config": {} }
      ]
    }
    "#;
    assert!(WorkflowDefinition::parse(raw).is_err());
}
