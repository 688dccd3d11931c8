//! Process-wide node registry (spec §4.H), grounded on
//! `original_source/narada/workflows/node_registry.py`: a static table
//! mapping dotted `node_id` strings to `(function, metadata)`, built
//! once via `register_all` rather than discovered by reflection (Rust
//! has none), with a startup assertion that every node id a complete
//! deployment needs is actually registered.

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::workflows::context::{Context, Value};
use crate::workflows::nodes::{combiner, destination, enricher, filter, selector, sorter, source};

pub type NodeFn = fn(&Context, &Value) -> BoxFuture<'static, Result<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    Source,
    Enricher,
    Filter,
    Sorter,
    Selector,
    Combiner,
    Destination,
}

impl NodeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeCategory::Source => "source",
            NodeCategory::Enricher => "enricher",
            NodeCategory::Filter => "filter",
            NodeCategory::Sorter => "sorter",
            NodeCategory::Selector => "selector",
            NodeCategory::Combiner => "combiner",
            NodeCategory::Destination => "destination",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub id: &'static str,
    pub description: &'static str,
    pub category: NodeCategory,
    pub input_type: Option<&'static str>,
    pub output_type: Option<&'static str>,
}

/// Node ids a complete deployment must provide (spec §4.H "a required
/// set of critical node ids"); checked by [`validate_required_nodes`]
/// at startup, before any workflow is accepted.
const REQUIRED_NODE_IDS: &[&str] = &[
    "source.spotify_playlist",
    "enricher.lastfm",
    "enricher.spotify",
    "filter.deduplicate",
    "sorter.by_metric",
    "selector.limit_tracks",
    "combiner.concatenate_playlists",
    "destination.create_internal",
    "destination.create_spotify",
    "destination.update_spotify",
];

pub static NODE_REGISTRY: Lazy<HashMap<&'static str, (NodeFn, NodeMetadata)>> = Lazy::new(register_all);

fn register_all() -> HashMap<&'static str, (NodeFn, NodeMetadata)> {
    let mut registry = HashMap::new();
    let mut register = |id: &'static str, description: &'static str, category: NodeCategory, input_type: Option<&'static str>, output_type: Option<&'static str>, f: NodeFn| {
        registry.insert(id, (f, NodeMetadata { id, description, category, input_type, output_type }));
    };

    register(
        "source.spotify_playlist",
        "Fetches a Spotify playlist, persists its tracks, and emits a TrackList",
        NodeCategory::Source,
        None,
        Some("tracklist"),
        source::spotify_playlist,
    );

    register(
        "enricher.lastfm",
        "Matches tracks against Last.fm and resolves requested metrics",
        NodeCategory::Enricher,
        Some("tracklist"),
        Some("tracklist"),
        enricher::lastfm,
    );
    register(
        "enricher.spotify",
        "Resolves requested Spotify-sourced metrics for already-matched tracks",
        NodeCategory::Enricher,
        Some("tracklist"),
        Some("tracklist"),
        enricher::spotify,
    );

    register("filter.deduplicate", "Removes duplicate tracks by id", NodeCategory::Filter, Some("tracklist"), Some("tracklist"), filter::deduplicate);
    register(
        "filter.by_release_date",
        "Keeps tracks released within a date range",
        NodeCategory::Filter,
        Some("tracklist"),
        Some("tracklist"),
        filter::by_release_date,
    );
    register(
        "filter.by_tracks",
        "Excludes tracks present in a reference tracklist",
        NodeCategory::Filter,
        Some("tracklist"),
        Some("tracklist"),
        filter::by_tracks,
    );
    register(
        "filter.by_artists",
        "Excludes tracks whose artists appear in a reference tracklist",
        NodeCategory::Filter,
        Some("tracklist"),
        Some("tracklist"),
        filter::by_artists,
    );
    register(
        "filter.by_metric",
        "Keeps tracks whose metric value falls within a range",
        NodeCategory::Filter,
        Some("tracklist"),
        Some("tracklist"),
        filter::by_metric,
    );

    register("sorter.by_user_plays", "Sorts by a user's play count metric", NodeCategory::Sorter, Some("tracklist"), Some("tracklist"), sorter::by_user_plays);
    register(
        "sorter.by_spotify_popularity",
        "Sorts by Spotify popularity",
        NodeCategory::Sorter,
        Some("tracklist"),
        Some("tracklist"),
        sorter::by_spotify_popularity,
    );
    register("sorter.by_metric", "Sorts by an arbitrary named metric", NodeCategory::Sorter, Some("tracklist"), Some("tracklist"), sorter::by_metric);
    register("sorter.by_date", "Sorts by release date", NodeCategory::Sorter, Some("tracklist"), Some("tracklist"), sorter::by_date);

    register("selector.limit_tracks", "Selects a subset of tracks by count and method", NodeCategory::Selector, Some("tracklist"), Some("tracklist"), selector::limit_tracks);

    register("combiner.merge_playlists", "Concatenates multiple tracklists, deduplicating", NodeCategory::Combiner, Some("tracklists"), Some("tracklist"), combiner::merge_playlists);
    register(
        "combiner.concatenate_playlists",
        "Concatenates multiple tracklists in task-id order",
        NodeCategory::Combiner,
        Some("tracklists"),
        Some("tracklist"),
        combiner::concatenate_playlists,
    );
    register("combiner.interleave_playlists", "Interleaves multiple tracklists round-robin", NodeCategory::Combiner, Some("tracklists"), Some("tracklist"), combiner::interleave_playlists);

    register("destination.create_internal", "Writes a tracklist to the internal store as a new playlist", NodeCategory::Destination, Some("tracklist"), None, destination::create_internal);
    register("destination.create_spotify", "Creates a Spotify playlist from a tracklist and persists the mapping", NodeCategory::Destination, Some("tracklist"), None, destination::create_spotify);
    register("destination.update_spotify", "Diffs a tracklist against a stored Spotify playlist and reconciles both", NodeCategory::Destination, Some("tracklist"), None, destination::update_spotify);

    registry
}

pub fn get_node(node_id: &str) -> Result<(NodeFn, &'static NodeMetadata)> {
    NODE_REGISTRY
        .get(node_id)
        .map(|(f, meta)| (*f, meta))
        .ok_or_else(|| AppError::not_found(format!("no node registered for id '{node_id}'")))
}

pub fn list_nodes() -> Vec<&'static NodeMetadata> {
    NODE_REGISTRY.values().map(|(_, meta)| meta).collect()
}

/// Startup validation (spec §4.H): asserts every id in
/// [`REQUIRED_NODE_IDS`] is registered. Failure aborts workflow start.
pub fn validate_required_nodes() -> Result<()> {
    let missing: Vec<&str> = REQUIRED_NODE_IDS.iter().filter(|id| !NODE_REGISTRY.contains_key(*id)).copied().collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Configuration(format!("missing required node registrations: {}", missing.join(", "))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_required_node_is_registered() {
        validate_required_nodes().unwrap();
    }

    #[test]
    fn get_node_errors_for_an_unknown_id() {
        assert!(get_node("nonexistent.node").is_err());
    }

    #[test]
    fn list_nodes_is_non_empty() {
        assert!(!list_nodes().is_empty());
    }
}
