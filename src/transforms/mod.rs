//! Pure functional transformations over [`TrackList`] (spec §4.G).
//!
//! Grounded on `original_source/narada/playlists/operations.py` and
//! `transformers.py`: the source expresses these as curried functions
//! (`toolz.curry`) that either return a transformer or apply it
//! immediately depending on whether a tracklist was supplied. Currying
//! buys nothing in Rust, so each primitive here is an ordinary
//! function that takes its configuration and returns a boxed
//! [`Transform`] closure; composition is `pipeline::create_pipeline`.

pub mod pipeline;
pub mod primitives;

use crate::domain::TrackList;
use crate::error::Result;

/// A single pipeline stage: `TrackList -> TrackList`, suspension-free
/// (spec §4.G "transform library functions are synchronous").
pub type Transform = Box<dyn Fn(TrackList) -> Result<TrackList> + Send + Sync>;

pub use pipeline::create_pipeline;
pub use primitives::{
    concatenate, exclude_artists, exclude_tracks, filter_by_date_range, filter_by_metric_range,
    filter_by_predicate, filter_duplicates, filter_not_in_playlist, filter_by_release_date,
    interleave, limit, sample_random, select_by_method, sort_by_attribute, take_last,
    SelectionMethod, SortKey,
};
