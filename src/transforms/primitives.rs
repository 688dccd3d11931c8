use chrono::Utc;
use rand::seq::SliceRandom;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::{Artist, Track, TrackList};
use crate::error::Result;
use crate::transforms::Transform;

/// Filters tracks by an arbitrary predicate. No provenance beyond the
/// shrunk track list itself; nothing specific to record (spec §4.G).
pub fn filter_by_predicate(pred: impl Fn(&Track) -> bool + Send + Sync + 'static) -> Transform {
    Box::new(move |tl: TrackList| -> Result<TrackList> {
        let TrackList { tracks, metadata } = tl;
        let tracks = tracks.into_iter().filter(|t| pred(t)).collect();
        Ok(TrackList { tracks, metadata })
    })
}

/// Deduplicates by id, keeping tracks without an id (nothing to compare
/// them against). Records `duplicates_removed`, `original_count`,
/// `tracks_without_ids` per spec §4.G.
pub fn filter_duplicates() -> Transform {
    Box::new(|tl: TrackList| -> Result<TrackList> {
        let TrackList { tracks, mut metadata } = tl;
        let original_count = tracks.len();
        let mut seen = HashSet::new();
        let mut tracks_without_ids = 0usize;
        let mut deduped = Vec::with_capacity(tracks.len());
        for track in tracks {
            match track.id {
                Some(id) => {
                    if seen.insert(id) {
                        deduped.push(track);
                    }
                }
                None => {
                    tracks_without_ids += 1;
                    deduped.push(track);
                }
            }
        }
        let duplicates_removed = original_count - deduped.len();
        metadata.insert("duplicates_removed".into(), JsonValue::from(duplicates_removed));
        metadata.insert("original_count".into(), JsonValue::from(original_count));
        metadata.insert("tracks_without_ids".into(), JsonValue::from(tracks_without_ids));
        Ok(TrackList { tracks: deduped, metadata })
    })
}

/// Keeps tracks whose `release_date` age in days falls within
/// `[min_age_days, max_age_days]`. A track with no release date is
/// dropped: there is no age to compare (mirrors
/// `original_source/narada/playlists/transformers.py::filter_by_release_date`).
pub fn filter_by_date_range(min_age_days: Option<i64>, max_age_days: Option<i64>) -> Transform {
    Box::new(move |tl: TrackList| -> Result<TrackList> {
        let TrackList { tracks, metadata } = tl;
        let now = Utc::now();
        let tracks = tracks
            .into_iter()
            .filter(|t| {
                let Some(release_date) = t.release_date else {
                    return false;
                };
                let age_days = (now - release_date).num_days();
                if let Some(max) = max_age_days {
                    if age_days > max {
                        return false;
                    }
                }
                if let Some(min) = min_age_days {
                    if age_days < min {
                        return false;
                    }
                }
                true
            })
            .collect();
        Ok(TrackList { tracks, metadata })
    })
}

/// Named convenience alias over [`filter_by_date_range`], carried over
/// from `transformers.py::filter_by_release_date` (dropped by the
/// distillation, not excluded by any Non-goal; see DESIGN.md).
pub fn filter_by_release_date(max_age_days: Option<i64>, min_age_days: Option<i64>) -> Transform {
    filter_by_date_range(min_age_days, max_age_days)
}

/// Drops tracks whose id appears in `reference`. A track without an id
/// is always kept: it cannot collide with anything in `reference`.
pub fn exclude_tracks(reference: Vec<Track>) -> Transform {
    let excluded_ids: HashSet<i64> = reference.into_iter().filter_map(|t| t.id).collect();
    Box::new(move |tl: TrackList| -> Result<TrackList> {
        let TrackList { tracks, metadata } = tl;
        let tracks = tracks
            .into_iter()
            .filter(|t| t.id.map(|id| !excluded_ids.contains(&id)).unwrap_or(true))
            .collect();
        Ok(TrackList { tracks, metadata })
    })
}

/// Named convenience alias over [`exclude_tracks`], carried over from
/// `transformers.py::filter_not_in_playlist`.
pub fn filter_not_in_playlist(reference: Vec<Track>) -> Transform {
    exclude_tracks(reference)
}

/// Drops tracks that share artists with `reference`. When `all_artists`
/// is `false` (the default "any overlap" reading), a track is excluded
/// if any of its artists appears in `reference`'s artist set; when
/// `true`, a track is excluded only if every one of its artists does.
pub fn exclude_artists(reference: Vec<Track>, all_artists: bool) -> Transform {
    let excluded: HashSet<Artist> = reference.into_iter().flat_map(|t| t.artists).collect();
    Box::new(move |tl: TrackList| -> Result<TrackList> {
        let TrackList { tracks, metadata } = tl;
        let tracks = tracks
            .into_iter()
            .filter(|t| {
                let overlaps = if all_artists {
                    !t.artists.is_empty() && t.artists.iter().all(|a| excluded.contains(a))
                } else {
                    t.artists.iter().any(|a| excluded.contains(a))
                };
                !overlaps
            })
            .collect();
        Ok(TrackList { tracks, metadata })
    })
}

/// Keeps tracks whose `metadata["metrics"][metric_name]` value falls in
/// `[min, max]`. `include_missing` decides the fate of tracks absent
/// from the metric map or carrying a `null` value there.
pub fn filter_by_metric_range(
    metric_name: impl Into<String>,
    min: Option<f64>,
    max: Option<f64>,
    include_missing: bool,
) -> Transform {
    let metric_name = metric_name.into();
    Box::new(move |tl: TrackList| -> Result<TrackList> {
        let metrics = tl.metric_map(&metric_name)?;
        let TrackList { tracks, metadata } = tl;
        let tracks = tracks
            .into_iter()
            .filter(|t| {
                let value = t.id.and_then(|id| metrics.get(&id).copied().flatten());
                match value {
                    Some(v) => min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m),
                    None => include_missing,
                }
            })
            .collect();
        Ok(TrackList { tracks, metadata })
    })
}

/// How a sort key is obtained for [`sort_by_attribute`].
pub enum SortKey {
    /// Arbitrary derived attribute, e.g. `release_date` as an epoch day.
    Attribute(Arc<dyn Fn(&Track) -> Option<f64> + Send + Sync>),
    /// Read straight from `metadata["metrics"][metric_name]`.
    Metric(String),
}

/// Sorts by `key`. Missing values sink to the end regardless of
/// direction: `+∞` when ascending, `-∞` when descending. Writes the
/// resolved key for every id-bearing track back into
/// `metadata["metrics"][metric_name_for_provenance]`. A [`SortKey::Metric`]
/// pointing at a string-keyed metrics map surfaces
/// [`AppError::Validation`] via [`TrackList::metric_map`] rather than
/// silently coercing (Invariant 4).
pub fn sort_by_attribute(key: SortKey, metric_name_for_provenance: impl Into<String>, reverse: bool) -> Transform {
    let metric_name_for_provenance = metric_name_for_provenance.into();
    Box::new(move |tl: TrackList| -> Result<TrackList> {
        let mut tl = tl;
        let values: HashMap<i64, Option<f64>> = match &key {
            SortKey::Attribute(getter) => {
                tl.tracks.iter().filter_map(|t| t.id.map(|id| (id, getter(t)))).collect()
            }
            SortKey::Metric(name) => tl.metric_map(name)?,
        };

        let sentinel = if reverse { f64::NEG_INFINITY } else { f64::INFINITY };
        let key_of = |t: &Track| -> f64 {
            t.id.and_then(|id| values.get(&id).copied().flatten()).unwrap_or(sentinel)
        };

        let mut tracks = tl.tracks;
        tracks.sort_by(|a, b| {
            let (ka, kb) = (key_of(a), key_of(b));
            let ordering = ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal);
            if reverse {
                ordering.reverse()
            } else {
                ordering
            }
        });
        tl.tracks = tracks;
        tl.set_metric_map(&metric_name_for_provenance, &values);
        Ok(tl)
    })
}

/// Keeps the first `n` tracks.
pub fn limit(n: usize) -> Transform {
    Box::new(move |tl: TrackList| -> Result<TrackList> {
        let TrackList { mut tracks, metadata } = tl;
        tracks.truncate(n);
        Ok(TrackList { tracks, metadata })
    })
}

/// Keeps the last `n` tracks, preserving order.
pub fn take_last(n: usize) -> Transform {
    Box::new(move |tl: TrackList| -> Result<TrackList> {
        let TrackList { tracks, metadata } = tl;
        let start = tracks.len().saturating_sub(n);
        Ok(TrackList { tracks: tracks[start..].to_vec(), metadata })
    })
}

/// Keeps `n` tracks chosen uniformly at random, without replacement.
pub fn sample_random(n: usize) -> Transform {
    Box::new(move |tl: TrackList| -> Result<TrackList> {
        let TrackList { tracks, metadata } = tl;
        let mut rng = rand::thread_rng();
        let sampled = tracks.choose_multiple(&mut rng, n).cloned().collect();
        Ok(TrackList { tracks: sampled, metadata })
    })
}

/// Dispatch target for [`select_by_method`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMethod {
    First,
    Last,
    Random,
}

impl std::fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Random => "random",
        };
        write!(f, "{s}")
    }
}

/// Selects `n` tracks by `method`, recording `selection_method` and
/// `original_count` per spec §4.G.
pub fn select_by_method(n: usize, method: SelectionMethod) -> Transform {
    Box::new(move |tl: TrackList| -> Result<TrackList> {
        let original_count = tl.tracks.len();
        let selector = match method {
            SelectionMethod::First => limit(n),
            SelectionMethod::Last => take_last(n),
            SelectionMethod::Random => sample_random(n),
        };
        let mut result = selector(tl)?;
        result.metadata.insert("selection_method".into(), JsonValue::String(method.to_string()));
        result.metadata.insert("original_count".into(), JsonValue::from(original_count));
        Ok(result)
    })
}

/// Concatenates `tracklists` in order. Not a [`Transform`]: a combiner
/// takes several tracklists, not one (spec §4.G).
pub fn concatenate(tracklists: Vec<TrackList>) -> Result<TrackList> {
    let mut tracks = Vec::new();
    for tl in &tracklists {
        tracks.extend(tl.tracks.iter().cloned());
    }
    let mut result = TrackList::new(tracks);
    result.metadata.insert("concatenated_lists".into(), JsonValue::from(tracklists.len()));
    Ok(result)
}

/// Round-robins over `tracklists`. With `stop_on_empty`, interleaving
/// stops as soon as any list is exhausted; otherwise exhausted lists
/// are skipped and interleaving continues with what remains.
pub fn interleave(tracklists: Vec<TrackList>, stop_on_empty: bool) -> Result<TrackList> {
    let mut iters: Vec<std::vec::IntoIter<Track>> = tracklists.into_iter().map(|tl| tl.tracks.into_iter()).collect();
    let mut tracks = Vec::new();
    'outer: loop {
        let mut advanced = false;
        for iter in iters.iter_mut() {
            match iter.next() {
                Some(track) => {
                    tracks.push(track);
                    advanced = true;
                }
                None if stop_on_empty => break 'outer,
                None => continue,
            }
        }
        if !advanced {
            break;
        }
    }
    let mut result = TrackList::new(tracks);
    result.metadata.insert("interleaved_lists".into(), JsonValue::from(iters.len()));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn artist(name: &str) -> Artist {
        Artist::new(name).unwrap()
    }

    fn track(id: i64, title: &str) -> Track {
        Track::new(title, vec![artist("Artist")]).unwrap().with_id(id)
    }

    #[test]
    fn filter_duplicates_keeps_id_less_tracks_and_counts_removed() {
        let without_id = Track::new("No Id", vec![artist("Artist")]).unwrap();
        let tl = TrackList::new(vec![track(1, "a"), track(1, "a dup"), track(2, "b"), without_id]);
        let result = filter_duplicates()(tl).unwrap();
        assert_eq!(result.tracks.len(), 3);
        assert_eq!(result.metadata.get("duplicates_removed").unwrap(), &JsonValue::from(1));
        assert_eq!(result.metadata.get("original_count").unwrap(), &JsonValue::from(4));
        assert_eq!(result.metadata.get("tracks_without_ids").unwrap(), &JsonValue::from(1));
    }

    #[test]
    fn filter_by_date_range_drops_tracks_without_a_release_date() {
        let tl = TrackList::new(vec![track(1, "no date")]);
        let result = filter_by_date_range(None, Some(30))(tl).unwrap();
        assert!(result.tracks.is_empty());
    }

    #[test]
    fn filter_by_date_range_respects_max_age() {
        let recent = track(1, "recent").with_release_date(Utc::now() - Duration::days(5));
        let old = track(2, "old").with_release_date(Utc::now() - Duration::days(400));
        let tl = TrackList::new(vec![recent, old]);
        let result = filter_by_date_range(None, Some(30))(tl).unwrap();
        assert_eq!(result.tracks.len(), 1);
        assert_eq!(result.tracks[0].id, Some(1));
    }

    #[test]
    fn exclude_tracks_keeps_id_less_tracks() {
        let reference = vec![track(1, "a")];
        let id_less = Track::new("no id", vec![artist("Artist")]).unwrap();
        let tl = TrackList::new(vec![track(1, "a"), track(2, "b"), id_less]);
        let result = exclude_tracks(reference)(tl).unwrap();
        assert_eq!(result.tracks.len(), 2);
        assert!(result.tracks.iter().any(|t| t.id == Some(2)));
    }

    #[test]
    fn exclude_artists_any_overlap_excludes_shared_artist() {
        let other = Track::new("ref", vec![artist("Shared")]).unwrap();
        let candidate = Track::new("c", vec![artist("Shared"), artist("Unique")]).unwrap().with_id(1);
        let tl = TrackList::new(vec![candidate]);
        let result = exclude_artists(vec![other], false)(tl).unwrap();
        assert!(result.tracks.is_empty());
    }

    #[test]
    fn exclude_artists_all_artists_requires_full_overlap() {
        let other = Track::new("ref", vec![artist("Shared")]).unwrap();
        let candidate = Track::new("c", vec![artist("Shared"), artist("Unique")]).unwrap().with_id(1);
        let tl = TrackList::new(vec![candidate]);
        let result = exclude_artists(vec![other], true)(tl).unwrap();
        assert_eq!(result.tracks.len(), 1);
    }

    #[test]
    fn filter_by_metric_range_excludes_missing_by_default() {
        let mut tl = TrackList::new(vec![track(1, "a"), track(2, "b")]);
        let mut values = HashMap::new();
        values.insert(1, Some(10.0));
        tl.set_metric_map("plays", &values);
        let result = filter_by_metric_range("plays", Some(5.0), None, false)(tl).unwrap();
        assert_eq!(result.tracks.len(), 1);
        assert_eq!(result.tracks[0].id, Some(1));
    }

    #[test]
    fn sort_by_attribute_sinks_missing_values_to_the_end() {
        let mut tl = TrackList::new(vec![track(1, "a"), track(2, "b"), track(3, "c")]);
        let mut values = HashMap::new();
        values.insert(1, Some(1.0));
        values.insert(2, None);
        tl.set_metric_map("plays", &values);
        let result = sort_by_attribute(SortKey::Metric("plays".into()), "plays", false)(tl).unwrap();
        assert_eq!(result.tracks[0].id, Some(1));
        assert_eq!(result.tracks.last().unwrap().id, Some(2));
    }

    #[test]
    fn sort_by_attribute_rejects_string_keyed_metrics() {
        let mut tl = TrackList::new(vec![track(1, "a")]);
        tl.metadata.insert("metrics".into(), serde_json::json!({ "plays": { "nope": 1 } }));
        let result = sort_by_attribute(SortKey::Metric("plays".into()), "plays", false)(tl);
        assert!(result.is_err());
    }

    #[test]
    fn select_by_method_first_records_provenance() {
        let tl = TrackList::new(vec![track(1, "a"), track(2, "b"), track(3, "c")]);
        let result = select_by_method(2, SelectionMethod::First)(tl).unwrap();
        assert_eq!(result.tracks.len(), 2);
        assert_eq!(result.metadata.get("selection_method").unwrap(), &JsonValue::from("first"));
        assert_eq!(result.metadata.get("original_count").unwrap(), &JsonValue::from(3));
    }

    #[test]
    fn concatenate_preserves_order_across_lists() {
        let a = TrackList::new(vec![track(1, "a")]);
        let b = TrackList::new(vec![track(2, "b")]);
        let result = concatenate(vec![a, b]).unwrap();
        assert_eq!(result.tracks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn interleave_round_robins_and_stops_on_shortest_list_when_requested() {
        let a = TrackList::new(vec![track(1, "a1"), track(2, "a2")]);
        let b = TrackList::new(vec![track(3, "b1")]);
        let result = interleave(vec![a, b], true).unwrap();
        assert_eq!(result.tracks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![Some(1), Some(3)]);
    }

    #[test]
    fn interleave_without_stop_on_empty_drains_every_list() {
        let a = TrackList::new(vec![track(1, "a1"), track(2, "a2")]);
        let b = TrackList::new(vec![track(3, "b1")]);
        let result = interleave(vec![a, b], false).unwrap();
        assert_eq!(result.tracks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![Some(1), Some(3), Some(2)]);
    }
}
