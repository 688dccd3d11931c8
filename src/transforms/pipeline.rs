use crate::domain::TrackList;
use crate::error::Result;
use crate::transforms::Transform;

/// Composes `transforms` left to right: `create_pipeline([t1, t2]) = t2 ∘ t1`.
/// The first transform whose closure returns `Err` short-circuits the rest.
pub fn create_pipeline(transforms: Vec<Transform>) -> Transform {
    Box::new(move |tracklist: TrackList| -> Result<TrackList> {
        transforms.iter().try_fold(tracklist, |acc, transform| transform(acc))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Artist, Track};
    use crate::transforms::{filter_by_predicate, limit};

    fn track(title: &str) -> Track {
        Track::new(title, vec![Artist::new("Artist").unwrap()]).unwrap()
    }

    #[test]
    fn pipeline_applies_stages_in_order() {
        let tl = TrackList::new(vec![track("a"), track("b"), track("c")]);
        let pipeline = create_pipeline(vec![
            filter_by_predicate(|t| t.title != "b"),
            limit(1),
        ]);
        let result = pipeline(tl).unwrap();
        assert_eq!(result.tracks.len(), 1);
        assert_eq!(result.tracks[0].title, "a");
    }

    #[test]
    fn pipeline_short_circuits_on_error() {
        let tl = TrackList::new(vec![track("a")]);
        let failing: Transform = Box::new(|_| Err(crate::error::AppError::validation("boom")));
        let pipeline = create_pipeline(vec![failing, limit(0)]);
        assert!(pipeline(tl).is_err());
    }
}
