//! Shared result-tallying helper for the sync services (spec §4.J):
//! every sync loop drives its per-item work through the batch processor
//! and then folds the resulting `ItemResult`s into one `SyncStats`.

use crate::batch::ItemResult;
use crate::domain::SyncStats;

/// What a successful item counted as, so each sync service doesn't
/// re-derive the imported/exported/skipped bucket logic.
pub enum Outcome {
    Imported,
    Exported,
    Skipped,
}

/// Folds `results` into `stats`: a failed item increments `errors`, a
/// successful one is classified by `classify` and its value returned
/// (in input order) for callers that need the values themselves, e.g.
/// to find the latest timestamp across a batch for checkpointing.
pub fn tally<R>(stats: &mut SyncStats, results: Vec<ItemResult<R>>, classify: impl Fn(&R) -> Outcome) -> Vec<R> {
    let mut values = Vec::with_capacity(results.len());
    for result in results {
        stats.total += 1;
        match (result.value, result.error) {
            (Some(value), None) => {
                match classify(&value) {
                    Outcome::Imported => stats.imported += 1,
                    Outcome::Exported => stats.exported += 1,
                    Outcome::Skipped => stats.skipped += 1,
                }
                values.push(value);
            }
            _ => stats.errors += 1,
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn tallies_successes_and_errors() {
        let mut stats = SyncStats::default();
        let results = vec![
            ItemResult { value: Some(1), error: None },
            ItemResult { value: None, error: Some(AppError::validation("boom")) },
        ];
        let values = tally(&mut stats, results, |_| Outcome::Imported);
        assert_eq!(values, vec![1]);
        assert_eq!(stats.imported, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total, 2);
    }
}
