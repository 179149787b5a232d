//! Deterministic batch sampling of steps and value types.
//!
//! Cross-backend comparisons rely on the same (cardinality, fraction, seed)
//! triple always selecting the same subset, so sampling draws from a seeded
//! RNG and never from ambient randomness. Steps and types are sampled
//! independently at the same fraction and seed.

use crate::storage::BatchFilter;
use crate::table::normalize::Dataset;
use crate::utils::error::QueryError;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Sample a step/type membership filter from a dataset's dictionaries
///
/// **Public** - main entry point for filter sampling
///
/// # Arguments
/// * `dataset` - The normalized dataset whose Step/Type tables to sample
/// * `fraction` - Fraction of each dictionary to keep, in (0, 1]
/// * `seed` - Sole source of randomness
///
/// # Returns
/// A filter carrying the sampled step and type rows
///
/// # Errors
/// * `QueryError::EmptyFilter` - a sampled membership set came out empty
///   (dictionary empty, or the fraction rounds to zero rows)
pub fn sample_filter(
    dataset: &Dataset,
    fraction: f64,
    seed: u64,
) -> Result<BatchFilter, QueryError> {
    let steps = sample_rows(&dataset.steps, fraction, seed);
    let types = sample_rows(&dataset.types, fraction, seed);

    debug!(
        "Sampled {}/{} steps and {}/{} types (fraction {}, seed {})",
        steps.len(),
        dataset.steps.len(),
        types.len(),
        dataset.types.len(),
        fraction,
        seed
    );

    BatchFilter::new(steps, types)
}

/// Sample a fraction of rows without replacement, reproducibly
///
/// **Public** - also used to sample one side of a filter on its own
///
/// The selection depends only on the row count, the fraction and the seed.
/// Selected rows keep their source order.
pub fn sample_rows<T: Clone>(rows: &[T], fraction: f64, seed: u64) -> Vec<T> {
    let amount = sample_count(rows.len(), fraction);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut picked = rand::seq::index::sample(&mut rng, rows.len(), amount).into_vec();
    picked.sort_unstable();

    picked.into_iter().map(|i| rows[i].clone()).collect()
}

/// Number of rows a fraction selects, clamped to the available count
fn sample_count(len: usize, fraction: f64) -> usize {
    let count = (len as f64 * fraction).round() as usize;
    count.min(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::normalize::normalize;
    use crate::trace::schema::RawTrace;

    fn rows(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_sample_count_rounds() {
        assert_eq!(sample_count(3, 0.67), 2);
        assert_eq!(sample_count(10, 0.5), 5);
        assert_eq!(sample_count(10, 1.0), 10);
        assert_eq!(sample_count(0, 0.5), 0);
    }

    #[test]
    fn test_same_seed_same_subset() {
        let first = sample_rows(&rows(100), 0.5, 42);
        let second = sample_rows(&rows(100), 0.5, 42);
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seed_different_subset() {
        let first = sample_rows(&rows(100), 0.5, 0);
        let second = sample_rows(&rows(100), 0.5, 1);
        assert_ne!(first, second);
    }

    #[test]
    fn test_full_fraction_selects_everything() {
        let all = sample_rows(&rows(7), 1.0, 3);
        assert_eq!(all, rows(7));
    }

    #[test]
    fn test_selection_keeps_source_order() {
        let picked = sample_rows(&rows(50), 0.3, 9);
        let mut sorted = picked.clone();
        sorted.sort_unstable();
        assert_eq!(picked, sorted);
    }

    #[test]
    fn test_empty_dictionary_is_query_error() {
        let trace: RawTrace = serde_json::from_str(r#"{"Step-1": {"0.0": {}}}"#).unwrap();
        let dataset = normalize(&trace).unwrap();

        // One step but no value types at all
        let result = sample_filter(&dataset, 1.0, 0);
        assert!(matches!(result, Err(QueryError::EmptyFilter("type"))));
    }
}
