//! Seeded random number generation for the synthetic tables.
//!
//! All randomness in the crate flows from a single global seed. Each
//! table derives its own random number generator by hashing the global
//! seed together with a string id, so the streams feeding the different
//! tables are decoupled: adding or removing one table does not change
//! the data generated for the others. This matters for the tests, which
//! assert on the exact data produced from a fixed seed.

use anyhow::{bail, Result};
use blake2::{Blake2b512, Digest};
use chrono::{Duration, NaiveDateTime};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Make a random number generator from a global seed and a string id.
///
/// The id is concatenated with the global seed and the result is
/// hashed. The resulting hash seeds the random number generator. It is
/// up to the caller to ensure that no id is used more than once with
/// the same global seed (unless the same random numbers are desired).
pub fn make_rng(global_seed: u64, id: &str) -> ChaCha8Rng {
    let message = format!("{id}{global_seed}");
    let mut hasher = Blake2b512::new();
    hasher.update(message);
    let seed = hasher.finalize()[0..32]
        .try_into()
        .expect("Unexpectedly failed to obtain correct-length slice");
    ChaCha8Rng::from_seed(seed)
}

/// One entry of a weighted categorical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weighted<T> {
    pub value: T,
    pub weight: f64,
}

/// A fixed set of values with selection weights that sum to 1.
///
/// The same table type backs the ethnicity, event-type and complication
/// draws. [`WeightedTable::choose`] assumes the table has already been
/// checked by [`WeightedTable::validate`]; every table reachable from a
/// `GeneratorConfig` is validated before generation starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedTable<T>(pub Vec<Weighted<T>>);

impl<T> WeightedTable<T> {
    pub fn new(entries: Vec<(T, f64)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(value, weight)| Weighted { value, weight })
                .collect(),
        )
    }

    /// Draw one value according to the weights.
    pub fn choose<'a>(&'a self, rng: &mut ChaCha8Rng) -> &'a T {
        &self
            .0
            .choose_weighted(rng, |entry| entry.weight)
            .expect("weighted table was validated before generation")
            .value
    }

    /// Check that the table is non-empty, every weight is positive and
    /// the weights sum to 1 (within floating point tolerance).
    pub fn validate(&self, table_name: &str) -> Result<()> {
        if self.0.is_empty() {
            bail!("weighted table '{table_name}' is empty");
        }
        if self.0.iter().any(|entry| entry.weight <= 0.0) {
            bail!("weighted table '{table_name}' contains a non-positive weight");
        }
        let total: f64 = self.0.iter().map(|entry| entry.weight).sum();
        if (total - 1.0).abs() > 1e-6 {
            bail!("weights of table '{table_name}' sum to {total}, expected 1");
        }
        Ok(())
    }
}

/// Draw a datetime uniformly between `start` and `end` (inclusive), at
/// second resolution.
pub fn sample_datetime(
    rng: &mut ChaCha8Rng,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> NaiveDateTime {
    let span = (end - start).num_seconds();
    start + Duration::seconds(rng.gen_range(0..=span))
}
