use std::sync::Arc;

use dashmap::DashMap;
use metrics::increment_counter;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{error::Error, telemetry::metrics::PERMUTATIONS_BUILT};

/// Server-side source of the random matchings used by region
/// compare-exchange.
///
/// A matching is a permutation of `{0, .., size-1}` derived deterministically
/// from `(size, seed)`: the seed feeds a reproducible PRNG which drives a
/// Fisher-Yates shuffle. The permutation does not need to be unpredictable to
/// the store, which builds it itself; obliviousness comes from the fixed
/// index schedule and the fresh ciphertexts on every write.
///
/// Permutations are materialised lazily on the first `mate` call for a key
/// and cached for the rest of the sort. The cache is keyed by `(size, seed)`
/// so concurrent lookups for an already-built matching never contend on the
/// array lock, and the entry API guarantees each permutation is computed at
/// most once.
#[derive(Debug, Default)]
pub struct MatchingOracle {
    cache: DashMap<(u32, u64), Arc<Vec<u32>>>,
}

impl MatchingOracle {
    /// Look up `π_{size,seed}[index]`.
    ///
    /// ## Errors
    /// `OutOfRange` if `index >= size`.
    pub fn mate(&self, size: u32, seed: u64, index: u32) -> Result<u32, Error> {
        if index >= size {
            return Err(Error::out_of_range(format!(
                "mate index {index} not in [0, {size})"
            )));
        }

        let permutation = Arc::clone(
            &self
                .cache
                .entry((size, seed))
                .or_insert_with(|| Arc::new(Self::permutation(size, seed))),
        );
        Ok(permutation[index as usize])
    }

    fn permutation(size: u32, seed: u64) -> Vec<u32> {
        increment_counter!(PERMUTATIONS_BUILT);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut permutation: Vec<u32> = (0..size).collect();
        permutation.shuffle(&mut rng);
        permutation
    }

    /// Drop all cached permutations. Called when a new sort session begins.
    pub fn clear(&self) {
        self.cache.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::MatchingOracle;
    use crate::error::Error;

    #[test]
    fn deterministic_for_same_key() {
        let oracle = MatchingOracle::default();
        let first: Vec<u32> = (0..16).map(|i| oracle.mate(16, 42, i).unwrap()).collect();
        let second: Vec<u32> = (0..16).map(|i| oracle.mate(16, 42, i).unwrap()).collect();
        assert_eq!(first, second);

        // A fresh oracle rebuilds the identical permutation from the seed.
        let rebuilt = MatchingOracle::default();
        let third: Vec<u32> = (0..16).map(|i| rebuilt.mate(16, 42, i).unwrap()).collect();
        assert_eq!(first, third);
    }

    #[test]
    fn is_a_permutation() {
        let oracle = MatchingOracle::default();
        for size in [1_u32, 2, 7, 16, 64] {
            let values: HashSet<u32> = (0..size)
                .map(|i| oracle.mate(size, 1234, i).unwrap())
                .collect();
            assert_eq!(values, (0..size).collect::<HashSet<_>>());
        }
    }

    #[test]
    fn seeds_give_distinct_matchings() {
        let oracle = MatchingOracle::default();
        let a: Vec<u32> = (0..64).map(|i| oracle.mate(64, 1, i).unwrap()).collect();
        let b: Vec<u32> = (0..64).map(|i| oracle.mate(64, 2, i).unwrap()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let oracle = MatchingOracle::default();
        assert!(matches!(
            oracle.mate(8, 7, 8),
            Err(Error::OutOfRange(_))
        ));
        assert!(matches!(oracle.mate(0, 7, 0), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn clear_empties_the_cache() {
        let oracle = MatchingOracle::default();
        oracle.mate(8, 1, 0).unwrap();
        oracle.mate(8, 2, 0).unwrap();
        assert_eq!(2, oracle.len());
        oracle.clear();
        assert_eq!(0, oracle.len());
    }
}
