use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// A keyed family of `k` hash functions mapping elements to Bloom positions.
///
/// Function `i` is the SHA-256 PRF `H(key ‖ i ‖ x)` reduced modulo the filter
/// width. The key stays on the client; the store only ever sees encrypted
/// positions.
#[derive(Debug, Clone)]
pub struct HashFamily {
    key: [u8; 32],
    k: u32,
}

impl HashFamily {
    /// Build a family of `k` functions under an existing key.
    ///
    /// ## Errors
    /// `InvalidArgument` if `k` is zero.
    pub fn new(key: [u8; 32], k: u32) -> Result<Self, Error> {
        if k == 0 {
            return Err(Error::invalid_argument("hash count must be positive"));
        }
        Ok(Self { key, k })
    }

    /// Build a family under a fresh random key.
    ///
    /// ## Errors
    /// `InvalidArgument` if `k` is zero.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, k: u32) -> Result<Self, Error> {
        let mut key = [0_u8; 32];
        rng.fill_bytes(&mut key);
        Self::new(key, k)
    }

    /// Number of functions in the family.
    #[must_use]
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Position of `element` under function `fn_index`, in `[0, m)`.
    ///
    /// The 256-bit digest is reduced modulo `m` as a big-endian integer, the
    /// byte-folding keeping every intermediate value inside `u64`.
    #[must_use]
    pub fn position(&self, fn_index: u32, element: u32, m: u32) -> u32 {
        debug_assert!(fn_index < self.k);
        debug_assert!(m > 0);

        let digest = Sha256::new()
            .chain_update(self.key)
            .chain_update(fn_index.to_be_bytes())
            .chain_update(element.to_be_bytes())
            .finalize();

        let m = u64::from(m);
        let folded = digest
            .iter()
            .fold(0_u64, |acc, &byte| ((acc << 8) | u64::from(byte)) % m);
        #[allow(clippy::cast_possible_truncation)]
        {
            folded as u32
        }
    }

    /// All `k` positions of `element`, in function order.
    #[must_use]
    pub fn positions(&self, element: u32, m: u32) -> Vec<u32> {
        (0..self.k).map(|i| self.position(i, element, m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::HashFamily;
    use crate::error::Error;

    const M: u32 = 1438;

    fn family() -> HashFamily {
        HashFamily::new([7; 32], 10).unwrap()
    }

    #[test]
    fn deterministic_per_key() {
        let a = family();
        let b = family();
        for element in [0, 1, 42_865, u32::MAX] {
            assert_eq!(a.positions(element, M), b.positions(element, M));
        }
    }

    #[test]
    fn positions_stay_in_range() {
        let family = family();
        for element in 0..200 {
            for position in family.positions(element * 37, M) {
                assert!(position < M);
            }
        }
    }

    #[test]
    fn functions_disagree() {
        let family = family();
        let positions = family.positions(42_865, M);
        // Ten independent functions mapping into 1438 slots almost surely do
        // not all agree; equality here would mean the index is ignored.
        assert!(positions.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn keys_disagree() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = HashFamily::generate(&mut rng, 4).unwrap();
        let b = HashFamily::generate(&mut rng, 4).unwrap();
        assert_ne!(a.positions(123, M), b.positions(123, M));
    }

    #[test]
    fn rejects_empty_family() {
        assert!(matches!(
            HashFamily::new([0; 32], 0),
            Err(Error::InvalidArgument(_))
        ));
    }
}
