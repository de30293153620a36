//! Client side of the oblivious sort.
//!
//! The orchestrator holds the symmetric key (via its [`Cipher`]) and drives
//! the store through the fixed schedule of region compare-exchanges. Only the
//! two cells of the pair currently being exchanged are ever decrypted, and
//! both are rewritten with fresh ciphertexts regardless of whether the
//! exchange changed anything, so the store learns nothing beyond the
//! schedule itself.

use rand_core::{CryptoRng, RngCore};
use tracing::{debug, instrument};

use crate::{
    cipher::Cipher,
    error::Error,
    helpers::Transport,
    protocol::{
        schedule::{region_pairs, RegionPair},
        MATCHINGS_PER_REGION,
    },
};

/// Decrypted outcome of a finished sort session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOutcome {
    pub values: Vec<u32>,
    pub comparisons: u64,
    pub writes: u64,
}

/// Drives one sort session against a store.
pub struct Orchestrator<T, C> {
    transport: T,
    cipher: C,
    matchings: usize,
}

impl<T: Transport, C: Cipher> Orchestrator<T, C> {
    pub fn new(transport: T, cipher: C) -> Self {
        Self {
            transport,
            cipher,
            matchings: MATCHINGS_PER_REGION,
        }
    }

    /// Override the number of matchings per region pair. The default of 4 is
    /// the analyzed choice; anything lower weakens the sorting probability.
    #[must_use]
    pub fn with_matchings(mut self, matchings: usize) -> Self {
        self.matchings = matchings;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Encrypt `values` and install them as the store's sorting array.
    /// Returns the array size reported by the store.
    ///
    /// ## Errors
    /// Propagates cipher and transport failures.
    pub async fn upload(&self, values: &[u32]) -> Result<u32, Error> {
        let cells = values
            .iter()
            .map(|&v| self.cipher.encrypt(v))
            .collect::<Result<Vec<_>, _>>()?;
        self.transport.initialize(cells).await
    }

    /// Run the full Randomized Shell Sort schedule over an array of length
    /// `n`. Seeds for the per-matching permutations are drawn from `rng`,
    /// which must be cryptographically strong; each seed is used for exactly
    /// one matching.
    ///
    /// ## Errors
    /// `InvalidArgument` if `n` is not a power of two; otherwise propagates
    /// cipher and transport failures. Any error aborts the sort, leaving the
    /// array as the last completed write left it (an unsorted permutation of
    /// the original multiset).
    #[instrument("oblivious_sort", skip_all, fields(n = n))]
    pub async fn sort<R: RngCore + CryptoRng>(&self, n: u32, rng: &mut R) -> Result<(), Error> {
        let mut current_size = 0;
        for region in region_pairs(n)? {
            if region.size != current_size {
                current_size = region.size;
                debug!(offset = current_size, "starting iteration");
            }
            self.region_compare_exchange(region, rng).await?;
        }
        Ok(())
    }

    /// Apply `self.matchings` independent random matchings between the two
    /// regions. For each matching the store expands a fresh seed into a
    /// permutation, and position `a_start + i` is exchanged with
    /// `b_start + mate[i]`.
    async fn region_compare_exchange<R: RngCore + CryptoRng>(
        &self,
        region: RegionPair,
        rng: &mut R,
    ) -> Result<(), Error> {
        for _ in 0..self.matchings {
            let seed = rng.next_u64();
            for i in 0..region.size {
                let mate = self.transport.get_mate(region.size, seed, i).await?;
                self.compare_exchange(region.a_start + i, region.b_start + mate)
                    .await?;
            }
        }
        Ok(())
    }

    /// Two-index compare-exchange. Direction is encoded by the index order:
    /// `idx_a < idx_b` enforces ascending order on the pair, `idx_a > idx_b`
    /// descending. Ties keep the original order.
    async fn compare_exchange(&self, idx_a: u32, idx_b: u32) -> Result<(), Error> {
        let (cell_a, cell_b) = self.transport.get_pair(idx_a, idx_b).await?;
        let a = self.cipher.decrypt(&cell_a)?;
        let b = self.cipher.decrypt(&cell_b)?;

        let swap = if idx_a < idx_b { a > b } else { a < b };
        let (keep_a, keep_b) = if swap { (b, a) } else { (a, b) };

        // Both cells are re-encrypted and written back even when the order
        // was already correct; the store cannot tell the cases apart.
        let new_a = self.cipher.encrypt(keep_a)?;
        let new_b = self.cipher.encrypt(keep_b)?;
        self.transport.write_pair(idx_a, idx_b, new_a, new_b).await
    }

    /// Fetch the final array, decrypt it, and return it with the store's
    /// operation counters.
    ///
    /// ## Errors
    /// `Integrity` if any cell fails authentication.
    pub async fn drain(&self) -> Result<SortOutcome, Error> {
        let snapshot = self.transport.final_array().await?;
        let values = snapshot
            .cells
            .iter()
            .map(|cell| self.cipher.decrypt(cell))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SortOutcome {
            values,
            comparisons: snapshot.comparisons,
            writes: snapshot.writes,
        })
    }
}
