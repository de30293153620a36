//! The upstream OBFI pipeline: element upload, hash-position generation, and
//! the hand-off into the oblivious sort.
//!
//! Phase 0 uploads `s` encrypted elements. Phase 1 turns them into an
//! encrypted array of Bloom hash positions padded to a power of two. Phase 2
//! switches the store to sorting mode and runs Randomized Shell Sort over the
//! padded array. The store only ever holds ciphertexts; every plaintext
//! touch happens on the client.

pub mod bloom;
pub mod hash_gen;
pub mod hashing;
pub mod upload;

use rand_core::{CryptoRng, RngCore};
use tracing::{info, instrument};

use crate::{
    cipher::Cipher,
    error::Error,
    helpers::Transport,
    protocol::sort::Orchestrator,
};

use bloom::BloomParams;
use hashing::HashFamily;

/// Pipeline sizing. `k` overrides the Bloom-derived hash count when set.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Number of elements to generate and upload.
    pub s: u32,
    /// Elements are drawn uniformly from `[0, range)`.
    pub range: u32,
    /// Number of hash functions; derived from `(s, fp_rate)` when `None`.
    pub k: Option<u32>,
    /// Target Bloom false-positive rate.
    pub fp_rate: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            s: 100,
            range: 10_000,
            k: None,
            fp_rate: 1e-3,
        }
    }
}

/// Outcome of a full pipeline run, decrypted client-side.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub bloom: BloomParams,
    pub array_size: u32,
    pub sorted: bool,
    pub comparisons: u64,
    pub writes: u64,
    pub values: Vec<u32>,
}

/// Run the complete pipeline against one store session.
///
/// ## Errors
/// Propagates every phase failure; see the phase functions. The sort result
/// is reported, not enforced: `sorted` is false in the (negligibly likely)
/// event the randomized schedule failed to sort.
#[instrument("pipeline", skip_all, fields(s = config.s))]
pub async fn run_pipeline<T, C, R>(
    transport: T,
    cipher: C,
    config: PipelineConfig,
    rng: &mut R,
) -> Result<PipelineReport, Error>
where
    T: Transport,
    C: Cipher,
    R: RngCore + CryptoRng,
{
    let bloom = BloomParams::derive(config.s, config.fp_rate)?;
    let k = config.k.unwrap_or(bloom.k);
    let family = HashFamily::generate(rng, k)?;

    let values = upload::upload_elements(&transport, &cipher, config.s, config.range, rng).await?;
    upload::verify_stored_elements(&transport, &cipher, &values, values.len().min(64)).await?;

    generate_and_sort(transport, cipher, &family, config.s, bloom, rng).await
}

/// Phases 1–2 split out so a caller with pre-uploaded elements can reuse
/// them.
async fn generate_and_sort<T, C, R>(
    transport: T,
    cipher: C,
    family: &HashFamily,
    s: u32,
    bloom: BloomParams,
    rng: &mut R,
) -> Result<PipelineReport, Error>
where
    T: Transport,
    C: Cipher,
    R: RngCore + CryptoRng,
{
    hash_gen::generate_hash_array(&transport, &cipher, family, s, bloom.m).await?;

    let array_size = transport.use_hash_array_for_sorting().await?;
    info!(array_size, "store switched to sorting mode");

    let orchestrator = Orchestrator::new(transport, cipher);
    orchestrator.sort(array_size, rng).await?;
    let outcome = orchestrator.drain().await?;

    let sorted = outcome.values.windows(2).all(|w| w[0] <= w[1]);
    info!(
        sorted,
        comparisons = outcome.comparisons,
        writes = outcome.writes,
        "pipeline complete"
    );

    Ok(PipelineReport {
        bloom,
        array_size,
        sorted,
        comparisons: outcome.comparisons,
        writes: outcome.writes,
        values: outcome.values,
    })
}
