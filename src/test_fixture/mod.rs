//! In-memory world for tests and benches: a store, a cheap cipher, and an
//! orchestrator wired together, plus a recording transport for access-pattern
//! assertions.

pub mod logging;
mod recording;

pub use recording::{RecordingStore, TraceOp};

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    cipher::XorCipher,
    helpers::InMemoryStore,
    protocol::sort::{Orchestrator, SortOutcome},
};

/// Fixed cipher key for fixtures. Tests that care about key handling build
/// their own cipher.
const FIXTURE_KEY: u64 = 0x5EED_CAFE;

/// Upload `values` into a fresh in-memory store and run a full sort with a
/// seeded rng. Panics on any protocol error; fixture only.
///
/// # Panics
/// If the sort fails, which indicates a bug in the protocol under test.
pub async fn run_sort(values: &[u32], rng_seed: u64) -> SortOutcome {
    let orchestrator = Orchestrator::new(InMemoryStore::new(), XorCipher::new(FIXTURE_KEY));
    let n = orchestrator.upload(values).await.unwrap();
    let mut rng = StdRng::seed_from_u64(rng_seed);
    orchestrator.sort(n, &mut rng).await.unwrap();
    orchestrator.drain().await.unwrap()
}

/// Like [`run_sort`], but returns the store-observed operation trace next to
/// the outcome.
///
/// # Panics
/// If the sort fails, which indicates a bug in the protocol under test.
pub async fn run_recorded_sort(values: &[u32], rng_seed: u64) -> (SortOutcome, Vec<TraceOp>) {
    let store = RecordingStore::new(InMemoryStore::new());
    let orchestrator = Orchestrator::new(store, XorCipher::new(FIXTURE_KEY));
    let n = orchestrator.upload(values).await.unwrap();
    let mut rng = StdRng::seed_from_u64(rng_seed);
    orchestrator.sort(n, &mut rng).await.unwrap();
    let outcome = orchestrator.drain().await.unwrap();
    let trace = orchestrator.transport().trace();
    (outcome, trace)
}

/// Bench entry point: sort `batchsize` random values in memory and assert the
/// result is ordered.
///
/// # Panics
/// If `batchsize` is not a power of two or the sort fails.
pub async fn sort(batchsize: usize) {
    let mut rng = rand::thread_rng();
    let values: Vec<u32> = (0..batchsize).map(|_| rand::Rng::gen(&mut rng)).collect();

    let orchestrator = Orchestrator::new(InMemoryStore::new(), XorCipher::new(FIXTURE_KEY));
    let n = orchestrator.upload(&values).await.unwrap();
    orchestrator.sort(n, &mut rng).await.unwrap();

    let outcome = orchestrator.drain().await.unwrap();
    assert!(outcome.values.windows(2).all(|w| w[0] <= w[1]));
}
