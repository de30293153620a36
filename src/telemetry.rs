//! Metric names emitted by the store. No recorder is installed by the crate;
//! counters are advisory and mirror the functional counters returned by
//! `GetFinalArray`.

pub mod metrics {
    pub const COMPARISONS: &str = "store.comparisons";
    pub const WRITES: &str = "store.writes";
    pub const MATE_REQUESTS: &str = "store.mate_requests";
    pub const PERMUTATIONS_BUILT: &str = "store.permutations_built";
}
