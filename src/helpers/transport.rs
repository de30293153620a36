use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::Error,
    store::{FinalArray, StoreHandle},
};

/// The RPC surface of the oblivious store, as seen by the client.
///
/// Implementations deliver every call to one store session. The sort client
/// is strictly sequential: it issues the next operation only after the
/// previous one returned, and correctness of compare-exchange depends on that
/// ordering, so implementations must not reorder calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Phase 0: announce `total` encrypted elements.
    async fn initialize_elements(&self, total: u32) -> Result<(), Error>;

    /// Phase 0: store a batch of encrypted elements starting at `start`.
    async fn upload_elements(&self, start: u32, cells: Vec<Bytes>) -> Result<(), Error>;

    /// Phase 0: seal the element array. Returns the number of cells stored.
    async fn finalize_elements(&self) -> Result<u32, Error>;

    /// Phase 0/1: read back one encrypted element.
    async fn read_element(&self, position: u32) -> Result<Bytes, Error>;

    /// Phase 1: announce the hash array size.
    async fn initialize_hashes(&self, expected: u32) -> Result<(), Error>;

    /// Phase 1: store one encrypted hash value.
    async fn store_hash(&self, index: u32, cell: Bytes) -> Result<(), Error>;

    /// Phase 1: seal the hash array. Returns `(received, expected)`.
    async fn finalize_hashes(&self) -> Result<(u32, u32), Error>;

    /// Start sorting the finalized hash array. Returns the array size.
    async fn use_hash_array_for_sorting(&self) -> Result<u32, Error>;

    /// Start sorting a directly uploaded encrypted array. Returns its size.
    async fn initialize(&self, cells: Vec<Bytes>) -> Result<u32, Error>;

    /// Fetch the ciphertexts at two fixed indices.
    async fn get_pair(&self, a: u32, b: u32) -> Result<(Bytes, Bytes), Error>;

    /// Blindly overwrite two cells.
    async fn write_pair(&self, a: u32, b: u32, cell_a: Bytes, cell_b: Bytes)
        -> Result<(), Error>;

    /// Look up `π_{size,seed}[index]` in the store's matching oracle.
    async fn get_mate(&self, size: u32, seed: u64, index: u32) -> Result<u32, Error>;

    /// Fetch the full array and the session counters.
    async fn final_array(&self) -> Result<FinalArray, Error>;
}

/// In-process transport: calls go straight into a shared [`StoreHandle`].
/// This is what unit tests, benches and single-process pipelines run on; the
/// HTTP client in `net` is the wire-crossing equivalent.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    handle: Arc<StoreHandle>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying store, e.g. to share it with an HTTP server.
    #[must_use]
    pub fn handle(&self) -> Arc<StoreHandle> {
        Arc::clone(&self.handle)
    }
}

#[async_trait]
impl Transport for InMemoryStore {
    async fn initialize_elements(&self, total: u32) -> Result<(), Error> {
        self.handle.initialize_elements(total)
    }

    async fn upload_elements(&self, start: u32, cells: Vec<Bytes>) -> Result<(), Error> {
        self.handle.upload_elements(start, cells)
    }

    async fn finalize_elements(&self) -> Result<u32, Error> {
        self.handle.finalize_elements()
    }

    async fn read_element(&self, position: u32) -> Result<Bytes, Error> {
        self.handle.read_element(position)
    }

    async fn initialize_hashes(&self, expected: u32) -> Result<(), Error> {
        self.handle.initialize_hashes(expected)
    }

    async fn store_hash(&self, index: u32, cell: Bytes) -> Result<(), Error> {
        self.handle.store_hash(index, cell)
    }

    async fn finalize_hashes(&self) -> Result<(u32, u32), Error> {
        self.handle.finalize_hashes()
    }

    async fn use_hash_array_for_sorting(&self) -> Result<u32, Error> {
        self.handle.use_hash_array_for_sorting()
    }

    async fn initialize(&self, cells: Vec<Bytes>) -> Result<u32, Error> {
        self.handle.initialize(cells)
    }

    async fn get_pair(&self, a: u32, b: u32) -> Result<(Bytes, Bytes), Error> {
        self.handle.get_pair(a, b)
    }

    async fn write_pair(
        &self,
        a: u32,
        b: u32,
        cell_a: Bytes,
        cell_b: Bytes,
    ) -> Result<(), Error> {
        self.handle.write_pair(a, b, cell_a, cell_b)
    }

    async fn get_mate(&self, size: u32, seed: u64, index: u32) -> Result<u32, Error> {
        self.handle.get_mate(size, seed, index)
    }

    async fn final_array(&self) -> Result<FinalArray, Error> {
        Ok(self.handle.final_array())
    }
}
