use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{error::Error, helpers::Transport, store::FinalArray};

/// One store-visible sort operation, stripped of its opaque payloads. What
/// the trace keeps is exactly what an honest-but-curious server can see of
/// the access pattern: operation kinds and indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOp {
    GetPair { a: u32, b: u32 },
    WritePair { a: u32, b: u32 },
    GetMate { size: u32, index: u32 },
}

/// Transport wrapper that records the sort-phase operation sequence. Used to
/// assert obliviousness: for two inputs of the same length the recorded
/// traces must be identical.
#[derive(Clone, Debug)]
pub struct RecordingStore<T> {
    inner: T,
    trace: Arc<Mutex<Vec<TraceOp>>>,
}

impl<T> RecordingStore<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            trace: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of the operations recorded so far.
    pub fn trace(&self) -> Vec<TraceOp> {
        self.trace.lock().unwrap().clone()
    }

    fn record(&self, op: TraceOp) {
        self.trace.lock().unwrap().push(op);
    }
}

#[async_trait]
impl<T: Transport> Transport for RecordingStore<T> {
    async fn initialize_elements(&self, total: u32) -> Result<(), Error> {
        self.inner.initialize_elements(total).await
    }

    async fn upload_elements(&self, start: u32, cells: Vec<Bytes>) -> Result<(), Error> {
        self.inner.upload_elements(start, cells).await
    }

    async fn finalize_elements(&self) -> Result<u32, Error> {
        self.inner.finalize_elements().await
    }

    async fn read_element(&self, position: u32) -> Result<Bytes, Error> {
        self.inner.read_element(position).await
    }

    async fn initialize_hashes(&self, expected: u32) -> Result<(), Error> {
        self.inner.initialize_hashes(expected).await
    }

    async fn store_hash(&self, index: u32, cell: Bytes) -> Result<(), Error> {
        self.inner.store_hash(index, cell).await
    }

    async fn finalize_hashes(&self) -> Result<(u32, u32), Error> {
        self.inner.finalize_hashes().await
    }

    async fn use_hash_array_for_sorting(&self) -> Result<u32, Error> {
        self.inner.use_hash_array_for_sorting().await
    }

    async fn initialize(&self, cells: Vec<Bytes>) -> Result<u32, Error> {
        self.inner.initialize(cells).await
    }

    async fn get_pair(&self, a: u32, b: u32) -> Result<(Bytes, Bytes), Error> {
        self.record(TraceOp::GetPair { a, b });
        self.inner.get_pair(a, b).await
    }

    async fn write_pair(
        &self,
        a: u32,
        b: u32,
        cell_a: Bytes,
        cell_b: Bytes,
    ) -> Result<(), Error> {
        self.record(TraceOp::WritePair { a, b });
        self.inner.write_pair(a, b, cell_a, cell_b).await
    }

    async fn get_mate(&self, size: u32, seed: u64, index: u32) -> Result<u32, Error> {
        self.record(TraceOp::GetMate { size, index });
        self.inner.get_mate(size, seed, index).await
    }

    async fn final_array(&self) -> Result<FinalArray, Error> {
        self.inner.final_array().await
    }
}
