//! Server side of the oblivious sort: an array of opaque ciphertext cells
//! plus the staging buffers the upstream pipeline fills before a sort begins.
//!
//! The store never decrypts anything. It answers fixed-index reads and blind
//! overwrites, counts them, and serves matchings from [`MatchingOracle`]. One
//! sort session is active at a time; all array state sits behind a single
//! mutex in [`StoreHandle`], while matching lookups bypass it entirely.

mod matching;

pub use matching::MatchingOracle;

use std::sync::Mutex;

use bytes::Bytes;
use metrics::increment_counter;

use crate::{
    error::Error,
    telemetry::metrics::{COMPARISONS, MATE_REQUESTS, WRITES},
};

/// A fixed-size staging buffer populated index-by-index by the client, then
/// sealed with an explicit finalize call. Used for both the phase-0 element
/// array and the phase-1 hash array.
#[derive(Debug, Default)]
struct Staging {
    cells: Vec<Bytes>,
    expected: u32,
    received: u32,
    finalized: bool,
}

impl Staging {
    fn initialize(&mut self, expected: u32) -> Result<(), Error> {
        if expected == 0 {
            return Err(Error::invalid_argument("expected size must be positive"));
        }
        self.cells = vec![Bytes::new(); expected as usize];
        self.expected = expected;
        self.received = 0;
        self.finalized = false;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.expected > 0
    }

    fn put(&mut self, index: u32, cell: Bytes) -> Result<(), Error> {
        if !self.is_initialized() {
            return Err(Error::failed_precondition("buffer not initialized"));
        }
        if index >= self.expected {
            return Err(Error::out_of_range(format!(
                "index {index} not in [0, {})",
                self.expected
            )));
        }
        self.cells[index as usize] = cell;
        self.received += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<u32, Error> {
        if self.received != self.expected {
            return Err(Error::failed_precondition(format!(
                "received {} of {} cells",
                self.received, self.expected
            )));
        }
        self.finalized = true;
        Ok(self.received)
    }
}

/// Final state of a sort session: the (still encrypted) array and the
/// operation counters accumulated since initialization.
#[derive(Debug, Clone)]
pub struct FinalArray {
    pub cells: Vec<Bytes>,
    pub comparisons: u64,
    pub writes: u64,
}

/// The encrypted-array state machine. See the module docs; this type holds
/// everything except the permutation cache, which lives beside it in
/// [`StoreHandle`] so matching reads do not take the array lock.
#[derive(Debug, Default)]
pub struct ObliviousStore {
    elements: Staging,
    hashes: Staging,
    cells: Vec<Bytes>,
    comparisons: u64,
    writes: u64,
}

impl ObliviousStore {
    /// Prepare to receive `total` encrypted elements (phase 0).
    ///
    /// ## Errors
    /// `InvalidArgument` if `total` is zero.
    pub fn initialize_elements(&mut self, total: u32) -> Result<(), Error> {
        self.elements.initialize(total)
    }

    /// Store a batch of encrypted elements starting at `start`. The batch is
    /// validated as a whole; a batch that spills past the announced total is
    /// rejected without storing anything.
    ///
    /// ## Errors
    /// `FailedPrecondition` before [`Self::initialize_elements`];
    /// `OutOfRange` if the batch spills past the announced total.
    pub fn upload_elements(&mut self, start: u32, cells: Vec<Bytes>) -> Result<(), Error> {
        if !self.elements.is_initialized() {
            return Err(Error::failed_precondition("buffer not initialized"));
        }
        let len = u32::try_from(cells.len())
            .map_err(|_| Error::invalid_argument("batch too large"))?;
        let end = start
            .checked_add(len)
            .ok_or_else(|| Error::out_of_range("batch index overflow"))?;
        if end > self.elements.expected {
            return Err(Error::out_of_range(format!(
                "batch [{start}, {end}) exceeds the announced total {}",
                self.elements.expected
            )));
        }
        for (i, cell) in cells.into_iter().enumerate() {
            self.elements.put(start + i as u32, cell)?;
        }
        Ok(())
    }

    /// Seal the element upload phase.
    ///
    /// ## Errors
    /// `FailedPrecondition` when fewer cells than announced were received.
    pub fn finalize_elements(&mut self) -> Result<u32, Error> {
        self.elements.finalize()
    }

    /// Return the encrypted element at `position`.
    ///
    /// ## Errors
    /// `FailedPrecondition` before finalization; `OutOfRange` out of bounds.
    pub fn read_element(&self, position: u32) -> Result<Bytes, Error> {
        if !self.elements.finalized {
            return Err(Error::failed_precondition("element data not finalized"));
        }
        self.elements
            .cells
            .get(position as usize)
            .cloned()
            .ok_or_else(|| {
                Error::out_of_range(format!("position {position} not in [0, {})", self.elements.expected))
            })
    }

    /// Prepare to receive `expected` encrypted hash values (phase 1).
    ///
    /// ## Errors
    /// `InvalidArgument` if `expected` is zero.
    pub fn initialize_hashes(&mut self, expected: u32) -> Result<(), Error> {
        self.hashes.initialize(expected)
    }

    /// Store one encrypted hash value.
    ///
    /// ## Errors
    /// `FailedPrecondition` before [`Self::initialize_hashes`]; `OutOfRange`
    /// if `index` is out of bounds.
    pub fn store_hash(&mut self, index: u32, cell: Bytes) -> Result<(), Error> {
        self.hashes.put(index, cell)
    }

    /// Seal the hash array.
    ///
    /// ## Errors
    /// `FailedPrecondition` when fewer cells than announced were received.
    pub fn finalize_hashes(&mut self) -> Result<(u32, u32), Error> {
        let received = self.hashes.finalize()?;
        Ok((received, self.hashes.expected))
    }

    /// Copy the finalized hash array into the sorting array and reset the
    /// session: counters back to zero. Returns the array size.
    ///
    /// ## Errors
    /// `FailedPrecondition` if the hash array is not finalized.
    pub fn use_hash_array_for_sorting(&mut self) -> Result<u32, Error> {
        if !self.hashes.finalized {
            return Err(Error::failed_precondition("hash array not finalized"));
        }
        self.cells = self.hashes.cells.clone();
        self.comparisons = 0;
        self.writes = 0;
        Ok(self.len())
    }

    /// Replace the sorting array directly, resetting counters. Returns the
    /// array size.
    ///
    /// ## Errors
    /// `InvalidArgument` for an empty array.
    pub fn initialize(&mut self, cells: Vec<Bytes>) -> Result<u32, Error> {
        if cells.is_empty() {
            return Err(Error::invalid_argument("array must not be empty"));
        }
        self.cells = cells;
        self.comparisons = 0;
        self.writes = 0;
        Ok(self.len())
    }

    /// Return the ciphertexts at two fixed indices. Counts one comparison.
    ///
    /// ## Errors
    /// `OutOfRange` if either index is outside the array.
    pub fn get_pair(&mut self, a: u32, b: u32) -> Result<(Bytes, Bytes), Error> {
        self.check_index(a)?;
        self.check_index(b)?;
        self.comparisons += 1;
        increment_counter!(COMPARISONS);
        Ok((
            self.cells[a as usize].clone(),
            self.cells[b as usize].clone(),
        ))
    }

    /// Blindly overwrite two cells with fresh ciphertexts. Counts one write.
    ///
    /// ## Errors
    /// `OutOfRange` if either index is outside the array.
    pub fn write_pair(
        &mut self,
        a: u32,
        b: u32,
        cell_a: Bytes,
        cell_b: Bytes,
    ) -> Result<(), Error> {
        self.check_index(a)?;
        self.check_index(b)?;
        self.cells[a as usize] = cell_a;
        self.cells[b as usize] = cell_b;
        self.writes += 1;
        increment_counter!(WRITES);
        Ok(())
    }

    /// The full array plus the session counters.
    pub fn final_array(&self) -> FinalArray {
        FinalArray {
            cells: self.cells.clone(),
            comparisons: self.comparisons,
            writes: self.writes,
        }
    }

    fn len(&self) -> u32 {
        u32::try_from(self.cells.len()).unwrap()
    }

    fn check_index(&self, index: u32) -> Result<(), Error> {
        if (index as usize) < self.cells.len() {
            Ok(())
        } else {
            Err(Error::out_of_range(format!(
                "index {index} not in [0, {})",
                self.cells.len()
            )))
        }
    }
}

/// One sort session's worth of shared state: the store behind its session
/// mutex, and the matching oracle beside it. Array operations serialise on
/// the mutex; `get_mate` never touches it, so matching lookups can be served
/// while a pair operation is in flight.
#[derive(Debug, Default)]
pub struct StoreHandle {
    state: Mutex<ObliviousStore>,
    matchings: MatchingOracle,
}

impl StoreHandle {
    pub fn initialize_elements(&self, total: u32) -> Result<(), Error> {
        self.state.lock().unwrap().initialize_elements(total)
    }

    pub fn upload_elements(&self, start: u32, cells: Vec<Bytes>) -> Result<(), Error> {
        self.state.lock().unwrap().upload_elements(start, cells)
    }

    pub fn finalize_elements(&self) -> Result<u32, Error> {
        self.state.lock().unwrap().finalize_elements()
    }

    pub fn read_element(&self, position: u32) -> Result<Bytes, Error> {
        self.state.lock().unwrap().read_element(position)
    }

    pub fn initialize_hashes(&self, expected: u32) -> Result<(), Error> {
        self.state.lock().unwrap().initialize_hashes(expected)
    }

    pub fn store_hash(&self, index: u32, cell: Bytes) -> Result<(), Error> {
        self.state.lock().unwrap().store_hash(index, cell)
    }

    pub fn finalize_hashes(&self) -> Result<(u32, u32), Error> {
        self.state.lock().unwrap().finalize_hashes()
    }

    /// Switch the session to sorting the finalized hash array. Clears the
    /// matching cache along with the counters.
    pub fn use_hash_array_for_sorting(&self) -> Result<u32, Error> {
        let size = self.state.lock().unwrap().use_hash_array_for_sorting()?;
        self.matchings.clear();
        Ok(size)
    }

    /// Start a session directly from a client-supplied encrypted array.
    pub fn initialize(&self, cells: Vec<Bytes>) -> Result<u32, Error> {
        let size = self.state.lock().unwrap().initialize(cells)?;
        self.matchings.clear();
        Ok(size)
    }

    pub fn get_pair(&self, a: u32, b: u32) -> Result<(Bytes, Bytes), Error> {
        self.state.lock().unwrap().get_pair(a, b)
    }

    pub fn write_pair(&self, a: u32, b: u32, cell_a: Bytes, cell_b: Bytes) -> Result<(), Error> {
        self.state.lock().unwrap().write_pair(a, b, cell_a, cell_b)
    }

    pub fn get_mate(&self, size: u32, seed: u64, index: u32) -> Result<u32, Error> {
        increment_counter!(MATE_REQUESTS);
        self.matchings.mate(size, seed, index)
    }

    pub fn final_array(&self) -> FinalArray {
        self.state.lock().unwrap().final_array()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{ObliviousStore, StoreHandle};
    use crate::error::Error;

    fn cell(byte: u8) -> Bytes {
        Bytes::from(vec![byte; 4])
    }

    fn store_with(n: u8) -> ObliviousStore {
        let mut store = ObliviousStore::default();
        store.initialize((0..n).map(cell).collect()).unwrap();
        store
    }

    #[test]
    fn initialize_rejects_empty_array() {
        let mut store = ObliviousStore::default();
        assert!(matches!(
            store.initialize(vec![]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn get_pair_returns_current_cells_and_counts() {
        let mut store = store_with(4);
        let (a, b) = store.get_pair(1, 3).unwrap();
        assert_eq!((cell(1), cell(3)), (a, b));
        assert_eq!(1, store.final_array().comparisons);
        assert_eq!(0, store.final_array().writes);
    }

    #[test]
    fn write_pair_overwrites_and_counts() {
        let mut store = store_with(4);
        store.write_pair(0, 2, cell(9), cell(8)).unwrap();
        let snapshot = store.final_array();
        assert_eq!(cell(9), snapshot.cells[0]);
        assert_eq!(cell(8), snapshot.cells[2]);
        assert_eq!(1, snapshot.writes);
    }

    #[test]
    fn pair_ops_reject_out_of_range() {
        let mut store = store_with(4);
        assert!(matches!(store.get_pair(0, 4), Err(Error::OutOfRange(_))));
        assert!(matches!(store.get_pair(4, 0), Err(Error::OutOfRange(_))));
        assert!(matches!(
            store.write_pair(0, 4, cell(0), cell(0)),
            Err(Error::OutOfRange(_))
        ));
        // Rejected calls are not counted.
        let snapshot = store.final_array();
        assert_eq!((0, 0), (snapshot.comparisons, snapshot.writes));
    }

    #[test]
    fn counters_accumulate_and_reset_on_initialize() {
        let mut store = store_with(2);
        for _ in 0..3 {
            store.get_pair(0, 1).unwrap();
            store.write_pair(0, 1, cell(1), cell(2)).unwrap();
        }
        let before = store.final_array();
        assert_eq!((3, 3), (before.comparisons, before.writes));

        store.initialize(vec![cell(0), cell(1)]).unwrap();
        let after = store.final_array();
        assert_eq!((0, 0), (after.comparisons, after.writes));
    }

    #[test]
    fn element_phase_state_machine() {
        let mut store = ObliviousStore::default();
        assert!(matches!(
            store.read_element(0),
            Err(Error::FailedPrecondition(_))
        ));
        assert!(matches!(
            store.initialize_elements(0),
            Err(Error::InvalidArgument(_))
        ));

        store.initialize_elements(3).unwrap();
        store.upload_elements(0, vec![cell(0), cell(1)]).unwrap();
        // Finalizing an incomplete upload fails and leaves the phase open.
        assert!(matches!(
            store.finalize_elements(),
            Err(Error::FailedPrecondition(_))
        ));
        assert!(matches!(
            store.upload_elements(2, vec![cell(2), cell(3)]),
            Err(Error::OutOfRange(_))
        ));

        store.upload_elements(2, vec![cell(2)]).unwrap();
        assert_eq!(3, store.finalize_elements().unwrap());
        assert_eq!(cell(1), store.read_element(1).unwrap());
        assert!(matches!(store.read_element(3), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn hash_phase_state_machine() {
        let mut store = ObliviousStore::default();
        assert!(matches!(
            store.store_hash(0, cell(0)),
            Err(Error::FailedPrecondition(_))
        ));
        assert!(matches!(
            store.use_hash_array_for_sorting(),
            Err(Error::FailedPrecondition(_))
        ));

        store.initialize_hashes(2).unwrap();
        store.store_hash(0, cell(7)).unwrap();
        assert!(matches!(
            store.use_hash_array_for_sorting(),
            Err(Error::FailedPrecondition(_))
        ));
        store.store_hash(1, cell(6)).unwrap();
        assert_eq!((2, 2), store.finalize_hashes().unwrap());

        assert_eq!(2, store.use_hash_array_for_sorting().unwrap());
        let snapshot = store.final_array();
        assert_eq!(vec![cell(7), cell(6)], snapshot.cells);
    }

    #[test]
    fn use_hash_array_resets_counters() {
        let mut store = ObliviousStore::default();
        store.initialize_hashes(2).unwrap();
        store.store_hash(0, cell(0)).unwrap();
        store.store_hash(1, cell(1)).unwrap();
        store.finalize_hashes().unwrap();
        store.use_hash_array_for_sorting().unwrap();

        store.get_pair(0, 1).unwrap();
        assert_eq!(1, store.final_array().comparisons);
        store.use_hash_array_for_sorting().unwrap();
        assert_eq!(0, store.final_array().comparisons);
    }

    #[test]
    fn handle_serves_mates_without_array_state() {
        let handle = StoreHandle::default();
        // No array yet; matchings are still available.
        let mate = handle.get_mate(8, 99, 3).unwrap();
        assert!(mate < 8);
        assert_eq!(mate, handle.get_mate(8, 99, 3).unwrap());
    }
}
