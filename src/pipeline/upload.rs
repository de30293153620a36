use rand::Rng;
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, info, instrument};

use crate::{cipher::Cipher, error::Error, helpers::Transport};

/// Elements are streamed to the store in batches of this size.
pub const UPLOAD_BATCH: u32 = 64;

/// Phase 0: generate `s` random elements in `[0, range)`, encrypt each, and
/// upload them to the store. Returns the generated plaintexts so the caller
/// can verify storage and reuse them as ground truth.
///
/// ## Errors
/// `InvalidArgument` for a zero count or range; otherwise propagates cipher
/// and transport failures.
#[instrument("upload_elements", skip_all, fields(s = s, range = range))]
pub async fn upload_elements<T, C, R>(
    transport: &T,
    cipher: &C,
    s: u32,
    range: u32,
    rng: &mut R,
) -> Result<Vec<u32>, Error>
where
    T: Transport,
    C: Cipher,
    R: RngCore + CryptoRng,
{
    if s == 0 {
        return Err(Error::invalid_argument("element count must be positive"));
    }
    if range == 0 {
        return Err(Error::invalid_argument("element range must be positive"));
    }

    transport.initialize_elements(s).await?;

    let values: Vec<u32> = (0..s).map(|_| rng.gen_range(0..range)).collect();

    for (batch_index, batch) in values.chunks(UPLOAD_BATCH as usize).enumerate() {
        let start = u32::try_from(batch_index).map_err(|_| {
            Error::invalid_argument("too many batches")
        })? * UPLOAD_BATCH;
        let cells = batch
            .iter()
            .map(|&v| cipher.encrypt(v))
            .collect::<Result<Vec<_>, _>>()?;
        transport.upload_elements(start, cells).await?;
        debug!(start, len = batch.len(), "uploaded batch");
    }

    let stored = transport.finalize_elements().await?;
    if stored != s {
        return Err(Error::failed_precondition(format!(
            "store reports {stored} of {s} elements"
        )));
    }

    info!(s, "element upload complete");
    Ok(values)
}

/// Read back a sample of stored elements and check they decrypt to the
/// uploaded plaintexts.
///
/// ## Errors
/// `Integrity` if a stored cell decrypts to the wrong value or fails
/// authentication.
pub async fn verify_stored_elements<T, C>(
    transport: &T,
    cipher: &C,
    expected: &[u32],
    sample: usize,
) -> Result<(), Error>
where
    T: Transport,
    C: Cipher,
{
    for (position, &value) in expected.iter().enumerate().take(sample) {
        let cell = transport
            .read_element(u32::try_from(position).map_err(|_| {
                Error::invalid_argument("sample too large")
            })?)
            .await?;
        if cipher.decrypt(&cell)? != value {
            return Err(Error::Integrity);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::{upload_elements, verify_stored_elements, UPLOAD_BATCH};
    use crate::{
        cipher::{Cipher, XorCipher},
        error::Error,
        helpers::{InMemoryStore, Transport},
    };

    #[tokio::test]
    async fn uploads_and_verifies() {
        let store = InMemoryStore::new();
        let cipher = XorCipher::new(1);
        let mut rng = StdRng::seed_from_u64(8);

        // More than one batch, not a multiple of the batch size.
        let s = UPLOAD_BATCH * 2 + 11;
        let values = upload_elements(&store, &cipher, s, 50_000, &mut rng)
            .await
            .unwrap();

        assert_eq!(s as usize, values.len());
        assert!(values.iter().all(|&v| v < 50_000));
        verify_stored_elements(&store, &cipher, &values, values.len())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stored_cells_are_opaque_and_recoverable() {
        let store = InMemoryStore::new();
        let cipher = XorCipher::new(2);
        let mut rng = StdRng::seed_from_u64(9);

        let values = upload_elements(&store, &cipher, 5, 100, &mut rng)
            .await
            .unwrap();
        let cell = store.read_element(3).await.unwrap();
        assert_eq!(values[3], cipher.decrypt(&cell).unwrap());
    }

    #[tokio::test]
    async fn wrong_key_fails_verification() {
        let store = InMemoryStore::new();
        let mut rng = StdRng::seed_from_u64(10);
        let values = upload_elements(&store, &XorCipher::new(3), 4, 100, &mut rng)
            .await
            .unwrap();

        assert!(matches!(
            verify_stored_elements(&store, &XorCipher::new(4), &values, 4).await,
            Err(Error::Integrity)
        ));
    }

    #[tokio::test]
    async fn rejects_zero_count() {
        let store = InMemoryStore::new();
        let mut rng = StdRng::seed_from_u64(11);
        assert!(matches!(
            upload_elements(&store, &XorCipher::new(5), 0, 100, &mut rng).await,
            Err(Error::InvalidArgument(_))
        ));
    }
}
