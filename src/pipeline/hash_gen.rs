use tracing::{debug, info, instrument};

use crate::{
    cipher::Cipher,
    error::Error,
    helpers::Transport,
    pipeline::hashing::HashFamily,
    protocol::SENTINEL,
};

/// Phase 1: stream the hash-position array.
///
/// For each stored element the client reads the ciphertext back, decrypts it,
/// computes its `k` Bloom positions, encrypts each position, and sends it to
/// the store's hash array. The array is announced at its padded size up
/// front: real positions are followed by sentinel ciphertexts up to the next
/// power of two, so the sorting phase always sees a power-of-two array with
/// the padding guaranteed to sink to the tail.
///
/// Returns the padded array size.
///
/// ## Errors
/// `InvalidArgument` for a zero element count or an `s·k` that overflows;
/// `Integrity` if a stored element fails decryption; otherwise propagates
/// transport failures.
#[instrument("generate_hash_array", skip_all, fields(s = s, k = family.k(), m = m))]
pub async fn generate_hash_array<T, C>(
    transport: &T,
    cipher: &C,
    family: &HashFamily,
    s: u32,
    m: u32,
) -> Result<u32, Error>
where
    T: Transport,
    C: Cipher,
{
    if s == 0 {
        return Err(Error::invalid_argument("element count must be positive"));
    }
    if m == 0 {
        return Err(Error::invalid_argument("filter width must be positive"));
    }

    let real = s
        .checked_mul(family.k())
        .ok_or_else(|| Error::invalid_argument("hash array size overflows"))?;
    let padded = real
        .checked_next_power_of_two()
        .ok_or_else(|| Error::invalid_argument("padded hash array size overflows"))?;

    transport.initialize_hashes(padded).await?;

    let mut index = 0;
    for position in 0..s {
        let cell = transport.read_element(position).await?;
        let element = cipher.decrypt(&cell)?;

        for fn_index in 0..family.k() {
            let hash_position = family.position(fn_index, element, m);
            transport
                .store_hash(index, cipher.encrypt(hash_position)?)
                .await?;
            index += 1;
        }

        if (position + 1) % 100 == 0 {
            debug!(done = position + 1, total = s, "hash generation progress");
        }
    }

    for pad_index in real..padded {
        transport
            .store_hash(pad_index, cipher.encrypt(SENTINEL)?)
            .await?;
    }

    let (received, expected) = transport.finalize_hashes().await?;
    if received != expected {
        return Err(Error::failed_precondition(format!(
            "hash array incomplete: {received} of {expected}"
        )));
    }

    info!(real, padded, "hash array complete");
    Ok(padded)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::generate_hash_array;
    use crate::{
        cipher::{Cipher, XorCipher},
        helpers::{InMemoryStore, Transport},
        pipeline::{hashing::HashFamily, upload::upload_elements},
        protocol::SENTINEL,
    };

    #[tokio::test]
    async fn streams_positions_and_pads_to_power_of_two() {
        let store = InMemoryStore::new();
        let cipher = XorCipher::new(6);
        let mut rng = StdRng::seed_from_u64(12);
        let family = HashFamily::generate(&mut rng, 3).unwrap();
        const M: u32 = 499;

        let values = upload_elements(&store, &cipher, 5, 10_000, &mut rng)
            .await
            .unwrap();
        let padded = generate_hash_array(&store, &cipher, &family, 5, M)
            .await
            .unwrap();

        // 5 elements × 3 functions = 15 real positions, padded to 16.
        assert_eq!(16, padded);

        let size = store.use_hash_array_for_sorting().await.unwrap();
        assert_eq!(padded, size);

        let snapshot = store.final_array().await.unwrap();
        let decrypted: Vec<u32> = snapshot
            .cells
            .iter()
            .map(|c| cipher.decrypt(c).unwrap())
            .collect();

        // Real slots hold the recomputed positions, in element-major order.
        let mut expected = Vec::new();
        for &value in &values {
            expected.extend(family.positions(value, M));
        }
        expected.push(SENTINEL);
        assert_eq!(expected, decrypted);
    }

    #[tokio::test]
    async fn power_of_two_input_needs_no_padding() {
        let store = InMemoryStore::new();
        let cipher = XorCipher::new(7);
        let mut rng = StdRng::seed_from_u64(13);
        let family = HashFamily::generate(&mut rng, 4).unwrap();

        upload_elements(&store, &cipher, 4, 1000, &mut rng)
            .await
            .unwrap();
        let padded = generate_hash_array(&store, &cipher, &family, 4, 997)
            .await
            .unwrap();
        assert_eq!(16, padded);
    }
}
