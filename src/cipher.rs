use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Plaintexts are 32-bit unsigned integers, packed big-endian inside the
/// ciphertext. Wide enough for Bloom hash positions and the sentinel.
const PLAINTEXT_LEN: usize = 4;

/// Symmetric encryption of a single array cell, held by the client only.
///
/// Every implementation must be randomised: two encryptions of the same value
/// produce different byte strings, so the store cannot link cells by equality
/// and cannot tell whether a rewritten pair actually changed. Decryption is
/// authenticated and fails with [`Error::Integrity`] on any cell that was not
/// produced under the current key.
pub trait Cipher: Send + Sync {
    /// Encrypt `value` into a fresh opaque cell.
    ///
    /// ## Errors
    /// Returns an error if the underlying scheme rejects the operation.
    fn encrypt(&self, value: u32) -> Result<Bytes, Error>;

    /// Decrypt a cell back into its value.
    ///
    /// ## Errors
    /// Returns [`Error::Integrity`] if the cell fails authentication or was
    /// not produced by [`Cipher::encrypt`] under the current key.
    fn decrypt(&self, cell: &[u8]) -> Result<u32, Error>;
}

/// AES-256-GCM cell encryption. Cells are `nonce ‖ ciphertext ‖ tag` with a
/// fresh 96-bit nonce drawn from the OS RNG on every call.
#[derive(Clone)]
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

const NONCE_LEN: usize = 12;

impl AesGcmCipher {
    /// Create a cipher with a freshly generated random key.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Create a cipher from a 256-bit key shared with the upstream pipeline.
    #[must_use]
    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, value: u32) -> Result<Bytes, Error> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ct = self
            .cipher
            .encrypt(&nonce, value.to_be_bytes().as_ref())
            .map_err(|_| Error::Integrity)?;

        let mut cell = Vec::with_capacity(NONCE_LEN + ct.len());
        cell.extend_from_slice(&nonce);
        cell.extend_from_slice(&ct);
        Ok(cell.into())
    }

    fn decrypt(&self, cell: &[u8]) -> Result<u32, Error> {
        if cell.len() <= NONCE_LEN {
            return Err(Error::Integrity);
        }
        let (nonce, ct) = cell.split_at(NONCE_LEN);
        let pt = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ct)
            .map_err(|_| Error::Integrity)?;

        let bytes: [u8; PLAINTEXT_LEN] = pt.as_slice().try_into().map_err(|_| Error::Integrity)?;
        Ok(u32::from_be_bytes(bytes))
    }
}

/// Keystream toy cipher for tests and demos. Orders of magnitude cheaper than
/// AES-GCM and usable with a fixed key, but NOT a real AEAD; do not use it
/// against an adversarial store.
///
/// Cells are `nonce(8) ‖ masked value(4) ‖ tag(8)`; mask and tag are both
/// derived from SHA-256 over the key and nonce, so re-encryptions of the same
/// value still differ and bit flips are still detected.
#[derive(Clone)]
pub struct XorCipher {
    key: u64,
}

const XOR_NONCE_LEN: usize = 8;
const XOR_TAG_LEN: usize = 8;

impl XorCipher {
    #[must_use]
    pub fn new(key: u64) -> Self {
        Self { key }
    }

    fn keystream(&self, nonce: &[u8]) -> [u8; PLAINTEXT_LEN] {
        let digest = Sha256::new()
            .chain_update(b"ks")
            .chain_update(self.key.to_be_bytes())
            .chain_update(nonce)
            .finalize();
        digest[..PLAINTEXT_LEN].try_into().unwrap()
    }

    fn tag(&self, nonce: &[u8], masked: &[u8]) -> [u8; XOR_TAG_LEN] {
        let digest = Sha256::new()
            .chain_update(b"tag")
            .chain_update(self.key.to_be_bytes())
            .chain_update(nonce)
            .chain_update(masked)
            .finalize();
        digest[..XOR_TAG_LEN].try_into().unwrap()
    }
}

impl Cipher for XorCipher {
    fn encrypt(&self, value: u32) -> Result<Bytes, Error> {
        let mut nonce = [0_u8; XOR_NONCE_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

        let ks = self.keystream(&nonce);
        let mut masked = value.to_be_bytes();
        for (m, k) in masked.iter_mut().zip(ks) {
            *m ^= k;
        }

        let mut cell = Vec::with_capacity(XOR_NONCE_LEN + PLAINTEXT_LEN + XOR_TAG_LEN);
        cell.extend_from_slice(&nonce);
        cell.extend_from_slice(&masked);
        cell.extend_from_slice(&self.tag(&nonce, &masked));
        Ok(cell.into())
    }

    fn decrypt(&self, cell: &[u8]) -> Result<u32, Error> {
        if cell.len() != XOR_NONCE_LEN + PLAINTEXT_LEN + XOR_TAG_LEN {
            return Err(Error::Integrity);
        }
        let (nonce, rest) = cell.split_at(XOR_NONCE_LEN);
        let (masked, tag) = rest.split_at(PLAINTEXT_LEN);
        if self.tag(nonce, masked).as_slice() != tag {
            return Err(Error::Integrity);
        }

        let ks = self.keystream(nonce);
        let mut pt = [0_u8; PLAINTEXT_LEN];
        for (i, (m, k)) in masked.iter().zip(ks).enumerate() {
            pt[i] = m ^ k;
        }
        Ok(u32::from_be_bytes(pt))
    }
}
