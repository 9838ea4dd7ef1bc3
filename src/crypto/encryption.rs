//! Shared-secret encryption between a participant and the computation
//! cluster.
//!
//! An X25519 key agreement against the cluster's public key yields a 32-byte
//! shared secret, which keys an authenticated cipher over fixed-width value
//! cells. Decryption with the wrong key or nonce fails with a typed error
//! rather than producing plausible garbage.

use crate::error::{ClientError, ClientResult};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};

/// Fixed message a wallet signs once per session to derive its encryption
/// key. Losing the signing capability makes existing ciphertexts permanently
/// unreadable for that user.
pub const KEY_DERIVATION_MESSAGE: &str = "conviction-core/encryption-key/v1";

/// Record-level nonce length in bytes (stored on accounts as a u128)
pub const NONCE_LEN: usize = 16;

/// Ciphertext cell width: 16 bytes of little-endian value + 16-byte auth tag
pub const CELL_LEN: usize = 32;

const CELL_PLAINTEXT_LEN: usize = 16;

/// Encryption context bound to one (participant key, cluster key) pair
pub struct EncryptionContext {
    cipher: ChaCha20Poly1305,
    public_key: [u8; 32],
}

impl EncryptionContext {
    /// Derive a context from the participant's secret and the cluster's
    /// public key
    pub fn new(secret: StaticSecret, cluster_public: &[u8; 32]) -> Self {
        let public_key = PublicKey::from(&secret);
        let shared = secret.diffie_hellman(&PublicKey::from(*cluster_public));
        let cipher = ChaCha20Poly1305::new(Key::from_slice(shared.as_bytes()));

        Self {
            cipher,
            public_key: public_key.to_bytes(),
        }
    }

    /// Derive a context from a wallet signature over
    /// [`KEY_DERIVATION_MESSAGE`].
    ///
    /// The 64-byte signature is hashed into the X25519 secret, so the same
    /// wallet always recovers the same key.
    pub fn from_signature(signature: &[u8], cluster_public: &[u8; 32]) -> ClientResult<Self> {
        if signature.len() != 64 {
            return Err(ClientError::Validation(format!(
                "Key-derivation signature must be 64 bytes, got {}",
                signature.len()
            )));
        }

        let digest = Sha256::digest(signature);
        let mut secret_bytes = [0u8; 32];
        secret_bytes.copy_from_slice(&digest);

        Ok(Self::new(StaticSecret::from(secret_bytes), cluster_public))
    }

    /// The participant's X25519 public key, sent alongside encrypted args so
    /// the cluster can derive the same shared secret
    pub fn public_key(&self) -> [u8; 32] {
        self.public_key
    }

    /// Encrypt fixed-width values into 32-byte ciphertext cells.
    ///
    /// Deterministic for a given nonce; a nonce must never be reused for
    /// different plaintexts under the same key.
    pub fn encrypt_values(
        &self,
        values: &[u128],
        nonce: &[u8; NONCE_LEN],
    ) -> ClientResult<Vec<[u8; CELL_LEN]>> {
        let mut cells = Vec::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            let plaintext = value.to_le_bytes();
            let cell_nonce = cell_nonce(nonce, index);
            let ciphertext = self
                .cipher
                .encrypt(Nonce::from_slice(&cell_nonce), &plaintext[..])
                .map_err(|_| ClientError::Decryption("Cell encryption failed".to_string()))?;

            let mut cell = [0u8; CELL_LEN];
            cell.copy_from_slice(&ciphertext);
            cells.push(cell);
        }
        Ok(cells)
    }

    /// Decrypt ciphertext cells produced by [`Self::encrypt_values`].
    ///
    /// Fails loudly on any key/nonce/ciphertext mismatch.
    pub fn decrypt_values(
        &self,
        cells: &[[u8; CELL_LEN]],
        nonce: &[u8; NONCE_LEN],
    ) -> ClientResult<Vec<u128>> {
        let mut values = Vec::with_capacity(cells.len());
        for (index, cell) in cells.iter().enumerate() {
            let cell_nonce = cell_nonce(nonce, index);
            let plaintext = self
                .cipher
                .decrypt(Nonce::from_slice(&cell_nonce), &cell[..])
                .map_err(|_| {
                    ClientError::Decryption(format!(
                        "Cell {} does not authenticate under this key/nonce",
                        index
                    ))
                })?;

            if plaintext.len() != CELL_PLAINTEXT_LEN {
                return Err(ClientError::Decryption(format!(
                    "Cell {} decrypted to {} bytes",
                    index,
                    plaintext.len()
                )));
            }

            let mut buf = [0u8; CELL_PLAINTEXT_LEN];
            buf.copy_from_slice(&plaintext);
            values.push(u128::from_le_bytes(buf));
        }
        Ok(values)
    }
}

/// Per-cell cipher nonce: 8 bytes of the record nonce + the cell index.
/// Distinct cells under one record nonce never share a cipher nonce.
fn cell_nonce(nonce: &[u8; NONCE_LEN], index: usize) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[..8].copy_from_slice(&nonce[..8]);
    out[8..].copy_from_slice(&(index as u32).to_le_bytes());
    out
}

/// Generate a fresh X25519 secret
pub fn generate_secret() -> StaticSecret {
    StaticSecret::random_from_rng(OsRng)
}

/// Generate a fresh 16-byte encryption nonce
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Nonce bytes as the u128 stored on accounts
pub fn nonce_to_u128(nonce: &[u8; NONCE_LEN]) -> u128 {
    u128::from_le_bytes(*nonce)
}

/// Account-stored u128 back to nonce bytes
pub fn nonce_from_u128(value: u128) -> [u8; NONCE_LEN] {
    value.to_le_bytes()
}
