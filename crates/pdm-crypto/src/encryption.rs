//! Authenticated symmetric encryption (AES-256-GCM).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use zeroize::Zeroizing;

use crate::constants::{KEY_SIZE, NONCE_SIZE};
use crate::errors::CryptoError;
use crate::utils::generate_random_bytes;

/// Encrypt `plaintext` under `key` with a fresh random 96-bit nonce.
///
/// Returns `(iv, ciphertext)`; the 16-byte authentication tag is appended to
/// the ciphertext by the AEAD. Nonces are never reused: one is drawn from the
/// CSPRNG for every call.
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::EncryptionFailed)?;
    let iv: [u8; NONCE_SIZE] = generate_random_bytes();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    Ok((iv.to_vec(), ciphertext))
}

/// Decrypt a ciphertext produced by [`encrypt`].
///
/// Tag verification is constant-time inside the AEAD. Fails with the opaque
/// [`CryptoError::DecryptionFailed`] on any authentication failure; callers
/// must not (and cannot) tell a wrong key apart from tampered data.
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if iv.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "nonce must be {} bytes, got {}",
            NONCE_SIZE,
            iv.len()
        )));
    }

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::DecryptionFailed)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(Zeroizing::new(plaintext))
}
