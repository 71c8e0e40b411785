//! Passphrase-based key derivation.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::constants::{KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};
use crate::errors::CryptoError;

/// Derive a 256-bit key from a passphrase and a per-blob salt.
///
/// Uses PBKDF2-HMAC-SHA-256 with [`PBKDF2_ITERATIONS`] iterations. The salt
/// must be exactly [`SALT_SIZE`] bytes; it is generated once per credential
/// blob and stored alongside the ciphertext.
///
/// # Example
///
/// ```
/// use pdm_crypto::{derive_key, generate_random_bytes};
///
/// let salt: [u8; 16] = generate_random_bytes();
/// let key = derive_key("correct horse battery staple", &salt).unwrap();
/// assert_eq!(key.len(), 32);
/// ```
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>, CryptoError> {
    if salt.len() != SALT_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "salt must be {} bytes, got {}",
            SALT_SIZE,
            salt.len()
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut *key);
    Ok(key)
}
