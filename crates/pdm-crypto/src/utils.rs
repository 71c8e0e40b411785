//! Randomness, identifiers, and the broker's clock.

use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Current Unix timestamp in milliseconds.
///
/// Single source of truth for wall-clock time across the broker. Components
/// with time-sensitive behavior take an explicit `now_ms` parameter instead
/// of calling this directly, so tests can drive the clock.
///
/// # Panics
///
/// Panics if the system clock is set before the Unix epoch.
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time is before Unix epoch")
        .as_millis() as u64
}

/// Fill a fixed-size array with cryptographically secure random bytes.
///
/// ```
/// use pdm_crypto::generate_random_bytes;
///
/// let salt: [u8; 16] = generate_random_bytes();
/// let nonce: [u8; 12] = generate_random_bytes();
/// ```
pub fn generate_random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate `n` cryptographically secure random bytes.
pub fn random_vec(n: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Mint a fresh random 128-bit identifier.
pub fn new_uuid() -> Uuid {
    Uuid::new_v4()
}
