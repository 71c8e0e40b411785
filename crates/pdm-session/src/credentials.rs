//! The credential blob: plaintext shape, ciphertext form, install and unlock.

use pdm_crypto::{decrypt, derive_key, encrypt, generate_random_bytes, SALT_SIZE};
use pdm_store::SecretStore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::SessionError;
use crate::CREDENTIALS_KEY;

/// Plaintext credentials held only inside an unlocked session and handed to
/// the storage client at initialization.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub app_id: String,
}

impl Credentials {
    /// The key the remote service authenticates the user by.
    pub fn signing_key(&self) -> &str {
        self.private_key.as_deref().unwrap_or(&self.api_key)
    }
}

// Secrets never appear in Debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("user_id", &self.user_id)
            .field("app_id", &self.app_id)
            .finish()
    }
}

/// Ciphertext form of the credentials as persisted: hex-encoded
/// `(salt, iv, ciphertext)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialBlob {
    pub salt: String,
    pub iv: String,
    pub data: String,
}

/// Whether a credential blob has been installed.
pub fn has_credentials(store: &SecretStore) -> bool {
    matches!(
        store.get_persistent::<CredentialBlob>(CREDENTIALS_KEY),
        Ok(Some(_))
    )
}

/// Encrypt and persist credentials under a passphrase-derived key.
///
/// This is the only write path for the blob; calling it again replaces the
/// blob wholesale (explicit re-store).
pub fn store_credentials(
    store: &SecretStore,
    credentials: &Credentials,
    passphrase: &str,
) -> Result<(), SessionError> {
    let salt: [u8; SALT_SIZE] = generate_random_bytes();
    let key = derive_key(passphrase, &salt)?;
    let plaintext = Zeroizing::new(
        serde_json::to_vec(credentials)
            .map_err(|e| SessionError::InvalidBlob(e.to_string()))?,
    );
    let (iv, ciphertext) = encrypt(&key, &plaintext)?;

    let blob = CredentialBlob {
        salt: hex::encode(salt),
        iv: hex::encode(iv),
        data: hex::encode(ciphertext),
    };
    store.put_persistent(CREDENTIALS_KEY, &blob)?;
    tracing::info!("Stored encrypted credential blob");
    Ok(())
}

/// Decrypt the stored blob with `passphrase`.
///
/// Returns the plaintext credentials and the derived key.
pub(crate) fn unlock_credentials(
    store: &SecretStore,
    passphrase: &str,
) -> Result<(Credentials, Zeroizing<[u8; 32]>), SessionError> {
    let blob: CredentialBlob = store
        .get_persistent(CREDENTIALS_KEY)?
        .ok_or(SessionError::NoCredentials)?;

    let salt = hex::decode(&blob.salt)
        .map_err(|e| SessionError::InvalidBlob(format!("bad salt encoding: {e}")))?;
    let iv = hex::decode(&blob.iv)
        .map_err(|e| SessionError::InvalidBlob(format!("bad iv encoding: {e}")))?;
    let ciphertext = hex::decode(&blob.data)
        .map_err(|e| SessionError::InvalidBlob(format!("bad ciphertext encoding: {e}")))?;

    let key = derive_key(passphrase, &salt)?;
    let plaintext = decrypt(&key, &iv, &ciphertext)?;
    let credentials: Credentials = serde_json::from_slice(&plaintext)
        .map_err(|e| SessionError::InvalidBlob(format!("bad plaintext shape: {e}")))?;

    Ok((credentials, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_credentials() -> Credentials {
        Credentials {
            api_key: "K".into(),
            private_key: Some("P".into()),
            user_id: None,
            app_id: "app-1".into(),
        }
    }

    fn temp_store() -> (tempfile::TempDir, SecretStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_install_and_unlock() {
        let (_dir, store) = temp_store();
        store_credentials(&store, &demo_credentials(), "demo123").unwrap();
        assert!(has_credentials(&store));

        let (creds, _key) = unlock_credentials(&store, "demo123").unwrap();
        assert_eq!(creds, demo_credentials());
    }

    #[test]
    fn test_wrong_passphrase_is_bad_passphrase() {
        let (_dir, store) = temp_store();
        store_credentials(&store, &demo_credentials(), "demo123").unwrap();

        let err = unlock_credentials(&store, "wrong").unwrap_err();
        assert!(matches!(err, SessionError::BadPassphrase));
        assert!(err.to_string().contains("Failed to unlock"));
    }

    #[test]
    fn test_no_blob_is_distinct_error() {
        let (_dir, store) = temp_store();
        let err = unlock_credentials(&store, "demo123").unwrap_err();
        assert!(matches!(err, SessionError::NoCredentials));
    }

    #[test]
    fn test_restore_replaces_blob() {
        let (_dir, store) = temp_store();
        store_credentials(&store, &demo_credentials(), "demo123").unwrap();

        let updated = Credentials {
            api_key: "K2".into(),
            ..demo_credentials()
        };
        store_credentials(&store, &updated, "newpass").unwrap();

        assert!(unlock_credentials(&store, "demo123").is_err());
        let (creds, _) = unlock_credentials(&store, "newpass").unwrap();
        assert_eq!(creds.api_key, "K2");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let output = format!("{:?}", demo_credentials());
        assert!(!output.contains('K') || output.contains("[REDACTED]"));
        assert!(!output.contains("\"P\""));
    }

    #[test]
    fn test_signing_key_prefers_private_key() {
        let creds = demo_credentials();
        assert_eq!(creds.signing_key(), "P");

        let without = Credentials {
            private_key: None,
            ..demo_credentials()
        };
        assert_eq!(without.signing_key(), "K");
    }
}
