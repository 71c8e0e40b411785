//! The session state machine.
//!
//! ```text
//! Locked --unlock(passphrase)--> Unlocked          (on success)
//! Locked --unlock(bad)---------> Locked + BadPassphrase
//! Unlocked --touch------------->Unlocked           (last_activity := now)
//! Unlocked --idle > timeout---> Expired            (router locks on sight)
//! Unlocked --lock-------------> Locked
//! Locked --restore token------> Unlocked           (token age <= timeout)
//! Locked --stale token--------> Locked + token cleared
//! ```

use std::sync::{Mutex, MutexGuard};

use pdm_store::SecretStore;
use serde_json::json;
use zeroize::Zeroizing;

use crate::credentials::{has_credentials, store_credentials, unlock_credentials, Credentials};
use crate::errors::SessionError;
use crate::{LAST_ACTIVITY_KEY, SESSION_ACTIVE_KEY, SESSION_PASSWORD_KEY, SESSION_TIMEOUT_MS};

/// Observable session state at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Locked,
    Unlocked,
    /// Unlocked but idle past the timeout; the caller must lock.
    Expired,
}

struct SessionState {
    #[allow(dead_code)] // held so the key lives exactly as long as the session
    derived_key: Zeroizing<[u8; 32]>,
    passphrase: Zeroizing<String>,
    user_did: Option<String>,
    last_activity_ms: u64,
}

/// Holds derived secrets in volatile memory and mirrors the restore token
/// into ephemeral storage as a write-through copy, never a second source of
/// truth.
pub struct SessionManager {
    store: SecretStore,
    state: Mutex<Option<SessionState>>,
}

fn lock_state(
    mutex: &Mutex<Option<SessionState>>,
) -> MutexGuard<'_, Option<SessionState>> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Session mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl SessionManager {
    pub fn new(store: SecretStore) -> Self {
        Self {
            store,
            state: Mutex::new(None),
        }
    }

    pub fn has_credentials(&self) -> bool {
        has_credentials(&self.store)
    }

    /// Encrypt and persist a credential blob (create or explicit re-store).
    pub fn install_credentials(
        &self,
        credentials: &Credentials,
        passphrase: &str,
    ) -> Result<(), SessionError> {
        store_credentials(&self.store, credentials, passphrase)
    }

    /// Unlock: derive, decrypt, hold secrets in memory, mirror the restore
    /// token. Returns the plaintext credentials for client initialization.
    pub fn unlock(&self, passphrase: &str, now_ms: u64) -> Result<Credentials, SessionError> {
        let (credentials, derived_key) = unlock_credentials(&self.store, passphrase)?;

        *lock_state(&self.state) = Some(SessionState {
            derived_key,
            passphrase: Zeroizing::new(passphrase.to_string()),
            user_did: None,
            last_activity_ms: now_ms,
        });
        self.mirror_token(passphrase, now_ms);
        tracing::info!("Session unlocked");
        Ok(credentials)
    }

    /// Drop all session secrets and the restore token.
    pub fn lock(&self) {
        *lock_state(&self.state) = None;
        self.store.remove_ephemeral(SESSION_ACTIVE_KEY);
        self.store.remove_ephemeral(SESSION_PASSWORD_KEY);
        self.store.remove_ephemeral(LAST_ACTIVITY_KEY);
        tracing::info!("Session locked");
    }

    /// Current state at `now_ms`, without side effects.
    pub fn status(&self, now_ms: u64) -> SessionStatus {
        match &*lock_state(&self.state) {
            None => SessionStatus::Locked,
            Some(state) if now_ms.saturating_sub(state.last_activity_ms) > SESSION_TIMEOUT_MS => {
                SessionStatus::Expired
            }
            Some(_) => SessionStatus::Unlocked,
        }
    }

    pub fn is_unlocked(&self, now_ms: u64) -> bool {
        self.status(now_ms) == SessionStatus::Unlocked
    }

    /// Record activity. `last_activity_ms` is monotone non-decreasing within
    /// a session; the ephemeral mirror is rewritten.
    pub fn touch(&self, now_ms: u64) {
        let mut guard = lock_state(&self.state);
        if let Some(state) = guard.as_mut() {
            state.last_activity_ms = state.last_activity_ms.max(now_ms);
            let last = state.last_activity_ms;
            let passphrase = state.passphrase.clone();
            drop(guard);
            self.mirror_token(&passphrase, last);
        }
    }

    /// Attempt to resume from the ephemeral restore token.
    ///
    /// A valid token (age within the timeout) re-runs the unlock path and
    /// returns the credentials; a stale or partial token is cleared.
    pub fn try_restore(&self, now_ms: u64) -> Result<Option<Credentials>, SessionError> {
        if lock_state(&self.state).is_some() {
            return Ok(None);
        }

        let active = self
            .store
            .get_ephemeral(SESSION_ACTIVE_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let passphrase = self
            .store
            .get_ephemeral(SESSION_PASSWORD_KEY)
            .and_then(|v| v.as_str().map(str::to_string));
        let last_activity = self
            .store
            .get_ephemeral(LAST_ACTIVITY_KEY)
            .and_then(|v| v.as_u64());

        let (Some(passphrase), Some(last_activity)) = (passphrase, last_activity) else {
            self.clear_token();
            return Ok(None);
        };
        if !active || now_ms.saturating_sub(last_activity) > SESSION_TIMEOUT_MS {
            tracing::debug!("Restore token stale, clearing");
            self.clear_token();
            return Ok(None);
        }

        match self.unlock(&passphrase, now_ms) {
            Ok(credentials) => {
                tracing::info!("Session restored from ephemeral token");
                Ok(Some(credentials))
            }
            Err(e) => {
                // Token no longer matches the blob (e.g. a re-store happened).
                self.clear_token();
                Err(e)
            }
        }
    }

    pub fn set_user_did(&self, did: &str) {
        if let Some(state) = lock_state(&self.state).as_mut() {
            state.user_did = Some(did.to_string());
        }
    }

    pub fn user_did(&self) -> Option<String> {
        lock_state(&self.state).as_ref().and_then(|s| s.user_did.clone())
    }

    fn mirror_token(&self, passphrase: &str, last_activity_ms: u64) {
        let results = [
            self.store.put_ephemeral(SESSION_ACTIVE_KEY, json!(true)),
            self.store
                .put_ephemeral(SESSION_PASSWORD_KEY, json!(passphrase)),
            self.store
                .put_ephemeral(LAST_ACTIVITY_KEY, json!(last_activity_ms)),
        ];
        for result in results {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to mirror restore token");
            }
        }
    }

    fn clear_token(&self) {
        self.store.remove_ephemeral(SESSION_ACTIVE_KEY);
        self.store.remove_ephemeral(SESSION_PASSWORD_KEY);
        self.store.remove_ephemeral(LAST_ACTIVITY_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    fn demo_credentials() -> Credentials {
        Credentials {
            api_key: "K".into(),
            private_key: Some("P".into()),
            user_id: None,
            app_id: "app-1".into(),
        }
    }

    fn manager_with_blob() -> (tempfile::TempDir, SessionManager) {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretStore::open(dir.path()).unwrap();
        let manager = SessionManager::new(store);
        manager
            .install_credentials(&demo_credentials(), "demo123")
            .unwrap();
        (dir, manager)
    }

    #[test]
    fn test_unlock_then_lock() {
        let (_dir, manager) = manager_with_blob();
        assert_eq!(manager.status(NOW), SessionStatus::Locked);

        let creds = manager.unlock("demo123", NOW).unwrap();
        assert_eq!(creds.api_key, "K");
        assert_eq!(manager.status(NOW), SessionStatus::Unlocked);

        manager.lock();
        assert_eq!(manager.status(NOW), SessionStatus::Locked);
    }

    #[test]
    fn test_bad_passphrase_stays_locked() {
        let (_dir, manager) = manager_with_blob();
        let err = manager.unlock("wrong", NOW).unwrap_err();
        assert!(err.to_string().contains("Failed to unlock"));
        assert_eq!(manager.status(NOW), SessionStatus::Locked);
    }

    #[test]
    fn test_inactivity_expires() {
        let (_dir, manager) = manager_with_blob();
        manager.unlock("demo123", NOW).unwrap();

        let just_within = NOW + SESSION_TIMEOUT_MS;
        assert_eq!(manager.status(just_within), SessionStatus::Unlocked);

        let past = NOW + SESSION_TIMEOUT_MS + 1;
        assert_eq!(manager.status(past), SessionStatus::Expired);
    }

    #[test]
    fn test_touch_is_monotone() {
        let (_dir, manager) = manager_with_blob();
        manager.unlock("demo123", NOW).unwrap();
        manager.touch(NOW + 10_000);
        // An out-of-order touch cannot move activity backwards.
        manager.touch(NOW + 5_000);

        assert_eq!(
            manager.status(NOW + 10_000 + SESSION_TIMEOUT_MS),
            SessionStatus::Unlocked
        );
        assert_eq!(
            manager.status(NOW + 10_000 + SESSION_TIMEOUT_MS + 1),
            SessionStatus::Expired
        );
    }

    #[test]
    fn test_touch_extends_session() {
        let (_dir, manager) = manager_with_blob();
        manager.unlock("demo123", NOW).unwrap();
        let later = NOW + SESSION_TIMEOUT_MS - 1;
        manager.touch(later);
        assert_eq!(
            manager.status(later + SESSION_TIMEOUT_MS),
            SessionStatus::Unlocked
        );
    }

    #[test]
    fn test_restore_within_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretStore::open(dir.path()).unwrap();
        let manager = SessionManager::new(store.clone());
        manager
            .install_credentials(&demo_credentials(), "demo123")
            .unwrap();
        manager.unlock("demo123", NOW).unwrap();

        // A "short restart": new manager over the same store handle.
        let restarted = SessionManager::new(store);
        let restored = restarted.try_restore(NOW + 60_000).unwrap();
        assert!(restored.is_some());
        assert_eq!(restarted.status(NOW + 60_000), SessionStatus::Unlocked);
    }

    #[test]
    fn test_restore_stale_token_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretStore::open(dir.path()).unwrap();
        let manager = SessionManager::new(store.clone());
        manager
            .install_credentials(&demo_credentials(), "demo123")
            .unwrap();
        manager.unlock("demo123", NOW).unwrap();

        let restarted = SessionManager::new(store.clone());
        let restored = restarted
            .try_restore(NOW + SESSION_TIMEOUT_MS + 1)
            .unwrap();
        assert!(restored.is_none());
        assert_eq!(store.get_ephemeral(SESSION_PASSWORD_KEY), None);
    }

    #[test]
    fn test_lock_clears_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretStore::open(dir.path()).unwrap();
        let manager = SessionManager::new(store.clone());
        manager
            .install_credentials(&demo_credentials(), "demo123")
            .unwrap();
        manager.unlock("demo123", NOW).unwrap();
        manager.lock();

        assert_eq!(store.get_ephemeral(SESSION_ACTIVE_KEY), None);
        assert_eq!(store.get_ephemeral(SESSION_PASSWORD_KEY), None);
        assert_eq!(store.get_ephemeral(LAST_ACTIVITY_KEY), None);
    }

    #[test]
    fn test_user_did_lives_with_session() {
        let (_dir, manager) = manager_with_blob();
        manager.unlock("demo123", NOW).unwrap();
        manager.set_user_did("did:nil:abc");
        assert_eq!(manager.user_did().as_deref(), Some("did:nil:abc"));

        manager.lock();
        assert_eq!(manager.user_did(), None);
    }
}
