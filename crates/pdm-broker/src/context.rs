//! The broker's composition root.

use std::sync::Arc;

use pdm_client::StorageClient;
use pdm_net::NetworkAdapter;
use pdm_policy::OriginPolicy;
use pdm_session::{Credentials, SessionManager};
use pdm_store::SecretStore;

use crate::config::BrokerConfig;
use crate::error::BrokerError;

/// Everything the router needs, constructed once at process start and passed
/// explicitly. Components own their state; the context only wires them.
pub struct BrokerContext {
    pub config: BrokerConfig,
    pub store: SecretStore,
    pub session: SessionManager,
    pub policy: OriginPolicy,
    pub client: StorageClient,
}

impl BrokerContext {
    pub fn new(config: BrokerConfig) -> Result<Arc<Self>, BrokerError> {
        let store = match &config.data_dir {
            Some(dir) => SecretStore::open(dir)?,
            None => SecretStore::open_default()?,
        };
        Self::with_store(config, store)
    }

    /// Build over an existing store handle. A new context over a live store
    /// models a short background restart: persistent and ephemeral state are
    /// both inherited, so `restore_session` can skip re-unlock.
    pub fn with_store(config: BrokerConfig, store: SecretStore) -> Result<Arc<Self>, BrokerError> {
        let adapter = NetworkAdapter::new(&config.server_url);
        let session = SessionManager::new(store.clone());
        let policy = OriginPolicy::load(store.clone())?;
        let client = StorageClient::new(store.clone(), adapter);

        Ok(Arc::new(Self {
            config,
            store,
            session,
            policy,
            client,
        }))
    }

    /// Resume a session from the ephemeral restore token, if one is valid.
    pub async fn restore_session(&self, now_ms: u64) -> Result<bool, BrokerError> {
        match self.session.try_restore(now_ms)? {
            Some(credentials) => {
                let did = self.client.initialize(&credentials).await?;
                self.session.set_user_did(&did);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether a credential blob exists (the UI's `CHECK_CREDENTIALS`).
    pub fn check_credentials(&self) -> bool {
        self.session.has_credentials()
    }

    /// Install or re-store the credential blob (the UI's
    /// `STORE_CREDENTIALS`).
    pub fn store_credentials(
        &self,
        credentials: &Credentials,
        passphrase: &str,
    ) -> Result<(), BrokerError> {
        self.session.install_credentials(credentials, passphrase)?;
        Ok(())
    }
}
