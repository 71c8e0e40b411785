//! Broker configuration.

use std::path::PathBuf;

/// Default remote storage endpoint.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Configuration for one broker process.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Base URL of the remote storage service.
    pub server_url: String,

    /// Data directory for the secret store; `None` uses the platform
    /// default.
    pub data_dir: Option<PathBuf>,
}

impl BrokerConfig {
    /// Load configuration from environment variables.
    ///
    /// `PDM_SERVER_URL` selects the remote service; `PDM_DATA_DIR`
    /// overrides the store location (useful for diagnostics).
    pub fn from_env() -> Self {
        let server_url =
            std::env::var("PDM_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        let data_dir = std::env::var("PDM_DATA_DIR").ok().map(PathBuf::from);
        Self {
            server_url,
            data_dir,
        }
    }

    pub fn with_server_url(server_url: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
            data_dir: None,
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            data_dir: None,
        }
    }
}
