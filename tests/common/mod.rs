//! Shared helpers for the end-to-end suite.

pub mod server;

use std::sync::{Arc, Once};

use pdm_bridge::{ContentRelay, PageShim, WindowBus, WindowId};
use pdm_broker::{ActionRouter, BrokerConfig, BrokerContext};
use pdm_session::Credentials;
use pdm_store::SecretStore;

pub const PAGE_WINDOW: WindowId = WindowId(1);

static TRACING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn demo_credentials() -> Credentials {
    Credentials {
        api_key: "K".into(),
        private_key: Some("P".into()),
        user_id: None,
        app_id: "demo-app".into(),
    }
}

/// A full broker over a temp store, pointed at `server_url`, with the demo
/// credential blob installed under passphrase `demo123`.
pub fn broker_over(dir: &tempfile::TempDir, server_url: &str) -> Arc<ActionRouter> {
    let store = SecretStore::open(dir.path()).unwrap();
    broker_with_store(store, server_url)
}

pub fn broker_with_store(store: SecretStore, server_url: &str) -> Arc<ActionRouter> {
    init_tracing();
    let ctx =
        BrokerContext::with_store(BrokerConfig::with_server_url(server_url), store).unwrap();
    if !ctx.check_credentials() {
        ctx.store_credentials(&demo_credentials(), "demo123").unwrap();
    }
    Arc::new(ActionRouter::new(ctx))
}

/// Wire a page (shim + relay) to a router over a fresh window bus.
pub fn page_for(router: &Arc<ActionRouter>, origin: &str) -> PageShim {
    let bus = WindowBus::new();
    ContentRelay::new(bus.clone(), PAGE_WINDOW, origin, router).spawn();
    PageShim::new(bus, PAGE_WINDOW, origin)
}
