//! The adapter facade and its auxiliary worker task.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch, Mutex};

use crate::errors::NetError;
use crate::{CONNECT_TIMEOUT, PING_TIMEOUT, REQUEST_TIMEOUT, SETUP_TIMEOUT};

/// HTTP methods the remote storage contract uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

type SetupOutcome = Result<AuxiliaryHandle, NetError>;

enum Slot {
    /// No auxiliary; next call starts one.
    Empty,
    /// Setup in flight; concurrent callers share the settlement.
    Starting(watch::Receiver<Option<SetupOutcome>>),
    Ready(AuxiliaryHandle),
    /// Setup failed; everything fails fast until `reinitialize`.
    Failed,
}

#[derive(Clone)]
struct AuxiliaryHandle {
    tx: mpsc::Sender<AuxRequest>,
}

enum AuxRequest {
    Call {
        endpoint: String,
        method: Method,
        body: Option<Value>,
        reply: oneshot::Sender<Result<Value, NetError>>,
    },
    Ping {
        reply: oneshot::Sender<()>,
    },
}

/// Issues JSON-over-HTTP calls to the remote service via a single auxiliary
/// worker task. At most one auxiliary exists per adapter; creation is
/// idempotent under concurrency.
#[derive(Clone)]
pub struct NetworkAdapter {
    inner: Arc<AdapterInner>,
}

struct AdapterInner {
    base_url: String,
    slot: Mutex<Slot>,
}

impl NetworkAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                base_url: base_url.trim_end_matches('/').to_string(),
                slot: Mutex::new(Slot::Empty),
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Call the remote service: `(endpoint, method, body?)` → parsed JSON.
    ///
    /// Fails with [`NetError::Timeout`] after [`REQUEST_TIMEOUT`], with
    /// [`NetError::Upstream`] on non-2xx, and fast with
    /// [`NetError::AdapterUnavailable`] while the adapter is torn down.
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Value, NetError> {
        let handle = self.ensure_auxiliary().await?;
        let (reply_tx, reply_rx) = oneshot::channel();
        handle
            .tx
            .send(AuxRequest::Call {
                endpoint: endpoint.to_string(),
                method,
                body,
                reply: reply_tx,
            })
            .await
            .map_err(|_| NetError::AdapterUnavailable)?;

        match tokio::time::timeout(REQUEST_TIMEOUT, reply_rx).await {
            Err(_) => Err(NetError::Timeout),
            Ok(Err(_)) => Err(NetError::AdapterUnavailable),
            Ok(Ok(result)) => result,
        }
    }

    /// Liveness probe. A stale auxiliary is dropped and recreated once;
    /// returns an error only if the replacement cannot be brought up either.
    pub async fn ping(&self) -> Result<(), NetError> {
        let handle = self.ensure_auxiliary().await?;
        if self.ping_handle(&handle).await {
            return Ok(());
        }

        tracing::warn!("Auxiliary did not answer ping, recreating");
        *self.inner.slot.lock().await = Slot::Empty;
        let handle = self.ensure_auxiliary().await?;
        if self.ping_handle(&handle).await {
            Ok(())
        } else {
            *self.inner.slot.lock().await = Slot::Failed;
            Err(NetError::AdapterUnavailable)
        }
    }

    /// Clear a failed adapter so the next call attempts setup again.
    pub async fn reinitialize(&self) {
        *self.inner.slot.lock().await = Slot::Empty;
    }

    async fn ping_handle(&self, handle: &AuxiliaryHandle) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if handle.tx.send(AuxRequest::Ping { reply: reply_tx }).await.is_err() {
            return false;
        }
        tokio::time::timeout(PING_TIMEOUT, reply_rx).await.is_ok()
    }

    async fn ensure_auxiliary(&self) -> Result<AuxiliaryHandle, NetError> {
        let mut rx = {
            let mut slot = self.inner.slot.lock().await;
            match &*slot {
                Slot::Ready(handle) => return Ok(handle.clone()),
                Slot::Failed => return Err(NetError::AdapterUnavailable),
                Slot::Starting(rx) => rx.clone(),
                Slot::Empty => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Slot::Starting(rx.clone());
                    tokio::spawn(start_auxiliary(Arc::clone(&self.inner), tx));
                    rx
                }
            }
        };

        loop {
            let settled = rx.borrow().clone();
            if let Some(outcome) = settled {
                return outcome;
            }
            rx.changed()
                .await
                .map_err(|_| NetError::AdapterUnavailable)?;
        }
    }
}

/// Bring up the worker and wait for its READY signal, then settle the slot.
async fn start_auxiliary(inner: Arc<AdapterInner>, settle: watch::Sender<Option<SetupOutcome>>) {
    let (tx, rx) = mpsc::channel(32);
    let (ready_tx, ready_rx) = oneshot::channel();
    let base_url = inner.base_url.clone();
    let worker = tokio::spawn(auxiliary_worker(base_url, rx, ready_tx));

    let outcome = match tokio::time::timeout(SETUP_TIMEOUT, ready_rx).await {
        Ok(Ok(())) => {
            tracing::info!("Network auxiliary ready");
            Ok(AuxiliaryHandle { tx })
        }
        _ => {
            tracing::warn!("Network auxiliary did not become ready, tearing down");
            worker.abort();
            Err(NetError::AdapterUnavailable)
        }
    };

    {
        let mut slot = inner.slot.lock().await;
        *slot = match &outcome {
            Ok(handle) => Slot::Ready(handle.clone()),
            Err(_) => Slot::Failed,
        };
    }
    let _ = settle.send(Some(outcome));
}

/// The auxiliary context: owns the HTTP client, services one request at a
/// time, exits when the adapter drops its handle.
async fn auxiliary_worker(
    base_url: String,
    mut rx: mpsc::Receiver<AuxRequest>,
    ready: oneshot::Sender<()>,
) {
    let client = match reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build HTTP client");
            return; // READY never fires; setup times out and tears down.
        }
    };

    // Listeners are installed; signal READY.
    if ready.send(()).is_err() {
        return;
    }

    while let Some(request) = rx.recv().await {
        match request {
            AuxRequest::Ping { reply } => {
                let _ = reply.send(());
            }
            AuxRequest::Call {
                endpoint,
                method,
                body,
                reply,
            } => {
                let result = perform_call(&client, &base_url, &endpoint, method, body).await;
                let _ = reply.send(result);
            }
        }
    }
    tracing::debug!("Network auxiliary shutting down");
}

async fn perform_call(
    client: &reqwest::Client,
    base_url: &str,
    endpoint: &str,
    method: Method,
    body: Option<Value>,
) -> Result<Value, NetError> {
    let url = format!("{base_url}{endpoint}");
    let mut request = match method {
        Method::Get => client.get(&url),
        Method::Post => client.post(&url),
        Method::Delete => client.delete(&url),
    };
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            NetError::Timeout
        } else {
            NetError::Transport(e.to_string())
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return response
            .json::<Value>()
            .await
            .map_err(|e| NetError::InvalidBody(e.to_string()));
    }

    let error_text = extract_error_text(response, status.as_u16()).await;
    Err(NetError::Upstream {
        status: status.as_u16(),
        error_text,
    })
}

async fn extract_error_text(response: reqwest::Response, status_code: u16) -> String {
    match response.json::<Value>().await.ok() {
        Some(body) => body
            .get("error")
            .or_else(|| body.get("errorText"))
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {status_code}")),
        None => format!("HTTP {status_code}"),
    }
}
