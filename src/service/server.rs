//! HTTP transport for the root publisher

use super::RootPublisher;
use crate::{Error, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

#[derive(Deserialize)]
struct RootQuery {
    #[serde(default)]
    namespace: String,
}

async fn merkle_root(
    State(publisher): State<Arc<RootPublisher>>,
    Query(query): Query<RootQuery>,
) -> Response {
    match publisher.signed_root(&query.namespace) {
        Ok(signed) => Json(signed).into_response(),
        Err(e) => {
            // details stay in the log, the client only sees a 500
            warn!(namespace = %query.namespace, error = %e, "merkle root request failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn public_key(State(publisher): State<Arc<RootPublisher>>) -> Response {
    Json(publisher.public_key()).into_response()
}

fn router(publisher: Arc<RootPublisher>) -> Router {
    Router::new()
        .route("/merkleRoot", get(merkle_root))
        .route("/publicKey", get(public_key))
        .with_state(publisher)
}

/// A running publication service
pub struct ServiceHandle {
    addr: SocketAddr,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceHandle {
    /// Address the service is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL clients should use
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// False once [`ServiceHandle::shutdown`] has been called
    pub fn is_running(&self) -> bool {
        self.shutdown.lock().is_some()
    }

    /// Stop accepting requests and wait for the service thread to exit.
    /// Calling it again is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        let tx = self.shutdown.lock().take();
        if let Some(tx) = tx {
            let _ = tx.send(());
        }
        let thread = self.thread.lock().take();
        if let Some(thread) = thread {
            thread
                .join()
                .map_err(|_| Error::Service("publisher thread panicked".into()))?;
        }
        Ok(())
    }
}

/// Starts the publication service at most once
///
/// Concurrent first calls are serialized; later calls get the running
/// service's handle back without binding again. A failed start leaves the
/// guard unset so it can be retried, and a service that was shut down is
/// replaced by the next start.
#[derive(Default)]
pub struct PublisherGuard {
    handle: Mutex<Option<Arc<ServiceHandle>>>,
}

impl PublisherGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, publisher: RootPublisher, addr: SocketAddr) -> Result<Arc<ServiceHandle>> {
        let mut slot = self.handle.lock();
        if let Some(handle) = slot.as_ref().filter(|h| h.is_running()) {
            return Ok(handle.clone());
        }
        let handle = Arc::new(spawn(publisher, addr)?);
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Handle of the running service, if any
    pub fn handle(&self) -> Option<Arc<ServiceHandle>> {
        self.handle.lock().clone().filter(|h| h.is_running())
    }
}

/// Bind on the caller's thread so address errors surface here, then serve on
/// a dedicated thread with its own runtime.
fn spawn(publisher: RootPublisher, addr: SocketAddr) -> Result<ServiceHandle> {
    let listener = std::net::TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;

    let (tx, rx) = oneshot::channel::<()>();
    let app = router(Arc::new(publisher));

    let thread = std::thread::Builder::new()
        .name("mtree-publisher".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("mtree-publisher-worker")
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!(error = %e, "failed to build publisher runtime");
                    return;
                }
            };

            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(e) => {
                        error!(error = %e, "failed to register publisher listener");
                        return;
                    }
                };
                let shutdown = async {
                    let _ = rx.await;
                };
                if let Err(e) = axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await
                {
                    error!(error = %e, "publisher stopped with error");
                }
            });
            info!(addr = %local_addr, "merkle root publisher stopped");
        })?;

    info!(addr = %local_addr, "merkle root publisher listening");
    Ok(ServiceHandle {
        addr: local_addr,
        shutdown: Mutex::new(Some(tx)),
        thread: Mutex::new(Some(thread)),
    })
}
