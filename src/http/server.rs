use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::election::ElectionNode;
use crate::error::{ElectionError, Result};
use crate::http::routes::router;

/// Serves a node's endpoints on a listener bound before the node started.
pub struct HttpServer {
    listener: TcpListener,
    node: Arc<ElectionNode>,
}

impl HttpServer {
    pub fn new(listener: TcpListener, node: Arc<ElectionNode>) -> Self {
        Self { listener, node }
    }

    /// Serve until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`ElectionError::Serve`] if the listener fails. That leaves the
    /// node unreachable, so callers treat it as fatal.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.listener.local_addr().map_err(ElectionError::Serve)?;
        tracing::info!(addr = %addr, self_addr = %self.node.self_addr(), "Listening");

        axum::serve(self.listener, router(self.node))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(ElectionError::Serve)
    }
}
