use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{ElectionConfig, NodeConfig, PortRange};
use crate::discovery::bind_first_available;
use crate::election::ElectionNode;
use crate::error::{ElectionError, Result};
use crate::http::HttpServer;

/// A running cluster member: the election loop plus its HTTP endpoints.
pub struct Node {
    election: Arc<ElectionNode>,
    listener: TcpListener,
}

impl Node {
    /// Build a node around an already bound listener.
    pub fn new(config: NodeConfig, listener: TcpListener) -> Result<Self> {
        let election = Arc::new(ElectionNode::new(config)?);
        Ok(Self { election, listener })
    }

    /// Claim the first free port in `range` and use the range as the peer list.
    ///
    /// # Errors
    ///
    /// [`ElectionError::PortsBusy`] when every port in the range is taken.
    pub async fn bootstrap(range: &PortRange, election: ElectionConfig) -> Result<Self> {
        let found = bind_first_available(range).await?;
        let config = NodeConfig {
            self_addr: found.self_addr,
            peers: found.peers,
            election,
        };
        Self::new(config, found.listener)
    }

    pub fn election(&self) -> Arc<ElectionNode> {
        self.election.clone()
    }

    pub fn self_addr(&self) -> &str {
        self.election.self_addr()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(ElectionError::Serve)
    }

    /// Run the election loop and serve the endpoints until `shutdown` is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails. The election loop is stopped
    /// first, so a node that can no longer be reached never keeps campaigning.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let election = self.election.clone();
        let loop_token = shutdown.child_token();
        let election_handle = tokio::spawn({
            let loop_token = loop_token.clone();
            async move { election.run(loop_token).await }
        });

        let server = HttpServer::new(self.listener, self.election.clone());
        let result = server.run(shutdown).await;

        loop_token.cancel();
        if let Err(e) = election_handle.await {
            tracing::warn!(error = %e, "Election loop task ended abnormally");
        }

        if let Err(e) = &result {
            tracing::error!(self_addr = %self.election.self_addr(), error = %e, "Listener failed");
        }
        result
    }
}
