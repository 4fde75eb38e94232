use std::time::Duration;

use reqwest::StatusCode;

use crate::election::message::{
    SENDER_HEADER, STATUS_CANDIDATE, STATUS_HEADER, STATUS_LEADER, VOICE_HEADER, VOICE_YES,
};
use crate::error::Result;

/// HTTP client for the `/ping` and `/mp` endpoints of peers.
///
/// Every call carries its own timeout; a slow peer costs the caller at most
/// that long.
#[derive(Debug, Clone)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new() -> Result<Self> {
        // Peers are addressed directly; never route through an environment proxy.
        let http = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self { http })
    }

    /// Liveness check. `Ok(true)` only for a `200 OK`.
    pub async fn ping(&self, addr: &str, timeout: Duration) -> Result<bool> {
        let response = self
            .http
            .get(format!("http://{addr}/ping"))
            .timeout(timeout)
            .send()
            .await?;
        Ok(response.status() == StatusCode::OK)
    }

    /// Ask a peer for its vote. `Ok(true)` when it answers `voice: yes`.
    pub async fn request_vote(&self, addr: &str, timeout: Duration) -> Result<bool> {
        let response = self
            .http
            .get(format!("http://{addr}/mp"))
            .header(STATUS_HEADER, STATUS_CANDIDATE)
            .timeout(timeout)
            .send()
            .await?;

        let granted = response
            .headers()
            .get(VOICE_HEADER)
            .and_then(|v| v.to_str().ok())
            == Some(VOICE_YES);
        Ok(granted)
    }

    /// Tell a peer that `leader_addr` is leader. The response is not inspected.
    pub async fn announce_leader(
        &self,
        addr: &str,
        leader_addr: &str,
        timeout: Duration,
    ) -> Result<()> {
        self.http
            .get(format!("http://{addr}/mp"))
            .header(STATUS_HEADER, STATUS_LEADER)
            .header(SENDER_HEADER, leader_addr)
            .timeout(timeout)
            .send()
            .await?;
        Ok(())
    }

    /// Fetch a node's `/status` document.
    pub async fn status<T: serde::de::DeserializeOwned>(
        &self,
        addr: &str,
        timeout: Duration,
    ) -> Result<T> {
        let status = self
            .http
            .get(format!("http://{addr}/status"))
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(status)
    }
}
