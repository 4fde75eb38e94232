use std::time::Duration;

use crate::error::{ElectionError, Result};

/// Timing policy for the election loop.
///
/// The defaults keep the ordering the protocol relies on to converge:
/// the random jitter is shorter than the heartbeat window, which is
/// shorter than the pre-election wait.
#[derive(Debug, Clone)]
pub struct ElectionConfig {
    /// Lower bound (inclusive) of the random election timeout
    pub election_timeout_min_ms: u64,
    /// Upper bound (exclusive) of the random election timeout
    pub election_timeout_max_ms: u64,
    /// Wait shared by every role before liveness is checked
    pub heartbeat_window_ms: u64,
    /// Extra wait before a non-leader starts an election
    pub pre_election_wait_ms: u64,
    /// Per-peer timeout of a `/ping` call during the quorum check
    pub ping_timeout_ms: u64,
    /// Per-peer timeout of a vote request
    pub vote_timeout_ms: u64,
    /// Upper bound on a detached leader announcement
    pub announce_timeout_ms: u64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            election_timeout_min_ms: 100,
            election_timeout_max_ms: 200,
            heartbeat_window_ms: 1000,
            pre_election_wait_ms: 2000,
            ping_timeout_ms: 1000 / 30,
            vote_timeout_ms: 1000 / 20,
            announce_timeout_ms: 1000,
        }
    }
}

impl ElectionConfig {
    pub fn heartbeat_window(&self) -> Duration {
        Duration::from_millis(self.heartbeat_window_ms)
    }

    pub fn pre_election_wait(&self) -> Duration {
        Duration::from_millis(self.pre_election_wait_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn vote_timeout(&self) -> Duration {
        Duration::from_millis(self.vote_timeout_ms)
    }

    pub fn announce_timeout(&self) -> Duration {
        Duration::from_millis(self.announce_timeout_ms)
    }

    /// Reject timings that would break convergence.
    pub fn validate(&self) -> Result<()> {
        if self.election_timeout_min_ms >= self.election_timeout_max_ms {
            return Err(ElectionError::InvalidConfig(format!(
                "election timeout range is empty: {}..{} ms",
                self.election_timeout_min_ms, self.election_timeout_max_ms
            )));
        }
        if self.election_timeout_max_ms >= self.heartbeat_window_ms {
            return Err(ElectionError::InvalidConfig(format!(
                "election timeout ({} ms) must be shorter than the heartbeat window ({} ms)",
                self.election_timeout_max_ms, self.heartbeat_window_ms
            )));
        }
        if self.heartbeat_window_ms >= self.pre_election_wait_ms {
            return Err(ElectionError::InvalidConfig(format!(
                "heartbeat window ({} ms) must be shorter than the pre-election wait ({} ms)",
                self.heartbeat_window_ms, self.pre_election_wait_ms
            )));
        }
        if self.ping_timeout_ms == 0 || self.vote_timeout_ms == 0 || self.announce_timeout_ms == 0 {
            return Err(ElectionError::InvalidConfig(
                "peer call timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address peers use to reach this node (host:port)
    pub self_addr: String,
    /// Every address in the cluster, in order. May include `self_addr`.
    pub peers: Vec<String>,
    pub election: ElectionConfig,
}

impl NodeConfig {
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self {
            self_addr: self_addr.into(),
            peers: Vec::new(),
            election: ElectionConfig::default(),
        }
    }

    pub fn with_peer(mut self, addr: impl Into<String>) -> Self {
        self.peers.push(addr.into());
        self
    }

    pub fn with_election(mut self, election: ElectionConfig) -> Self {
        self.election = election;
        self
    }

    /// Cluster size used for majority arithmetic.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Reject a node that could never reach a majority, then check timings.
    pub fn validate(&self) -> Result<()> {
        if self.peers.is_empty() {
            return Err(ElectionError::InvalidConfig(
                "peer list is empty; at least one cluster address is required".to_string(),
            ));
        }
        self.election.validate()
    }
}

/// Contiguous block of ports that make up a local cluster.
#[derive(Debug, Clone)]
pub struct PortRange {
    pub host: String,
    pub min_port: u16,
    pub count: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            min_port: 8000,
            count: 3,
        }
    }
}

impl PortRange {
    pub fn new(host: impl Into<String>, min_port: u16, count: u16) -> Self {
        Self {
            host: host.into(),
            min_port,
            count,
        }
    }

    /// Every address in the range, lowest port first.
    ///
    /// Ports past `u16::MAX` are dropped.
    pub fn addresses(&self) -> Vec<String> {
        (0..self.count)
            .filter_map(|i| self.min_port.checked_add(i))
            .map(|port| format!("{}:{}", self.host, port))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn election_config_default() {
        let cfg = ElectionConfig::default();
        assert_eq!(cfg.election_timeout_min_ms, 100);
        assert_eq!(cfg.election_timeout_max_ms, 200);
        assert_eq!(cfg.heartbeat_window(), Duration::from_secs(1));
        assert_eq!(cfg.pre_election_wait(), Duration::from_secs(2));
        assert_eq!(cfg.ping_timeout_ms, 33);
        assert_eq!(cfg.vote_timeout_ms, 50);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn election_config_rejects_empty_timeout_range() {
        let cfg = ElectionConfig {
            election_timeout_min_ms: 200,
            election_timeout_max_ms: 200,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ElectionError::InvalidConfig(_))));
    }

    #[test]
    fn election_config_rejects_broken_ordering() {
        let cfg = ElectionConfig {
            election_timeout_max_ms: 1500,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ElectionConfig {
            pre_election_wait_ms: 500,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn election_config_rejects_zero_call_timeout() {
        let cfg = ElectionConfig {
            vote_timeout_ms: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn node_config_with_peer() {
        let cfg = NodeConfig::new("127.0.0.1:8000")
            .with_peer("127.0.0.1:8000")
            .with_peer("127.0.0.1:8001")
            .with_peer("127.0.0.1:8002");
        assert_eq!(cfg.self_addr, "127.0.0.1:8000");
        assert_eq!(cfg.peer_count(), 3);
        assert_eq!(cfg.peers[2], "127.0.0.1:8002");
    }

    #[test]
    fn node_config_rejects_empty_peer_list() {
        let cfg = NodeConfig::new("127.0.0.1:8000");
        assert!(matches!(cfg.validate(), Err(ElectionError::InvalidConfig(_))));

        let cfg = cfg.with_peer("127.0.0.1:8000");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn port_range_addresses() {
        let range = PortRange::new("localhost", 9000, 3);
        assert_eq!(
            range.addresses(),
            vec!["localhost:9000", "localhost:9001", "localhost:9002"]
        );
    }

    #[test]
    fn port_range_stops_at_max_port() {
        let range = PortRange::new("127.0.0.1", u16::MAX - 1, 4);
        assert_eq!(range.addresses().len(), 2);
    }
}
