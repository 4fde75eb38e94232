use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::NodeConfig;
use crate::election::client::PeerClient;
use crate::election::message::{self, Message, Reply};
use crate::election::state::{has_majority, ElectionState, Role};
use crate::election::timer::random_election_timeout;
use crate::error::Result;

/// Which branch a single pass of the election loop took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A leader announcement or vote request arrived during the heartbeat window
    LivenessObserved,
    /// Leader kept its quorum and sent heartbeats
    LeadershipAsserted,
    /// Someone became active during the pre-election wait
    ElectionSuppressed,
    /// This node ran a vote round
    ElectionHeld(ElectionOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectionOutcome {
    pub won: bool,
    pub votes: usize,
}

/// Snapshot served on `/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub address: String,
    pub role: Role,
    pub election_timeout_ms: u64,
    pub peer_count: usize,
}

/// One participant in the election.
///
/// The timer loop ([`run`](Self::run)) is the only driver of elections;
/// inbound messages reach [`handle_message`](Self::handle_message) from
/// the HTTP layer. Both go through the same lock on `state`, and no guard
/// is held across a network call.
pub struct ElectionNode {
    pub state: RwLock<ElectionState>,
    config: NodeConfig,
    election_timeout: Duration,
    client: PeerClient,
}

impl ElectionNode {
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate()?;

        let election_timeout = random_election_timeout(
            config.election.election_timeout_min_ms,
            config.election.election_timeout_max_ms,
        );

        Ok(Self {
            state: RwLock::new(ElectionState::new()),
            config,
            election_timeout,
            client: PeerClient::new()?,
        })
    }

    pub fn self_addr(&self) -> &str {
        &self.config.self_addr
    }

    pub fn peers(&self) -> &[String] {
        &self.config.peers
    }

    pub fn peer_count(&self) -> usize {
        self.config.peer_count()
    }

    pub fn election_timeout(&self) -> Duration {
        self.election_timeout
    }

    pub async fn role(&self) -> Role {
        self.state.read().await.role
    }

    pub async fn is_leader(&self) -> bool {
        self.role().await == Role::Leader
    }

    pub async fn status(&self) -> NodeStatus {
        NodeStatus {
            address: self.config.self_addr.clone(),
            role: self.role().await,
            election_timeout_ms: self.election_timeout.as_millis() as u64,
            peer_count: self.peer_count(),
        }
    }

    /// Run the election loop until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            self_addr = %self.config.self_addr,
            election_timeout_ms = self.election_timeout.as_millis() as u64,
            peer_count = self.peer_count(),
            "Election loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(self_addr = %self.config.self_addr, "Election loop stopped");
                    return;
                }
                outcome = self.run_cycle() => {
                    tracing::trace!(self_addr = %self.config.self_addr, ?outcome, "Cycle finished");
                }
            }
        }
    }

    /// One pass of the election loop.
    ///
    /// Non-leaders wait their random timeout first so that followers rarely
    /// start elections in lockstep. Every role then waits the heartbeat
    /// window; a leader re-checks its quorum, everyone else waits again and
    /// holds an election unless a leader or candidate showed up meanwhile.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let role = {
            let mut state = self.state.write().await;
            state.begin_cycle();
            state.role
        };

        if role != Role::Leader {
            tokio::time::sleep(self.election_timeout).await;
        }
        tokio::time::sleep(self.config.election.heartbeat_window()).await;

        let (role, leader_seen) = {
            let state = self.state.read().await;
            (state.role, state.leader_seen)
        };
        if leader_seen {
            return CycleOutcome::LivenessObserved;
        }

        if role == Role::Leader {
            if self.check_quorum().await {
                // An announcement may have demoted us during the quorum check
                if !self.is_leader().await {
                    return CycleOutcome::LivenessObserved;
                }
                self.broadcast_heartbeat();
                return CycleOutcome::LeadershipAsserted;
            }

            let mut state = self.state.write().await;
            if state.role == Role::Leader {
                state.become_follower();
                tracing::warn!(self_addr = %self.config.self_addr, "Lost quorum, stepping down");
            }
        }

        tokio::time::sleep(self.config.election.pre_election_wait()).await;

        if self.state.read().await.leader_seen {
            return CycleOutcome::ElectionSuppressed;
        }

        CycleOutcome::ElectionHeld(self.solicit_votes().await)
    }

    /// Ping every address, this node included, and report whether a strict
    /// majority answered. Errors and timeouts just don't count.
    pub async fn check_quorum(&self) -> bool {
        let timeout = self.config.election.ping_timeout();
        let mut available = 0;

        for peer in &self.config.peers {
            match self.client.ping(peer, timeout).await {
                Ok(true) => available += 1,
                Ok(false) => {
                    tracing::debug!(peer = %peer, "Ping answered without success");
                }
                Err(e) => {
                    tracing::debug!(peer = %peer, error = %e, "Ping failed");
                }
            }
        }

        let quorum = has_majority(self.peer_count(), available);
        tracing::debug!(
            self_addr = %self.config.self_addr,
            available,
            peer_count = self.peer_count(),
            quorum,
            "Quorum check"
        );
        quorum
    }

    /// Announce leadership to every address without waiting for answers.
    pub fn broadcast_heartbeat(&self) {
        let timeout = self.config.election.announce_timeout();

        for peer in &self.config.peers {
            let client = self.client.clone();
            let peer = peer.clone();
            let leader = self.config.self_addr.clone();

            tokio::spawn(async move {
                if let Err(e) = client.announce_leader(&peer, &leader, timeout).await {
                    tracing::trace!(peer = %peer, error = %e, "Heartbeat not delivered");
                }
            });
        }
    }

    /// Become candidate and ask every address, this node included, for a vote.
    pub async fn solicit_votes(&self) -> ElectionOutcome {
        self.state.write().await.become_candidate();
        tracing::info!(self_addr = %self.config.self_addr, "Starting election");

        let timeout = self.config.election.vote_timeout();
        let mut votes = 0;

        for peer in &self.config.peers {
            match self.client.request_vote(peer, timeout).await {
                Ok(true) => {
                    votes += 1;
                    tracing::debug!(peer = %peer, votes, "Received vote");
                }
                Ok(false) => {
                    tracing::debug!(peer = %peer, "Vote refused");
                }
                Err(e) => {
                    tracing::debug!(peer = %peer, error = %e, "Vote request failed");
                }
            }
        }

        let role = self
            .state
            .write()
            .await
            .finish_election(votes, self.peer_count());
        let won = role == Role::Leader;

        if won {
            tracing::info!(self_addr = %self.config.self_addr, votes, "Became leader");
        } else {
            tracing::info!(
                self_addr = %self.config.self_addr,
                votes,
                peer_count = self.peer_count(),
                "Election lost, back to follower"
            );
        }

        ElectionOutcome { won, votes }
    }

    /// Apply a message received on `/mp`.
    pub async fn handle_message(&self, msg: &Message) -> Reply {
        let mut state = self.state.write().await;
        message::handle_message(&mut state, msg, &self.config.self_addr)
    }
}
