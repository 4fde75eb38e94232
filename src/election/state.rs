use serde::{Deserialize, Serialize};

/// Election role of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Follower => write!(f, "follower"),
            Role::Candidate => write!(f, "candidate"),
            Role::Leader => write!(f, "leader"),
        }
    }
}

/// Strict majority of a cluster of `peer_count` addresses.
///
/// Uses integer division: a cluster of 3 needs 2, a cluster of 4 needs 3.
pub fn has_majority(peer_count: usize, count: usize) -> bool {
    peer_count / 2 < count
}

/// Mutable election state shared by the timer loop and inbound handlers.
///
/// Nothing here is persisted; a restarted node is a follower again.
#[derive(Debug)]
pub struct ElectionState {
    pub role: Role,
    /// Set when a foreign leader announcement or a vote request arrives,
    /// cleared at the start of every cycle.
    pub leader_seen: bool,
}

impl ElectionState {
    pub fn new() -> Self {
        Self {
            role: Role::Follower,
            leader_seen: false,
        }
    }

    pub fn begin_cycle(&mut self) {
        self.leader_seen = false;
    }

    pub fn become_follower(&mut self) {
        self.role = Role::Follower;
    }

    pub fn become_candidate(&mut self) {
        self.role = Role::Candidate;
    }

    pub fn become_leader(&mut self) {
        self.role = Role::Leader;
    }

    /// Close a vote round and return the resulting role.
    ///
    /// Promotion requires both a majority and that nothing demoted this
    /// node while the round was in flight.
    pub fn finish_election(&mut self, votes: usize, peer_count: usize) -> Role {
        if has_majority(peer_count, votes) && self.role == Role::Candidate {
            self.become_leader();
        } else {
            self.become_follower();
        }
        self.role
    }
}

impl Default for ElectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_follower() {
        let state = ElectionState::new();
        assert_eq!(state.role, Role::Follower);
        assert!(!state.leader_seen);
    }

    #[test]
    fn test_majority_table() {
        // (cluster size, smallest winning count)
        let cases = [(1, 1), (2, 2), (3, 2), (4, 3), (5, 3), (6, 4), (7, 4)];
        for (n, k) in cases {
            assert!(has_majority(n, k), "n={n} k={k} should be a majority");
            assert!(!has_majority(n, k - 1), "n={n} k={} should not be", k - 1);
        }
        assert!(!has_majority(0, 0));
    }

    #[test]
    fn test_begin_cycle_clears_liveness() {
        let mut state = ElectionState::new();
        state.leader_seen = true;
        state.begin_cycle();
        assert!(!state.leader_seen);
    }

    #[test]
    fn test_finish_election_with_majority() {
        let mut state = ElectionState::new();
        state.become_candidate();
        assert_eq!(state.finish_election(2, 3), Role::Leader);
        assert_eq!(state.role, Role::Leader);
    }

    #[test]
    fn test_finish_election_without_majority() {
        let mut state = ElectionState::new();
        state.become_candidate();
        assert_eq!(state.finish_election(1, 3), Role::Follower);
    }

    #[test]
    fn test_finish_election_after_demotion() {
        let mut state = ElectionState::new();
        state.become_candidate();
        // A leader announcement landed mid-round
        state.become_follower();
        assert_eq!(state.finish_election(3, 3), Role::Follower);
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Follower.to_string(), "follower");
        assert_eq!(Role::Candidate.to_string(), "candidate");
        assert_eq!(Role::Leader.to_string(), "leader");
    }
}
