use axum::http::HeaderMap;

use crate::election::state::{ElectionState, Role};

/// Request header carrying the sender's role
pub const STATUS_HEADER: &str = "server_status";
/// Request header carrying a leader's own address
pub const SENDER_HEADER: &str = "port";
/// Response header carrying a granted vote
pub const VOICE_HEADER: &str = "voice";

pub const STATUS_LEADER: &str = "leader";
pub const STATUS_CANDIDATE: &str = "candidate";
pub const VOICE_YES: &str = "yes";

/// A message received on `/mp`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A leader asserting itself. `sender` is empty when the header is missing.
    LeaderAnnouncement { sender: String },
    /// A candidate asking for a vote
    VoteRequest,
    /// No or unrecognised status; ignored
    Unknown,
}

impl Message {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match header_str(headers, STATUS_HEADER) {
            STATUS_LEADER => Message::LeaderAnnouncement {
                sender: header_str(headers, SENDER_HEADER).to_string(),
            },
            STATUS_CANDIDATE => Message::VoteRequest,
            _ => Message::Unknown,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Outcome of handling a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reply {
    pub vote_granted: bool,
}

/// Apply an inbound message to local state.
pub fn handle_message(state: &mut ElectionState, msg: &Message, self_addr: &str) -> Reply {
    match msg {
        Message::LeaderAnnouncement { sender } if sender == self_addr => {
            tracing::trace!(self_addr, "Own leader announcement looped back");
            Reply::default()
        }
        Message::LeaderAnnouncement { sender } => {
            if state.role != Role::Follower {
                tracing::info!(
                    self_addr,
                    leader = %sender,
                    previous = %state.role,
                    "Yielding to leader, now follower"
                );
            } else {
                tracing::debug!(self_addr, leader = %sender, "Leader heartbeat");
            }
            state.become_follower();
            state.leader_seen = true;
            Reply::default()
        }
        Message::VoteRequest => {
            let vote_granted = state.role != Role::Leader;
            state.leader_seen = true;
            tracing::debug!(self_addr, role = %state.role, granted = vote_granted, "Vote request");
            Reply { vote_granted }
        }
        Message::Unknown => Reply::default(),
    }
}
