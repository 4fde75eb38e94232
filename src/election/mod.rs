//! Leader election among a fixed set of peers.
//!
//! Every node runs the same loop ([`ElectionNode::run`]): wait a random
//! jitter plus a common heartbeat window, yield if a leader or candidate was
//! heard from, otherwise either re-assert leadership (leader) or hold an
//! election (everyone else). There are no terms; a node yields to any leader
//! announcement that is not its own and grants a vote to every candidate
//! while it is not leader.
//!
//! # Components
//!
//! - [`state`]: role, liveness flag and the majority predicate
//! - [`message`]: the `/mp` wire vocabulary and how inbound messages mutate state
//! - [`client`]: outbound calls to peers, each bounded by a timeout
//! - [`node`]: the timer loop, quorum check, heartbeat broadcast and vote round
//! - [`timer`]: random election timeout

pub mod client;
pub mod message;
pub mod node;
pub mod state;
pub mod timer;

pub use client::PeerClient;
pub use message::{Message, Reply};
pub use node::{CycleOutcome, ElectionNode, ElectionOutcome};
pub use state::{has_majority, ElectionState, Role};
