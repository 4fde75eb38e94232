use rand::Rng;
use std::time::Duration;

/// Draws an election timeout from `min_ms..max_ms`.
pub fn random_election_timeout(min_ms: u64, max_ms: u64) -> Duration {
    let mut rng = rand::thread_rng();
    let timeout_ms = if min_ms < max_ms {
        rng.gen_range(min_ms..max_ms)
    } else {
        min_ms
    };
    Duration::from_millis(timeout_ms)
}
