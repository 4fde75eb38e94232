//! Picks this node's address out of a local port range.
//!
//! Every process in a local cluster is started with the same range. Each one
//! claims the first port it can bind, and treats the whole range as the peer
//! list.

use tokio::net::TcpListener;

use crate::config::PortRange;
use crate::error::{ElectionError, Result};

/// A listener already bound for this node, plus every cluster address.
#[derive(Debug)]
pub struct Discovered {
    pub listener: TcpListener,
    pub self_addr: String,
    pub peers: Vec<String>,
}

/// Bind the first free port in `range`.
///
/// # Errors
///
/// [`ElectionError::PortsBusy`] when no port in the range can be bound.
pub async fn bind_first_available(range: &PortRange) -> Result<Discovered> {
    let peers = range.addresses();

    for addr in &peers {
        match TcpListener::bind(addr.as_str()).await {
            Ok(listener) => {
                tracing::debug!(addr = %addr, "Claimed port");
                return Ok(Discovered {
                    listener,
                    self_addr: addr.clone(),
                    peers,
                });
            }
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "Port busy");
            }
        }
    }

    Err(ElectionError::PortsBusy {
        host: range.host.clone(),
        min_port: range.min_port,
        count: range.count,
    })
}

/// Bind an explicitly chosen address.
pub async fn bind_addr(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| ElectionError::Bind {
        addr: addr.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Find `count` consecutive free ports starting at an OS-assigned one.
    async fn free_range(count: u16) -> PortRange {
        loop {
            let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = first.local_addr().unwrap().port();
            drop(first);

            if base.checked_add(count).is_none() {
                continue;
            }
            let range = PortRange::new("127.0.0.1", base, count);
            let mut held = Vec::new();
            for addr in range.addresses() {
                match TcpListener::bind(addr.as_str()).await {
                    Ok(l) => held.push(l),
                    Err(_) => break,
                }
            }
            if held.len() == count as usize {
                return range;
            }
        }
    }

    #[tokio::test]
    async fn test_claims_first_free_port() {
        let range = free_range(3).await;
        let found = bind_first_available(&range).await.unwrap();

        assert_eq!(found.self_addr, range.addresses()[0]);
        assert_eq!(found.peers, range.addresses());
        assert_eq!(
            found.listener.local_addr().unwrap().port(),
            range.min_port
        );
    }

    #[tokio::test]
    async fn test_skips_busy_ports() {
        let range = free_range(3).await;
        let _busy = bind_addr(&range.addresses()[0]).await.unwrap();

        let found = bind_first_available(&range).await.unwrap();
        assert_eq!(found.self_addr, range.addresses()[1]);
        assert_eq!(found.peers.len(), 3);
    }

    #[tokio::test]
    async fn test_all_ports_busy() {
        let range = free_range(2).await;
        let _a = bind_addr(&range.addresses()[0]).await.unwrap();
        let _b = bind_addr(&range.addresses()[1]).await.unwrap();

        let err = bind_first_available(&range).await.unwrap_err();
        assert!(matches!(err, ElectionError::PortsBusy { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_empty_range_is_busy() {
        let range = PortRange::new("127.0.0.1", 9000, 0);
        assert!(matches!(
            bind_first_available(&range).await,
            Err(ElectionError::PortsBusy { .. })
        ));
    }

    #[tokio::test]
    async fn test_bind_addr_reports_address() {
        let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = held.local_addr().unwrap().to_string();

        match bind_addr(&addr).await {
            Err(ElectionError::Bind { addr: reported, .. }) => assert_eq!(reported, addr),
            other => panic!("expected bind error, got {other:?}"),
        }
    }
}
