//! Boundary to the external discovery/registration collaborator.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time;

use super::peers::PeerSet;

/// Key prefix peer nodes register themselves under.
pub const PEER_PREFIX: &str = "/fanout/nodes/";

const WATCH_INTERVAL_SECS: u64 = 5;

#[derive(Debug)]
pub struct DiscoveryError(pub String);

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "discovery error: {}", self.0)
    }
}

impl std::error::Error for DiscoveryError {}

/// Abstraction over the discovery collaborator (e.g. etcd).
///
/// The core only needs two things from it: announce this node, and read the
/// current peer list.
#[async_trait]
pub trait PeerDiscovery: Send + Sync {
    /// Announce this node's address under a lease.
    async fn register_self(&self, addr: &str, lease_secs: u64) -> Result<(), DiscoveryError>;

    /// Current peer address list registered under the prefix.
    async fn watch_peers(&self, prefix: &str) -> Result<Vec<String>, DiscoveryError>;
}

// ---------------------------------------------------------------------------
// Static implementation (configuration-driven and tests)
// ---------------------------------------------------------------------------

/// Fixed peer list from configuration; registration is a no-op.
pub struct StaticPeers {
    peers: Vec<String>,
}

impl StaticPeers {
    pub fn new(peers: Vec<String>) -> Self {
        Self { peers }
    }
}

#[async_trait]
impl PeerDiscovery for StaticPeers {
    async fn register_self(&self, addr: &str, _lease_secs: u64) -> Result<(), DiscoveryError> {
        tracing::debug!(%addr, "static discovery, registration skipped");
        Ok(())
    }

    async fn watch_peers(&self, _prefix: &str) -> Result<Vec<String>, DiscoveryError> {
        Ok(self.peers.clone())
    }
}

/// Keep the peer set current. The node's own advertised address never enters
/// the set — broadcasts go to every *other* node.
pub fn spawn_watch(
    discovery: Arc<dyn PeerDiscovery>,
    peers: Arc<PeerSet>,
    self_addr: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(Duration::from_secs(WATCH_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            match discovery.watch_peers(PEER_PREFIX).await {
                Ok(list) => {
                    peers.replace(list.into_iter().filter(|p| *p != self_addr).collect());
                }
                Err(err) => tracing::warn!(%err, "peer discovery refresh failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_discovery_returns_configured_peers() {
        let discovery = StaticPeers::new(vec!["http://b:6000".to_string()]);
        discovery
            .register_self("http://a:6000", 5)
            .await
            .expect("register");
        let peers = discovery.watch_peers(PEER_PREFIX).await.expect("watch");
        assert_eq!(peers, ["http://b:6000"]);
    }

    #[tokio::test]
    async fn watch_filters_out_own_address() {
        let discovery: Arc<dyn PeerDiscovery> = Arc::new(StaticPeers::new(vec![
            "http://a:6000".to_string(),
            "http://b:6000".to_string(),
        ]));
        let peers = Arc::new(PeerSet::new(Vec::new()));
        let handle = spawn_watch(discovery, peers.clone(), "http://a:6000".to_string());

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(peers.snapshot(), ["http://b:6000"]);
    }
}
