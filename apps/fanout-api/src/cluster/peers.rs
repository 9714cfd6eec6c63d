//! The set of peer node base URLs.

use parking_lot::RwLock;

/// Read-mostly snapshot of the other cluster nodes, maintained by the
/// discovery watch loop.
///
/// The lock is this set's own; it is never held while a remote call is in
/// flight or while any session or index structure is touched, so core
/// deliveries cannot block on cluster-membership updates.
pub struct PeerSet {
    inner: RwLock<Vec<String>>,
}

impl PeerSet {
    pub fn new(initial: Vec<String>) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.inner.read().clone()
    }

    pub fn replace(&self, peers: Vec<String>) {
        *self.inner.write() = peers;
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
