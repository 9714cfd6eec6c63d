use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ApiError;

/// Abstraction over the tenant registration collaborator.
///
/// Backed by a shared store (e.g. etcd) when clustered so every node sees the
/// same tenant set; the in-memory implementation serves standalone nodes and
/// tests.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn register(&self, system_id: &str) -> Result<(), ApiError>;
    async fn is_registered(&self, system_id: &str) -> Result<bool, ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

pub struct MemoryTenantDirectory {
    tenants: Mutex<HashSet<String>>,
}

impl MemoryTenantDirectory {
    pub fn new() -> Self {
        Self {
            tenants: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for MemoryTenantDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenantDirectory for MemoryTenantDirectory {
    async fn register(&self, system_id: &str) -> Result<(), ApiError> {
        self.tenants.lock().unwrap().insert(system_id.to_string());
        Ok(())
    }

    async fn is_registered(&self, system_id: &str) -> Result<bool, ApiError> {
        Ok(self.tenants.lock().unwrap().contains(system_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_lookup() {
        let dir = MemoryTenantDirectory::new();
        assert!(!dir.is_registered("acme").await.unwrap());

        dir.register("acme").await.unwrap();
        assert!(dir.is_registered("acme").await.unwrap());
        assert!(!dir.is_registered("other").await.unwrap());
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let dir = MemoryTenantDirectory::new();
        dir.register("acme").await.unwrap();
        dir.register("acme").await.unwrap();
        assert!(dir.is_registered("acme").await.unwrap());
    }
}
