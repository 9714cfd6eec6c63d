//! Secondary membership indices over the session registry.
//!
//! Three instances exist per hub: by group (composite tenant-scoped key), by
//! business user id, and by tenant. Buckets hold client-id sets, so duplicate
//! adds and absent removes are O(1) no-ops.

use std::collections::HashSet;
use std::hash::Hash;

use dashmap::DashMap;

/// Composite group index key. The same group name under two tenants must
/// never cross-deliver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub system_id: String,
    pub group_name: String,
}

impl GroupKey {
    pub fn new(system_id: &str, group_name: &str) -> Self {
        Self {
            system_id: system_id.to_string(),
            group_name: group_name.to_string(),
        }
    }
}

/// One membership table: key → set of client ids.
pub struct MembershipIndex<K> {
    buckets: DashMap<K, HashSet<String>>,
}

impl<K: Eq + Hash + Clone> MembershipIndex<K> {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Idempotent add. Returns `true` if the member was actually inserted.
    pub fn add_member(&self, key: K, client_id: &str) -> bool {
        self.buckets
            .entry(key)
            .or_default()
            .insert(client_id.to_string())
    }

    /// Removes at most one matching entry; a no-op if absent. A bucket whose
    /// last member goes away is dropped from the map.
    pub fn remove_member(&self, key: &K, client_id: &str) {
        let now_empty = match self.buckets.get_mut(key) {
            Some(mut members) => {
                members.remove(client_id);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.buckets.remove_if(key, |_, members| members.is_empty());
        }
    }

    /// Snapshot of a bucket. Unknown keys yield an empty list, never an error.
    pub fn members_of(&self, key: &K) -> Vec<String> {
        self.buckets
            .get(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl<K: Eq + Hash + Clone> Default for MembershipIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let index = MembershipIndex::new();
        let key = GroupKey::new("acme", "lobby");

        assert!(index.add_member(key.clone(), "cli_a"));
        assert!(!index.add_member(key.clone(), "cli_a"));
        assert_eq!(index.members_of(&key), ["cli_a"]);
    }

    #[test]
    fn remove_is_at_most_once() {
        let index = MembershipIndex::new();
        let key = GroupKey::new("acme", "lobby");
        index.add_member(key.clone(), "cli_a");
        index.add_member(key.clone(), "cli_b");

        index.remove_member(&key, "cli_a");
        index.remove_member(&key, "cli_a");
        assert_eq!(index.members_of(&key), ["cli_b"]);
    }

    #[test]
    fn empty_bucket_is_dropped() {
        let index = MembershipIndex::new();
        let key = GroupKey::new("acme", "lobby");
        index.add_member(key.clone(), "cli_a");
        assert_eq!(index.bucket_count(), 1);

        index.remove_member(&key, "cli_a");
        assert_eq!(index.bucket_count(), 0);
    }

    #[test]
    fn unknown_key_yields_empty() {
        let index: MembershipIndex<String> = MembershipIndex::new();
        assert!(index.members_of(&"nope".to_string()).is_empty());
        index.remove_member(&"nope".to_string(), "cli_a");
    }

    #[test]
    fn same_group_name_is_tenant_scoped() {
        let index = MembershipIndex::new();
        index.add_member(GroupKey::new("acme", "lobby"), "cli_a");
        index.add_member(GroupKey::new("globex", "lobby"), "cli_b");

        assert_eq!(index.members_of(&GroupKey::new("acme", "lobby")), ["cli_a"]);
        assert_eq!(
            index.members_of(&GroupKey::new("globex", "lobby")),
            ["cli_b"]
        );
    }
}
