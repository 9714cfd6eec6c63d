//! The hub is the context object tying the core together: the session
//! registry, the three membership indices, the lifecycle queue handles, and
//! (when clustered) the broadcast client. One hub is built at startup and
//! shared as `Arc<Hub>`; tests build as many independent hubs as they need.

use std::sync::Arc;

use fanout_common::SnowflakeGenerator;

use crate::cluster::client::ClusterClient;

use super::events::PushMessage;
use super::indices::{GroupKey, MembershipIndex};
use super::lifecycle::LifecycleTx;
use super::registry::SessionRegistry;
use super::session::Session;

pub struct Hub {
    pub registry: SessionRegistry,
    pub groups: MembershipIndex<GroupKey>,
    pub users: MembershipIndex<String>,
    pub systems: MembershipIndex<String>,
    pub lifecycle: LifecycleTx,
    pub cluster: Option<ClusterClient>,
    ids: SnowflakeGenerator,
}

impl Hub {
    pub fn new(
        lifecycle: LifecycleTx,
        cluster: Option<ClusterClient>,
        ids: SnowflakeGenerator,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            groups: MembershipIndex::new(),
            users: MembershipIndex::new(),
            systems: MembershipIndex::new(),
            lifecycle,
            cluster,
            ids,
        }
    }

    /// Correlation id stamped on every delivery one send produces.
    pub fn next_message_id(&self) -> String {
        self.ids.generate().to_string()
    }

    // -----------------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------------

    /// Register a freshly upgraded session and its tenant membership.
    pub fn add_session(&self, session: Arc<Session>) {
        self.systems
            .add_member(session.system_id.clone(), &session.client_id);
        self.registry.add(session);
    }

    /// Cascading removal: the registry entry and every index bucket the
    /// session occupies.
    pub fn remove_session(&self, session: &Session) {
        self.registry.remove(&session.client_id);
        self.systems
            .remove_member(&session.system_id, &session.client_id);
        if let Some(user_id) = session.user_id() {
            self.users.remove_member(&user_id, &session.client_id);
        }
        for group_name in session.groups() {
            self.groups.remove_member(
                &GroupKey::new(&session.system_id, &group_name),
                &session.client_id,
            );
        }
    }

    /// Add the session to a group (index + its own list). Returns `false`
    /// when the session already listed the group — the whole join is then
    /// skipped, including any notification.
    pub fn bind_group_local(&self, session: &Session, group_name: &str) -> bool {
        if !session.join_group(group_name) {
            return false;
        }
        self.groups.add_member(
            GroupKey::new(&session.system_id, group_name),
            &session.client_id,
        );
        true
    }

    /// Bind a user identity and index the session under it. Returns `true`
    /// when the user index actually gained this session — the caller then
    /// owes the multi-login notification.
    pub fn bind_user_local(&self, session: &Session, user_id: &str, extend: Option<&str>) -> bool {
        if user_id.is_empty() {
            return false;
        }
        session.bind_identity(user_id, extend);
        // Index under the identity actually bound: the first bind wins, a
        // later conflicting bind must not create a second bucket entry.
        let Some(bound) = session.user_id() else {
            return false;
        };
        self.users.add_member(bound, &session.client_id)
    }

    // -----------------------------------------------------------------------
    // Local delivery — all enqueues, never blocking on a slow client
    // -----------------------------------------------------------------------

    /// Deliver to one local session. Unknown, tombstoned, and self targets
    /// are skipped; none of these is an error.
    pub fn deliver_to_client(&self, client_id: &str, exclude: &str, message: &PushMessage) -> bool {
        if !exclude.is_empty() && exclude == client_id {
            return false;
        }
        match self.registry.get(client_id) {
            Some(session) if !session.is_deleted() => {
                session.deliver(message);
                true
            }
            _ => false,
        }
    }

    /// Deliver to every live local member of a group, pruning entries whose
    /// session is gone or tombstoned.
    pub fn local_group_send(
        &self,
        system_id: &str,
        group_name: &str,
        exclude: &str,
        message: &PushMessage,
    ) {
        let key = GroupKey::new(system_id, group_name);
        for client_id in self.groups.members_of(&key) {
            if client_id == exclude {
                continue;
            }
            match self.registry.get(&client_id) {
                Some(session) if !session.is_deleted() => session.deliver(message),
                _ => self.groups.remove_member(&key, &client_id),
            }
        }
    }

    /// Deliver to the local sessions of a user identity, with optional
    /// tenant and group filters.
    pub fn local_user_send(
        &self,
        user_id: &str,
        system_filter: Option<&str>,
        group_filter: Option<&str>,
        exclude: &str,
        message: &PushMessage,
    ) {
        let key = user_id.to_string();
        for client_id in self.users.members_of(&key) {
            if client_id == exclude {
                continue;
            }
            let session = match self.registry.get(&client_id) {
                Some(session) if !session.is_deleted() => session,
                _ => {
                    self.users.remove_member(&key, &client_id);
                    continue;
                }
            };
            if let Some(system_id) = system_filter {
                if session.system_id != system_id {
                    continue;
                }
            }
            if let Some(group_name) = group_filter {
                if !session.in_group(group_name) {
                    continue;
                }
            }
            session.deliver(message);
        }
    }

    /// Deliver to every local session of a tenant.
    pub fn local_system_send(&self, system_id: &str, message: &PushMessage) {
        let key = system_id.to_string();
        for client_id in self.systems.members_of(&key) {
            match self.registry.get(&client_id) {
                Some(session) if !session.is_deleted() => session.deliver(message),
                _ => self.systems.remove_member(&key, &client_id),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Local queries
    // -----------------------------------------------------------------------

    /// Live local members of a group, pruning stale entries on the way.
    pub fn local_group_members(&self, system_id: &str, group_name: &str) -> Vec<String> {
        let key = GroupKey::new(system_id, group_name);
        let mut members = Vec::new();
        for client_id in self.groups.members_of(&key) {
            match self.registry.get(&client_id) {
                Some(session) if !session.is_deleted() => members.push(client_id),
                _ => self.groups.remove_member(&key, &client_id),
            }
        }
        members
    }

    /// Live local sessions of a user identity as `systemId:groupName:clientId`
    /// composite identifiers — one entry per matching group, or a single
    /// entry with an empty group for a session in no groups.
    pub fn local_user_clients(
        &self,
        system_filter: Option<&str>,
        group_filter: Option<&str>,
        user_id: &str,
    ) -> Vec<String> {
        let key = user_id.to_string();
        let mut out = Vec::new();
        for client_id in self.users.members_of(&key) {
            let session = match self.registry.get(&client_id) {
                Some(session) if !session.is_deleted() => session,
                _ => {
                    self.users.remove_member(&key, &client_id);
                    continue;
                }
            };
            if let Some(system_id) = system_filter {
                if session.system_id != system_id {
                    continue;
                }
            }
            let groups = session.groups();
            if groups.is_empty() {
                if group_filter.is_some() {
                    continue;
                }
                out.push(format!("{}::{}", session.system_id, client_id));
            } else {
                for group_name in groups {
                    if let Some(filter) = group_filter {
                        if filter != group_name {
                            continue;
                        }
                    }
                    out.push(format!("{}:{}:{}", session.system_id, group_name, client_id));
                }
            }
        }
        out
    }
}
