//! Fan-out operations: resolve a logical target (clients, group, user,
//! tenant) into local deliveries, relaying to peer nodes when the target may
//! live elsewhere. Cluster RPC handlers call the `*_local` variants so a
//! relayed operation is never re-broadcast.

use std::sync::Arc;

use crate::cluster::client::{BindGroup, ClientSend, CloseClient, GroupSend, SystemSend, UserSend};

use super::events::{code, PresencePayload, PushMessage};
use super::hub::Hub;
use super::lifecycle::CloseCause;
use super::session::{Outbound, Session};

fn push_message(message_id: &str, send_user_id: &str, code: i32, msg: &str, data: &str) -> PushMessage {
    PushMessage {
        message_id: message_id.to_string(),
        send_user_id: send_user_id.to_string(),
        code,
        msg: msg.to_string(),
        data: data.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Sends
// ---------------------------------------------------------------------------

/// Send to one explicit client. Unknown targets are relayed to the cluster
/// (some other node may hold the connection); self-sends are suppressed.
pub fn send_to_client(
    hub: &Hub,
    client_id: &str,
    send_user_id: &str,
    code: i32,
    msg: &str,
    data: &str,
) -> String {
    let message_id = hub.next_message_id();
    if client_id == send_user_id {
        return message_id;
    }

    match hub.registry.get(client_id) {
        Some(session) => {
            let message = push_message(&message_id, send_user_id, code, msg, data);
            session.deliver(&message);
        }
        None => {
            if let Some(cluster) = &hub.cluster {
                cluster.relay_client_send(ClientSend {
                    message_id: message_id.clone(),
                    send_user_id: send_user_id.to_string(),
                    client_id: client_id.to_string(),
                    code,
                    msg: msg.to_string(),
                    data: data.to_string(),
                });
            }
        }
    }
    message_id
}

/// Send to many explicit clients; one correlation id per target.
pub fn send_to_clients(
    hub: &Hub,
    client_ids: &[String],
    send_user_id: &str,
    code: i32,
    msg: &str,
    data: &str,
) -> Vec<String> {
    client_ids
        .iter()
        .filter(|client_id| client_id.as_str() != send_user_id)
        .map(|client_id| send_to_client(hub, client_id, send_user_id, code, msg, data))
        .collect()
}

/// Send to every member of a tenant-scoped group, excluding the sender.
pub fn send_to_group(
    hub: &Hub,
    system_id: &str,
    send_user_id: &str,
    group_name: &str,
    code: i32,
    msg: &str,
    data: &str,
) -> String {
    let message_id = hub.next_message_id();
    let message = push_message(&message_id, send_user_id, code, msg, data);
    hub.local_group_send(system_id, group_name, send_user_id, &message);

    if let Some(cluster) = &hub.cluster {
        cluster.relay_group_send(GroupSend {
            system_id: system_id.to_string(),
            message_id: message_id.clone(),
            send_user_id: send_user_id.to_string(),
            group_name: group_name.to_string(),
            code,
            msg: msg.to_string(),
            data: data.to_string(),
        });
    }
    message_id
}

/// Send to every session of a business user identity, with optional tenant
/// and group filters.
#[allow(clippy::too_many_arguments)]
pub fn send_to_user(
    hub: &Hub,
    system_filter: Option<&str>,
    send_user_id: &str,
    group_filter: Option<&str>,
    user_id: &str,
    code: i32,
    msg: &str,
    data: &str,
) -> String {
    let message_id = hub.next_message_id();
    let message = push_message(&message_id, send_user_id, code, msg, data);
    hub.local_user_send(user_id, system_filter, group_filter, send_user_id, &message);

    if let Some(cluster) = &hub.cluster {
        cluster.relay_user_send(UserSend {
            system_id: system_filter.map(str::to_string),
            message_id: message_id.clone(),
            send_user_id: send_user_id.to_string(),
            group_name: group_filter.map(str::to_string),
            user_id: user_id.to_string(),
            code,
            msg: msg.to_string(),
            data: data.to_string(),
        });
    }
    message_id
}

/// Send to every session of a tenant.
pub fn send_to_system(
    hub: &Hub,
    system_id: &str,
    send_user_id: &str,
    code: i32,
    msg: &str,
    data: &str,
) -> String {
    let message_id = hub.next_message_id();
    let message = push_message(&message_id, send_user_id, code, msg, data);
    hub.local_system_send(system_id, &message);

    if let Some(cluster) = &hub.cluster {
        cluster.relay_system_send(SystemSend {
            system_id: system_id.to_string(),
            message_id: message_id.clone(),
            send_user_id: send_user_id.to_string(),
            code,
            msg: msg.to_string(),
            data: data.to_string(),
        });
    }
    message_id
}

// ---------------------------------------------------------------------------
// Group / user binding
// ---------------------------------------------------------------------------

/// Bind a local session to a group, with the presence and multi-login side
/// effects. A session that already lists the group returns immediately.
pub fn bind_session_to_group(
    hub: &Hub,
    session: &Arc<Session>,
    group_name: &str,
    user_id: Option<&str>,
    extend: Option<&str>,
) {
    if !hub.bind_group_local(session, group_name) {
        return;
    }

    if let Some(user_id) = user_id {
        bind_session_user(hub, session, user_id, extend, group_name);
    }

    if session.notify_on_presence {
        let payload = PresencePayload {
            system_id: session.system_id.clone(),
            group_name: group_name.to_string(),
            client_id: session.client_id.clone(),
            user_id: session.user_id().unwrap_or_default(),
            extend: session.extend().unwrap_or_default(),
        }
        .to_data();
        send_to_group(
            hub,
            &session.system_id,
            &session.client_id,
            group_name,
            code::CLIENT_ONLINE,
            "client online",
            &payload,
        );
    }
}

/// Bind a user identity to a local session. The first time the user index
/// gains this session, every *other* session of the identity is told about
/// the additional sign-on.
pub fn bind_session_user(
    hub: &Hub,
    session: &Arc<Session>,
    user_id: &str,
    extend: Option<&str>,
    group_name: &str,
) {
    if !hub.bind_user_local(session, user_id, extend) {
        return;
    }
    let Some(bound) = session.user_id() else {
        return;
    };

    let payload = PresencePayload {
        system_id: session.system_id.clone(),
        group_name: group_name.to_string(),
        client_id: session.client_id.clone(),
        user_id: bound.clone(),
        extend: session.extend().unwrap_or_default(),
    }
    .to_data();
    send_to_user(
        hub,
        None,
        &session.client_id,
        None,
        &bound,
        code::MULTI_LOGIN,
        "user signed in on another client",
        &payload,
    );
}

/// Bind by client id: locally when the session is here, otherwise relayed to
/// the node that holds it.
pub fn bind_to_group(
    hub: &Hub,
    system_id: &str,
    group_name: &str,
    client_id: &str,
    user_id: Option<&str>,
    extend: Option<&str>,
) {
    match hub.registry.get(client_id) {
        Some(session) if !session.is_deleted() => {
            bind_session_to_group(hub, &session, group_name, user_id, extend);
        }
        _ => {
            if let Some(cluster) = &hub.cluster {
                cluster.relay_bind(BindGroup {
                    system_id: system_id.to_string(),
                    group_name: group_name.to_string(),
                    client_id: client_id.to_string(),
                    user_id: user_id.map(str::to_string),
                    extend: extend.map(str::to_string),
                });
            }
        }
    }
}

/// Cluster RPC entry: bind without relaying further.
pub fn bind_local(
    hub: &Hub,
    group_name: &str,
    client_id: &str,
    user_id: Option<&str>,
    extend: Option<&str>,
) {
    if let Some(session) = hub.registry.get(client_id) {
        if !session.is_deleted() {
            bind_session_to_group(hub, &session, group_name, user_id, extend);
        }
    }
}

// ---------------------------------------------------------------------------
// Force close
// ---------------------------------------------------------------------------

/// Tear down a session: close the socket and hand the disconnect to the
/// lifecycle queue. Only the tombstone winner enqueues.
pub fn close_session(hub: &Hub, session: &Arc<Session>) {
    if session.mark_deleted() {
        session.send(Outbound::Close);
        hub.lifecycle
            .client_disconnected(session.clone(), CloseCause::ServerClose);
    }
}

/// Force-close by client id, tenant-checked; relayed when the session is not
/// local.
pub fn close_client(hub: &Hub, client_id: &str, system_id: &str) {
    match hub.registry.get(client_id) {
        Some(session) => {
            if session.system_id == system_id {
                close_session(hub, &session);
            }
        }
        None => {
            if let Some(cluster) = &hub.cluster {
                cluster.relay_close(CloseClient {
                    system_id: system_id.to_string(),
                    client_id: client_id.to_string(),
                });
            }
        }
    }
}

/// Cluster RPC entry: close without relaying further.
pub fn close_local(hub: &Hub, client_id: &str, system_id: &str) {
    if let Some(session) = hub.registry.get(client_id) {
        if session.system_id == system_id {
            close_session(hub, &session);
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Live members of a group across the whole cluster.
pub async fn group_members(hub: &Hub, system_id: &str, group_name: &str) -> Vec<String> {
    let mut members = hub.local_group_members(system_id, group_name);
    if let Some(cluster) = &hub.cluster {
        members.extend(cluster.group_clients(system_id, group_name).await);
    }
    members
}

/// A user identity's sessions across the whole cluster, as composite
/// `systemId:groupName:clientId` identifiers.
pub async fn user_clients(
    hub: &Hub,
    system_filter: Option<&str>,
    group_filter: Option<&str>,
    user_id: &str,
) -> Vec<String> {
    let mut clients = hub.local_user_clients(system_filter, group_filter, user_id);
    if let Some(cluster) = &hub.cluster {
        clients.extend(
            cluster
                .user_clients(system_filter, group_filter, user_id)
                .await,
        );
    }
    clients
}
