//! Connect/disconnect event queues.
//!
//! Structural side effects of a session's lifetime (presence bookkeeping,
//! index cascades, notifications) run on a single consumer task fed by two
//! bounded queues, so they happen in a well-defined order no matter how many
//! read tasks race. The queues never block their producers: a full queue
//! drops the event with a warning.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::events::{code, PresencePayload};
use super::hub::Hub;
use super::router;
use super::session::Session;

const EVENT_QUEUE_CAPACITY: usize = 10_000;

/// Why a session left the `Open` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// The peer sent a close frame or the stream ended.
    PeerClosed,
    /// A transport-level read error.
    TransportError,
    /// The client sent an in-band close command.
    ClientRequest,
    /// The server tore the connection down (force-close).
    ServerClose,
}

pub struct Disconnect {
    pub session: Arc<Session>,
    pub cause: CloseCause,
}

/// Producer half, held by the hub.
pub struct LifecycleTx {
    connect: mpsc::Sender<Arc<Session>>,
    disconnect: mpsc::Sender<Disconnect>,
}

/// Consumer half, owned by the task spawned in [`spawn`].
pub struct LifecycleRx {
    connect: mpsc::Receiver<Arc<Session>>,
    disconnect: mpsc::Receiver<Disconnect>,
}

pub fn channel() -> (LifecycleTx, LifecycleRx) {
    let (connect_tx, connect_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let (disconnect_tx, disconnect_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    (
        LifecycleTx {
            connect: connect_tx,
            disconnect: disconnect_tx,
        },
        LifecycleRx {
            connect: connect_rx,
            disconnect: disconnect_rx,
        },
    )
}

impl LifecycleTx {
    pub fn client_connected(&self, session: Arc<Session>) {
        if let Err(err) = self.connect.try_send(session) {
            tracing::warn!(?err, "connect event queue full, event dropped");
        }
    }

    pub fn client_disconnected(&self, session: Arc<Session>, cause: CloseCause) {
        if let Err(err) = self.disconnect.try_send(Disconnect { session, cause }) {
            tracing::warn!(?err, "disconnect event queue full, event dropped");
        }
    }
}

/// Start the single consumer task draining both queues.
pub fn spawn(hub: Arc<Hub>, mut rx: LifecycleRx) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = rx.connect.recv() => match event {
                    Some(session) => on_connect(&hub, session),
                    None => break,
                },
                event = rx.disconnect.recv() => match event {
                    Some(disconnect) => on_disconnect(&hub, disconnect),
                    None => break,
                },
            }
        }
    })
}

fn on_connect(hub: &Arc<Hub>, session: Arc<Session>) {
    tracing::info!(
        client_id = %session.client_id,
        system_id = %session.system_id,
        live = hub.registry.count(),
        "client connected"
    );
}

fn on_disconnect(hub: &Arc<Hub>, event: Disconnect) {
    let Disconnect { session, cause } = event;

    hub.remove_session(&session);

    let payload = PresencePayload {
        system_id: session.system_id.clone(),
        group_name: session.groups().join(","),
        client_id: session.client_id.clone(),
        user_id: session.user_id().unwrap_or_default(),
        extend: session.extend().unwrap_or_default(),
    }
    .to_data();

    // Tell the user identity's surviving sessions, regardless of tenant or
    // group.
    if let Some(user_id) = session.user_id() {
        router::send_to_user(
            hub,
            None,
            &session.client_id,
            None,
            &user_id,
            code::CLIENT_OFFLINE,
            "client offline",
            &payload,
        );
    }

    // Tell each group the session belonged to, if it asked for presence.
    if session.notify_on_presence {
        for group_name in session.groups() {
            router::send_to_group(
                hub,
                &session.system_id,
                &session.client_id,
                &group_name,
                code::CLIENT_OFFLINE,
                "client offline",
                &payload,
            );
        }
    }

    tracing::info!(
        client_id = %session.client_id,
        system_id = %session.system_id,
        live = hub.registry.count(),
        seconds = session.lifetime_secs(),
        ?cause,
        "client disconnected"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::indices::GroupKey;
    use crate::gateway::session::Outbound;
    use fanout_common::SnowflakeGenerator;
    use std::time::Duration;

    fn make_notifying_session(
        client_id: &str,
        system_id: &str,
    ) -> (Arc<Session>, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Session::new(
            client_id.to_string(),
            system_id.to_string(),
            true,
            tx,
        ));
        (session, rx)
    }

    #[tokio::test]
    async fn disconnect_cascades_and_notifies_group() {
        let (tx, rx) = channel();
        let hub = Arc::new(Hub::new(tx, None, SnowflakeGenerator::new(0)));
        spawn(hub.clone(), rx);

        let (a, mut rx_a) = make_notifying_session("cli_a", "acme");
        let (b, _rx_b) = make_notifying_session("cli_b", "acme");
        hub.add_session(a.clone());
        hub.add_session(b.clone());
        hub.bind_group_local(&a, "lobby");
        hub.bind_group_local(&b, "lobby");

        assert!(b.mark_deleted());
        hub.lifecycle
            .client_disconnected(b.clone(), CloseCause::PeerClosed);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(hub.registry.get("cli_b").is_none());
        assert_eq!(
            hub.groups.members_of(&GroupKey::new("acme", "lobby")),
            ["cli_a"]
        );

        let frame = rx_a.try_recv().expect("offline notification");
        let Outbound::Text(text) = frame else {
            panic!("expected text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["code"], code::CLIENT_OFFLINE);
        assert_eq!(value["sendUserId"], "cli_b");
    }

    #[tokio::test]
    async fn disconnect_notifies_user_identity_sessions() {
        let (tx, rx) = channel();
        let hub = Arc::new(Hub::new(tx, None, SnowflakeGenerator::new(0)));
        spawn(hub.clone(), rx);

        let (a, mut rx_a) = make_notifying_session("cli_a", "acme");
        let (b, _rx_b) = make_notifying_session("cli_b", "acme");
        hub.add_session(a.clone());
        hub.add_session(b.clone());
        hub.bind_user_local(&a, "u1", None);
        hub.bind_user_local(&b, "u1", None);

        assert!(b.mark_deleted());
        hub.lifecycle
            .client_disconnected(b.clone(), CloseCause::TransportError);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(hub.users.members_of(&"u1".to_string()), ["cli_a"]);
        let mut saw_offline = false;
        while let Ok(Outbound::Text(text)) = rx_a.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            if value["code"] == code::CLIENT_OFFLINE {
                saw_offline = true;
            }
        }
        assert!(saw_offline);
    }
}
