//! WebSocket upgrade endpoint and the per-connection tasks.
//!
//! Each connection runs two tasks: a writer draining the session's outbound
//! queue into the socket, and the read loop that decodes in-band commands and
//! classifies how the connection ends.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use fanout_common::id::{prefix, prefixed_ulid};

use crate::error::ApiError;
use crate::AppState;

use super::events::{CommandFrame, Envelope};
use super::handler::{self, Flow};
use super::hub::Hub;
use super::lifecycle::CloseCause;
use super::router;
use super::session::{Outbound, Session};

/// Interval between server-initiated ping frames.
const PING_INTERVAL_SECS: u64 = 50;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectParams {
    system_id: String,
    notify: Option<String>,
    group_name: Option<String>,
    user_id: Option<String>,
    extend: Option<String>,
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // Unknown tenants never get a socket.
    if params.system_id.is_empty() {
        return ApiError::tenant_invalid("systemId is required").into_response();
    }
    match state.tenants.is_registered(&params.system_id).await {
        Ok(true) => {}
        Ok(false) => {
            return ApiError::tenant_invalid("systemId is not registered").into_response();
        }
        Err(err) => return err.into_response(),
    }

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| handle_connection(socket, state, params))
        .into_response()
}

async fn handle_connection(socket: WebSocket, state: AppState, params: ConnectParams) {
    let (ws_tx, ws_rx) = socket.split();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    let client_id = prefixed_ulid(prefix::CLIENT);
    let notify = params
        .notify
        .as_deref()
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let session = Arc::new(Session::new(
        client_id.clone(),
        params.system_id.clone(),
        notify,
        out_tx,
    ));

    let writer = tokio::spawn(write_loop(ws_tx, out_rx));

    let hub = state.hub.clone();
    hub.add_session(session.clone());

    // Connect parameters may bind a group (and a user identity alongside),
    // or a bare user identity.
    if let Some(group_name) = params.group_name.as_deref().filter(|g| !g.is_empty()) {
        router::bind_session_to_group(
            &hub,
            &session,
            group_name,
            params.user_id.as_deref(),
            params.extend.as_deref(),
        );
    } else if let Some(user_id) = params.user_id.as_deref().filter(|u| !u.is_empty()) {
        router::bind_session_user(&hub, &session, user_id, params.extend.as_deref(), "");
    }

    // Reveal the generated identity to the client as the first frame.
    let hello = Envelope::success(serde_json::json!({ "clientId": client_id }));
    session.send(Outbound::Text(serde_json::to_string(&hello).unwrap()));

    hub.lifecycle.client_connected(session.clone());

    let cause = read_loop(&hub, &session, ws_rx).await;

    // Only the tombstone winner enqueues teardown; a force-close may already
    // have claimed it.
    if session.mark_deleted() {
        session.send(Outbound::Close);
        hub.lifecycle.client_disconnected(session.clone(), cause);
    }

    let _ = writer.await;
}

/// Drain the outbound queue into the socket. Exits on the close frame or the
/// first write error.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(frame) = out_rx.recv().await {
        let result = match frame {
            Outbound::Text(text) => ws_tx.send(Message::Text(text.into())).await,
            Outbound::Ping => ws_tx.send(Message::Ping(Vec::new().into())).await,
            Outbound::Close => {
                let _ = ws_tx
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::NORMAL,
                        reason: String::new().into(),
                    })))
                    .await;
                break;
            }
        };
        if result.is_err() {
            break;
        }
    }
}

/// Consume inbound frames until the connection ends, classifying why.
async fn read_loop(
    hub: &Arc<Hub>,
    session: &Arc<Session>,
    mut ws_rx: SplitStream<WebSocket>,
) -> CloseCause {
    loop {
        match ws_rx.next().await {
            Some(Ok(Message::Text(text))) => {
                let frame: CommandFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(err) => {
                        tracing::warn!(
                            client_id = %session.client_id,
                            system_id = %session.system_id,
                            ?err,
                            "ignoring malformed client frame"
                        );
                        continue;
                    }
                };
                if handler::handle_command(hub, session, frame) == Flow::Close {
                    return CloseCause::ClientRequest;
                }
            }
            // Keepalive traffic, not a close condition.
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Binary(_))) => {
                tracing::warn!(client_id = %session.client_id, "ignoring binary client frame");
            }
            Some(Ok(Message::Close(_))) | None => return CloseCause::PeerClosed,
            Some(Err(err)) => {
                tracing::warn!(
                    client_id = %session.client_id,
                    system_id = %session.system_id,
                    ?err,
                    "client read error"
                );
                return CloseCause::TransportError;
            }
        }
    }
}

/// Periodically enqueue a ping to every live session.
pub fn spawn_heartbeat(hub: Arc<Hub>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(Duration::from_secs(PING_INTERVAL_SECS));
        ticker.tick().await; // First tick fires immediately; skip it.
        loop {
            ticker.tick().await;
            for session in hub.registry.all() {
                session.send(Outbound::Ping);
            }
        }
    })
}
