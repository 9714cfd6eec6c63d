//! Server side of the node-to-node RPC contract.
//!
//! Every handler acts on local state only — a relayed operation must never
//! be broadcast a second time.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use crate::gateway::events::{Envelope, PushMessage};
use crate::gateway::router;
use crate::AppState;

use super::client::{
    BindGroup, ClientSend, CloseClient, GroupClientsQuery, GroupSend, IdList, SystemSend,
    UserClientsQuery, UserSend,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cluster/send/client", post(send_client))
        .route("/cluster/send/group", post(send_group))
        .route("/cluster/send/user", post(send_user))
        .route("/cluster/send/system", post(send_system))
        .route("/cluster/close/client", post(close_client))
        .route("/cluster/bind/group", post(bind_group))
        .route("/cluster/group/clients", post(group_clients))
        .route("/cluster/user/clients", post(user_clients))
}

fn ack() -> Json<Envelope> {
    Json(Envelope::success(Value::Null))
}

async fn send_client(State(state): State<AppState>, Json(req): Json<ClientSend>) -> Json<Envelope> {
    let message = PushMessage {
        message_id: req.message_id,
        send_user_id: req.send_user_id.clone(),
        code: req.code,
        msg: req.msg,
        data: req.data,
    };
    state
        .hub
        .deliver_to_client(&req.client_id, &req.send_user_id, &message);
    ack()
}

async fn send_group(State(state): State<AppState>, Json(req): Json<GroupSend>) -> Json<Envelope> {
    let message = PushMessage {
        message_id: req.message_id,
        send_user_id: req.send_user_id.clone(),
        code: req.code,
        msg: req.msg,
        data: req.data,
    };
    state
        .hub
        .local_group_send(&req.system_id, &req.group_name, &req.send_user_id, &message);
    ack()
}

async fn send_user(State(state): State<AppState>, Json(req): Json<UserSend>) -> Json<Envelope> {
    let message = PushMessage {
        message_id: req.message_id,
        send_user_id: req.send_user_id.clone(),
        code: req.code,
        msg: req.msg,
        data: req.data,
    };
    state.hub.local_user_send(
        &req.user_id,
        req.system_id.as_deref(),
        req.group_name.as_deref(),
        &req.send_user_id,
        &message,
    );
    ack()
}

async fn send_system(State(state): State<AppState>, Json(req): Json<SystemSend>) -> Json<Envelope> {
    let message = PushMessage {
        message_id: req.message_id,
        send_user_id: req.send_user_id,
        code: req.code,
        msg: req.msg,
        data: req.data,
    };
    state.hub.local_system_send(&req.system_id, &message);
    ack()
}

async fn close_client(
    State(state): State<AppState>,
    Json(req): Json<CloseClient>,
) -> Json<Envelope> {
    router::close_local(&state.hub, &req.client_id, &req.system_id);
    ack()
}

async fn bind_group(State(state): State<AppState>, Json(req): Json<BindGroup>) -> Json<Envelope> {
    router::bind_local(
        &state.hub,
        &req.group_name,
        &req.client_id,
        req.user_id.as_deref(),
        req.extend.as_deref(),
    );
    ack()
}

async fn group_clients(
    State(state): State<AppState>,
    Json(req): Json<GroupClientsQuery>,
) -> Json<IdList> {
    Json(IdList {
        list: state
            .hub
            .local_group_members(&req.system_id, &req.group_name),
    })
}

async fn user_clients(
    State(state): State<AppState>,
    Json(req): Json<UserClientsQuery>,
) -> Json<IdList> {
    Json(IdList {
        list: state.hub.local_user_clients(
            req.system_id.as_deref(),
            req.group_name.as_deref(),
            &req.user_id,
        ),
    })
}
