//! Message send endpoints. Each resolves locally and relays to the cluster
//! when the target may live on another node; the response echoes the
//! generated message correlation id.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::gateway::events::Envelope;
use crate::gateway::router;
use crate::AppState;

use super::resolve_tenant;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/send/2/client", post(send_to_client))
        .route("/api/send/2/clients", post(send_to_clients))
        .route("/api/send/2/group", post(send_to_group))
        .route("/api/send/2/user", post(send_to_user))
}

fn message_id_response(message_id: String) -> Json<Envelope> {
    Json(Envelope::success(serde_json::json!({
        "messageId": message_id,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/send/2/client
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SendToClientRequest {
    pub system_id: Option<String>,
    pub send_user_id: String,
    pub client_id: String,
    pub code: i32,
    pub msg: String,
    pub data: String,
}

#[utoipa::path(
    post,
    path = "/api/send/2/client",
    tag = "Send",
    request_body = SendToClientRequest,
    responses((status = 200, description = "Message queued", body = Envelope)),
)]
pub async fn send_to_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SendToClientRequest>,
) -> Result<Json<Envelope>, ApiError> {
    resolve_tenant(&state, &headers, req.system_id.as_deref()).await?;
    if req.client_id.is_empty() {
        return Err(ApiError::invalid("clientId is required"));
    }
    if req.send_user_id.is_empty() {
        return Err(ApiError::invalid("sendUserId is required"));
    }

    let message_id = router::send_to_client(
        &state.hub,
        &req.client_id,
        &req.send_user_id,
        req.code,
        &req.msg,
        &req.data,
    );
    Ok(message_id_response(message_id))
}

// ---------------------------------------------------------------------------
// POST /api/send/2/clients
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SendToClientsRequest {
    pub system_id: Option<String>,
    pub send_user_id: String,
    pub client_ids: Vec<String>,
    pub code: i32,
    pub msg: String,
    pub data: String,
}

#[utoipa::path(
    post,
    path = "/api/send/2/clients",
    tag = "Send",
    request_body = SendToClientsRequest,
    responses((status = 200, description = "Messages queued", body = Envelope)),
)]
pub async fn send_to_clients(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SendToClientsRequest>,
) -> Result<Json<Envelope>, ApiError> {
    resolve_tenant(&state, &headers, req.system_id.as_deref()).await?;
    if req.client_ids.is_empty() {
        return Err(ApiError::invalid("clientIds is required"));
    }
    if req.send_user_id.is_empty() {
        return Err(ApiError::invalid("sendUserId is required"));
    }

    let message_ids = router::send_to_clients(
        &state.hub,
        &req.client_ids,
        &req.send_user_id,
        req.code,
        &req.msg,
        &req.data,
    );
    Ok(message_id_response(message_ids.join(",")))
}

// ---------------------------------------------------------------------------
// POST /api/send/2/group
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SendToGroupRequest {
    pub system_id: Option<String>,
    pub send_user_id: String,
    pub group_name: String,
    pub code: i32,
    pub msg: String,
    pub data: String,
}

#[utoipa::path(
    post,
    path = "/api/send/2/group",
    tag = "Send",
    request_body = SendToGroupRequest,
    responses((status = 200, description = "Message queued", body = Envelope)),
)]
pub async fn send_to_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SendToGroupRequest>,
) -> Result<Json<Envelope>, ApiError> {
    let system_id = resolve_tenant(&state, &headers, req.system_id.as_deref()).await?;
    if req.group_name.is_empty() {
        return Err(ApiError::invalid("groupName is required"));
    }
    if req.send_user_id.is_empty() {
        return Err(ApiError::invalid("sendUserId is required"));
    }

    let message_id = router::send_to_group(
        &state.hub,
        &system_id,
        &req.send_user_id,
        &req.group_name,
        req.code,
        &req.msg,
        &req.data,
    );
    Ok(message_id_response(message_id))
}

// ---------------------------------------------------------------------------
// POST /api/send/2/user
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SendToUserRequest {
    pub system_id: Option<String>,
    pub send_user_id: String,
    pub group_name: Option<String>,
    pub user_id: String,
    pub code: i32,
    pub msg: String,
    pub data: String,
}

#[utoipa::path(
    post,
    path = "/api/send/2/user",
    tag = "Send",
    request_body = SendToUserRequest,
    responses((status = 200, description = "Message queued", body = Envelope)),
)]
pub async fn send_to_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SendToUserRequest>,
) -> Result<Json<Envelope>, ApiError> {
    let system_id = resolve_tenant(&state, &headers, req.system_id.as_deref()).await?;
    if req.user_id.is_empty() {
        return Err(ApiError::invalid("userId is required"));
    }
    if req.send_user_id.is_empty() {
        return Err(ApiError::invalid("sendUserId is required"));
    }

    let message_id = router::send_to_user(
        &state.hub,
        Some(&system_id),
        &req.send_user_id,
        req.group_name.as_deref().filter(|g| !g.is_empty()),
        &req.user_id,
        req.code,
        &req.msg,
        &req.data,
    );
    Ok(message_id_response(message_id))
}
