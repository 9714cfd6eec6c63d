//! Online-list queries: who is in a group, and which connections a business
//! user identity currently has. Both union local state with every peer's
//! answer when clustered.

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
        .route("/api/group/list", post(group_list))
        .route("/api/user/list", post(user_clients))
}

// ---------------------------------------------------------------------------
// POST /api/group/list
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupListRequest {
    pub system_id: Option<String>,
    pub group_name: String,
}

#[utoipa::path(
    post,
    path = "/api/group/list",
    tag = "Groups",
    request_body = GroupListRequest,
    responses((status = 200, description = "Online client ids", body = Envelope)),
)]
pub async fn group_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GroupListRequest>,
) -> Result<Json<Envelope>, ApiError> {
    let system_id = resolve_tenant(&state, &headers, req.system_id.as_deref()).await?;
    if req.group_name.is_empty() {
        return Err(ApiError::invalid("groupName is required"));
    }

    let list = router::group_members(&state.hub, &system_id, &req.group_name).await;
    Ok(Json(Envelope::success(serde_json::json!(list))))
}

// ---------------------------------------------------------------------------
// POST /api/user/list
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserClientsRequest {
    pub system_id: Option<String>,
    pub group_name: Option<String>,
    pub user_id: String,
}

#[utoipa::path(
    post,
    path = "/api/user/list",
    tag = "Groups",
    request_body = UserClientsRequest,
    responses((status = 200, description = "Composite session identifiers", body = Envelope)),
)]
pub async fn user_clients(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UserClientsRequest>,
) -> Result<Json<Envelope>, ApiError> {
    let system_id = resolve_tenant(&state, &headers, req.system_id.as_deref()).await?;
    if req.user_id.is_empty() {
        return Err(ApiError::invalid("userId is required"));
    }

    let list = router::user_clients(
        &state.hub,
        Some(&system_id),
        req.group_name.as_deref().filter(|g| !g.is_empty()),
        &req.user_id,
    )
    .await;
    Ok(Json(Envelope::success(serde_json::json!(list))))
}
