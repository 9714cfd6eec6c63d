//! Bind-to-group endpoint.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::gateway::events::Envelope;
use crate::gateway::router;
use crate::AppState;

use super::resolve_tenant;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/bind/2/group", post(bind_to_group))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BindToGroupRequest {
    pub system_id: Option<String>,
    pub group_name: String,
    pub client_id: String,
    pub user_id: Option<String>,
    pub extend: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/bind/2/group",
    tag = "Groups",
    request_body = BindToGroupRequest,
    responses((status = 200, description = "Client bound", body = Envelope)),
)]
pub async fn bind_to_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BindToGroupRequest>,
) -> Result<Json<Envelope>, ApiError> {
    let system_id = resolve_tenant(&state, &headers, req.system_id.as_deref()).await?;
    if req.group_name.is_empty() {
        return Err(ApiError::invalid("groupName is required"));
    }
    if req.client_id.is_empty() {
        return Err(ApiError::invalid("clientId is required"));
    }

    router::bind_to_group(
        &state.hub,
        &system_id,
        &req.group_name,
        &req.client_id,
        req.user_id.as_deref(),
        req.extend.as_deref(),
    );

    Ok(Json(Envelope::success(Value::Null)))
}
