//! Force-close endpoint.

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
    Router::new().route("/api/close/client", post(close_client))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CloseClientRequest {
    pub system_id: Option<String>,
    pub client_id: String,
}

#[utoipa::path(
    post,
    path = "/api/close/client",
    tag = "Clients",
    request_body = CloseClientRequest,
    responses((status = 200, description = "Close requested", body = Envelope)),
)]
pub async fn close_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CloseClientRequest>,
) -> Result<Json<Envelope>, ApiError> {
    let system_id = resolve_tenant(&state, &headers, req.system_id.as_deref()).await?;
    if req.client_id.is_empty() {
        return Err(ApiError::invalid("clientId is required"));
    }

    router::close_client(&state.hub, &req.client_id, &system_id);

    Ok(Json(Envelope::success(Value::Null)))
}
