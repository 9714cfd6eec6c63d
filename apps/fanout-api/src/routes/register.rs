//! Tenant registration endpoint. The only management route exempt from the
//! tenant check — it is the one creating the tenant.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::gateway::events::Envelope;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/register", post(register_tenant))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub system_id: String,
}

#[utoipa::path(
    post,
    path = "/api/register",
    tag = "Tenants",
    request_body = RegisterRequest,
    responses((status = 200, description = "Tenant registered", body = Envelope)),
)]
pub async fn register_tenant(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<Envelope>, ApiError> {
    if req.system_id.is_empty() {
        return Err(ApiError::invalid("systemId is required"));
    }

    state.tenants.register(&req.system_id).await?;

    Ok(Json(Envelope::success(serde_json::json!({
        "systemId": req.system_id,
    }))))
}
