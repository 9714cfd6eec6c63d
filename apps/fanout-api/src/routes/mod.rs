pub mod bind;
pub mod close;
pub mod health;
pub mod online;
pub mod register;
pub mod send;

use axum::http::HeaderMap;
use axum::Router;
use utoipa::OpenApi;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .merge(register::router())
        .merge(bind::router())
        .merge(send::router())
        .merge(online::router())
        .merge(close::router())
}

/// Effective tenant for a management call: the body's `systemId` when
/// present, else the `SystemId` header. It must be registered.
pub(crate) async fn resolve_tenant(
    state: &AppState,
    headers: &HeaderMap,
    body_system_id: Option<&str>,
) -> Result<String, ApiError> {
    let system_id = body_system_id
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("SystemId")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::tenant_invalid("systemId is required"))?;

    if !state.tenants.is_registered(&system_id).await? {
        return Err(ApiError::tenant_invalid("systemId is not registered"));
    }
    Ok(system_id)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        register::register_tenant,
        bind::bind_to_group,
        send::send_to_client,
        send::send_to_clients,
        send::send_to_group,
        send::send_to_user,
        online::group_list,
        online::user_clients,
        close::close_client,
    ),
    components(schemas(
        crate::gateway::events::Envelope,
        register::RegisterRequest,
        bind::BindToGroupRequest,
        send::SendToClientRequest,
        send::SendToClientsRequest,
        send::SendToGroupRequest,
        send::SendToUserRequest,
        online::GroupListRequest,
        online::UserClientsRequest,
        close::CloseClientRequest,
    )),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Tenants", description = "Tenant registration"),
        (name = "Send", description = "Message fan-out"),
        (name = "Groups", description = "Group binding and queries"),
        (name = "Clients", description = "Client connection management"),
    )
)]
pub struct ApiDoc;
