use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::gateway::events::{code, Envelope};

/// Application-level error that converts into the `{code, msg, data}` envelope.
///
/// Failures keep HTTP 200 — callers dispatch on the envelope's negative code,
/// not on the transport status.
#[derive(Debug)]
pub struct ApiError {
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    /// Missing or malformed field in a management-API request.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self {
            code: code::FAIL,
            msg: msg.into(),
        }
    }

    /// Tenant id missing, or not known to the tenant directory.
    pub fn tenant_invalid(msg: impl Into<String>) -> Self {
        Self {
            code: code::TENANT_INVALID,
            msg: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: code::FAIL,
            msg: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Json(Envelope::failure(self.code, self.msg)).into_response()
    }
}
