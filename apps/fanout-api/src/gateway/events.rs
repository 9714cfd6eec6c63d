//! Wire-format types: response envelope, delivery frames, presence payloads,
//! and the in-band client command set.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Response codes
// ---------------------------------------------------------------------------

/// Numeric codes carried in envelopes and delivery frames. Negative codes are
/// failures; positive codes identify server-originated notifications.
pub mod code {
    /// Tenant id missing or not registered.
    pub const TENANT_INVALID: i32 = -1001;
    /// Generic request failure.
    pub const FAIL: i32 = -1;
    pub const SUCCESS: i32 = 0;
    /// A client joined a group the receiver belongs to.
    pub const CLIENT_ONLINE: i32 = 1001;
    /// A client left a group the receiver belongs to, or a user session ended.
    pub const CLIENT_OFFLINE: i32 = 1002;
    /// The receiver's user identity signed on from another connection.
    pub const MULTI_LOGIN: i32 = 2000;
}

// ---------------------------------------------------------------------------
// Envelope (management API + connection handshake)
// ---------------------------------------------------------------------------

/// The `{code, msg, data}` envelope every HTTP response and the upgrade
/// handshake use.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Envelope {
    pub code: i32,
    pub msg: String,
    #[schema(value_type = Object)]
    pub data: Value,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            code: code::SUCCESS,
            msg: "success".to_string(),
            data,
        }
    }

    pub fn failure(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery frame (server → client)
// ---------------------------------------------------------------------------

/// A message delivered to a client. `data` is the sender's opaque payload
/// string; `message_id` correlates every delivery produced by one send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub message_id: String,
    pub send_user_id: String,
    pub code: i32,
    pub msg: String,
    pub data: String,
}

/// Payload serialized into `data` for presence and multi-login notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub system_id: String,
    pub group_name: String,
    pub client_id: String,
    pub user_id: String,
    pub extend: String,
}

impl PresencePayload {
    pub fn to_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// In-band client commands
// ---------------------------------------------------------------------------

/// Raw command envelope as received from the client.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandFrame {
    pub event: String,
    pub system_id: Option<String>,
    pub send_user_id: Option<String>,
    pub group_name: Option<String>,
    pub user_id: Option<String>,
    pub extend: Option<String>,
    pub client_ids: Vec<String>,
    pub data: String,
}

/// The closed set of client commands. Classification never fails: anything
/// the server does not recognize, or that lacks a required field, lands in
/// `Unrecognized` and is logged and dropped by the dispatcher.
#[derive(Debug)]
pub enum ClientCommand {
    /// `B2G` — bind this connection to a group, optionally binding a user
    /// identity alongside.
    BindGroup {
        group_name: String,
        user_id: Option<String>,
        extend: Option<String>,
    },
    /// `S2C` / `S2M` — send to one or more explicit client ids.
    SendToClients {
        client_ids: Vec<String>,
        data: String,
    },
    /// `S2G` — send to a group; explicit `clientIds` take precedence.
    SendToGroup {
        system_id: Option<String>,
        group_name: String,
        client_ids: Vec<String>,
        data: String,
    },
    /// `S2U` — reserved; recognized but not implemented.
    SendToUser,
    /// `CLS` — the client asks for its own connection to be torn down.
    CloseConnection,
    Unrecognized {
        event: String,
        reason: &'static str,
    },
}

impl ClientCommand {
    pub fn classify(frame: CommandFrame) -> Self {
        let event = frame.event.to_ascii_uppercase();
        match event.as_str() {
            "B2G" => match non_empty(frame.group_name) {
                Some(group_name) => Self::BindGroup {
                    group_name,
                    user_id: frame.user_id,
                    extend: frame.extend,
                },
                None => Self::Unrecognized {
                    event: frame.event,
                    reason: "groupName is required",
                },
            },
            "S2C" | "S2M" => {
                if frame.client_ids.is_empty() {
                    Self::Unrecognized {
                        event: frame.event,
                        reason: "clientIds is required",
                    }
                } else {
                    Self::SendToClients {
                        client_ids: frame.client_ids,
                        data: frame.data,
                    }
                }
            }
            "S2G" => match non_empty(frame.group_name) {
                Some(group_name) => Self::SendToGroup {
                    system_id: non_empty(frame.system_id),
                    group_name,
                    client_ids: frame.client_ids,
                    data: frame.data,
                },
                None => Self::Unrecognized {
                    event: frame.event,
                    reason: "groupName is required",
                },
            },
            "S2U" => Self::SendToUser,
            "CLS" => Self::CloseConnection,
            _ => Self::Unrecognized {
                event: frame.event,
                reason: "unknown event",
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
