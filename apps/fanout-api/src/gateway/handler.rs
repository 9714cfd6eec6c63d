//! In-band command dispatch for frames arriving on an open connection.

use std::sync::Arc;

use super::events::{code, ClientCommand, CommandFrame};
use super::hub::Hub;
use super::router;
use super::session::Session;

/// What the read loop should do after a command has been handled.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

pub fn handle_command(hub: &Hub, session: &Arc<Session>, frame: CommandFrame) -> Flow {
    match ClientCommand::classify(frame) {
        ClientCommand::BindGroup {
            group_name,
            user_id,
            extend,
        } => {
            router::bind_session_to_group(
                hub,
                session,
                &group_name,
                user_id.as_deref(),
                extend.as_deref(),
            );
            Flow::Continue
        }
        ClientCommand::SendToClients { client_ids, data } => {
            router::send_to_clients(
                hub,
                &client_ids,
                &session.client_id,
                code::SUCCESS,
                "success",
                &data,
            );
            Flow::Continue
        }
        ClientCommand::SendToGroup {
            system_id,
            group_name,
            client_ids,
            data,
        } => {
            if !client_ids.is_empty() {
                // Explicit ids take precedence: only the listed clients
                // receive the message, even though a group was named.
                router::send_to_clients(
                    hub,
                    &client_ids,
                    &session.client_id,
                    code::SUCCESS,
                    "success",
                    &data,
                );
            } else {
                let system_id = system_id.as_deref().unwrap_or(&session.system_id);
                router::send_to_group(
                    hub,
                    system_id,
                    &session.client_id,
                    &group_name,
                    code::SUCCESS,
                    "success",
                    &data,
                );
            }
            Flow::Continue
        }
        ClientCommand::SendToUser => {
            // Reserved: recognized, intentionally a no-op.
            tracing::debug!(client_id = %session.client_id, "S2U command ignored");
            Flow::Continue
        }
        ClientCommand::CloseConnection => Flow::Close,
        ClientCommand::Unrecognized { event, reason } => {
            tracing::warn!(
                client_id = %session.client_id,
                system_id = %session.system_id,
                %event,
                reason,
                "ignoring client command"
            );
            Flow::Continue
        }
    }
}
