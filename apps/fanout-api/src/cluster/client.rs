//! Node-to-node broadcast client.
//!
//! Sends are fire-and-forget: one spawned call per peer, failures logged and
//! swallowed — at most one peer actually holds the target connection and the
//! rest are legitimate no-ops. Queries run one concurrent call per peer,
//! wait for all of them, and union whatever answered; a failed peer simply
//! contributes nothing.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::peers::PeerSet;

// ---------------------------------------------------------------------------
// RPC bodies (shared with the server side in `cluster::routes`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSend {
    pub message_id: String,
    pub send_user_id: String,
    pub client_id: String,
    pub code: i32,
    pub msg: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSend {
    pub system_id: String,
    pub message_id: String,
    pub send_user_id: String,
    pub group_name: String,
    pub code: i32,
    pub msg: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSend {
    pub system_id: Option<String>,
    pub message_id: String,
    pub send_user_id: String,
    pub group_name: Option<String>,
    pub user_id: String,
    pub code: i32,
    pub msg: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSend {
    pub system_id: String,
    pub message_id: String,
    pub send_user_id: String,
    pub code: i32,
    pub msg: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseClient {
    pub system_id: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindGroup {
    pub system_id: String,
    pub group_name: String,
    pub client_id: String,
    pub user_id: Option<String>,
    pub extend: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupClientsQuery {
    pub system_id: String,
    pub group_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClientsQuery {
    pub system_id: Option<String>,
    pub group_name: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdList {
    pub list: Vec<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ClusterClient {
    peers: Arc<PeerSet>,
    http: reqwest::Client,
}

impl ClusterClient {
    pub fn new(peers: Arc<PeerSet>) -> Self {
        Self {
            peers,
            http: reqwest::Client::new(),
        }
    }

    pub fn relay_client_send(&self, req: ClientSend) {
        self.broadcast("/cluster/send/client", req);
    }

    pub fn relay_group_send(&self, req: GroupSend) {
        self.broadcast("/cluster/send/group", req);
    }

    pub fn relay_user_send(&self, req: UserSend) {
        self.broadcast("/cluster/send/user", req);
    }

    pub fn relay_system_send(&self, req: SystemSend) {
        self.broadcast("/cluster/send/system", req);
    }

    pub fn relay_close(&self, req: CloseClient) {
        self.broadcast("/cluster/close/client", req);
    }

    pub fn relay_bind(&self, req: BindGroup) {
        self.broadcast("/cluster/bind/group", req);
    }

    /// Group membership held by the other nodes.
    pub async fn group_clients(&self, system_id: &str, group_name: &str) -> Vec<String> {
        self.query(
            "/cluster/group/clients",
            GroupClientsQuery {
                system_id: system_id.to_string(),
                group_name: group_name.to_string(),
            },
        )
        .await
    }

    /// A user identity's sessions held by the other nodes.
    pub async fn user_clients(
        &self,
        system_id: Option<&str>,
        group_name: Option<&str>,
        user_id: &str,
    ) -> Vec<String> {
        self.query(
            "/cluster/user/clients",
            UserClientsQuery {
                system_id: system_id.map(str::to_string),
                group_name: group_name.map(str::to_string),
                user_id: user_id.to_string(),
            },
        )
        .await
    }

    /// One spawned fire-and-forget call per peer.
    fn broadcast<T>(&self, path: &'static str, body: T)
    where
        T: Serialize + Clone + Send + Sync + 'static,
    {
        for peer in self.peers.snapshot() {
            let url = format!("{peer}{path}");
            let http = self.http.clone();
            let body = body.clone();
            tokio::spawn(async move {
                match http.post(&url).json(&body).send().await {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => {
                        tracing::warn!(%url, status = %resp.status(), "cluster relay rejected");
                    }
                    Err(err) => tracing::warn!(%url, ?err, "cluster relay failed"),
                }
            });
        }
    }

    /// One concurrent call per peer, wait for all, union the answers.
    /// The peer snapshot is taken before any call goes out; the lock is not
    /// held across the fan-out.
    async fn query<T>(&self, path: &'static str, body: T) -> Vec<String>
    where
        T: Serialize + Clone,
    {
        let calls = self.peers.snapshot().into_iter().map(|peer| {
            let url = format!("{peer}{path}");
            let http = self.http.clone();
            let body = body.clone();
            async move {
                match fetch_list::<_, IdList>(&http, &url, &body).await {
                    Ok(answer) => answer.list,
                    Err(err) => {
                        tracing::warn!(%url, ?err, "cluster query failed");
                        Vec::new()
                    }
                }
            }
        });
        join_all(calls).await.into_iter().flatten().collect()
    }
}

async fn fetch_list<B: Serialize, R: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    body: &B,
) -> Result<R, reqwest::Error> {
    http.post(url)
        .json(body)
        .send()
        .await?
        .error_for_status()?
        .json::<R>()
        .await
}
