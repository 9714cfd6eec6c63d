#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

use fanout_api::cluster::client::ClusterClient;
use fanout_api::cluster::peers::PeerSet;
use fanout_api::config::Config;
use fanout_api::gateway::hub::Hub;
use fanout_api::gateway::lifecycle;
use fanout_api::tenants::MemoryTenantDirectory;
use fanout_api::AppState;
use fanout_common::SnowflakeGenerator;

pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A server bound to an OS-assigned port, with the cluster RPC surface
/// mounted so nodes can talk to each other in tests.
pub struct TestNode {
    pub addr: SocketAddr,
    pub state: AppState,
    pub peers: Arc<PeerSet>,
}

impl TestNode {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, query: &str) -> String {
        format!("ws://{}/ws?{}", self.addr, query)
    }
}

/// Start a node. The peer set starts empty; cluster tests fill it once the
/// other node's port is known.
pub async fn start_node(clustered: bool) -> TestNode {
    let config = Config {
        port: 0,
        cluster: clustered,
        advertise_addr: None,
        peers: Vec::new(),
        max_message_size: 8192,
        peer_lease_secs: 5,
        worker_id: 0,
    };

    let peers = Arc::new(PeerSet::new(Vec::new()));
    let cluster = clustered.then(|| ClusterClient::new(peers.clone()));

    let (lifecycle_tx, lifecycle_rx) = lifecycle::channel();
    let hub = Arc::new(Hub::new(
        lifecycle_tx,
        cluster,
        SnowflakeGenerator::new(0),
    ));
    lifecycle::spawn(hub.clone(), lifecycle_rx);

    let state = AppState {
        config: Arc::new(config),
        hub,
        tenants: Arc::new(MemoryTenantDirectory::new()),
    };

    let app = Router::new()
        .merge(fanout_api::routes::router())
        .merge(fanout_api::cluster::routes::router())
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestNode { addr, state, peers }
}

/// Register a tenant through the management API.
pub async fn register_tenant(node: &TestNode, system_id: &str) {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/register", node.base_url()))
        .json(&serde_json::json!({ "systemId": system_id }))
        .send()
        .await
        .expect("register request");
    let body: serde_json::Value = resp.json().await.expect("register response");
    assert_eq!(body["code"], 0, "register failed: {body}");
}

/// Connect a WebSocket client and consume the hello envelope. Returns the
/// stream and the server-assigned client id.
pub async fn connect(node: &TestNode, query: &str) -> (WsStream, String) {
    let (mut ws, _) = tokio_tungstenite::connect_async(node.ws_url(query))
        .await
        .expect("ws connect");
    let hello = next_json(&mut ws).await.expect("hello frame");
    assert_eq!(hello["code"], 0, "unexpected hello: {hello}");
    let client_id = hello["data"]["clientId"]
        .as_str()
        .expect("clientId in hello")
        .to_string();
    (ws, client_id)
}

/// Next text frame as JSON, skipping keepalive traffic. `None` on close or
/// timeout.
pub async fn next_json(ws: &mut WsStream) -> Option<serde_json::Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(3), ws.next())
            .await
            .ok()??;
        match msg.ok()? {
            tungstenite::Message::Text(text) => return serde_json::from_str(&text).ok(),
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            tungstenite::Message::Close(_) => return None,
            _ => continue,
        }
    }
}

/// Assert nothing arrives on the stream for a short window.
pub async fn assert_silent(ws: &mut WsStream) {
    let result = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            match ws.next().await {
                Some(Ok(tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_))) => continue,
                other => break other,
            }
        }
    })
    .await;
    assert!(result.is_err(), "expected silence, got: {result:?}");
}

/// Send an in-band command frame.
pub async fn send_command(ws: &mut WsStream, command: serde_json::Value) {
    ws.send(tungstenite::Message::Text(command.to_string().into()))
        .await
        .expect("send command");
}

/// Query a group's online members through the management API.
pub async fn group_list(node: &TestNode, system_id: &str, group_name: &str) -> Vec<String> {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/group/list", node.base_url()))
        .json(&serde_json::json!({ "systemId": system_id, "groupName": group_name }))
        .send()
        .await
        .expect("group list request");
    let body: serde_json::Value = resp.json().await.expect("group list response");
    assert_eq!(body["code"], 0, "group list failed: {body}");
    body["data"]
        .as_array()
        .expect("list data")
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

/// Poll until `check` passes or the deadline hits.
pub async fn wait_until<F, Fut>(mut check: F, what: &str)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..30 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("timed out waiting for {what}");
}
