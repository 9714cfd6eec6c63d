use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fanout_api::cluster::client::ClusterClient;
use fanout_api::cluster::discovery::{self, PeerDiscovery, StaticPeers};
use fanout_api::cluster::peers::PeerSet;
use fanout_api::config::Config;
use fanout_api::gateway::hub::Hub;
use fanout_api::gateway::{lifecycle, server};
use fanout_api::tenants::MemoryTenantDirectory;
use fanout_api::AppState;
use fanout_common::SnowflakeGenerator;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing — env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let peers = Arc::new(PeerSet::new(config.peers.clone()));
    let discovery: Arc<dyn PeerDiscovery> = Arc::new(StaticPeers::new(config.peers.clone()));

    let cluster = config
        .cluster
        .then(|| ClusterClient::new(peers.clone()));

    let (lifecycle_tx, lifecycle_rx) = lifecycle::channel();
    let hub = Arc::new(Hub::new(
        lifecycle_tx,
        cluster,
        SnowflakeGenerator::new(config.worker_id),
    ));
    lifecycle::spawn(hub.clone(), lifecycle_rx);
    server::spawn_heartbeat(hub.clone());

    if config.cluster {
        let advertise = config
            .advertise_addr
            .clone()
            .expect("checked by Config::from_env");
        if let Err(err) = discovery
            .register_self(&advertise, config.peer_lease_secs)
            .await
        {
            tracing::error!(%err, "failed to register with peer discovery");
        }
        discovery::spawn_watch(discovery, peers, advertise);
        tracing::info!(peers = ?config.peers, "cluster mode enabled");
    }

    let state = AppState {
        config: Arc::new(config),
        hub,
        tenants: Arc::new(MemoryTenantDirectory::new()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(fanout_api::routes::router());
    if state.config.cluster {
        app = app.merge(fanout_api::cluster::routes::router());
    }
    let app = app.layer(cors).layer(TraceLayer::new_for_http()).with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "fanout-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
