/// Server configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP/WebSocket server binds to.
    pub port: u16,
    /// Whether this node is part of a cluster.
    pub cluster: bool,
    /// Base URL other nodes use to reach this one (e.g. `http://10.0.0.3:6000`).
    /// Required when `cluster` is set.
    pub advertise_addr: Option<String>,
    /// Base URLs of the other cluster nodes, comma-separated. The discovery
    /// collaborator may replace this set at runtime.
    pub peers: Vec<String>,
    /// Maximum inbound WebSocket frame size in bytes.
    pub max_message_size: usize,
    /// Lease passed to the discovery collaborator on registration.
    pub peer_lease_secs: u64,
    /// Worker id embedded in generated message ids. Must be unique per node.
    pub worker_id: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        let cluster = bool_var("CLUSTER");
        let advertise_addr = std::env::var("ADVERTISE_ADDR")
            .ok()
            .filter(|s| !s.is_empty());
        if cluster && advertise_addr.is_none() {
            panic!("ADVERTISE_ADDR env var is required when CLUSTER=true");
        }

        Self {
            port: parsed_var("PORT", 6000),
            cluster,
            advertise_addr,
            peers: list_var("PEERS"),
            max_message_size: parsed_var("MAX_MESSAGE_SIZE", 8192),
            peer_lease_secs: parsed_var("PEER_LEASE_SECS", 5),
            worker_id: parsed_var("WORKER_ID", 0),
        }
    }
}

fn bool_var(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn list_var(name: &str) -> Vec<String> {
    std::env::var(name)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
