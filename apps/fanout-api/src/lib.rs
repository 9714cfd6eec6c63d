pub mod cluster;
pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod tenants;

use std::sync::Arc;

use config::Config;
use gateway::hub::Hub;
use tenants::TenantDirectory;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<Hub>,
    pub tenants: Arc<dyn TenantDirectory>,
}
