//! Simulation gateways: HTTP to the simulation backend, or offline fallback.

pub mod http;
pub mod offline;
pub mod wire;

use std::sync::Arc;

use simchat_core::config::{GatewayConfig, GatewayMode};
use simchat_core::error::Result;
use simchat_core::gateway::SimulationGateway;

pub use http::HttpGateway;
pub use offline::OfflineGateway;

/// Build the gateway selected by `config.mode`.
pub fn from_config(config: &GatewayConfig) -> Result<Arc<dyn SimulationGateway>> {
    match config.mode {
        GatewayMode::Http => {
            let gateway = HttpGateway::new(config)?;
            tracing::info!(url = gateway.run_url(), "Using HTTP simulation gateway");
            Ok(Arc::new(gateway))
        }
        GatewayMode::Offline => {
            tracing::info!("Using offline simulation gateway");
            Ok(Arc::new(
                OfflineGateway::new().with_history_limit(config.history_limit as usize),
            ))
        }
    }
}
