//! Shared domain types, configuration, errors and the simulation gateway seam
//! for SimChat.

pub mod config;
pub mod error;
pub mod gateway;
pub mod types;

pub use config::SimChatConfig;
pub use error::{GatewayError, Result, SimChatError};
pub use gateway::{MockGateway, RunCall, SimulationGateway};
pub use types::*;
