use thiserror::Error;

/// Top-level error type for SimChat.
///
/// Covers the failures that can escape a crate boundary: configuration
/// loading, I/O, serialization, and gateway construction. Failures of an
/// individual simulation request are modelled by [`GatewayError`] and never
/// surface as a `SimChatError` from the chat core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Gateway error: {0}")]
    Gateway(String),
}

impl From<toml::de::Error> for SimChatError {
    fn from(err: toml::de::Error) -> Self {
        SimChatError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SimChatError {
    fn from(err: toml::ser::Error) -> Self {
        SimChatError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SimChatError {
    fn from(err: serde_json::Error) -> Self {
        SimChatError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for SimChat operations.
pub type Result<T> = std::result::Result<T, SimChatError>;

/// Failure reported by a [`SimulationGateway`](crate::gateway::SimulationGateway).
///
/// The chat core treats both variants as "send failed"; the distinction is
/// kept so logs can tell a dead backend from a rejected model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Network or connection failure, including undecodable responses.
    #[error("transport error: {0}")]
    Transport(String),

    /// The simulation engine reported failure (including malformed overrides).
    #[error("engine error: {0}")]
    Engine(String),
}

impl GatewayError {
    /// Short label for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Transport(_) => "transport",
            GatewayError::Engine(_) => "engine",
        }
    }
}
