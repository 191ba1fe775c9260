//! Error types for the chat core.

use simchat_core::error::GatewayError;

/// Local input rejections. Never sent to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("override cannot be empty")]
    EmptyOverride,
}

/// Failures observed by the chat core.
///
/// None of these escape as a hard error: invalid input is absorbed, a failed
/// send becomes an assistant reply, and a failed history fetch keeps the
/// previous cache.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("send failed: {0}")]
    SendFailure(GatewayError),
    #[error("history fetch failed: {0}")]
    HistoryFetchFailure(GatewayError),
}

impl ChatError {
    /// The underlying gateway failure, if any.
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            ChatError::SendFailure(e) | ChatError::HistoryFetchFailure(e) => Some(e),
            ChatError::InvalidInput(_) => None,
        }
    }
}
