//! Gateway speaking JSON over HTTP to the simulation backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use simchat_core::config::GatewayConfig;
use simchat_core::error::{GatewayError, SimChatError};
use simchat_core::gateway::SimulationGateway;
use simchat_core::types::{HistoryEntry, SimulationResult};

use crate::wire::{ErrorBody, HistoryResponse, RunRequest, RunResponse};

/// Longest slice of an unexpected body quoted in an error.
const BODY_SNIPPET_LEN: usize = 200;

/// HTTP client for the run and history endpoints.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    run_url: String,
    history_url: String,
    history_limit: u32,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, SimChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SimChatError::Gateway(format!("failed to build HTTP client: {}", e)))?;

        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            run_url: format!("{}{}", base, config.run_path),
            history_url: format!("{}{}", base, config.history_path),
            history_limit: config.history_limit,
        })
    }

    pub fn run_url(&self) -> &str {
        &self.run_url
    }

    pub fn history_url(&self) -> &str {
        &self.history_url
    }
}

#[async_trait]
impl SimulationGateway for HttpGateway {
    async fn run(
        &self,
        message: &str,
        override_payload: Option<&str>,
    ) -> Result<SimulationResult, GatewayError> {
        let body = RunRequest {
            message,
            idf_content: override_payload,
        };

        let response = self
            .client
            .post(&self.run_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("simulation request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) if body.status == "error" => GatewayError::Engine(body.message),
                _ => GatewayError::Transport(format!(
                    "simulation backend returned {}: {}",
                    status,
                    snippet(&text)
                )),
            });
        }

        let parsed: RunResponse = serde_json::from_str(&text).map_err(|e| {
            GatewayError::Transport(format!("failed to parse simulation response: {}", e))
        })?;

        if parsed.status != "success" {
            return Err(GatewayError::Engine(
                parsed
                    .message
                    .unwrap_or_else(|| format!("simulation status '{}'", parsed.status)),
            ));
        }

        let results = parsed.results.ok_or_else(|| {
            GatewayError::Transport("simulation response has no results".to_string())
        })?;

        tracing::debug!(
            simulation_id = parsed.simulation_id.as_deref().unwrap_or("unknown"),
            "Simulation response received"
        );
        Ok(results.into())
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, GatewayError> {
        let response = self
            .client
            .get(&self.history_url)
            .query(&[("limit", self.history_limit)])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("history request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Transport(format!(
                "history backend returned {}: {}",
                status,
                snippet(&text)
            )));
        }

        let parsed: HistoryResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("failed to parse history: {}", e)))?;

        Ok(parsed.history.into_iter().map(HistoryEntry::from).collect())
    }
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
