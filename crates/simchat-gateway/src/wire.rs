//! JSON shapes exchanged with the simulation backend.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simchat_core::types::{EnergyByCategory, HistoryEntry, InfoValue, SimulationResult};

/// Body of `POST /api/simulation/run`.
#[derive(Debug, Serialize)]
pub struct RunRequest<'a> {
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idf_content: Option<&'a str>,
}

/// Successful run response envelope.
#[derive(Debug, Deserialize)]
pub struct RunResponse {
    pub status: String,
    #[serde(default)]
    pub simulation_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Option<WireResults>,
}

#[derive(Debug, Deserialize)]
pub struct WireResults {
    pub total_energy: f64,
    pub energy_by_type: EnergyByCategory,
    #[serde(default)]
    pub additional_info: Option<BTreeMap<String, InfoValue>>,
}

impl From<WireResults> for SimulationResult {
    fn from(wire: WireResults) -> Self {
        SimulationResult {
            total_energy: wire.total_energy,
            energy_by_category: wire.energy_by_type,
            additional_info: wire.additional_info.unwrap_or_default(),
        }
    }
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

/// Body of `GET /api/simulation/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<WireHistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WireHistoryEntry {
    pub simulation_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub total_energy: f64,
    pub energy_by_type: EnergyByCategory,
    #[serde(default)]
    pub idf_file: Option<String>,
    #[serde(default)]
    pub used_mock_data: bool,
}

impl From<WireHistoryEntry> for HistoryEntry {
    fn from(wire: WireHistoryEntry) -> Self {
        HistoryEntry {
            id: wire.simulation_id,
            message: wire.message,
            created_at: wire.created_at,
            total_energy: wire.total_energy,
            energy_by_category: wire.energy_by_type,
            config_file_name: wire.idf_file.filter(|name| !name.trim().is_empty()),
            used_fallback_data: wire.used_mock_data,
        }
    }
}
