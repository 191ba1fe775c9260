//! Offline gateway producing plausible fallback results without a backend.
//!
//! Values are derived from the message (and override) text, so the same
//! request always yields the same breakdown. Every run is recorded in an
//! in-memory history flagged as fallback data.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simchat_core::error::GatewayError;
use simchat_core::gateway::SimulationGateway;
use simchat_core::types::{
    EnergyByCategory, EnergyCategory, HistoryEntry, InfoValue, SimulationResult,
};

/// Floor area reported alongside fallback results, in square metres.
pub const FALLBACK_FLOOR_AREA_M2: f64 = 4_500.0;

/// Hours in a non-leap simulation year.
pub const SIMULATION_HOURS: f64 = 8_760.0;

/// File name recorded for runs that carried an override.
const OVERRIDE_FILE_NAME: &str = "custom.idf";

/// Annual kWh range per category.
fn category_range(category: EnergyCategory) -> RangeInclusive<u64> {
    match category {
        EnergyCategory::Cooling => 15_000..=25_000,
        EnergyCategory::Heating => 10_000..=20_000,
        EnergyCategory::Lighting => 7_000..=15_000,
        EnergyCategory::Equipment => 5_000..=12_000,
        EnergyCategory::Ventilation => 3_000..=8_000,
    }
}

/// Gateway that never leaves the process.
#[derive(Debug, Default)]
pub struct OfflineGateway {
    history: Mutex<Vec<HistoryEntry>>,
    runs: AtomicU64,
    history_limit: Option<usize>,
}

impl OfflineGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` runs, dropping the oldest.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Deterministic result for a request.
    pub fn simulate(message: &str, override_payload: Option<&str>) -> SimulationResult {
        let mut seed = fnv1a(message.as_bytes());
        if let Some(payload) = override_payload {
            seed ^= fnv1a(payload.as_bytes()).rotate_left(17);
        }
        let mut rng = StdRng::seed_from_u64(seed);

        let mut energy = EnergyByCategory::default();
        for category in EnergyCategory::ALL {
            let range = category_range(category);
            energy.set(category, rng.random_range(range) as f64);
        }

        let mut result = SimulationResult::from_categories(energy);
        let eui = (result.total_energy / FALLBACK_FLOOR_AREA_M2 * 100.0).round() / 100.0;
        result.additional_info = BTreeMap::from([
            ("floor_area".to_string(), InfoValue::Number(FALLBACK_FLOOR_AREA_M2)),
            ("eui".to_string(), InfoValue::Number(eui)),
            (
                "simulation_hours".to_string(),
                InfoValue::Number(SIMULATION_HOURS),
            ),
            (
                "note".to_string(),
                InfoValue::Text("Offline fallback data".to_string()),
            ),
        ]);
        result
    }

    fn record(&self, message: &str, override_payload: Option<&str>, result: &SimulationResult) {
        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("sim_{:08x}", run);
        let entry = HistoryEntry {
            id,
            message: message.to_string(),
            created_at: Utc::now(),
            total_energy: result.total_energy,
            energy_by_category: result.energy_by_category.clone(),
            config_file_name: override_payload.map(|_| OVERRIDE_FILE_NAME.to_string()),
            used_fallback_data: true,
        };
        tracing::debug!(simulation_id = %entry.id, "Offline run recorded");

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.insert(0, entry);
        if let Some(limit) = self.history_limit {
            history.truncate(limit);
        }
    }
}

#[async_trait]
impl SimulationGateway for OfflineGateway {
    async fn run(
        &self,
        message: &str,
        override_payload: Option<&str>,
    ) -> Result<SimulationResult, GatewayError> {
        if let Some(payload) = override_payload {
            if !has_model_content(payload) {
                return Err(GatewayError::Engine(
                    "Simulation failed: override contains no model objects".to_string(),
                ));
            }
        }

        let result = Self::simulate(message, override_payload);
        self.record(message, override_payload, &result);
        Ok(result)
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, GatewayError> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(history.clone())
    }
}

/// Whether an IDF payload has anything besides `!` comments and whitespace.
fn has_model_content(payload: &str) -> bool {
    payload.lines().any(|line| {
        let code = line.split('!').next().unwrap_or("");
        !code.trim().is_empty()
    })
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
