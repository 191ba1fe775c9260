use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// End-use category reported by the simulation engine.
///
/// The set is closed: every result carries exactly these five categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyCategory {
    Cooling,
    Heating,
    Lighting,
    Equipment,
    Ventilation,
}

impl EnergyCategory {
    /// All categories in display order.
    pub const ALL: [EnergyCategory; 5] = [
        EnergyCategory::Cooling,
        EnergyCategory::Heating,
        EnergyCategory::Lighting,
        EnergyCategory::Equipment,
        EnergyCategory::Ventilation,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            EnergyCategory::Cooling => "Cooling",
            EnergyCategory::Heating => "Heating",
            EnergyCategory::Lighting => "Lighting",
            EnergyCategory::Equipment => "Equipment",
            EnergyCategory::Ventilation => "Ventilation",
        }
    }
}

impl fmt::Display for EnergyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Author of a conversation entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Request lifecycle status of a chat session.
///
/// `Error` is a display hint only: it accepts new input exactly like `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    /// A simulation request is in flight.
    Pending,
    /// The last request failed.
    Error,
}

impl SessionStatus {
    /// Whether a new send may be dispatched in this status.
    pub fn accepts_input(&self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "Idle"),
            SessionStatus::Pending => write!(f, "Pending"),
            SessionStatus::Error => write!(f, "Error"),
        }
    }
}

// =============================================================================
// Simulation results
// =============================================================================

/// Energy use per category, in kWh.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyByCategory {
    pub cooling: f64,
    pub heating: f64,
    pub lighting: f64,
    pub equipment: f64,
    pub ventilation: f64,
}

impl EnergyByCategory {
    /// Value for a single category.
    pub fn get(&self, category: EnergyCategory) -> f64 {
        match category {
            EnergyCategory::Cooling => self.cooling,
            EnergyCategory::Heating => self.heating,
            EnergyCategory::Lighting => self.lighting,
            EnergyCategory::Equipment => self.equipment,
            EnergyCategory::Ventilation => self.ventilation,
        }
    }

    /// Set the value for a single category.
    pub fn set(&mut self, category: EnergyCategory, value: f64) {
        match category {
            EnergyCategory::Cooling => self.cooling = value,
            EnergyCategory::Heating => self.heating = value,
            EnergyCategory::Lighting => self.lighting = value,
            EnergyCategory::Equipment => self.equipment = value,
            EnergyCategory::Ventilation => self.ventilation = value,
        }
    }

    /// Iterate `(category, value)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (EnergyCategory, f64)> + '_ {
        EnergyCategory::ALL.iter().map(move |c| (*c, self.get(*c)))
    }

    /// Sum over all categories.
    pub fn sum(&self) -> f64 {
        self.iter().map(|(_, v)| v).sum()
    }
}

/// A free-form value in a result's additional info.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoValue::Number(n) => write!(f, "{}", n),
            InfoValue::Text(s) => f.write_str(s),
        }
    }
}

/// Structured output of one simulation run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Total energy consumption in kWh.
    pub total_energy: f64,
    /// Consumption split by end-use category.
    pub energy_by_category: EnergyByCategory,
    /// Extra engine-reported facts (floor area, EUI, simulated hours, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_info: BTreeMap<String, InfoValue>,
}

impl SimulationResult {
    /// Build a result whose total is the sum of its categories.
    pub fn from_categories(energy_by_category: EnergyByCategory) -> Self {
        Self {
            total_energy: energy_by_category.sum(),
            energy_by_category,
            additional_info: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// One message in the conversation transcript.
///
/// Entries are immutable once appended; the owning session only hands out
/// shared references.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Structured result for successful assistant replies. Shared with the
    /// session's current-result slot rather than copied.
    pub result: Option<Arc<SimulationResult>>,
}

impl ConversationEntry {
    /// A user-authored entry stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            result: None,
        }
    }

    /// An assistant entry stamped with the current time.
    pub fn assistant(content: impl Into<String>, result: Option<Arc<SimulationResult>>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            result,
        }
    }
}

// =============================================================================
// History
// =============================================================================

/// A past simulation run as listed by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Server-assigned run identifier.
    pub id: String,
    /// The message that triggered the run.
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub total_energy: f64,
    pub energy_by_category: EnergyByCategory,
    /// Name of the configuration file the run used, if not the default.
    pub config_file_name: Option<String>,
    /// Whether the backend fell back to generated data instead of the engine.
    pub used_fallback_data: bool,
}

impl HistoryEntry {
    /// "Mock" for fallback data, "EnergyPlus" otherwise.
    pub fn source_label(&self) -> &'static str {
        if self.used_fallback_data {
            "Mock"
        } else {
            "EnergyPlus"
        }
    }

    /// Configuration file name, or the backend's default model.
    pub fn config_file_label(&self) -> &str {
        self.config_file_name.as_deref().unwrap_or("default.idf")
    }

    /// The recorded totals as a result, for comparisons.
    pub fn to_result(&self) -> SimulationResult {
        SimulationResult {
            total_energy: self.total_energy,
            energy_by_category: self.energy_by_category.clone(),
            additional_info: BTreeMap::new(),
        }
    }
}
