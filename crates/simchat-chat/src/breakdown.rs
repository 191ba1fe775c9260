//! Derived views over simulation results: per-category shares for the
//! results panel and deltas against a past run.

use simchat_core::types::{EnergyCategory, HistoryEntry, InfoValue, SimulationResult};

/// Additional-info key for the modelled floor area.
pub const FLOOR_AREA_KEY: &str = "floor_area";
/// Additional-info key for energy use intensity (kWh/m²).
pub const EUI_KEY: &str = "eui";

/// One category's value and its share of the category sum.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: EnergyCategory,
    pub value: f64,
    /// Percentage of the category sum, 0 when the sum is 0.
    pub percent: f64,
}

/// What the results panel shows for the current result.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyBreakdown {
    pub total_energy: f64,
    pub shares: Vec<CategoryShare>,
    pub floor_area: Option<InfoValue>,
    pub eui: Option<InfoValue>,
}

impl EnergyBreakdown {
    pub fn from_result(result: &SimulationResult) -> Self {
        let sum = result.energy_by_category.sum();
        let shares = result
            .energy_by_category
            .iter()
            .map(|(category, value)| CategoryShare {
                category,
                value,
                percent: if sum > 0.0 { value / sum * 100.0 } else { 0.0 },
            })
            .collect();

        Self {
            total_energy: result.total_energy,
            shares,
            floor_area: result.additional_info.get(FLOOR_AREA_KEY).cloned(),
            eui: result.additional_info.get(EUI_KEY).cloned(),
        }
    }

    /// The category with the largest consumption; the first one wins ties.
    pub fn dominant(&self) -> Option<&CategoryShare> {
        self.shares
            .iter()
            .fold(None, |best: Option<&CategoryShare>, share| match best {
                Some(b) if b.value >= share.value => Some(b),
                _ => Some(share),
            })
    }
}

/// Change of one figure between a baseline run and the current result.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    pub baseline: f64,
    pub current: f64,
    pub absolute: f64,
    /// Relative change in percent; `None` when the baseline is 0.
    pub percent: Option<f64>,
}

impl Delta {
    pub fn between(baseline: f64, current: f64) -> Self {
        let absolute = current - baseline;
        Self {
            baseline,
            current,
            absolute,
            percent: (baseline != 0.0).then(|| absolute / baseline * 100.0),
        }
    }
}

/// Current result compared against a past run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultComparison {
    /// Id of the history entry used as the baseline.
    pub baseline_id: String,
    pub total: Delta,
    pub categories: Vec<(EnergyCategory, Delta)>,
}

impl ResultComparison {
    pub fn against(baseline: &HistoryEntry, current: &SimulationResult) -> Self {
        let categories = EnergyCategory::ALL
            .iter()
            .map(|c| {
                (
                    *c,
                    Delta::between(
                        baseline.energy_by_category.get(*c),
                        current.energy_by_category.get(*c),
                    ),
                )
            })
            .collect();

        Self {
            baseline_id: baseline.id.clone(),
            total: Delta::between(baseline.total_energy, current.total_energy),
            categories,
        }
    }
}
