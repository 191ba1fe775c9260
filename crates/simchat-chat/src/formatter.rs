//! Human-readable summaries of simulation results.
//!
//! Pure and deterministic: the same result always renders to the same text,
//! independent of locale or clock.

use simchat_core::types::SimulationResult;

/// Unit suffix for every energy figure.
pub const ENERGY_UNIT: &str = "kWh";

/// Maximum fractional digits kept when rendering a number.
const MAX_FRACTION_DIGITS: usize = 3;

/// Render a result as the assistant's chat reply.
pub fn format_result(result: &SimulationResult) -> String {
    let mut lines = vec![
        "Simulation completed successfully!".to_string(),
        String::new(),
        format!(
            "Total Energy Consumption: {}",
            format_energy(result.total_energy)
        ),
        String::new(),
        "Breakdown:".to_string(),
    ];
    for (category, value) in result.energy_by_category.iter() {
        lines.push(format!("- {}: {}", category.label(), format_energy(value)));
    }
    lines.join("\n")
}

/// A value with thousands grouping and the energy unit, e.g. `12,500 kWh`.
pub fn format_energy(value: f64) -> String {
    format!("{} {}", group_thousands(value), ENERGY_UNIT)
}

/// Group the integer part in threes with commas and keep at most three
/// fractional digits, dropping trailing zeros (`1234.5` -> `1,234.5`).
pub fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let text = format!("{:.*}", MAX_FRACTION_DIGITS, value.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let is_zero = int_part.chars().all(|c| c == '0') && frac_part.is_empty();
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}
