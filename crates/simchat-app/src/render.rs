//! Plain-text rendering of session state for the terminal.

use simchat_chat::breakdown::{Delta, EnergyBreakdown, ResultComparison};
use simchat_chat::formatter::{format_energy, group_thousands};
use simchat_chat::orchestrator::HistoryView;
use simchat_core::types::{ConversationEntry, InfoValue, Role};

pub fn entry(entry: &ConversationEntry) -> String {
    let prefix = match entry.role {
        Role::User => "you",
        Role::Assistant => "sim",
    };
    format!(
        "[{}] {}> {}",
        entry.timestamp.format("%H:%M:%S"),
        prefix,
        entry.content
    )
}

pub fn breakdown(breakdown: &EnergyBreakdown) -> String {
    let mut lines = vec![format!("Total: {}", format_energy(breakdown.total_energy))];
    for share in &breakdown.shares {
        lines.push(format!(
            "  {:<12} {:>14}  {:>5.1}%",
            share.category.label(),
            format_energy(share.value),
            share.percent
        ));
    }
    if let Some(ref area) = breakdown.floor_area {
        lines.push(format!("  Floor area: {}", with_unit(area, "m²")));
    }
    if let Some(ref eui) = breakdown.eui {
        lines.push(format!("  EUI: {}", with_unit(eui, "kWh/m²")));
    }
    if let Some(top) = breakdown.dominant() {
        lines.push(format!("  Largest use: {}", top.category.label()));
    }
    lines.join("\n")
}

pub fn history(view: &HistoryView) -> String {
    let mut lines = Vec::new();
    if let Some(ref error) = view.error {
        lines.push(format!("! Could not refresh history: {}", error));
    }
    if view.entries.is_empty() {
        lines.push("No simulations yet.".to_string());
    }
    for entry in &view.entries {
        lines.push(format!(
            "{}  {}  {:>14}  {:<10}  {:<12}  {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M"),
            format_energy(entry.total_energy),
            entry.source_label(),
            entry.config_file_label(),
            entry.message
        ));
    }
    lines.join("\n")
}

pub fn comparison(cmp: &ResultComparison) -> String {
    let mut lines = vec![
        format!("Compared with {}:", cmp.baseline_id),
        format!("  {:<12} {}", "Total", delta(&cmp.total)),
    ];
    for (category, d) in &cmp.categories {
        lines.push(format!("  {:<12} {}", category.label(), delta(d)));
    }
    lines.join("\n")
}

fn delta(d: &Delta) -> String {
    let sign = if d.absolute > 0.0 { "+" } else { "" };
    let percent = match d.percent {
        Some(p) => format!("{}{:.1}%", if p > 0.0 { "+" } else { "" }, p),
        None => "n/a".to_string(),
    };
    format!(
        "{} -> {}  ({}{}, {})",
        group_thousands(d.baseline),
        format_energy(d.current),
        sign,
        format_energy(d.absolute),
        percent
    )
}

fn with_unit(value: &InfoValue, unit: &str) -> String {
    match value {
        InfoValue::Number(n) => format!("{} {}", group_thousands(*n), unit),
        InfoValue::Text(text) => text.clone(),
    }
}
