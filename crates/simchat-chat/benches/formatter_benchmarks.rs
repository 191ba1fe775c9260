//! Benchmarks for the per-message hot paths: rendering a result summary and
//! ordering a freshly fetched history listing.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use simchat_chat::formatter::format_result;
use simchat_chat::history::sort_newest_first;
use simchat_core::types::{EnergyByCategory, HistoryEntry, SimulationResult};

fn sample_result(index: usize) -> SimulationResult {
    let base = index as f64 * 17.25;
    SimulationResult::from_categories(EnergyByCategory {
        cooling: 21_345.0 + base,
        heating: 14_820.5 + base,
        lighting: 9_210.0 + base,
        equipment: 7_450.75 + base,
        ventilation: 4_980.0 + base,
    })
}

/// A listing with clustered timestamps so the id tie-break is exercised.
fn sample_history(len: usize) -> Vec<HistoryEntry> {
    (0..len)
        .map(|i| {
            let result = sample_result(i);
            HistoryEntry {
                id: format!("sim_{:08x}", i * 7919 % 65_521),
                message: format!("simulate building variant {}", i),
                created_at: Utc.timestamp_opt(1_730_000_000 + (i / 4) as i64, 0).unwrap(),
                total_energy: result.total_energy,
                energy_by_category: result.energy_by_category,
                config_file_name: (i % 3 == 0).then(|| "office.idf".to_string()),
                used_fallback_data: i % 2 == 0,
            }
        })
        .collect()
}

fn bench_format_result(c: &mut Criterion) {
    let results: Vec<SimulationResult> = (0..64).map(sample_result).collect();

    c.bench_function("format_result", |b| {
        let mut i = 0;
        b.iter(|| {
            let text = format_result(black_box(&results[i % results.len()]));
            i += 1;
            text
        })
    });
}

fn bench_sort_history(c: &mut Criterion) {
    let listing = sample_history(500);

    c.bench_function("sort_newest_first_500", |b| {
        b.iter_batched(
            || listing.clone(),
            |mut entries| {
                sort_newest_first(&mut entries);
                entries
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_format_result, bench_sort_history);
criterion_main!(benches);
