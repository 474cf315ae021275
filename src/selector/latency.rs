//! Latency-weighted selection.
//!
//! # Weight Derivation
//! ```text
//! avg    = mean of every explicit `latency=` value (ms, > 0)
//! weight = round(avg / latency * 100)    for measured servers, halves up
//! weight = 100                           for unmeasured servers,
//!                                        or everyone when nothing is measured
//! ```
//!
//! Weights are recomputed from scratch on every update; sequencing is the
//! same smooth weighted round robin used for static weights.

use std::collections::HashMap;

use crate::selector::context::CallContext;
use crate::selector::metadata::{sorted_entries, Metadata, DEFAULT_WEIGHT};
use crate::selector::weighted::{SmoothWeighted, Weighted, MAX_WEIGHT};
use crate::selector::Selector;

/// Prefers servers with lower measured round-trip latency.
///
/// Latency values are produced elsewhere (a measurement job writing into the
/// server metadata); this selector only consumes them.
#[derive(Debug, Default)]
pub struct WeightedLatencySelector {
    table: SmoothWeighted,
}

impl WeightedLatencySelector {
    pub fn new(servers: &HashMap<String, String>) -> Self {
        Self {
            table: SmoothWeighted::new(compute_latency_weights(servers)),
        }
    }

    /// Copy of the current entry table.
    pub fn entries(&self) -> Vec<Weighted> {
        self.table.snapshot()
    }
}

/// Derive weighted entries from `latency=` metadata, sorted by address.
pub fn compute_latency_weights(servers: &HashMap<String, String>) -> Vec<Weighted> {
    let measured: Vec<(&str, Option<u64>)> = sorted_entries(servers)
        .into_iter()
        .map(|(addr, raw)| (addr, Metadata::parse(raw).latency_ms()))
        .collect();

    let (sum, count) = measured
        .iter()
        .filter_map(|(_, latency)| *latency)
        .fold((0u128, 0u128), |(sum, count), l| (sum + u128::from(l), count + 1));

    if count == 0 {
        return measured
            .into_iter()
            .map(|(addr, _)| Weighted::new(addr, DEFAULT_WEIGHT))
            .collect();
    }

    measured
        .into_iter()
        .map(|(addr, latency)| {
            let weight = match latency {
                Some(l) => latency_weight(sum, count, l),
                None => DEFAULT_WEIGHT,
            };
            Weighted::new(addr, weight)
        })
        .collect()
}

/// `round(sum / count / latency * 100)` in exact integer arithmetic, halves
/// rounding up. `count` and `latency` are never 0.
fn latency_weight(sum: u128, count: u128, latency: u64) -> i64 {
    let scale = 2 * DEFAULT_WEIGHT as u128;
    let denom = 2 * count * u128::from(latency);
    let w = (scale * sum + count * u128::from(latency)) / denom;
    w.min(MAX_WEIGHT as u128) as i64
}

impl Selector for WeightedLatencySelector {
    fn select(
        &self,
        _ctx: &CallContext,
        _service_path: &str,
        _service_method: &str,
        _args: Option<&[u8]>,
    ) -> Option<String> {
        self.table.next_server()
    }

    fn update_server(&self, servers: &HashMap<String, String>) {
        let entries = compute_latency_weights(servers);
        if tracing::enabled!(tracing::Level::DEBUG) {
            for entry in &entries {
                tracing::debug!(server = %entry.server, weight = entry.weight, "Latency weight");
            }
        }
        self.table.replace(entries);
    }

    fn name(&self) -> &'static str {
        "weighted_latency"
    }

    fn len(&self) -> usize {
        self.table.len()
    }
}
