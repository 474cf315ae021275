//! Smooth weighted round-robin selection over static `weight=` metadata.

use std::collections::HashMap;

use crate::selector::context::CallContext;
use crate::selector::metadata::{sorted_entries, Metadata};
use crate::selector::weighted::{SmoothWeighted, Weighted};
use crate::selector::Selector;

/// Cycles servers in proportion to their configured weight without bursts.
#[derive(Debug, Default)]
pub struct WeightedRoundRobinSelector {
    table: SmoothWeighted,
}

impl WeightedRoundRobinSelector {
    pub fn new(servers: &HashMap<String, String>) -> Self {
        Self {
            table: SmoothWeighted::new(build_entries(servers)),
        }
    }

    /// Copy of the current entry table.
    pub fn entries(&self) -> Vec<Weighted> {
        self.table.snapshot()
    }
}

fn build_entries(servers: &HashMap<String, String>) -> Vec<Weighted> {
    sorted_entries(servers)
        .into_iter()
        .map(|(addr, raw)| Weighted::new(addr, Metadata::parse(raw).weight()))
        .collect()
}

impl Selector for WeightedRoundRobinSelector {
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
        let entries = build_entries(servers);
        tracing::debug!(servers = entries.len(), "Rebuilt weighted round-robin table");
        self.table.replace(entries);
    }

    fn name(&self) -> &'static str {
        "weighted_round_robin"
    }

    fn len(&self) -> usize {
        self.table.len()
    }
}
