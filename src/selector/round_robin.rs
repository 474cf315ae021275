//! Round-robin selection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::selector::context::CallContext;
use crate::selector::metadata::sorted_addresses;
use crate::selector::Selector;

/// Rotates through servers in address order, ignoring weights.
#[derive(Debug)]
pub struct RoundRobinSelector {
    servers: ArcSwap<Vec<String>>,
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new(servers: &HashMap<String, String>) -> Self {
        Self {
            servers: ArcSwap::from_pointee(sorted_addresses(servers)),
            counter: AtomicUsize::new(0),
        }
    }
}

impl Selector for RoundRobinSelector {
    fn select(
        &self,
        _ctx: &CallContext,
        _service_path: &str,
        _service_method: &str,
        _args: Option<&[u8]>,
    ) -> Option<String> {
        let servers = self.servers.load();
        if servers.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % servers.len();
        Some(servers[index].clone())
    }

    fn update_server(&self, servers: &HashMap<String, String>) {
        let addrs = sorted_addresses(servers);
        tracing::debug!(servers = addrs.len(), "Rebuilt round-robin list");
        self.servers.store(Arc::new(addrs));
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn len(&self) -> usize {
        self.servers.load().len()
    }
}
