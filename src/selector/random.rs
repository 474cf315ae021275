//! Uniform random selection.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::selector::context::CallContext;
use crate::selector::metadata::sorted_addresses;
use crate::selector::Selector;

/// Picks a server uniformly at random on every call.
#[derive(Debug)]
pub struct RandomSelector {
    servers: ArcSwap<Vec<String>>,
}

impl RandomSelector {
    pub fn new(servers: &HashMap<String, String>) -> Self {
        Self {
            servers: ArcSwap::from_pointee(sorted_addresses(servers)),
        }
    }
}

impl Selector for RandomSelector {
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
        Some(servers[fastrand::usize(..servers.len())].clone())
    }

    fn update_server(&self, servers: &HashMap<String, String>) {
        self.servers.store(Arc::new(sorted_addresses(servers)));
    }

    fn name(&self) -> &'static str {
        "random"
    }

    fn len(&self) -> usize {
        self.servers.load().len()
    }
}
