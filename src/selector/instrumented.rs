//! Metrics and tracing around any selector.

use std::collections::HashMap;

use crate::observability::metrics;
use crate::selector::context::CallContext;
use crate::selector::Selector;

/// Wraps a selector and records selections, misses and updates.
#[derive(Debug)]
pub(crate) struct Instrumented {
    inner: Box<dyn Selector>,
}

impl Instrumented {
    pub(crate) fn new(inner: Box<dyn Selector>) -> Self {
        metrics::record_server_count(inner.name(), inner.len());
        Self { inner }
    }
}

impl Selector for Instrumented {
    fn select(
        &self,
        ctx: &CallContext,
        service_path: &str,
        service_method: &str,
        args: Option<&[u8]>,
    ) -> Option<String> {
        let selected = self.inner.select(ctx, service_path, service_method, args);
        match &selected {
            Some(_) => metrics::record_selection(self.inner.name()),
            None => {
                tracing::debug!(
                    strategy = self.inner.name(),
                    service_path,
                    service_method,
                    "No server available"
                );
                metrics::record_empty_selection(self.inner.name());
            }
        }
        selected
    }

    fn update_server(&self, servers: &HashMap<String, String>) {
        self.inner.update_server(servers);
        let count = self.inner.len();
        tracing::info!(strategy = self.inner.name(), servers = count, "Server set updated");
        metrics::record_update(self.inner.name());
        metrics::record_server_count(self.inner.name(), count);
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
