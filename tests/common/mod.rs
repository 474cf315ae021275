//! Shared helpers for selector integration tests.

use std::collections::HashMap;

use rpc_selector::{CallContext, Selector};

/// Build an address -> metadata map.
#[allow(dead_code)]
pub fn servers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(addr, meta)| (addr.to_string(), meta.to_string()))
        .collect()
}

/// `n` servers named `tcp@10.0.{generation}.{i}:8972`, weighted 1..=n.
#[allow(dead_code)]
pub fn generation(generation: usize, n: usize) -> HashMap<String, String> {
    (0..n)
        .map(|i| (format!("tcp@10.0.{generation}.{i}:8972"), format!("weight={}", i + 1)))
        .collect()
}

/// Count how often each server is picked over `calls` selections.
#[allow(dead_code)]
pub fn tally(selector: &dyn Selector, calls: usize) -> HashMap<String, usize> {
    let ctx = CallContext::new();
    let mut calc = HashMap::new();
    for _ in 0..calls {
        if let Some(server) = selector.select(&ctx, "Arith", "Mul", None) {
            *calc.entry(server).or_insert(0) += 1;
        }
    }
    calc
}
