//! Concurrent select/update races.
//!
//! Every generation of servers uses a disjoint address range. Once a
//! generation has been applied, no later selection may return an address
//! from an older one.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rpc_selector::{new_selector, CallContext, SelectMode, Selector, SelectorOptions};

mod common;

const READERS: usize = 8;
const GENERATIONS: usize = 200;

fn generation_of(addr: &str) -> usize {
    // tcp@10.0.{generation}.{i}:8972
    addr.trim_start_matches("tcp@10.0.")
        .split('.')
        .next()
        .and_then(|g| g.parse().ok())
        .expect("well-formed address")
}

fn race(mode: SelectMode) {
    let selector: Arc<Box<dyn Selector>> = Arc::new(new_selector(
        mode,
        &common::generation(0, 3),
        &SelectorOptions::default(),
    ));
    let applied = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|r| {
            let selector = Arc::clone(&selector);
            let applied = Arc::clone(&applied);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let ctx = CallContext::new();
                let mut calls = 0usize;
                while !done.load(Ordering::Acquire) {
                    let floor = applied.load(Ordering::Acquire);
                    let method = format!("m{r}-{calls}");
                    let picked = selector
                        .select(&ctx, "Arith", &method, None)
                        .expect("every generation is non-empty");
                    let generation = generation_of(&picked);
                    assert!(
                        generation >= floor,
                        "{mode}: picked {picked} after generation {floor} was applied"
                    );
                    calls += 1;
                }
                calls
            })
        })
        .collect();

    for g in 1..=GENERATIONS {
        selector.update_server(&common::generation(g, 1 + g % 4));
        applied.store(g, Ordering::Release);
        thread::yield_now();
    }
    done.store(true, Ordering::Release);

    let total: usize = readers
        .into_iter()
        .map(|h| h.join().expect("reader panicked"))
        .sum();
    assert!(total > 0);

    let last = common::generation(GENERATIONS, 1 + GENERATIONS % 4);
    let ctx = CallContext::new();
    for _ in 0..50 {
        let picked = selector.select(&ctx, "Arith", "Mul", None).unwrap();
        assert!(last.contains_key(&picked));
    }
}

#[test]
fn test_concurrent_weighted_round_robin() {
    race(SelectMode::WeightedRoundRobin);
}

#[test]
fn test_concurrent_weighted_latency() {
    race(SelectMode::WeightedLatency);
}

#[test]
fn test_concurrent_consistent_hash() {
    race(SelectMode::ConsistentHash);
}

#[test]
fn test_concurrent_round_robin() {
    race(SelectMode::RoundRobin);
}

#[test]
fn test_concurrent_random() {
    race(SelectMode::Random);
}

#[test]
fn test_concurrent_closest() {
    race(SelectMode::Closest);
}
