//! Weighted entries and smooth weighted round-robin sequencing.
//!
//! # Algorithm
//! ```text
//! for each pick:
//!     current_weight[i] += effective_weight[i]   (every entry)
//!     best = argmax(current_weight)              (first wins on ties)
//!     current_weight[best] -= sum(effective_weight)
//!     return best
//! ```
//!
//! Over a window of `sum(weight)` picks each entry is chosen exactly
//! `weight` times, interleaved rather than in bursts.

use parking_lot::Mutex;

/// Upper bound for any entry weight, keeping table sums far from overflow.
pub const MAX_WEIGHT: i64 = i32::MAX as i64;

/// Per-server bookkeeping for weight-based strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weighted {
    pub server: String,
    pub weight: i64,
    pub effective_weight: i64,
    pub(crate) current_weight: i64,
}

impl Weighted {
    /// Fresh entry with `effective_weight == weight` and no sequencing history.
    ///
    /// `weight` is clamped to `0..=MAX_WEIGHT`.
    pub fn new(server: impl Into<String>, weight: i64) -> Self {
        let weight = weight.clamp(0, MAX_WEIGHT);
        Self {
            server: server.into(),
            weight,
            effective_weight: weight,
            current_weight: 0,
        }
    }
}

/// A table of [`Weighted`] entries sequenced under a single lock.
///
/// The table is replaced wholesale on update; a pick sees either the old or
/// the new table, never a mixture.
#[derive(Debug, Default)]
pub struct SmoothWeighted {
    entries: Mutex<Vec<Weighted>>,
}

impl SmoothWeighted {
    pub fn new(entries: Vec<Weighted>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Publish a freshly built table.
    pub fn replace(&self, entries: Vec<Weighted>) {
        let old = std::mem::replace(&mut *self.entries.lock(), entries);
        drop(old);
    }

    /// Run one smooth weighted round-robin step.
    pub fn next_server(&self) -> Option<String> {
        let mut entries = self.entries.lock();
        pick(&mut entries).map(|e| e.server.clone())
    }

    /// Copy of the current table.
    pub fn snapshot(&self) -> Vec<Weighted> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn pick(entries: &mut [Weighted]) -> Option<&Weighted> {
    if entries.is_empty() {
        return None;
    }

    let total: i64 = entries.iter().map(|e| e.effective_weight).sum();
    if total <= 0 {
        // Nothing carries weight: fixed order decides.
        return entries.first();
    }

    let mut best: Option<usize> = None;
    for i in 0..entries.len() {
        let entry = &mut entries[i];
        if entry.effective_weight <= 0 {
            continue;
        }
        entry.current_weight += entry.effective_weight;
        let current = entry.current_weight;
        match best {
            Some(b) if entries[b].current_weight >= current => {}
            _ => best = Some(i),
        }
    }

    let best = best?;
    entries[best].current_weight -= total;
    Some(&entries[best])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn table(weights: &[(&str, i64)]) -> SmoothWeighted {
        SmoothWeighted::new(weights.iter().map(|(s, w)| Weighted::new(*s, *w)).collect())
    }

    #[test]
    fn test_smooth_sequence() {
        let sw = table(&[("a", 5), ("b", 1), ("c", 1)]);
        let picks: Vec<String> = (0..7).filter_map(|_| sw.next_server()).collect();
        // Classic nginx sequence for 5/1/1.
        assert_eq!(picks, vec!["a", "a", "b", "a", "c", "a", "a"]);
    }

    #[test]
    fn test_no_bursts() {
        let sw = table(&[("a", 4), ("b", 2), ("c", 1)]);
        let picks: Vec<String> = (0..7).filter_map(|_| sw.next_server()).collect();
        let longest_run = picks
            .windows(3)
            .filter(|w| w[0] == w[1] && w[1] == w[2])
            .count();
        assert_eq!(longest_run, 0, "picks were {:?}", picks);
    }

    #[test]
    fn test_empty_table() {
        let sw = SmoothWeighted::default();
        assert!(sw.next_server().is_none());
        assert!(sw.is_empty());
    }

    #[test]
    fn test_all_zero_weights_pick_first() {
        let sw = table(&[("a", 0), ("b", 0)]);
        for _ in 0..10 {
            assert_eq!(sw.next_server().as_deref(), Some("a"));
        }
    }

    #[test]
    fn test_zero_weight_never_chosen() {
        let sw = table(&[("a", 0), ("b", 3), ("c", 1)]);
        for _ in 0..100 {
            assert_ne!(sw.next_server().as_deref(), Some("a"));
        }
    }

    #[test]
    fn test_replace_resets_history() {
        let sw = table(&[("a", 1), ("b", 1)]);
        assert_eq!(sw.next_server().as_deref(), Some("a"));
        sw.replace(vec![Weighted::new("a", 1), Weighted::new("b", 1)]);
        assert_eq!(sw.next_server().as_deref(), Some("a"));
        assert!(sw.snapshot().iter().all(|e| e.effective_weight == e.weight));
    }

    #[test]
    fn test_new_clamps() {
        let w = Weighted::new("a", -10);
        assert_eq!(w.weight, 0);
        assert_eq!(w.effective_weight, 0);
        assert_eq!(Weighted::new("b", i64::MAX).weight, MAX_WEIGHT);
    }

    proptest! {
        /// One full window of picks hands out exactly `weight` picks per entry.
        #[test]
        fn prop_exact_proportion(weights in proptest::collection::vec(1i64..20, 1..8)) {
            let entries: Vec<Weighted> = weights
                .iter()
                .enumerate()
                .map(|(i, w)| Weighted::new(format!("s{i}"), *w))
                .collect();
            let sw = SmoothWeighted::new(entries);
            let window: i64 = weights.iter().sum();

            let mut counts: HashMap<String, i64> = HashMap::new();
            for _ in 0..window {
                let picked = sw.next_server().expect("non-empty table");
                *counts.entry(picked).or_default() += 1;
            }

            for (i, w) in weights.iter().enumerate() {
                prop_assert_eq!(counts.get(&format!("s{i}")).copied().unwrap_or(0), *w);
            }
        }
    }
}
