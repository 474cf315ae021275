//! Server metadata parsing.
//!
//! # Responsibilities
//! - Parse the `key=value&key=value` string attached to each server address
//! - Expose typed accessors (weight, latency, group, state, coordinates)
//! - Absorb malformed values into documented defaults
//!
//! # Design Decisions
//! - Query-string encoding (percent-decoding applies), first occurrence wins
//! - Unknown keys are retained but never interpreted
//! - Never fails: a bad value must not poison the rest of the set

use std::collections::HashMap;

/// Weight assigned when `weight=` is absent or malformed.
pub const DEFAULT_WEIGHT: i64 = 100;

/// Parsed view of a server's metadata string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    values: HashMap<String, String>,
}

impl Metadata {
    /// Parse a metadata string. Empty input yields empty metadata.
    pub fn parse(raw: &str) -> Self {
        let mut values = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(raw.trim().as_bytes()) {
            if key.is_empty() {
                continue;
            }
            values
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { values }
    }

    /// Raw value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Static weight from `weight=`.
    ///
    /// Absent or unparsable values fall back to [`DEFAULT_WEIGHT`];
    /// negative values clamp to 0.
    pub fn weight(&self) -> i64 {
        match self.get("weight") {
            None => DEFAULT_WEIGHT,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(w) => w.max(0),
                Err(_) => {
                    tracing::warn!(value = %raw, "Malformed weight metadata, using default");
                    DEFAULT_WEIGHT
                }
            },
        }
    }

    /// Measured round-trip latency in milliseconds from `latency=`.
    ///
    /// Returns `None` when absent, unparsable or zero.
    pub fn latency_ms(&self) -> Option<u64> {
        let raw = self.get("latency")?;
        match raw.trim().parse::<u64>() {
            Ok(0) => None,
            Ok(ms) => Some(ms),
            Err(_) => {
                tracing::warn!(value = %raw, "Malformed latency metadata, treating as unmeasured");
                None
            }
        }
    }

    /// Server group, if any.
    pub fn group(&self) -> Option<&str> {
        self.get("group").filter(|g| !g.is_empty())
    }

    /// False when the server is explicitly marked `state=inactive`.
    pub fn is_active(&self) -> bool {
        !matches!(self.get("state"), Some(s) if s.eq_ignore_ascii_case("inactive"))
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinate("latitude", 90.0)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinate("longitude", 180.0)
    }

    fn coordinate(&self, key: &str, bound: f64) -> Option<f64> {
        self.get(key)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && v.abs() <= bound)
    }
}

/// Drop inactive servers and, when `group` is set, servers from other groups.
///
/// Discovery snapshots go through this before reaching a selector; the
/// selectors themselves never filter.
pub fn filter_servers(
    servers: &HashMap<String, String>,
    group: Option<&str>,
) -> HashMap<String, String> {
    let group = group.filter(|g| !g.is_empty());
    servers
        .iter()
        .filter(|(_, raw)| {
            let meta = Metadata::parse(raw);
            if !meta.is_active() {
                return false;
            }
            match group {
                Some(wanted) => meta.group() == Some(wanted),
                None => true,
            }
        })
        .map(|(addr, raw)| (addr.clone(), raw.clone()))
        .collect()
}

/// `(address, metadata)` pairs sorted by address so rebuilt tables have a fixed order.
pub(crate) fn sorted_entries(servers: &HashMap<String, String>) -> Vec<(&str, &str)> {
    let mut entries: Vec<(&str, &str)> = servers
        .iter()
        .map(|(addr, meta)| (addr.as_str(), meta.as_str()))
        .collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries
}

pub(crate) fn sorted_addresses(servers: &HashMap<String, String>) -> Vec<String> {
    let mut addrs: Vec<String> = servers.keys().cloned().collect();
    addrs.sort_unstable();
    addrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let meta = Metadata::parse("");
        assert_eq!(meta.weight(), DEFAULT_WEIGHT);
        assert_eq!(meta.latency_ms(), None);
        assert!(meta.group().is_none());
        assert!(meta.is_active());
    }

    #[test]
    fn test_parse_pairs() {
        let meta = Metadata::parse("weight=4&latency=60&group=blue&extra=1");
        assert_eq!(meta.weight(), 4);
        assert_eq!(meta.latency_ms(), Some(60));
        assert_eq!(meta.group(), Some("blue"));
        assert_eq!(meta.get("extra"), Some("1"));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let meta = Metadata::parse("weight=7&weight=9");
        assert_eq!(meta.weight(), 7);
    }

    #[test]
    fn test_percent_decoding() {
        let meta = Metadata::parse("group=east%20coast");
        assert_eq!(meta.group(), Some("east coast"));
    }

    #[test]
    fn test_malformed_weight_defaults() {
        assert_eq!(Metadata::parse("weight=abc").weight(), DEFAULT_WEIGHT);
        assert_eq!(Metadata::parse("weight=").weight(), DEFAULT_WEIGHT);
        assert_eq!(Metadata::parse("weight=1.5").weight(), DEFAULT_WEIGHT);
    }

    #[test]
    fn test_negative_weight_clamps_to_zero() {
        assert_eq!(Metadata::parse("weight=-3").weight(), 0);
        assert_eq!(Metadata::parse("weight=0").weight(), 0);
    }

    #[test]
    fn test_latency_zero_and_garbage_unmeasured() {
        assert_eq!(Metadata::parse("latency=0").latency_ms(), None);
        assert_eq!(Metadata::parse("latency=-5").latency_ms(), None);
        assert_eq!(Metadata::parse("latency=fast").latency_ms(), None);
    }

    #[test]
    fn test_state_inactive() {
        assert!(!Metadata::parse("state=inactive").is_active());
        assert!(!Metadata::parse("state=INACTIVE").is_active());
        assert!(Metadata::parse("state=active").is_active());
    }

    #[test]
    fn test_coordinates_out_of_range() {
        let meta = Metadata::parse("latitude=91&longitude=120.5");
        assert_eq!(meta.latitude(), None);
        assert_eq!(meta.longitude(), Some(120.5));
    }

    #[test]
    fn test_filter_servers() {
        let mut servers = HashMap::new();
        servers.insert("a".to_string(), "group=blue".to_string());
        servers.insert("b".to_string(), "group=green".to_string());
        servers.insert("c".to_string(), "group=blue&state=inactive".to_string());
        servers.insert("d".to_string(), String::new());

        let all = filter_servers(&servers, None);
        assert_eq!(all.len(), 3);
        assert!(!all.contains_key("c"));

        let blue = filter_servers(&servers, Some("blue"));
        assert_eq!(blue.len(), 1);
        assert!(blue.contains_key("a"));

        let empty_group = filter_servers(&servers, Some(""));
        assert_eq!(empty_group.len(), 3);
    }

    #[test]
    fn test_sorted_entries() {
        let mut servers = HashMap::new();
        servers.insert("z".to_string(), String::new());
        servers.insert("a".to_string(), "weight=1".to_string());
        let entries = sorted_entries(&servers);
        assert_eq!(entries, vec![("a", "weight=1"), ("z", "")]);
    }
}
