//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the selector.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::selector::{
    GeoPoint, KeyPolicy, RequestKey, SelectMode, SelectorOptions, DEFAULT_VIRTUAL_NODES,
};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SelectorConfig {
    /// Selection strategy.
    pub strategy: SelectMode,

    /// Only servers whose `group=` metadata matches are used (empty = all).
    pub group: String,

    /// Server address -> metadata string.
    pub servers: HashMap<String, String>,

    /// Consistent hashing settings.
    pub hash: HashConfig,

    /// Client location for proximity selection.
    pub geo: Option<GeoPoint>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl SelectorConfig {
    /// Construction options derived from this config.
    pub fn selector_options(&self) -> SelectorOptions {
        SelectorOptions {
            virtual_nodes: self.hash.virtual_nodes,
            key: RequestKey::from_policy(self.hash.key),
            origin: self.geo,
        }
    }

    /// Group filter, `None` when unset.
    pub fn group_filter(&self) -> Option<&str> {
        Some(self.group.as_str()).filter(|g| !g.is_empty())
    }
}

/// Consistent hash configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HashConfig {
    /// Ring points per server.
    pub virtual_nodes: usize,

    /// Request attributes that feed the key.
    pub key: KeyPolicy,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            key: KeyPolicy::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
