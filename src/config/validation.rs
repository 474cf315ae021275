//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (virtual nodes in 1..=65536, coordinates on the globe)
//! - Check strategy prerequisites (closest needs a client location)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SelectorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::SelectorConfig;
use crate::selector::{SelectMode, MAX_VIRTUAL_NODES};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("hash.virtual_nodes must be greater than 0")]
    ZeroVirtualNodes,

    #[error("hash.virtual_nodes {0} exceeds the maximum of 65536")]
    TooManyVirtualNodes(usize),

    #[error("geo.latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("geo.longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("strategy 'closest' requires a [geo] section")]
    MissingGeo,

    #[error("unknown log level '{0}'")]
    InvalidLogLevel(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("server address must not be empty")]
    EmptyServerAddress,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &SelectorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.hash.virtual_nodes == 0 {
        errors.push(ValidationError::ZeroVirtualNodes);
    } else if config.hash.virtual_nodes > MAX_VIRTUAL_NODES {
        errors.push(ValidationError::TooManyVirtualNodes(config.hash.virtual_nodes));
    }

    match config.geo {
        Some(geo) => {
            if !(-90.0..=90.0).contains(&geo.latitude) {
                errors.push(ValidationError::LatitudeOutOfRange(geo.latitude));
            }
            if !(-180.0..=180.0).contains(&geo.longitude) {
                errors.push(ValidationError::LongitudeOutOfRange(geo.longitude));
            }
        }
        None if config.strategy == SelectMode::Closest => {
            errors.push(ValidationError::MissingGeo);
        }
        None => {}
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.servers.keys().any(|addr| addr.trim().is_empty()) {
        errors.push(ValidationError::EmptyServerAddress);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
