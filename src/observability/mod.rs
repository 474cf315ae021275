//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Selectors produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (selection / update counters, server gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metric calls are no-ops until a recorder is installed
//! - `RUST_LOG` overrides the configured level

pub mod logging;
pub mod metrics;
