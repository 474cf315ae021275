//! Server selection for RPC clients.
//!
//! Given a live set of backend addresses (each with a metadata string) and
//! per-call context, a [`Selector`] picks exactly one backend per call.
//!
//! ```
//! use std::collections::HashMap;
//! use rpc_selector::{new_selector, CallContext, SelectMode, SelectorOptions};
//!
//! let servers: HashMap<String, String> = [
//!     ("tcp@10.0.0.1:8972".to_string(), "weight=4".to_string()),
//!     ("tcp@10.0.0.2:8972".to_string(), "weight=1".to_string()),
//! ]
//! .into();
//!
//! let selector = new_selector(SelectMode::WeightedRoundRobin, &servers, &SelectorOptions::default());
//! let picked = selector.select(&CallContext::new(), "Arith", "Mul", None);
//! assert!(picked.is_some());
//! ```

pub mod config;
pub mod observability;
pub mod selector;

pub use config::SelectorConfig;
pub use selector::{
    new_selector, CallContext, SelectMode, Selector, SelectorError, SelectorOptions,
};
