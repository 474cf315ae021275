//! Selector error definitions.

use thiserror::Error;

/// Errors raised while constructing selectors.
///
/// Selection and server updates never fail; malformed input is absorbed
/// into defaults instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    /// Strategy name did not match any known mode.
    #[error("unknown select mode: {0}")]
    UnknownMode(String),
}
