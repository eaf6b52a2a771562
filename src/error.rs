//! Error taxonomy for the distribution engine.

use thiserror::Error;

/// Errors surfaced to callers of the distribution engine.
///
/// Invariant violations inside the search itself (an exhausted target
/// pool, draining a bin that was never marked for removal) are bugs in
/// the caller's configuration and panic instead; they are prevented by
/// the `InvalidSetup` validation performed before a search starts.
#[derive(Debug, Error)]
pub enum DistributeError {
    /// A distribution was converted to bundles while one of its bins
    /// held no items. Not retried; the caller decides what to do.
    #[error("bin {index} is empty")]
    EmptyBin { index: usize },

    /// The search was configured in a way that cannot produce valid
    /// individuals (zero bins, disruption budget too small for the
    /// structurally required changes, ...).
    #[error("invalid search setup: {0}")]
    InvalidSetup(String),
}
