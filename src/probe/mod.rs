//! Probe module for controller-side reachability checks.
//!
//! Supports HTTP and TCP probes. Each probe runs exactly once per call and
//! encodes transport failures in its result record; only configuration
//! problems are returned as [`ProbeError`].

mod http;
mod params;
mod tcp;

pub use http::*;
pub use tcp::*;

use std::fmt::Write;
use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ProbeError {
    /// Whether this error must be raised to the caller instead of being
    /// recorded in a probe result.
    pub fn is_config(&self) -> bool {
        matches!(self, ProbeError::Config(_))
    }
}

/// Convert a timeout in seconds into a [`Duration`].
///
/// Negative, NaN, infinite and overflowing values are rejected as
/// configuration errors.
pub(crate) fn timeout_from_secs(secs: f64) -> Result<Duration, ProbeError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ProbeError::Config(format!("invalid timeout {} seconds: {}", secs, e)))
}

/// Render an error together with its source chain on a single line.
///
/// Sources whose message is already part of the outer message are skipped.
pub(crate) fn report(err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = err.to_string();
    let mut current = err;
    while let Some(src) = current.source() {
        let msg = src.to_string();
        if !s.contains(&msg) {
            let _ = write!(s, ": {}", msg);
        }
        current = src;
    }
    s
}
