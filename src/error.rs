//! Error types used by the testvisor runtime and suite providers.
//!
//! This module defines three error enums:
//!
//! - [`RuntimeError`] — errors raised by the orchestration runtime itself.
//! - [`SuiteError`] — errors raised by a suite provider while probing or
//!   running units. These surface to the supervisor as protocol violations.
//! - [`ConfigError`] — invalid runtime configuration, rejected up front.
//!
//! All types provide `as_label()` for stable snake_case labels in logs.

use thiserror::Error;

/// # Errors produced by the testvisor runtime.
///
/// These represent failures in the orchestration system itself, not test
/// failures (a failing test unit is an expected outcome, aggregated by the
/// result sink and reflected in the exit status).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The request channel closed before any generation could run, so there
    /// is no exit status to return.
    #[error("request channel closed before any generation ran")]
    ChannelClosed,

    /// Runtime configuration was rejected by [`Config::validate`](crate::Config::validate).
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ChannelClosed => "runtime_channel_closed",
            RuntimeError::Config(_) => "runtime_config_invalid",
        }
    }
}

/// # Errors produced by a suite provider.
///
/// A suite session that fails to open, probe, or run a unit cannot be
/// recovered within the current generation: the worker reports the failure
/// as a protocol violation and the generation aborts with
/// [`ExitStatus::ProtocolFatal`](crate::ExitStatus::ProtocolFatal).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SuiteError {
    /// The compiled suite artifact could not be instantiated.
    #[error("failed to open suite session: {reason}")]
    Open {
        /// Human-readable description of the instantiation failure.
        reason: String,
    },

    /// The suite crashed or misbehaved while serving a probe or a unit run.
    #[error("suite execution error: {reason}")]
    Execution {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl SuiteError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SuiteError::Open { .. } => "suite_open_failed",
            SuiteError::Execution { .. } => "suite_execution_failed",
        }
    }
}

/// # Invalid runtime configuration.
///
/// Returned by [`Config::validate`](crate::Config::validate); the supervisor
/// refuses to start with an invalid configuration rather than clamping
/// silently.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_workers` must be at least 1.
    #[error("max_workers must be a positive integer (got 0)")]
    ZeroWorkers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            RuntimeError::ChannelClosed.as_label(),
            "runtime_channel_closed"
        );
        let open = SuiteError::Open {
            reason: "missing artifact".into(),
        };
        assert_eq!(open.as_label(), "suite_open_failed");
    }
}
