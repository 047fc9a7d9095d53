//! # Suite provider boundary.
//!
//! This module defines the contract between the supervisor and the compiled
//! test-suite artifact it orchestrates:
//!
//! - [`Suite`] — factory for per-worker sessions of the compiled artifact
//! - [`SuiteSession`] — one isolated execution context able to probe the
//!   suite and run individual units
//! - [`ProbeReport`] / [`UnitReport`] — what a session reports back
//! - [`Outcome`] / [`UnitResult`] — per-unit results as aggregated by the
//!   runtime
//!
//! The supervisor never looks inside a suite: it only counts units, hands
//! out unit ids, and collects outcomes.

mod provider;
mod result;

pub use provider::{Suite, SuiteRef, SuiteSession};
pub use result::{Outcome, ProbeReport, UnitReport, UnitResult};
