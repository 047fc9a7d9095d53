//! # Suite and session traits.
//!
//! A [`Suite`] stands for one compiled test artifact. Each execution worker
//! opens its **own** [`SuiteSession`] from the shared suite, so sessions may
//! keep per-worker state (interpreter instance, child process, in-memory VM)
//! without any cross-worker synchronization.
//!
//! Session failures are not recoverable within a generation: the worker
//! reports them to the supervisor as protocol violations and the whole
//! generation aborts.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SuiteFlags;
use crate::error::SuiteError;
use crate::suite::result::{ProbeReport, UnitReport};

/// Shared handle to a suite provider.
///
/// A generation-start request carries one of these; the same handle is given
/// to every worker of the generation.
pub type SuiteRef = Arc<dyn Suite>;

/// # A compiled test suite, able to mint execution sessions.
///
/// `open` is called once per worker. The `flags` are forwarded opaquely from
/// [`Config`](crate::Config); the runtime never interprets them.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use testvisor::{
///     Outcome, ProbeReport, Suite, SuiteError, SuiteFlags, SuiteSession, UnitReport,
/// };
///
/// struct TwoUnits;
///
/// #[async_trait]
/// impl Suite for TwoUnits {
///     fn name(&self) -> &str {
///         "two-units"
///     }
///
///     async fn open(&self, _flags: &SuiteFlags) -> Result<Box<dyn SuiteSession>, SuiteError> {
///         Ok(Box::new(Session))
///     }
/// }
///
/// struct Session;
///
/// #[async_trait]
/// impl SuiteSession for Session {
///     async fn probe(&mut self) -> Result<ProbeReport, SuiteError> {
///         Ok(ProbeReport::new(2))
///     }
///
///     async fn run_unit(&mut self, _id: u32) -> Result<UnitReport, SuiteError> {
///         Ok(UnitReport::new(Outcome::Passed))
///     }
/// }
/// ```
#[async_trait]
pub trait Suite: Send + Sync + 'static {
    /// Returns a stable, human-readable suite name (used in events/logs).
    fn name(&self) -> &str;

    /// Instantiates one isolated execution session of the compiled artifact.
    async fn open(&self, flags: &SuiteFlags) -> Result<Box<dyn SuiteSession>, SuiteError>;
}

/// # One isolated execution context of a suite.
///
/// Exactly one session lives per worker. The supervisor sends a probe to the
/// first session of a generation only; every session may receive any number
/// of `run_unit` calls, one at a time.
#[async_trait]
pub trait SuiteSession: Send {
    /// Counts the units in the suite.
    ///
    /// Logs captured while the suite sets itself up belong in
    /// [`ProbeReport::logs`]; they are flushed to the renderer's diagnostic
    /// channel, never mixed into a unit's own logs.
    async fn probe(&mut self) -> Result<ProbeReport, SuiteError>;

    /// Runs the unit with the given id and reports its outcome.
    ///
    /// Ids are `0..unit_count` as established by the probe. The runtime
    /// guarantees it never asks one session to run two units concurrently.
    async fn run_unit(&mut self, id: u32) -> Result<UnitReport, SuiteError>;
}
