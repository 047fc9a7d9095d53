//! # testvisor: a test-execution orchestrator on tokio.
//!
//! testvisor runs a compiled test suite as a sequence of **generations**: it
//! probes the suite for its unit count, fans the units out over a bounded
//! worker pool, aggregates results into a report renderer, and yields one
//! [`ExitStatus`] per generation. In watch mode, requests arriving while a
//! generation is active are **superseded** — only the most recent one runs
//! next, and never before the active generation fully finishes.
//!
//! ## Architecture
//! ```text
//! requests ──► Supervisor ──(select! loop + generation state machine)
//!                 │
//!                 ├── WorkerPool ── WorkerActor 0 ── SuiteSession (probe + units)
//!                 │                 WorkerActor 1 ── SuiteSession (units)
//!                 │                 ...              (min(max_workers, units))
//!                 │
//!                 ├── ResultSink ── Report renderer (restart/diagnostic/ingest/finish)
//!                 │
//!                 └── Bus ── broadcast ──► Subscribe impls (LogWriter, ...)
//! ```
//!
//! ## Guarantees
//! - Unit ids are dispatched in ascending order, each exactly once per
//!   generation.
//! - A generation is complete only when every dispatched unit has reported
//!   and every worker has confirmed termination.
//! - Exactly one exit status per generation: `Success` (0),
//!   `TestFailures` (1), `NoTestsFound` (2), or `ProtocolFatal` (3).
//! - Protocol violations abort the generation; they are never swallowed.
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use testvisor::{
//!     Config, ConsoleReport, ExitStatus, Outcome, ProbeReport, Suite, SuiteError,
//!     SuiteFlags, SuiteSession, Supervisor, UnitReport,
//! };
//!
//! struct TinySuite;
//!
//! #[async_trait]
//! impl Suite for TinySuite {
//!     fn name(&self) -> &str {
//!         "tiny"
//!     }
//!
//!     async fn open(&self, _flags: &SuiteFlags) -> Result<Box<dyn SuiteSession>, SuiteError> {
//!         Ok(Box::new(TinySession))
//!     }
//! }
//!
//! struct TinySession;
//!
//! #[async_trait]
//! impl SuiteSession for TinySession {
//!     async fn probe(&mut self) -> Result<ProbeReport, SuiteError> {
//!         Ok(ProbeReport::new(3))
//!     }
//!
//!     async fn run_unit(&mut self, _id: u32) -> Result<UnitReport, SuiteError> {
//!         Ok(UnitReport::new(Outcome::Passed))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut sup = Supervisor::new(Config::default(), Box::new(ConsoleReport::new()))?;
//!     let status = sup.run_suite(Arc::new(TinySuite)).await?;
//!     assert_eq!(status, ExitStatus::Success);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//! - [`config`] — runtime configuration and opaque suite flags
//! - `core` (private) — machine, worker pool, sink, supervisor loop
//! - [`error`] — runtime, suite, and configuration errors
//! - [`events`] / [`subscribers`] — observability bus and subscribers
//! - [`report`] — renderer boundary and the embedded console renderer
//! - [`suite`] — suite provider boundary

pub mod config;
mod core;
pub mod error;
pub mod events;
pub mod report;
pub mod subscribers;
pub mod suite;

pub use config::{Config, SuiteFlags};
pub use crate::core::Supervisor;
pub use error::{ConfigError, RuntimeError, SuiteError};
pub use events::{Bus, Event, EventKind};
pub use report::{ConsoleReport, ExitStatus, Report};
pub use subscribers::{LogWriter, Subscribe};
pub use suite::{Outcome, ProbeReport, Suite, SuiteRef, SuiteSession, UnitReport, UnitResult};
