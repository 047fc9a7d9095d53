//! # Renderer trait and exit status contract.

use async_trait::async_trait;

use crate::suite::UnitResult;

/// Terminal verdict of one generation.
///
/// The supervisor yields exactly one of these per generation; callers map it
/// to a process exit code via [`ExitStatus::code`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every unit passed (todo units count as passing here only if the
    /// renderer decides so; the embedded renderer treats todo as failing).
    Success,
    /// At least one unit failed.
    TestFailures,
    /// The probe found zero units. Distinguished from success so watch
    /// tooling can tell "all green" apart from "nothing ran".
    NoTestsFound,
    /// The generation aborted on a protocol violation or worker crash.
    ProtocolFatal,
}

impl ExitStatus {
    /// Maps the status to a process exit code.
    ///
    /// `Success → 0`, `TestFailures → 1`, `NoTestsFound → 2`,
    /// `ProtocolFatal → 3`.
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::TestFailures => 1,
            ExitStatus::NoTestsFound => 2,
            ExitStatus::ProtocolFatal => 3,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            ExitStatus::Success => "success",
            ExitStatus::TestFailures => "test_failures",
            ExitStatus::NoTestsFound => "no_tests_found",
            ExitStatus::ProtocolFatal => "protocol_fatal",
        }
    }
}

/// # Incremental report renderer.
///
/// The supervisor drives a renderer through a fixed call sequence per
/// generation:
///
/// ```text
/// restart(unit_count)            once, right after a successful probe
///                                (also for unit_count == 0)
/// diagnostic(preamble)           zero or more times, before the first ingest
/// ingest(result)                 once per unit, in completion order
/// finish() -> ExitStatus         once, after worker teardown
/// ```
///
/// `restart` wipes any state accumulated from a previous generation, so a
/// long-lived renderer never leaks counts across watch-mode runs. All calls
/// come from the single supervisor context; implementations need no internal
/// locking.
#[async_trait]
pub trait Report: Send + 'static {
    /// Resets the renderer for a new generation of `unit_count` units.
    async fn restart(&mut self, unit_count: u32);

    /// Emits out-of-band diagnostic lines (suite preamble, abort reasons).
    ///
    /// Diagnostics are never attributed to a specific unit.
    async fn diagnostic(&mut self, lines: &[String]);

    /// Ingests one unit result. Results arrive in completion order, which
    /// is not unit-id order.
    async fn ingest(&mut self, result: &UnitResult);

    /// Finishes the report for this generation and yields its verdict.
    ///
    /// Only the aggregate verdict (`Success`/`TestFailures`) is the
    /// renderer's to decide; the supervisor overrides it with
    /// [`ExitStatus::NoTestsFound`] or [`ExitStatus::ProtocolFatal`] when
    /// those terminal outcomes apply.
    async fn finish(&mut self) -> ExitStatus;
}
