//! # Probe and unit result types.
//!
//! [`ProbeReport`] and [`UnitReport`] are what a session hands back to its
//! worker; [`UnitResult`] is the aggregated record the supervisor builds
//! from a `UnitReport` (adding the unit id and the dispatch-stamped
//! duration) and forwards to the renderer.

/// Outcome of running one test unit.
///
/// `Failed` and `Todo` are expected, aggregated outcomes; neither aborts the
/// generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The unit ran and all its expectations held.
    Passed,
    /// The unit ran and at least one expectation did not hold.
    Failed,
    /// The unit is a placeholder the suite author marked as not yet written.
    Todo,
}

/// What a session reports for a probe.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Number of individually runnable units in the suite.
    pub unit_count: u32,
    /// Logs captured during suite setup, before any unit id is known.
    pub logs: Vec<String>,
}

impl ProbeReport {
    /// Creates a probe report with no preamble logs.
    pub fn new(unit_count: u32) -> Self {
        Self {
            unit_count,
            logs: Vec::new(),
        }
    }

    /// Attaches preamble logs captured during suite setup.
    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }
}

/// What a session reports for one unit run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitReport {
    /// The unit's outcome.
    pub outcome: Outcome,
    /// Logs the unit emitted while running, in emission order.
    pub logs: Vec<String>,
}

impl UnitReport {
    /// Creates a report with no logs.
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            logs: Vec::new(),
        }
    }

    /// Attaches the unit's captured logs.
    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }
}

/// Aggregated result of one unit run, as forwarded to the renderer.
///
/// Produced exactly once per unit id per generation and never mutated after
/// creation. The duration is measured by the supervisor on a monotonic
/// clock, from the moment the run command was sent to the moment the result
/// arrived, so concurrent workers never need synchronized clocks.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitResult {
    /// Id of the unit, in `0..unit_count`.
    pub unit: u32,
    /// The unit's outcome.
    pub outcome: Outcome,
    /// Wall time of the run in milliseconds (dispatch to result receipt).
    pub duration_ms: f64,
    /// Logs the unit emitted while running, in emission order.
    pub logs: Vec<String>,
}
