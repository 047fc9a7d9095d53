//! # Runtime events emitted by the supervisor and its worker pool.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Request events**: generation-start requests and supersession
//! - **Generation lifecycle**: probe, dispatch, completion, finish
//! - **Failure events**: protocol violations
//! - **Teardown events**: worker pool shutdown
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! worker/unit ids, reasons, and the generation verdict.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::report::ExitStatus;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Request events ===
    /// A generation-start request arrived.
    ///
    /// Sets:
    /// - `suite`: suite name
    RunRequested,

    /// A request arrived while busy and replaced the pending slot.
    ///
    /// Sets:
    /// - `suite`: the newly pending suite name
    /// - `reason`: name of the request it displaced, if any
    RunSuperseded,

    // === Generation lifecycle ===
    /// The first worker of a generation was asked for the unit count.
    ///
    /// Sets:
    /// - `suite`: suite name
    ProbeStarted,

    /// The probe returned; the generation is sized and queued.
    ///
    /// Sets:
    /// - `suite`: suite name
    /// - `unit_count`: number of units discovered
    SuiteProbed,

    /// A unit was assigned to a worker.
    ///
    /// Sets:
    /// - `worker`: worker index
    /// - `unit`: unit id
    UnitDispatched,

    /// A worker reported a unit result.
    ///
    /// Sets:
    /// - `worker`: worker index
    /// - `unit`: unit id
    /// - `duration_ms`: dispatch-to-result wall time
    UnitCompleted,

    /// The generation finished and the renderer yielded a verdict.
    ///
    /// Sets:
    /// - `suite`: suite name
    /// - `status`: the generation's exit status
    RunFinished,

    // === Failure events ===
    /// A worker sent a malformed or unexpected message; the generation
    /// aborts.
    ///
    /// Sets:
    /// - `worker`: offending worker index (if attributable)
    /// - `reason`: description including the offending payload
    ProtocolViolated,

    // === Teardown events ===
    /// Worker teardown began (the generation is draining).
    WorkersStopping,

    /// Every worker confirmed termination.
    WorkersStopped,

    /// A worker did not stop within the grace period and was aborted.
    ///
    /// Sets:
    /// - `worker`: worker index
    /// - `unit`: the in-flight unit lost with it, if any
    WorkerAborted,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the suite, if applicable.
    pub suite: Option<Arc<str>>,
    /// Worker index, if applicable.
    pub worker: Option<usize>,
    /// Unit id, if applicable.
    pub unit: Option<u32>,
    /// Unit count discovered by a probe.
    pub unit_count: Option<u32>,
    /// Dispatch-to-result wall time in milliseconds.
    pub duration_ms: Option<f64>,
    /// Human-readable reason (violations, supersession details, etc.).
    pub reason: Option<Arc<str>>,
    /// Generation verdict (for `RunFinished`).
    pub status: Option<ExitStatus>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            suite: None,
            worker: None,
            unit: None,
            unit_count: None,
            duration_ms: None,
            reason: None,
            status: None,
        }
    }

    /// Attaches a suite name.
    #[inline]
    pub fn with_suite(mut self, suite: impl Into<Arc<str>>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    /// Attaches a worker index.
    #[inline]
    pub fn with_worker(mut self, worker: usize) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Attaches a unit id.
    #[inline]
    pub fn with_unit(mut self, unit: u32) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Attaches a probed unit count.
    #[inline]
    pub fn with_unit_count(mut self, unit_count: u32) -> Self {
        self.unit_count = Some(unit_count);
        self
    }

    /// Attaches a measured duration in milliseconds.
    #[inline]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a generation verdict.
    #[inline]
    pub fn with_status(mut self, status: ExitStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::RunRequested);
        let b = Event::new(EventKind::RunRequested);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_set_fields() {
        let ev = Event::new(EventKind::UnitCompleted)
            .with_worker(1)
            .with_unit(7)
            .with_duration_ms(12.5);
        assert_eq!(ev.worker, Some(1));
        assert_eq!(ev.unit, Some(7));
        assert_eq!(ev.duration_ms, Some(12.5));
    }
}
