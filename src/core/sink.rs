//! # Result sink: drives the report renderer.
//!
//! The sink owns the [`Report`] for the lifetime of the supervisor and
//! enforces the renderer call sequence (`restart`, `diagnostic*`, `ingest*`,
//! `finish`) across generations. It is also where a generation's verdict is
//! mapped onto the final [`ExitStatus`]:
//!
//! ```text
//! Verdict::Aggregate   → whatever the renderer's finish() says
//! Verdict::NoUnits     → diagnostic + ExitStatus::NoTestsFound
//! Verdict::Fatal(r)    → diagnostic(r) + ExitStatus::ProtocolFatal
//! ```
//!
//! The renderer's own `finish()` still runs for overridden verdicts so it
//! can flush whatever output it buffered; only its status is discarded.

use crate::core::machine::Verdict;
use crate::report::{ExitStatus, Report};
use crate::suite::UnitResult;

pub(crate) struct ResultSink {
    report: Box<dyn Report>,
}

impl ResultSink {
    pub(crate) fn new(report: Box<dyn Report>) -> Self {
        Self { report }
    }

    /// Resets the renderer for a new generation (also for zero units).
    pub(crate) async fn restart(&mut self, unit_count: u32) {
        self.report.restart(unit_count).await;
    }

    /// Forwards out-of-band lines (suite preamble, abort reasons).
    pub(crate) async fn diagnostic(&mut self, lines: &[String]) {
        if !lines.is_empty() {
            self.report.diagnostic(lines).await;
        }
    }

    /// Forwards one unit result, in completion order.
    pub(crate) async fn ingest(&mut self, result: &UnitResult) {
        self.report.ingest(result).await;
    }

    /// Finishes the generation and resolves its exit status.
    pub(crate) async fn finish(&mut self, verdict: Verdict) -> ExitStatus {
        match verdict {
            Verdict::Aggregate => self.report.finish().await,
            Verdict::NoUnits => {
                self.report
                    .diagnostic(&["no tests found in the suite".to_string()])
                    .await;
                let _ = self.report.finish().await;
                ExitStatus::NoTestsFound
            }
            Verdict::Fatal(reason) => {
                self.report
                    .diagnostic(&[format!("protocol violation: {reason}")])
                    .await;
                let _ = self.report.finish().await;
                ExitStatus::ProtocolFatal
            }
        }
    }
}
