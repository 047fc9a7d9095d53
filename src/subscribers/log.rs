//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stderr in a human-readable format, keeping
//! stdout free for the report renderer.
//!
//! ## Output format
//! ```text
//! [requested] suite=my-suite
//! [probed] suite=my-suite units=12
//! [dispatched] worker=0 unit=0
//! [completed] worker=0 unit=0 duration=3.2ms
//! [superseded] suite=my-suite displaced="older-suite"
//! [violation] worker=1 reason="result for unknown unit 99"
//! [finished] suite=my-suite status=success
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::subscriber::Subscribe;

/// Simple stderr logging subscriber.
///
/// Prints human-readable event descriptions for debugging and demonstration
/// purposes. Not intended for production use — implement a custom
/// [`Subscribe`] for structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let suite = e.suite.as_deref().unwrap_or("?");
        match e.kind {
            EventKind::RunRequested => {
                eprintln!("[requested] suite={suite}");
            }
            EventKind::RunSuperseded => {
                let displaced = e.reason.as_deref().unwrap_or("none");
                eprintln!("[superseded] suite={suite} displaced={displaced:?}");
            }
            EventKind::ProbeStarted => {
                eprintln!("[probing] suite={suite}");
            }
            EventKind::SuiteProbed => {
                eprintln!("[probed] suite={suite} units={}", e.unit_count.unwrap_or(0));
            }
            EventKind::UnitDispatched => {
                if let (Some(worker), Some(unit)) = (e.worker, e.unit) {
                    eprintln!("[dispatched] worker={worker} unit={unit}");
                }
            }
            EventKind::UnitCompleted => {
                if let (Some(worker), Some(unit)) = (e.worker, e.unit) {
                    let ms = e.duration_ms.unwrap_or(0.0);
                    eprintln!("[completed] worker={worker} unit={unit} duration={ms:.1}ms");
                }
            }
            EventKind::RunFinished => {
                let status = e.status.map(|s| s.as_label()).unwrap_or("unknown");
                eprintln!("[finished] suite={suite} status={status}");
            }
            EventKind::ProtocolViolated => {
                let reason = e.reason.as_deref().unwrap_or("unknown");
                eprintln!("[violation] worker={:?} reason={reason:?}", e.worker);
            }
            EventKind::WorkersStopping => {
                eprintln!("[stopping-workers]");
            }
            EventKind::WorkersStopped => {
                eprintln!("[workers-stopped]");
            }
            EventKind::WorkerAborted => {
                eprintln!("[worker-aborted] worker={:?} unit={:?}", e.worker, e.unit);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
