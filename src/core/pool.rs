//! # Worker pool for one generation.
//!
//! The pool spawns [`WorkerActor`]s lazily: worker 0 comes up for the probe
//! and is reused for dispatch; further workers appear the first time the
//! supervisor dispatches to their index. A generation over `n` units with a
//! `max_workers` cap therefore never holds more than `min(max_workers, n)`
//! workers, and a zero-unit generation never grows past the probe worker.
//!
//! ## Rules
//! - **Dispatch stamping**: the dispatch-to-result duration is measured
//!   here, on one monotonic clock, so workers never report times and
//!   concurrent workers need no clock agreement.
//! - **One in-flight unit per worker**: [`WorkerPool::take_inflight`]
//!   matches a result against the stamp; a mismatch means the worker lied
//!   and the supervisor treats it as a protocol violation.
//! - **Teardown barrier**: [`WorkerPool::shutdown`] cancels everything,
//!   then waits up to the grace period (shared across the whole pool) for
//!   workers to join. Stragglers are aborted and announced via
//!   [`EventKind::WorkerAborted`].
//! - **Crash surfacing**: every worker task is watched; a panic inside a
//!   session is routed as a `Protocol` message so the generation aborts
//!   instead of waiting forever on a result that will never arrive.

use std::any::Any;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::SuiteFlags;
use crate::core::worker::{Routed, WorkerActor, WorkerCmd, WorkerMsg};
use crate::events::{Bus, Event, EventKind};
use crate::suite::SuiteRef;

/// Channel capacity for one worker's command queue.
///
/// A worker is only ever sent the next command after its previous reply was
/// consumed, so a single slot never blocks the dispatch path.
const CMD_CAPACITY: usize = 1;

struct WorkerHandle {
    cmds: mpsc::Sender<WorkerCmd>,
    /// Watcher task: joins the actor and routes an abnormal exit as a
    /// `Protocol` message. Finishes as soon as the actor does.
    watcher: JoinHandle<()>,
    /// Aborts the actor task itself (the watcher then observes the abort).
    abort: AbortHandle,
    /// Unit currently running on this worker, with its dispatch stamp.
    inflight: Option<(u32, Instant)>,
}

/// Lazily grown set of workers executing one suite.
pub(crate) struct WorkerPool {
    suite: SuiteRef,
    flags: SuiteFlags,
    grace: Duration,
    bus: Bus,
    out: mpsc::Sender<Routed>,
    cancel: CancellationToken,
    workers: Vec<WorkerHandle>,
}

impl WorkerPool {
    pub(crate) fn new(
        suite: SuiteRef,
        flags: SuiteFlags,
        grace: Duration,
        bus: Bus,
        out: mpsc::Sender<Routed>,
    ) -> Self {
        Self {
            suite,
            flags,
            grace,
            bus,
            out,
            cancel: CancellationToken::new(),
            workers: Vec::new(),
        }
    }

    /// Spawns worker 0 (if needed) and asks it for the unit count.
    pub(crate) async fn probe(&mut self) {
        self.ensure_worker(0);
        // A dead worker has already routed its Protocol message; a failed
        // send here needs no extra handling.
        let _ = self.workers[0].cmds.send(WorkerCmd::Probe).await;
    }

    /// Spawns the worker (if needed), stamps the dispatch, and sends the
    /// run command.
    pub(crate) async fn dispatch(&mut self, worker: usize, unit: u32) {
        self.ensure_worker(worker);
        self.workers[worker].inflight = Some((unit, Instant::now()));
        let _ = self.workers[worker].cmds.send(WorkerCmd::RunUnit { id: unit }).await;
    }

    /// Clears the worker's in-flight stamp and returns the elapsed wall
    /// time in milliseconds.
    ///
    /// Returns `None` when the worker was not running `unit` — a result for
    /// a unit that was never dispatched to it, or a second result for the
    /// same dispatch.
    pub(crate) fn take_inflight(&mut self, worker: usize, unit: u32) -> Option<f64> {
        let handle = self.workers.get_mut(worker)?;
        match handle.inflight.take() {
            Some((expected, stamped)) if expected == unit => {
                Some(stamped.elapsed().as_secs_f64() * 1_000.0)
            }
            _ => None,
        }
    }

    /// Tears down every worker, waiting up to the grace period overall.
    ///
    /// Workers that do not join in time are aborted; each abort publishes a
    /// [`EventKind::WorkerAborted`] event naming the unit lost with it.
    pub(crate) async fn shutdown(&mut self) {
        self.cancel.cancel();
        let deadline = Instant::now() + self.grace;
        for (index, mut handle) in self.workers.drain(..).enumerate() {
            // Closing the command channel wakes a worker parked on recv.
            drop(handle.cmds);
            let left = deadline.saturating_duration_since(Instant::now());
            if time::timeout(left, &mut handle.watcher).await.is_err() {
                handle.abort.abort();
                handle.watcher.abort();
                let mut ev = Event::new(EventKind::WorkerAborted).with_worker(index);
                if let Some((unit, _)) = handle.inflight {
                    ev = ev.with_unit(unit);
                }
                self.bus.publish(ev);
            }
        }
    }

    fn ensure_worker(&mut self, index: usize) {
        while self.workers.len() <= index {
            let worker = self.workers.len();
            let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CAPACITY);
            let actor = WorkerActor::new(
                worker,
                self.suite.clone(),
                self.flags,
                cmd_rx,
                self.out.clone(),
                self.cancel.child_token(),
            );
            let task = tokio::spawn(actor.run());
            let abort = task.abort_handle();
            let out = self.out.clone();
            let watcher = tokio::spawn(async move {
                if let Err(err) = task.await {
                    // Cancellation is the normal teardown path; only a
                    // panic means the session died before reporting.
                    if err.is_panic() {
                        let reason = format!(
                            "worker {worker} panicked: {}",
                            panic_message(err.into_panic())
                        );
                        let _ = out
                            .send(Routed {
                                worker,
                                msg: WorkerMsg::Protocol { reason },
                            })
                            .await;
                    }
                }
            });
            self.workers.push(WorkerHandle {
                cmds: cmd_tx,
                watcher,
                abort,
                inflight: None,
            });
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::error::SuiteError;
    use crate::suite::{Outcome, ProbeReport, Suite, SuiteSession, UnitReport};

    struct EchoSuite {
        unit_count: u32,
    }

    #[async_trait]
    impl Suite for EchoSuite {
        fn name(&self) -> &str {
            "echo"
        }

        async fn open(&self, _flags: &SuiteFlags) -> Result<Box<dyn SuiteSession>, SuiteError> {
            Ok(Box::new(EchoSession {
                unit_count: self.unit_count,
            }))
        }
    }

    struct EchoSession {
        unit_count: u32,
    }

    #[async_trait]
    impl SuiteSession for EchoSession {
        async fn probe(&mut self) -> Result<ProbeReport, SuiteError> {
            Ok(ProbeReport::new(self.unit_count))
        }

        async fn run_unit(&mut self, _id: u32) -> Result<UnitReport, SuiteError> {
            Ok(UnitReport::new(Outcome::Passed))
        }
    }

    fn pool(unit_count: u32) -> (WorkerPool, mpsc::Receiver<Routed>) {
        let (tx, rx) = mpsc::channel(16);
        let pool = WorkerPool::new(
            Arc::new(EchoSuite { unit_count }),
            SuiteFlags {
                seed: 0,
                fuzz_runs: 10,
            },
            Duration::from_secs(2),
            Bus::new(16),
            tx,
        );
        (pool, rx)
    }

    #[tokio::test]
    async fn probe_spawns_only_worker_zero() {
        let (mut pool, mut rx) = pool(4);
        pool.probe().await;
        let routed = rx.recv().await.unwrap();
        assert_eq!(routed.worker, 0);
        assert!(matches!(routed.msg, WorkerMsg::Probed { unit_count: 4, .. }));
        assert_eq!(pool.workers.len(), 1);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn dispatch_stamps_and_take_inflight_matches() {
        let (mut pool, mut rx) = pool(4);
        pool.dispatch(1, 2).await;
        assert_eq!(pool.workers.len(), 2);

        let routed = rx.recv().await.unwrap();
        assert_eq!(routed.worker, 1);
        assert!(matches!(routed.msg, WorkerMsg::Finished { id: 2, .. }));

        let elapsed = pool.take_inflight(1, 2);
        assert!(elapsed.is_some());
        assert!(elapsed.unwrap() >= 0.0);
        // Second take for the same dispatch must not match.
        assert!(pool.take_inflight(1, 2).is_none());
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn take_inflight_rejects_wrong_unit() {
        let (mut pool, mut rx) = pool(4);
        pool.dispatch(0, 3).await;
        let _ = rx.recv().await.unwrap();
        assert!(pool.take_inflight(0, 1).is_none());
        pool.shutdown().await;
    }

    struct PanickySuite;

    #[async_trait]
    impl Suite for PanickySuite {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn open(&self, _flags: &SuiteFlags) -> Result<Box<dyn SuiteSession>, SuiteError> {
            Ok(Box::new(PanickySession))
        }
    }

    struct PanickySession;

    #[async_trait]
    impl SuiteSession for PanickySession {
        async fn probe(&mut self) -> Result<ProbeReport, SuiteError> {
            Ok(ProbeReport::new(1))
        }

        async fn run_unit(&mut self, id: u32) -> Result<UnitReport, SuiteError> {
            panic!("unit {id} blew up");
        }
    }

    #[tokio::test]
    async fn worker_panic_surfaces_as_protocol_message() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut pool = WorkerPool::new(
            Arc::new(PanickySuite),
            SuiteFlags {
                seed: 0,
                fuzz_runs: 10,
            },
            Duration::from_secs(2),
            Bus::new(16),
            tx,
        );

        pool.dispatch(0, 0).await;
        let routed = rx.recv().await.unwrap();
        assert_eq!(routed.worker, 0);
        match routed.msg {
            WorkerMsg::Protocol { reason } => {
                assert!(reason.contains("panicked"), "unexpected reason: {reason}");
                assert!(reason.contains("unit 0 blew up"));
            }
            other => panic!("expected protocol message, got {other:?}"),
        }
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_joins_idle_workers() {
        let (mut pool, mut rx) = pool(2);
        pool.probe().await;
        let _ = rx.recv().await.unwrap();
        pool.shutdown().await;
        assert!(pool.workers.is_empty());
        // All senders are gone once the workers joined and the pool drops.
        drop(pool);
        assert!(rx.recv().await.is_none());
    }
}
