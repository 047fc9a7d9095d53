//! # Worker actor: one suite session, commands executed one at a time.
//!
//! Each worker owns its own [`SuiteSession`](crate::SuiteSession), opened
//! from the shared suite when the actor starts. Commands arrive over a
//! per-worker channel and are served strictly sequentially, so a session
//! never sees two concurrent calls.
//!
//! ## Message flow
//! ```text
//! Pool ── WorkerCmd::Probe ───────► actor ── session.probe()    ──► Routed{Probed}
//! Pool ── WorkerCmd::RunUnit{id} ─► actor ── session.run_unit() ──► Routed{Finished}
//!
//! session error at any point        actor ─────────────────────► Routed{Protocol}, exit
//! ```
//!
//! ## Rules
//! - A session failure is terminal for the worker: it reports `Protocol`
//!   and exits. The supervisor aborts the generation; there are no retries.
//! - The cancel token and a closed command channel both end the actor
//!   between commands. A run already in progress is not interrupted here;
//!   the pool's grace timeout covers sessions that refuse to finish.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::SuiteFlags;
use crate::suite::{Outcome, SuiteRef};

/// Command sent from the pool to one worker.
#[derive(Debug)]
pub(crate) enum WorkerCmd {
    /// Ask the session how many units the suite contains.
    Probe,
    /// Run one unit and report its outcome.
    RunUnit { id: u32 },
}

/// What a worker reports back to the supervisor.
#[derive(Debug)]
pub(crate) enum WorkerMsg {
    /// The session counted the suite's units.
    Probed { unit_count: u32, logs: Vec<String> },
    /// The session finished running one unit.
    Finished {
        id: u32,
        outcome: Outcome,
        logs: Vec<String>,
    },
    /// The session failed; the worker is done.
    Protocol { reason: String },
}

/// Worker message tagged with the sender's pool index.
#[derive(Debug)]
pub(crate) struct Routed {
    pub(crate) worker: usize,
    pub(crate) msg: WorkerMsg,
}

/// Actor driving one suite session.
pub(crate) struct WorkerActor {
    index: usize,
    suite: SuiteRef,
    flags: SuiteFlags,
    cmds: mpsc::Receiver<WorkerCmd>,
    out: mpsc::Sender<Routed>,
    cancel: CancellationToken,
}

impl WorkerActor {
    pub(crate) fn new(
        index: usize,
        suite: SuiteRef,
        flags: SuiteFlags,
        cmds: mpsc::Receiver<WorkerCmd>,
        out: mpsc::Sender<Routed>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            index,
            suite,
            flags,
            cmds,
            out,
            cancel,
        }
    }

    /// Opens the session and serves commands until cancelled, until the
    /// command channel closes, or until the session fails.
    pub(crate) async fn run(mut self) {
        let mut session = match self.suite.open(&self.flags).await {
            Ok(session) => session,
            Err(err) => {
                self.report(WorkerMsg::Protocol {
                    reason: err.to_string(),
                })
                .await;
                return;
            }
        };

        loop {
            let cmd = tokio::select! {
                _ = self.cancel.cancelled() => break,
                cmd = self.cmds.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => break,
                },
            };

            match cmd {
                WorkerCmd::Probe => match session.probe().await {
                    Ok(report) => {
                        self.report(WorkerMsg::Probed {
                            unit_count: report.unit_count,
                            logs: report.logs,
                        })
                        .await;
                    }
                    Err(err) => {
                        self.report(WorkerMsg::Protocol {
                            reason: format!("probe: {err}"),
                        })
                        .await;
                        break;
                    }
                },
                WorkerCmd::RunUnit { id } => match session.run_unit(id).await {
                    Ok(report) => {
                        self.report(WorkerMsg::Finished {
                            id,
                            outcome: report.outcome,
                            logs: report.logs,
                        })
                        .await;
                    }
                    Err(err) => {
                        self.report(WorkerMsg::Protocol {
                            reason: format!("unit {id}: {err}"),
                        })
                        .await;
                        break;
                    }
                },
            }
        }
    }

    async fn report(&self, msg: WorkerMsg) {
        let _ = self
            .out
            .send(Routed {
                worker: self.index,
                msg,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::error::SuiteError;
    use crate::suite::{ProbeReport, Suite, SuiteSession, UnitReport};

    struct StaticSuite {
        unit_count: u32,
        fail_open: bool,
    }

    #[async_trait]
    impl Suite for StaticSuite {
        fn name(&self) -> &str {
            "static"
        }

        async fn open(&self, _flags: &SuiteFlags) -> Result<Box<dyn SuiteSession>, SuiteError> {
            if self.fail_open {
                return Err(SuiteError::Open {
                    reason: "artifact missing".into(),
                });
            }
            Ok(Box::new(StaticSession {
                unit_count: self.unit_count,
            }))
        }
    }

    struct StaticSession {
        unit_count: u32,
    }

    #[async_trait]
    impl SuiteSession for StaticSession {
        async fn probe(&mut self) -> Result<ProbeReport, SuiteError> {
            Ok(ProbeReport::new(self.unit_count).with_logs(vec!["warming up".into()]))
        }

        async fn run_unit(&mut self, id: u32) -> Result<UnitReport, SuiteError> {
            if id >= self.unit_count {
                return Err(SuiteError::Execution {
                    reason: format!("no unit {id}"),
                });
            }
            Ok(UnitReport::new(Outcome::Passed))
        }
    }

    fn spawn_worker(
        suite: StaticSuite,
    ) -> (mpsc::Sender<WorkerCmd>, mpsc::Receiver<Routed>, CancellationToken) {
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let (out_tx, out_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let actor = WorkerActor::new(
            3,
            Arc::new(suite),
            SuiteFlags {
                seed: 0,
                fuzz_runs: 10,
            },
            cmd_rx,
            out_tx,
            cancel.clone(),
        );
        tokio::spawn(actor.run());
        (cmd_tx, out_rx, cancel)
    }

    #[tokio::test]
    async fn probe_then_run_round_trip() {
        let (cmds, mut out, _cancel) = spawn_worker(StaticSuite {
            unit_count: 2,
            fail_open: false,
        });

        cmds.send(WorkerCmd::Probe).await.unwrap();
        let routed = out.recv().await.unwrap();
        assert_eq!(routed.worker, 3);
        match routed.msg {
            WorkerMsg::Probed { unit_count, logs } => {
                assert_eq!(unit_count, 2);
                assert_eq!(logs, vec!["warming up".to_string()]);
            }
            other => panic!("expected probe response, got {other:?}"),
        }

        cmds.send(WorkerCmd::RunUnit { id: 1 }).await.unwrap();
        match out.recv().await.unwrap().msg {
            WorkerMsg::Finished { id, outcome, .. } => {
                assert_eq!(id, 1);
                assert_eq!(outcome, Outcome::Passed);
            }
            other => panic!("expected finished, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn open_failure_reports_protocol_and_exits() {
        let (_cmds, mut out, _cancel) = spawn_worker(StaticSuite {
            unit_count: 0,
            fail_open: true,
        });

        match out.recv().await.unwrap().msg {
            WorkerMsg::Protocol { reason } => assert!(reason.contains("artifact missing")),
            other => panic!("expected protocol message, got {other:?}"),
        }
        // The actor dropped its sender; the channel must now be closed.
        assert!(out.recv().await.is_none());
    }

    #[tokio::test]
    async fn session_failure_is_terminal() {
        let (cmds, mut out, _cancel) = spawn_worker(StaticSuite {
            unit_count: 1,
            fail_open: false,
        });

        cmds.send(WorkerCmd::RunUnit { id: 9 }).await.unwrap();
        match out.recv().await.unwrap().msg {
            WorkerMsg::Protocol { reason } => assert!(reason.contains("unit 9")),
            other => panic!("expected protocol message, got {other:?}"),
        }
        assert!(out.recv().await.is_none());
    }

    #[tokio::test]
    async fn cancel_stops_idle_worker() {
        let (_cmds, mut out, cancel) = spawn_worker(StaticSuite {
            unit_count: 1,
            fail_open: false,
        });
        cancel.cancel();
        assert!(out.recv().await.is_none());
    }
}
