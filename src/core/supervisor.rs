//! # Supervisor: single event loop orchestrating generations.
//!
//! The [`Supervisor`] owns the event bus, the result sink, and the pure
//! generation [`Machine`]. It runs one `select!` loop over two sources —
//! generation-start requests and worker messages — translates each into a
//! machine input, and applies the returned effects (spawn the pool, dispatch
//! a unit, stop workers, finish the report).
//!
//! ## High-level architecture
//! ```text
//! requests (mpsc)  ──►  ┌────────────┐   effects   ┌──────────────────┐
//!                       │  select!   │ ──────────► │ WorkerPool       │
//! worker msgs     ──►   │  + Machine │             │   dispatch/stop  │
//! (Routed, mpsc)        └────────────┘ ──────────► │ ResultSink       │
//!                             │                    │   restart/ingest │
//!                             ▼                    └──────────────────┘
//!                       Bus.publish(Event) ──► subscriber listeners
//! ```
//!
//! ## Rules
//! - **Single writer**: all machine steps, sink calls, and pool commands run
//!   on this one loop; nothing in the runtime takes a lock.
//! - **Supersession**: while a generation is active only the most recent
//!   request is retained; each displaced request publishes
//!   [`EventKind::RunSuperseded`]. The retained request starts the moment
//!   the active generation finishes.
//! - **No torn generations**: a request never interrupts in-flight units;
//!   teardown waits for every dispatched unit to report (or for an abort).
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use testvisor::{
//!     Config, ConsoleReport, Outcome, ProbeReport, Suite, SuiteError, SuiteFlags,
//!     SuiteSession, Supervisor, UnitReport,
//! };
//!
//! struct MySuite;
//!
//! #[async_trait]
//! impl Suite for MySuite {
//!     fn name(&self) -> &str {
//!         "my-suite"
//!     }
//!
//!     async fn open(&self, _flags: &SuiteFlags) -> Result<Box<dyn SuiteSession>, SuiteError> {
//!         Ok(Box::new(MySession))
//!     }
//! }
//!
//! struct MySession;
//!
//! #[async_trait]
//! impl SuiteSession for MySession {
//!     async fn probe(&mut self) -> Result<ProbeReport, SuiteError> {
//!         Ok(ProbeReport::new(2))
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
//!     let status = sup.run_suite(Arc::new(MySuite)).await?;
//!     std::process::exit(status.code());
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::Config;
use crate::core::machine::{Effect, Input, Machine};
use crate::core::pool::WorkerPool;
use crate::core::sink::ResultSink;
use crate::core::worker::{Routed, WorkerMsg};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::report::{ExitStatus, Report};
use crate::subscribers::Subscribe;
use crate::suite::{SuiteRef, UnitResult};

/// Everything tied to the currently active generation.
struct Active {
    suite: SuiteRef,
    pool: WorkerPool,
    /// Probe-time logs, flushed to the renderer right after its restart.
    preamble: Vec<String>,
}

/// Coordinates generations: probe, dispatch, aggregation, and teardown.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    listeners_started: bool,
    sink: ResultSink,
    machine: Machine,
    active: Option<Active>,
    /// Single supersession slot; only the most recent displaced request
    /// survives.
    pending: Option<SuiteRef>,
    /// Suite carried by the request currently being fed to the machine.
    incoming: Option<SuiteRef>,
    /// Result carried by the worker message currently being fed.
    relay: Option<UnitResult>,
    last: Option<ExitStatus>,
}

impl Supervisor {
    /// Creates a supervisor with the given configuration and renderer.
    ///
    /// Fails fast on invalid configuration rather than clamping values.
    pub fn new(cfg: Config, report: Box<dyn Report>) -> Result<Self, RuntimeError> {
        cfg.validate()?;
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let machine = Machine::new(cfg.max_workers);
        Ok(Self {
            cfg,
            bus,
            subscribers: Vec::new(),
            listeners_started: false,
            sink: ResultSink::new(report),
            machine,
            active: None,
            pending: None,
            incoming: None,
            relay: None,
            last: None,
        })
    }

    /// Registers an event subscriber.
    ///
    /// Must be called before the first [`run`](Supervisor::run) /
    /// [`run_suite`](Supervisor::run_suite); listener tasks are spawned once,
    /// on the first run.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Returns the event bus, e.g. to attach ad-hoc receivers in tests.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs exactly one generation of `suite` and returns its status.
    pub async fn run_suite(&mut self, suite: SuiteRef) -> Result<ExitStatus, RuntimeError> {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(suite).await;
        drop(tx);
        self.run(rx).await
    }

    /// Serves generation-start requests until the channel closes (watch
    /// mode).
    ///
    /// Requests arriving while a generation is active go through the
    /// supersession slot: only the most recent one runs next. When the
    /// channel closes, the active generation (and one retained pending
    /// request, if any) still runs to completion; the status of the last
    /// completed generation is returned.
    ///
    /// Returns [`RuntimeError::ChannelClosed`] if the channel closed before
    /// any generation ran.
    pub async fn run(
        &mut self,
        mut requests: mpsc::Receiver<SuiteRef>,
    ) -> Result<ExitStatus, RuntimeError> {
        if !self.listeners_started {
            self.spawn_listeners();
            self.listeners_started = true;
        }

        let mut worker_rx: Option<mpsc::Receiver<Routed>> = None;
        let mut requests_open = true;

        while requests_open || !self.machine.is_idle() || self.pending.is_some() {
            tokio::select! {
                req = requests.recv(), if requests_open => match req {
                    Some(suite) => {
                        self.bus.publish(
                            Event::new(EventKind::RunRequested).with_suite(suite.name()),
                        );
                        self.incoming = Some(suite);
                        self.feed(Input::RunRequested, &mut worker_rx).await;
                    }
                    None => requests_open = false,
                },
                routed = recv_routed(&mut worker_rx) => match routed {
                    Some(routed) => {
                        if let Some(input) = self.translate(routed) {
                            self.feed(input, &mut worker_rx).await;
                        }
                    }
                    None => {
                        // Every worker exited without the generation
                        // reaching a verdict.
                        worker_rx = None;
                        let input = Input::Violation {
                            worker: None,
                            reason: "all workers exited unexpectedly".to_string(),
                        };
                        self.feed(input, &mut worker_rx).await;
                    }
                },
            }
        }

        self.last.take().ok_or(RuntimeError::ChannelClosed)
    }

    /// Turns one worker message into a machine input, publishing the
    /// matching event and stashing any payload for the effects to pick up.
    ///
    /// Violations are not published here: the machine decides whether a
    /// message constitutes an abort, and announces every abort cause via
    /// [`Effect::ReportViolation`] — including the ones only it can detect.
    fn translate(&mut self, routed: Routed) -> Option<Input> {
        let Routed { worker, msg } = routed;
        match msg {
            WorkerMsg::Probed { unit_count, logs } => {
                let active = self.active.as_mut()?;
                active.preamble = logs;
                Some(Input::Probed { unit_count })
            }
            WorkerMsg::Finished { id, outcome, logs } => {
                let active = self.active.as_mut()?;
                match active.pool.take_inflight(worker, id) {
                    Some(duration_ms) => {
                        self.bus.publish(
                            Event::new(EventKind::UnitCompleted)
                                .with_worker(worker)
                                .with_unit(id)
                                .with_duration_ms(duration_ms),
                        );
                        self.relay = Some(UnitResult {
                            unit: id,
                            outcome,
                            duration_ms,
                            logs,
                        });
                        Some(Input::UnitCompleted { worker, unit: id })
                    }
                    None => Some(Input::Violation {
                        worker: Some(worker),
                        reason: format!("worker {worker} reported unit {id} it was not running"),
                    }),
                }
            }
            WorkerMsg::Protocol { reason } => Some(Input::Violation {
                worker: Some(worker),
                reason,
            }),
        }
    }

    /// Feeds one input through the machine and applies its effects; effects
    /// may queue further inputs (teardown confirmation, retained request),
    /// which are processed before returning to the select loop.
    async fn feed(&mut self, input: Input, rx_slot: &mut Option<mpsc::Receiver<Routed>>) {
        let mut inputs = VecDeque::from([input]);
        while let Some(input) = inputs.pop_front() {
            for effect in self.machine.step(input) {
                self.apply(effect, rx_slot, &mut inputs).await;
            }
        }
    }

    async fn apply(
        &mut self,
        effect: Effect,
        rx_slot: &mut Option<mpsc::Receiver<Routed>>,
        inputs: &mut VecDeque<Input>,
    ) {
        match effect {
            Effect::StartProbe => {
                if let Some(suite) = self.incoming.take() {
                    let (tx, rx) = mpsc::channel(self.cfg.max_workers.max(1) * 2);
                    let mut pool = WorkerPool::new(
                        suite.clone(),
                        self.cfg.suite_flags(),
                        self.cfg.grace,
                        self.bus.clone(),
                        tx,
                    );
                    self.bus
                        .publish(Event::new(EventKind::ProbeStarted).with_suite(suite.name()));
                    pool.probe().await;
                    *rx_slot = Some(rx);
                    self.active = Some(Active {
                        suite,
                        pool,
                        preamble: Vec::new(),
                    });
                }
            }
            Effect::KeepPending => {
                if let Some(suite) = self.incoming.take() {
                    let mut ev = Event::new(EventKind::RunSuperseded).with_suite(suite.name());
                    if let Some(displaced) = self.pending.replace(suite) {
                        ev = ev.with_reason(displaced.name());
                    }
                    self.bus.publish(ev);
                }
            }
            Effect::RestartReport { unit_count } => {
                // Only reached for a probe the machine accepted, so this is
                // the place to announce the sized generation.
                if let Some(active) = self.active.as_ref() {
                    self.bus.publish(
                        Event::new(EventKind::SuiteProbed)
                            .with_suite(active.suite.name())
                            .with_unit_count(unit_count),
                    );
                }
                self.sink.restart(unit_count).await;
                if let Some(active) = self.active.as_mut() {
                    let preamble = std::mem::take(&mut active.preamble);
                    self.sink.diagnostic(&preamble).await;
                }
            }
            Effect::Dispatch { worker, unit } => {
                if let Some(active) = self.active.as_mut() {
                    active.pool.dispatch(worker, unit).await;
                    self.bus.publish(
                        Event::new(EventKind::UnitDispatched)
                            .with_worker(worker)
                            .with_unit(unit),
                    );
                }
            }
            Effect::RelayResult => {
                if let Some(result) = self.relay.take() {
                    self.sink.ingest(&result).await;
                }
            }
            Effect::ReportViolation { worker, reason } => {
                let mut ev = Event::new(EventKind::ProtocolViolated).with_reason(reason);
                if let Some(worker) = worker {
                    ev = ev.with_worker(worker);
                }
                self.bus.publish(ev);
            }
            Effect::StopWorkers => {
                self.bus.publish(Event::new(EventKind::WorkersStopping));
                if let Some(active) = self.active.as_mut() {
                    active.pool.shutdown().await;
                }
                self.bus.publish(Event::new(EventKind::WorkersStopped));
                inputs.push_back(Input::WorkersStopped);
            }
            Effect::FinishReport { verdict } => {
                let status = self.sink.finish(verdict).await;
                let mut ev = Event::new(EventKind::RunFinished).with_status(status);
                if let Some(active) = self.active.take() {
                    ev = ev.with_suite(active.suite.name());
                }
                *rx_slot = None;
                self.bus.publish(ev);
                self.last = Some(status);
            }
            Effect::TakePending => {
                if let Some(suite) = self.pending.take() {
                    self.bus
                        .publish(Event::new(EventKind::RunRequested).with_suite(suite.name()));
                    self.incoming = Some(suite);
                    inputs.push_back(Input::RunRequested);
                }
            }
        }
    }

    /// One detached listener task per subscriber; each gets its own bus
    /// receiver, so a slow subscriber lags only itself. Listeners exit when
    /// the bus sender side is dropped with the supervisor.
    fn spawn_listeners(&self) {
        for subscriber in self.subscribers.iter().cloned() {
            let mut rx = self.bus.subscribe();
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(ev) => subscriber.on_event(&ev).await,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
        }
    }
}

async fn recv_routed(rx: &mut Option<mpsc::Receiver<Routed>>) -> Option<Routed> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
