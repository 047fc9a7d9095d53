//! # Generation state machine.
//!
//! The dispatch and lifecycle logic lives here as a **pure transition
//! function**: [`Machine::step`] takes one [`Input`] and returns the next
//! internal state plus a list of [`Effect`]s for the supervisor to apply
//! (send a command, stop the pool, finish the report). No channels, no
//! clocks, no tasks — which is what makes the supersession and draining
//! rules testable without a live runtime.
//!
//! ## States
//! ```text
//!            RunRequested              Probed{n>0}
//!   Idle ───────────────► Probing ───────────────► Dispatching
//!    ▲                       │                          │
//!    │                       │ Probed{0}                │ queue empty &
//!    │                       ▼                          ▼ all reported
//!    └────────────────── Draining ◄─────────────────────┘
//!        WorkersStopped
//! ```
//! A `RunRequested` in any non-idle state yields [`Effect::KeepPending`]:
//! the supervisor overwrites its single pending slot, so only the most
//! recent request survives (watch-mode supersession). The slot is consumed
//! via [`Effect::TakePending`] when the active generation finishes.
//!
//! ## Rules
//! - Unit ids are dispatched in **ascending order** as workers free up.
//! - Every unit id is dispatched exactly once and must report exactly once;
//!   a duplicate or unknown id is a protocol violation.
//! - A violation aborts the generation: workers are stopped and the verdict
//!   becomes [`Verdict::Fatal`]. Violations are never silently ignored —
//!   that would hang the pool waiting for a result that will never arrive.
//!   Every violation, whether reported by a worker or detected here
//!   (duplicate result, out-of-state probe), yields
//!   [`Effect::ReportViolation`] so observers see the cause.
//! - Teardown ([`Effect::StopWorkers`]) is only emitted once per
//!   generation; a violation while already draining just hardens the
//!   verdict.

use std::collections::VecDeque;

/// Index of a worker within the pool of the active generation.
pub(crate) type WorkerId = usize;

/// Lifecycle state of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// No active generation.
    Idle,
    /// Waiting for the first worker to report the unit count.
    Probing,
    /// Units queued or in flight.
    Dispatching,
    /// All units accounted for (or aborted); tearing down workers.
    Draining,
}

/// One event consumed by the state machine.
#[derive(Debug)]
pub(crate) enum Input {
    /// A generation-start request arrived.
    RunRequested,
    /// The probe reported how many units the suite contains.
    Probed { unit_count: u32 },
    /// A worker reported a unit result (payload stays with the supervisor).
    UnitCompleted { worker: WorkerId, unit: u32 },
    /// A worker sent a malformed or unexpected message, or crashed.
    Violation {
        worker: Option<WorkerId>,
        reason: String,
    },
    /// Every worker of the generation confirmed termination.
    WorkersStopped,
}

/// One instruction for the supervisor to carry out.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Effect {
    /// Spawn the first worker and ask it for the unit count.
    StartProbe,
    /// Store the request in the single pending slot, displacing any
    /// previous occupant.
    KeepPending,
    /// Reset the renderer for `unit_count` units (also for zero).
    RestartReport { unit_count: u32 },
    /// Ensure `worker` exists and send it `unit`.
    Dispatch { worker: WorkerId, unit: u32 },
    /// Forward the unit result currently in hand to the result sink.
    RelayResult,
    /// Announce a protocol violation to observers. The fatal reason itself
    /// is already recorded for the verdict.
    ReportViolation {
        worker: Option<WorkerId>,
        reason: String,
    },
    /// Tear down every worker, then feed back [`Input::WorkersStopped`].
    StopWorkers,
    /// Finish the renderer and publish the generation verdict.
    FinishReport { verdict: Verdict },
    /// If the pending slot is occupied, consume it and feed back
    /// [`Input::RunRequested`] for it.
    TakePending,
}

/// How the generation's exit status is determined.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Verdict {
    /// Normal completion: the renderer's aggregate decides
    /// success/failures.
    Aggregate,
    /// The probe found zero units.
    NoUnits,
    /// The generation aborted on a protocol violation.
    Fatal(String),
}

/// Pure state machine for one supervisor.
///
/// Exclusively owns the unit queue, the done-flags, and the outstanding
/// counter; nothing else in the runtime mutates them.
pub(crate) struct Machine {
    max_workers: usize,
    state: State,
    unit_count: u32,
    queue: VecDeque<u32>,
    done: Vec<bool>,
    /// Units not yet reported (dispatched or still queued).
    outstanding: u32,
    fatal: Option<String>,
}

impl Machine {
    /// Creates an idle machine. `max_workers` must already be validated.
    pub(crate) fn new(max_workers: usize) -> Self {
        Self {
            max_workers,
            state: State::Idle,
            unit_count: 0,
            queue: VecDeque::new(),
            done: Vec::new(),
            outstanding: 0,
            fatal: None,
        }
    }

    /// True when no generation is active.
    pub(crate) fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Number of workers the active generation runs with.
    pub(crate) fn worker_count(&self) -> usize {
        self.max_workers.min(self.unit_count as usize)
    }

    /// Consumes one input and returns the effects to apply, in order.
    pub(crate) fn step(&mut self, input: Input) -> Vec<Effect> {
        match (self.state, input) {
            (State::Idle, Input::RunRequested) => {
                self.reset_generation();
                self.state = State::Probing;
                vec![Effect::StartProbe]
            }
            (_, Input::RunRequested) => vec![Effect::KeepPending],

            (State::Probing, Input::Probed { unit_count }) => self.on_probed(unit_count),
            (State::Probing, Input::UnitCompleted { worker, unit }) => self.abort(
                Some(worker),
                format!("unit result {unit} received before the probe"),
            ),

            (State::Dispatching, Input::UnitCompleted { worker, unit }) => {
                self.on_unit_completed(worker, unit)
            }
            (State::Dispatching, Input::Probed { unit_count }) => {
                self.abort(None, format!("unexpected probe response ({unit_count} units)"))
            }

            (State::Draining, Input::WorkersStopped) => self.on_workers_stopped(),
            (State::Draining, Input::Violation { worker, reason }) => {
                // Teardown is already in progress; remember the failure so
                // the verdict comes out fatal, but do not tear down twice.
                if self.fatal.is_none() {
                    self.fatal = Some(reason.clone());
                }
                vec![Effect::ReportViolation { worker, reason }]
            }
            // A result already queued when the abort decision was made.
            (State::Draining, _) => vec![],

            (State::Probing | State::Dispatching, Input::Violation { worker, reason }) => {
                self.abort(worker, reason)
            }
            // Teardown confirmations only exist once draining has begun.
            (State::Probing | State::Dispatching, Input::WorkersStopped) => vec![],

            // Stray worker messages after teardown carry no meaning.
            (State::Idle, _) => vec![],
        }
    }

    fn on_probed(&mut self, unit_count: u32) -> Vec<Effect> {
        self.unit_count = unit_count;
        if unit_count == 0 {
            self.state = State::Draining;
            return vec![
                Effect::RestartReport { unit_count: 0 },
                Effect::StopWorkers,
            ];
        }

        self.queue = (0..unit_count).collect();
        self.done = vec![false; unit_count as usize];
        self.outstanding = unit_count;
        self.state = State::Dispatching;

        let mut effects = vec![Effect::RestartReport { unit_count }];
        for worker in 0..self.worker_count() {
            if let Some(unit) = self.queue.pop_front() {
                effects.push(Effect::Dispatch { worker, unit });
            }
        }
        effects
    }

    fn on_unit_completed(&mut self, worker: WorkerId, unit: u32) -> Vec<Effect> {
        if unit >= self.unit_count {
            return self.abort(Some(worker), format!("result for unknown unit {unit}"));
        }
        if self.done[unit as usize] {
            return self.abort(Some(worker), format!("duplicate result for unit {unit}"));
        }
        self.done[unit as usize] = true;
        self.outstanding -= 1;

        let mut effects = vec![Effect::RelayResult];
        if let Some(next) = self.queue.pop_front() {
            effects.push(Effect::Dispatch { worker, unit: next });
        } else if self.outstanding == 0 {
            self.state = State::Draining;
            effects.push(Effect::StopWorkers);
        }
        effects
    }

    fn on_workers_stopped(&mut self) -> Vec<Effect> {
        self.state = State::Idle;
        let verdict = match self.fatal.take() {
            Some(reason) => Verdict::Fatal(reason),
            None if self.unit_count == 0 => Verdict::NoUnits,
            None => Verdict::Aggregate,
        };
        vec![Effect::FinishReport { verdict }, Effect::TakePending]
    }

    fn abort(&mut self, worker: Option<WorkerId>, reason: String) -> Vec<Effect> {
        self.fatal = Some(reason.clone());
        self.state = State::Draining;
        vec![Effect::ReportViolation { worker, reason }, Effect::StopWorkers]
    }

    fn reset_generation(&mut self) {
        self.unit_count = 0;
        self.queue.clear();
        self.done.clear();
        self.outstanding = 0;
        self.fatal = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probed(machine: &mut Machine, unit_count: u32) -> Vec<Effect> {
        assert_eq!(machine.step(Input::RunRequested), vec![Effect::StartProbe]);
        machine.step(Input::Probed { unit_count })
    }

    fn dispatches(effects: &[Effect]) -> Vec<(WorkerId, u32)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Dispatch { worker, unit } => Some((*worker, *unit)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn five_units_two_workers_first_assignments() {
        let mut machine = Machine::new(2);
        let effects = probed(&mut machine, 5);
        assert_eq!(effects[0], Effect::RestartReport { unit_count: 5 });
        // Exactly two workers, ids 0 then 1, in that order.
        assert_eq!(dispatches(&effects), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn pool_never_exceeds_unit_count() {
        let mut machine = Machine::new(8);
        let effects = probed(&mut machine, 3);
        assert_eq!(dispatches(&effects), vec![(0, 0), (1, 1), (2, 2)]);
        assert_eq!(machine.worker_count(), 3);
    }

    #[test]
    fn subsequent_units_go_out_ascending_regardless_of_finish_order() {
        let mut machine = Machine::new(2);
        probed(&mut machine, 5);

        // Worker 1 finishes before worker 0: it still gets the next id, 2.
        let effects = machine.step(Input::UnitCompleted { worker: 1, unit: 1 });
        assert_eq!(effects, vec![
            Effect::RelayResult,
            Effect::Dispatch { worker: 1, unit: 2 },
        ]);
        let effects = machine.step(Input::UnitCompleted { worker: 0, unit: 0 });
        assert_eq!(effects, vec![
            Effect::RelayResult,
            Effect::Dispatch { worker: 0, unit: 3 },
        ]);
        let effects = machine.step(Input::UnitCompleted { worker: 1, unit: 2 });
        assert_eq!(effects, vec![
            Effect::RelayResult,
            Effect::Dispatch { worker: 1, unit: 4 },
        ]);
    }

    #[test]
    fn every_unit_dispatched_exactly_once() {
        let mut machine = Machine::new(3);
        let mut sent = dispatches(&probed(&mut machine, 10));
        let mut cursor = 0;
        while cursor < sent.len() {
            let (worker, unit) = sent[cursor];
            cursor += 1;
            let effects = machine.step(Input::UnitCompleted { worker, unit });
            sent.extend(dispatches(&effects));
        }
        let mut units: Vec<u32> = sent.iter().map(|(_, u)| *u).collect();
        units.sort_unstable();
        assert_eq!(units, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn generation_drains_once_all_units_report() {
        let mut machine = Machine::new(2);
        probed(&mut machine, 2);
        machine.step(Input::UnitCompleted { worker: 0, unit: 0 });
        let effects = machine.step(Input::UnitCompleted { worker: 1, unit: 1 });
        assert_eq!(effects, vec![Effect::RelayResult, Effect::StopWorkers]);
        assert!(!machine.is_idle());

        let effects = machine.step(Input::WorkersStopped);
        assert_eq!(effects, vec![
            Effect::FinishReport {
                verdict: Verdict::Aggregate,
            },
            Effect::TakePending,
        ]);
        assert!(machine.is_idle());
    }

    #[test]
    fn zero_units_skips_dispatch_entirely() {
        let mut machine = Machine::new(4);
        let effects = probed(&mut machine, 0);
        assert_eq!(effects, vec![
            Effect::RestartReport { unit_count: 0 },
            Effect::StopWorkers,
        ]);
        assert_eq!(machine.worker_count(), 0);

        let effects = machine.step(Input::WorkersStopped);
        assert_eq!(effects, vec![
            Effect::FinishReport {
                verdict: Verdict::NoUnits,
            },
            Effect::TakePending,
        ]);
    }

    #[test]
    fn requests_while_busy_keep_pending() {
        let mut machine = Machine::new(2);
        probed(&mut machine, 5);
        for _ in 0..3 {
            assert_eq!(machine.step(Input::RunRequested), vec![Effect::KeepPending]);
        }
        // Still dispatching the original generation.
        assert!(!machine.is_idle());
    }

    #[test]
    fn request_during_draining_also_keeps_pending() {
        let mut machine = Machine::new(1);
        probed(&mut machine, 1);
        machine.step(Input::UnitCompleted { worker: 0, unit: 0 });
        assert_eq!(machine.step(Input::RunRequested), vec![Effect::KeepPending]);
    }

    #[test]
    fn duplicate_result_aborts() {
        let mut machine = Machine::new(2);
        probed(&mut machine, 3);
        machine.step(Input::UnitCompleted { worker: 0, unit: 0 });
        let effects = machine.step(Input::UnitCompleted { worker: 1, unit: 0 });
        assert!(matches!(
            &effects[0],
            Effect::ReportViolation { worker: Some(1), reason } if reason.contains("duplicate")
        ));
        assert_eq!(effects[1], Effect::StopWorkers);

        let effects = machine.step(Input::WorkersStopped);
        match &effects[0] {
            Effect::FinishReport {
                verdict: Verdict::Fatal(reason),
            } => assert!(reason.contains("duplicate")),
            other => panic!("expected fatal verdict, got {other:?}"),
        }
    }

    #[test]
    fn unknown_unit_aborts() {
        let mut machine = Machine::new(2);
        probed(&mut machine, 3);
        let effects = machine.step(Input::UnitCompleted { worker: 0, unit: 99 });
        assert!(matches!(&effects[0], Effect::ReportViolation { .. }));
        assert_eq!(effects[1], Effect::StopWorkers);
    }

    #[test]
    fn second_probe_response_aborts() {
        let mut machine = Machine::new(2);
        probed(&mut machine, 3);
        let effects = machine.step(Input::Probed { unit_count: 7 });
        assert!(matches!(
            &effects[0],
            Effect::ReportViolation { worker: None, reason } if reason.contains("probe")
        ));
        assert_eq!(effects[1], Effect::StopWorkers);
    }

    #[test]
    fn violation_aborts_without_further_dispatch() {
        let mut machine = Machine::new(2);
        probed(&mut machine, 5);
        let effects = machine.step(Input::Violation {
            worker: Some(0),
            reason: "unrecognized message".into(),
        });
        assert!(matches!(&effects[0], Effect::ReportViolation { .. }));
        assert_eq!(effects[1], Effect::StopWorkers);

        // Results that were already in flight no longer produce dispatches.
        let effects = machine.step(Input::UnitCompleted { worker: 0, unit: 0 });
        assert!(dispatches(&effects).is_empty());
    }

    #[test]
    fn violation_while_draining_hardens_the_verdict() {
        let mut machine = Machine::new(1);
        probed(&mut machine, 1);
        machine.step(Input::UnitCompleted { worker: 0, unit: 0 });
        let effects = machine.step(Input::Violation {
            worker: Some(0),
            reason: "worker crashed during teardown".into(),
        });
        // Reported but no second teardown.
        assert!(matches!(&effects[0], Effect::ReportViolation { .. }));
        assert_eq!(effects.len(), 1);

        let effects = machine.step(Input::WorkersStopped);
        assert!(matches!(
            &effects[0],
            Effect::FinishReport {
                verdict: Verdict::Fatal(_),
            }
        ));
    }

    #[test]
    fn stray_messages_when_idle_are_ignored() {
        let mut machine = Machine::new(2);
        assert_eq!(machine.step(Input::Probed { unit_count: 4 }), vec![]);
        assert_eq!(
            machine.step(Input::UnitCompleted { worker: 0, unit: 0 }),
            vec![]
        );
        assert!(machine.is_idle());
    }

    #[test]
    fn next_generation_starts_clean_after_abort() {
        let mut machine = Machine::new(2);
        probed(&mut machine, 3);
        machine.step(Input::Violation {
            worker: None,
            reason: "boom".into(),
        });
        machine.step(Input::WorkersStopped);
        assert!(machine.is_idle());

        // The fatal flag must not leak into the next generation.
        let effects = probed(&mut machine, 1);
        assert_eq!(dispatches(&effects), vec![(0, 0)]);
        machine.step(Input::UnitCompleted { worker: 0, unit: 0 });
        let effects = machine.step(Input::WorkersStopped);
        assert_eq!(effects[0], Effect::FinishReport {
            verdict: Verdict::Aggregate,
        });
    }
}
