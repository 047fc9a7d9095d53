//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for the supervisor runtime,
//! and [`SuiteFlags`], the opaque values forwarded to every suite session.
//!
//! Config is validated once, when the supervisor is created; invalid values
//! are rejected with [`ConfigError`] rather than clamped silently.

use std::time::Duration;

use crate::error::ConfigError;

/// Global configuration for the supervisor runtime.
///
/// Defines:
/// - **Pool sizing**: upper bound on concurrent execution workers
/// - **Suite flags**: seed and fuzz-run count forwarded opaquely to suites
/// - **Teardown behavior**: grace period when stopping workers
/// - **Event system**: bus capacity for observability event delivery
///
/// ## Field semantics
/// - `max_workers`: hard cap; the pool for a generation is sized to
///   `min(max_workers, unit_count)`
/// - `grace`: maximum wait for workers to stop during teardown before their
///   tasks are aborted
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by `Bus`)
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of execution workers per generation.
    ///
    /// Must be at least 1. The actual pool size for a generation is
    /// `min(max_workers, unit_count)`, so a tiny suite never over-allocates
    /// workers.
    pub max_workers: usize,

    /// Initial random seed, forwarded opaquely to every suite session.
    ///
    /// The core never interprets this value.
    pub seed: u64,

    /// Number of fuzz iterations, forwarded opaquely to every suite session.
    ///
    /// The core never interprets this value.
    pub fuzz_runs: u32,

    /// Maximum time to wait for workers to stop during teardown.
    ///
    /// Teardown only begins once every dispatched unit has reported back, so
    /// workers are normally idle and join promptly. If a worker still does
    /// not stop within `grace`, its task is aborted and a
    /// [`EventKind::WorkerAborted`](crate::EventKind::WorkerAborted) event
    /// is published.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// will observe `Lagged` and skip older items. Minimum value is 1
    /// (enforced by the bus).
    pub bus_capacity: usize,
}

impl Config {
    /// Checks the configuration for values the runtime refuses to run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    /// Returns the flags forwarded to every suite session.
    #[inline]
    pub fn suite_flags(&self) -> SuiteFlags {
        SuiteFlags {
            seed: self.seed,
            fuzz_runs: self.fuzz_runs,
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_workers = num_cpus::get()` (one worker per logical core)
    /// - `seed = 0` (callers wanting reproducible fuzzing supply their own)
    /// - `fuzz_runs = 100`
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get().max(1),
            seed: 0,
            fuzz_runs: 100,
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}

/// Opaque per-session values handed to [`Suite::open`](crate::Suite::open).
///
/// Mirrors what the suite artifact needs at instantiation time; the
/// supervisor forwards these without interpreting them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuiteFlags {
    /// Initial random seed for the suite's fuzzers.
    pub seed: u64,
    /// Number of fuzz iterations per fuzz test.
    pub fuzz_runs: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_workers_is_rejected() {
        let cfg = Config {
            max_workers: 0,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroWorkers));
    }

    #[test]
    fn suite_flags_carry_seed_and_fuzz() {
        let cfg = Config {
            seed: 42,
            fuzz_runs: 7,
            ..Config::default()
        };
        let flags = cfg.suite_flags();
        assert_eq!(flags.seed, 42);
        assert_eq!(flags.fuzz_runs, 7);
    }
}
