//! # Core runtime: generation machine, worker pool, result sink, supervisor.
//!
//! The split keeps the tricky parts testable in isolation:
//! - [`machine`] — pure generation state machine (no I/O, no clocks)
//! - [`worker`] — worker actor owning one suite session
//! - [`pool`] — spawns workers, stamps dispatch times, tears down with grace
//! - [`sink`] — drives the report renderer and maps verdicts to exit statuses
//! - [`supervisor`] — the single event loop wiring all of the above together

mod machine;
mod pool;
mod sink;
mod supervisor;
mod worker;

pub use supervisor::Supervisor;
