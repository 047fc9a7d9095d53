//! # Report renderer boundary.
//!
//! The runtime hands results to a renderer incrementally and asks it to
//! finish once per generation:
//!
//! - [`Report`] — the renderer trait (`restart` / `diagnostic` / `ingest` /
//!   `finish`)
//! - [`ExitStatus`] — the generation verdict a renderer (or the runtime)
//!   yields
//! - [`ConsoleReport`] — a small embedded renderer printing human-readable
//!   lines, so the crate is usable without wiring a custom one
//!
//! Renderers must tolerate results arriving in any unit-id order; their
//! final aggregate counts have to be order-independent.

mod console;
mod renderer;

pub use console::ConsoleReport;
pub use renderer::{ExitStatus, Report};
