//! # Observability events for the testvisor runtime.
//!
//! The runtime reports everything it does through a broadcast [`Bus`]:
//! generation lifecycle, per-unit dispatch/completion, protocol violations,
//! worker teardown. Subscribers (see [`crate::subscribers`]) attach to the
//! bus for logging, metrics, or test instrumentation without touching the
//! dispatch path.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
