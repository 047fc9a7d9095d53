//! # Event subscribers for the testvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and a built-in [`LogWriter`]
//! for handling runtime events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Supervisor/Pool ── publish(Event) ──► Bus ──► broadcast to subscribers
//!                                                    │
//!                                                    ├──► LogWriter
//!                                                    ├──► Metrics (custom)
//!                                                    └──► ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use testvisor::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if matches!(event.kind, EventKind::ProtocolViolated) {
//!             // increment a counter, page someone, etc.
//!         }
//!     }
//! }
//! ```

mod log;
mod subscriber;

pub use log::LogWriter;
pub use subscriber::Subscribe;
