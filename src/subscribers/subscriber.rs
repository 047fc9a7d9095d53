//! # Event subscriber trait.
//!
//! Provides [`Subscribe`], the extension point for plugging custom event
//! handlers into the runtime.
//!
//! Each subscriber gets a dedicated listener task fed from its own
//! [`Bus`](crate::events::Bus) receiver, so a slow subscriber lags only its
//! own receiver and never blocks the dispatch path.

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Events are delivered in publish order per receiver; a receiver that
///   lags more than the bus capacity skips the oldest events.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from the subscriber's own listener task, never from the
    /// supervisor context.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in logs.
    ///
    /// Prefer short, descriptive names (e.g., "log", "metrics"). The default
    /// uses `type_name::<Self>()`, which can be verbose — override it when
    /// possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
