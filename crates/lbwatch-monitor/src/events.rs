//! Structured monitor events.
//!
//! The notification sink is external (logging, sound, UI); the scheduler
//! only ever pushes typed events into an unbounded channel and never
//! blocks on delivery.

use lbwatch_core::{PositionSide, Size};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::trace;

/// Events emitted by the monitoring session.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Monitoring started for an identifier.
    Started { uid: String },
    /// Monitoring stopped by request.
    Stopped,
    /// A poll completed successfully.
    Fetched { count: usize },
    /// A position appeared that was not in the previous snapshot.
    Opened {
        symbol: String,
        side: PositionSide,
        size: Size,
    },
    /// A position from the previous snapshot disappeared.
    Closed {
        symbol: String,
        side: PositionSide,
        pnl: Decimal,
    },
    /// A fatal fetch/normalization error; monitoring has stopped.
    Error {
        kind: &'static str,
        message: String,
    },
}

/// Sender half of the notification channel.
pub type EventSender = mpsc::UnboundedSender<MonitorEvent>;
/// Receiver half of the notification channel.
pub type EventReceiver = mpsc::UnboundedReceiver<MonitorEvent>;

/// Create the notification channel.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Deliver an event, ignoring a departed receiver: the sink's absence
/// must never affect monitoring.
pub(crate) fn emit(tx: &EventSender, event: MonitorEvent) {
    trace!(?event, "Monitor event");
    let _ = tx.send(event);
}
