//! Live mark-price application.
//!
//! Consumes price ticks from the push channel and repricing-patches the
//! store. This path never diffs, never highlights, and never emits
//! opened/closed events: the poll loop is authoritative for position
//! existence, the stream only refines prices. A tick for a symbol that is
//! not currently open is a no-op.

use crate::store::SnapshotStore;
use lbwatch_core::PriceTick;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Apply live price ticks to the store until the channel closes or the
/// token is cancelled.
pub async fn run_live_apply(
    store: Arc<SnapshotStore>,
    mut tick_rx: mpsc::Receiver<PriceTick>,
    cancel: CancellationToken,
) {
    debug!("Live price application started");
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            tick = tick_rx.recv() => {
                let Some(tick) = tick else { break };
                match store.patch(&tick.symbol, tick.price) {
                    Some(position) => trace!(
                        symbol = %position.symbol,
                        mark = %position.mark_price,
                        pnl = %position.pnl,
                        "Live reprice"
                    ),
                    None => trace!(symbol = %tick.symbol, "Live tick for unknown symbol"),
                }
            }
        }
    }
    debug!("Live price application stopped");
}
