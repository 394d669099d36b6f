//! Mark-price stream connection management.
//!
//! One background task owns the socket. The symbol set it subscribes to
//! arrives over a `watch` channel from the poll scheduler; on every change
//! the previous subscription is torn down and the new set subscribed. An
//! empty set disconnects until symbols return. Transport errors reconnect
//! with exponential backoff and never propagate to the poll loop.

use crate::error::{StreamError, StreamResult};
use crate::message::parse_frame;
use futures_util::{Sink, SinkExt, StreamExt};
use lbwatch_core::PriceTick;
use serde_json::json;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Stream connection configuration.
#[derive(Debug, Clone)]
pub struct PriceStreamConfig {
    /// WebSocket URL.
    pub url: String,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
}

impl Default for PriceStreamConfig {
    fn default() -> Self {
        Self {
            url: "wss://fstream.binance.com/ws".to_string(),
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60000,
        }
    }
}

/// Handle for shutting the stream task down.
#[derive(Clone)]
pub struct PriceStreamHandle {
    shutdown: CancellationToken,
}

impl PriceStreamHandle {
    /// Signal graceful shutdown.
    pub fn shutdown(&self) {
        info!("Price stream shutdown requested");
        self.shutdown.cancel();
    }
}

/// How one connection attempt ended.
enum ConnectionExit {
    /// Shutdown requested; the task must exit.
    Shutdown,
    /// Symbol set became empty; stay disconnected until it changes.
    Idle,
    /// Socket closed or tick consumer gone; reconnect if symbols remain.
    Closed,
}

/// Spawn the mark-price stream task.
///
/// `symbols_rx` carries the current symbol set (lowercased internally for
/// stream names); `tick_tx` receives parsed price ticks.
pub fn spawn_price_stream(
    config: PriceStreamConfig,
    symbols_rx: watch::Receiver<Vec<String>>,
    tick_tx: mpsc::Sender<PriceTick>,
) -> (PriceStreamHandle, JoinHandle<()>) {
    let shutdown = CancellationToken::new();
    let handle = PriceStreamHandle {
        shutdown: shutdown.clone(),
    };

    let join_handle = tokio::spawn(run_stream(config, symbols_rx, tick_tx, shutdown));
    (handle, join_handle)
}

async fn run_stream(
    config: PriceStreamConfig,
    mut symbols_rx: watch::Receiver<Vec<String>>,
    tick_tx: mpsc::Sender<PriceTick>,
    shutdown: CancellationToken,
) {
    let mut attempt = 0u32;

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        // Stay disconnected while there is nothing to subscribe to.
        if symbols_rx.borrow_and_update().is_empty() {
            tokio::select! {
                () = shutdown.cancelled() => return,
                changed = symbols_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    continue;
                }
            }
        }

        match run_connection(&config, &mut symbols_rx, &tick_tx, &shutdown).await {
            Ok(ConnectionExit::Shutdown) => return,
            Ok(ConnectionExit::Idle) => {
                attempt = 0;
                continue;
            }
            Ok(ConnectionExit::Closed) => {
                attempt += 1;
                info!("Price stream closed");
            }
            Err(e) => {
                attempt += 1;
                warn!(?e, "Price stream error");
            }
        }

        let delay = backoff_delay(&config, attempt);
        debug!(attempt, delay_ms = delay.as_millis(), "Price stream reconnecting");
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = shutdown.cancelled() => return,
        }
    }
}

async fn run_connection(
    config: &PriceStreamConfig,
    symbols_rx: &mut watch::Receiver<Vec<String>>,
    tick_tx: &mpsc::Sender<PriceTick>,
    shutdown: &CancellationToken,
) -> StreamResult<ConnectionExit> {
    info!(url = %config.url, "Connecting to mark-price stream");

    let (ws_stream, _response) = connect_async(&config.url)
        .await
        .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;
    let (mut write, mut read) = ws_stream.split();

    let mut subscribed = symbols_rx.borrow_and_update().clone();
    let mut request_id = 1u64;
    send_subscription(&mut write, "SUBSCRIBE", &subscribed, &mut request_id).await?;
    info!(symbols = ?subscribed, "Mark-price stream subscribed");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(ConnectionExit::Shutdown);
            }

            changed = symbols_rx.changed() => {
                if changed.is_err() {
                    return Ok(ConnectionExit::Shutdown);
                }
                let next = symbols_rx.borrow_and_update().clone();
                if next == subscribed {
                    continue;
                }
                // Tear down the previous subscription before the new one.
                send_subscription(&mut write, "UNSUBSCRIBE", &subscribed, &mut request_id).await?;
                if next.is_empty() {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(ConnectionExit::Idle);
                }
                send_subscription(&mut write, "SUBSCRIBE", &next, &mut request_id).await?;
                info!(symbols = ?next, "Mark-price stream resubscribed");
                subscribed = next;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        // Malformed frames are dropped silently.
                        if let Some(tick) = parse_frame(&text) {
                            if tick_tx.send(tick).await.is_err() {
                                return Ok(ConnectionExit::Shutdown);
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        write.send(Message::Pong(payload)).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Ok(ConnectionExit::Closed);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }
}

async fn send_subscription<S>(
    write: &mut S,
    method: &str,
    symbols: &[String],
    request_id: &mut u64,
) -> StreamResult<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let params: Vec<String> = symbols
        .iter()
        .map(|s| format!("{}@markPrice", s.to_lowercase()))
        .collect();
    let request = json!({
        "method": method,
        "params": params,
        "id": *request_id,
    });
    *request_id += 1;

    write
        .send(Message::Text(request.to_string()))
        .await
        .map_err(|e| StreamError::SendFailed(e.to_string()))
}

fn backoff_delay(config: &PriceStreamConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let delay = config
        .reconnect_base_delay_ms
        .saturating_mul(1u64 << exp)
        .min(config.reconnect_max_delay_ms);
    Duration::from_millis(delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PriceStreamConfig {
        PriceStreamConfig {
            url: "wss://example.invalid/ws".to_string(),
            reconnect_base_delay_ms: 100,
            reconnect_max_delay_ms: 1000,
        }
    }

    #[test]
    fn test_backoff_caps_at_max() {
        let config = test_config();
        assert_eq!(backoff_delay(&config, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(&config, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(&config, 4), Duration::from_millis(800));
        assert_eq!(backoff_delay(&config, 5), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&config, 60), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_stream_idles_without_symbols_and_shuts_down() {
        let (_symbols_tx, symbols_rx) = watch::channel(Vec::new());
        let (tick_tx, _tick_rx) = mpsc::channel(16);

        let (handle, join) = spawn_price_stream(test_config(), symbols_rx, tick_tx);

        // No symbols: the task must idle without attempting a connection,
        // and shut down promptly when asked.
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .expect("stream task did not shut down")
            .unwrap();
    }
}
