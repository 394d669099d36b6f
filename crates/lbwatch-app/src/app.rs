//! Main application orchestration.
//!
//! Wires the leaderboard client, the snapshot store, the poll scheduler,
//! and the optional live price stream together, then consumes the monitor
//! event channel as the notification sink: every event becomes a tracing
//! line and a metrics update. Rendering, sound, and log persistence belong
//! to whatever sits on top of the log stream.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use lbwatch_monitor::{events, run_live_apply, MonitorEvent, MonitorSession, SnapshotStore};
use lbwatch_source::{normalize_document, LeaderboardClient};
use lbwatch_stream::spawn_price_stream;
use lbwatch_telemetry::Metrics;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    /// Create a new application.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Ok(Self { config })
    }

    /// Run the watch loop until the session ends or Ctrl-C arrives.
    pub async fn run_watch(&self, uid_override: Option<String>) -> AppResult<()> {
        let uid = uid_override
            .or_else(|| self.config.uid.clone())
            .filter(|uid| !uid.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("a non-empty uid is required (--uid or config file)".to_string())
            })?;

        let client = Arc::new(LeaderboardClient::new(&self.config.api_url)?);
        let store = Arc::new(SnapshotStore::new());
        let (event_tx, mut event_rx) = events::channel();

        let mut session =
            MonitorSession::new(client, store.clone(), event_tx, self.config.monitor_config());

        // The live channel has its own failure domain; it is wired up once
        // here and fed symbol sets by the scheduler.
        let live_cancel = CancellationToken::new();
        let mut stream_handle = None;
        if self.config.live.enabled {
            let (symbols_tx, symbols_rx) = watch::channel(Vec::new());
            let (tick_tx, mut tick_rx) = mpsc::channel(1024);
            let (counted_tx, counted_rx) = mpsc::channel(1024);

            let (handle, _stream_task) =
                spawn_price_stream(self.config.live.clone().into(), symbols_rx, tick_tx);
            tokio::spawn(async move {
                while let Some(tick) = tick_rx.recv().await {
                    Metrics::live_tick();
                    if counted_tx.send(tick).await.is_err() {
                        break;
                    }
                }
            });
            tokio::spawn(run_live_apply(store.clone(), counted_rx, live_cancel.clone()));

            session = session.with_symbol_subscriber(symbols_tx);
            stream_handle = Some(handle);
        }

        session.start(&uid)?;
        Metrics::session_started();

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    if self.handle_event(&store, event) {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    session.stop();
                }
            }
        }

        if let Some(handle) = stream_handle {
            handle.shutdown();
        }
        live_cancel.cancel();
        Ok(())
    }

    /// Render one monitor event. Returns true when the run is over.
    fn handle_event(&self, store: &SnapshotStore, event: MonitorEvent) -> bool {
        match event {
            MonitorEvent::Started { uid } => {
                info!(%uid, "Monitoring started");
            }
            MonitorEvent::Fetched { count } => {
                Metrics::poll_completed("success");
                Metrics::open_positions(store.position_count());
                info!(count, "Positions fetched");
            }
            MonitorEvent::Opened { symbol, side, size } => {
                Metrics::position_opened();
                info!(%symbol, %side, %size, "New position opened");
            }
            MonitorEvent::Closed { symbol, side, pnl } => {
                Metrics::position_closed();
                info!(%symbol, %side, %pnl, "Position closed");
            }
            MonitorEvent::Stopped => {
                info!("Monitoring stopped");
                return true;
            }
            MonitorEvent::Error { kind, message } => {
                Metrics::poll_completed(kind);
                error!(kind, %message, "Monitoring halted");
                return true;
            }
        }
        false
    }

    /// Normalize a pasted payload file and log the canonical positions.
    pub fn run_paste(&self, path: &Path) -> AppResult<()> {
        info!(path = %path.display(), "Processing pasted data");
        let text = std::fs::read_to_string(path)?;
        let positions = normalize_document(&text)?;

        info!(count = positions.len(), "Processed pasted positions");
        for position in &positions {
            info!(
                symbol = %position.symbol,
                side = %position.side,
                leverage = %position.leverage,
                size = %position.size,
                entry = %position.entry_price,
                mark = %position.mark_price,
                pnl = %position.pnl,
                roe = %position.roe,
                "Position"
            );
        }
        Ok(())
    }
}
