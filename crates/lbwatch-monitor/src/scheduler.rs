//! The poll scheduler.
//!
//! An explicit state machine (`Idle`, `Waiting`, `Fetching`, `Faulted`)
//! rather than an implicit self-rescheduling callback, which makes the
//! stale-result guard and idempotent stop checkable. One logical timeline
//! per session: the next fetch is armed only after the current one
//! settles, success or failure.

use crate::events::{emit, EventSender, MonitorEvent};
use crate::store::SnapshotStore;
use crate::{MonitorError, MonitorResult};
use lbwatch_core::Snapshot;
use lbwatch_source::{normalize, PositionSource};
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fallback poll interval if the candidate list is empty.
const FALLBACK_INTERVAL_MS: u64 = 30_000;

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Not monitoring.
    Idle,
    /// Timer armed for the next poll.
    Waiting,
    /// A fetch is in flight.
    Fetching,
    /// A fatal error is being reported; settles in `Idle`.
    Faulted,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Waiting => write!(f, "WAITING"),
            Self::Fetching => write!(f, "FETCHING"),
            Self::Faulted => write!(f, "FAULTED"),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Candidate poll intervals; one is chosen at random each cycle.
    /// Spreading the cadence avoids hammering the source in lockstep;
    /// the exact values are a tunable.
    pub poll_intervals_ms: Vec<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_intervals_ms: vec![5_000, 15_000, 31_000, 47_000, 60_000],
        }
    }
}

/// One monitoring session for one identifier.
///
/// All mutable lifecycle state lives here, never in process-wide globals;
/// construct one instance per monitored identifier. The epoch counter is
/// per-session so a future multi-session extension is not precluded.
pub struct MonitorSession {
    source: Arc<dyn PositionSource>,
    store: Arc<SnapshotStore>,
    events: EventSender,
    config: MonitorConfig,
    state: Arc<RwLock<MonitorState>>,
    /// Bumped on every start/stop; an in-flight fetch whose epoch no
    /// longer matches is discarded on resolution.
    epoch: Arc<AtomicU64>,
    cancel: Mutex<Option<CancellationToken>>,
    /// Symbol-set subscriber for the live price channel, if attached.
    symbols_tx: Option<Arc<watch::Sender<Vec<String>>>>,
}

impl MonitorSession {
    pub fn new(
        source: Arc<dyn PositionSource>,
        store: Arc<SnapshotStore>,
        events: EventSender,
        config: MonitorConfig,
    ) -> Self {
        Self {
            source,
            store,
            events,
            config,
            state: Arc::new(RwLock::new(MonitorState::Idle)),
            epoch: Arc::new(AtomicU64::new(0)),
            cancel: Mutex::new(None),
            symbols_tx: None,
        }
    }

    /// Attach a live price channel subscriber; the current symbol set is
    /// pushed to it after every successful poll.
    #[must_use]
    pub fn with_symbol_subscriber(mut self, symbols_tx: watch::Sender<Vec<String>>) -> Self {
        self.symbols_tx = Some(Arc::new(symbols_tx));
        self
    }

    /// Current scheduler state.
    pub fn state(&self) -> MonitorState {
        *self.state.read()
    }

    /// Whether a poll loop is active.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), MonitorState::Waiting | MonitorState::Fetching)
    }

    /// Start monitoring an identifier.
    ///
    /// Resets the store to empty-uninitialized, clears highlights, and
    /// spawns the poll loop. Calling `start` while already running is a
    /// no-op other than a log line.
    pub fn start(&self, uid: &str) -> MonitorResult<()> {
        if uid.trim().is_empty() {
            return Err(MonitorError::MissingIdentifier);
        }
        if self.is_running() {
            warn!(uid, "Monitoring already running; start ignored");
            return Ok(());
        }

        let my_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.clear();

        let token = CancellationToken::new();
        *self.cancel.lock() = Some(token.clone());
        *self.state.write() = MonitorState::Fetching;

        info!(uid, "Monitoring started");
        emit(
            &self.events,
            MonitorEvent::Started {
                uid: uid.to_string(),
            },
        );

        let ctx = PollContext {
            source: self.source.clone(),
            store: self.store.clone(),
            events: self.events.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            epoch: self.epoch.clone(),
            my_epoch,
            cancel: token,
            symbols_tx: self.symbols_tx.clone(),
            uid: uid.to_string(),
        };
        tokio::spawn(ctx.run());

        Ok(())
    }

    /// Stop monitoring.
    ///
    /// Effective even while a fetch is in flight: the epoch bump makes the
    /// eventual resolution produce no snapshot replacement and no
    /// notification.
    pub fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
        }

        let was_running = self.is_running();
        *self.state.write() = MonitorState::Idle;
        self.store.clear_highlights();

        if was_running {
            info!("Monitoring stopped");
            emit(&self.events, MonitorEvent::Stopped);
        }
    }
}

/// Everything one spawned poll loop needs, cloned out of the session.
struct PollContext {
    source: Arc<dyn PositionSource>,
    store: Arc<SnapshotStore>,
    events: EventSender,
    config: MonitorConfig,
    state: Arc<RwLock<MonitorState>>,
    epoch: Arc<AtomicU64>,
    my_epoch: u64,
    cancel: CancellationToken,
    symbols_tx: Option<Arc<watch::Sender<Vec<String>>>>,
    uid: String,
}

impl PollContext {
    fn is_current(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) == self.my_epoch
    }

    /// Write the state only while this loop is still the live session;
    /// a stopped session must not overwrite `Idle`.
    fn set_state(&self, state: MonitorState) {
        if self.is_current() {
            *self.state.write() = state;
        }
    }

    async fn run(self) {
        loop {
            if !self.is_current() {
                return;
            }
            self.set_state(MonitorState::Fetching);

            debug!(uid = %self.uid, "Polling positions");
            let fetched = self.source.fetch_positions(&self.uid).await;

            // Stale-result guard: a fetch that resolves after stop/restart
            // is discarded without touching the store or the sink.
            if !self.is_current() {
                debug!(uid = %self.uid, "Discarding stale fetch result");
                return;
            }

            match fetched.and_then(|raw| normalize(&raw)) {
                Ok(positions) => self.apply_poll(positions),
                Err(e) => {
                    // Fail closed: the common causes (source blocked, bad
                    // identifier, changed payload shape) do not resolve on
                    // their own, so no blind retry.
                    warn!(uid = %self.uid, error = %e, "Poll failed; monitoring stops");
                    emit(
                        &self.events,
                        MonitorEvent::Error {
                            kind: e.kind(),
                            message: e.to_string(),
                        },
                    );
                    self.set_state(MonitorState::Faulted);
                    if self.is_current() {
                        self.store.clear_highlights();
                    }
                    self.set_state(MonitorState::Idle);
                    return;
                }
            }

            self.set_state(MonitorState::Waiting);
            let interval = self.pick_interval();
            debug!(interval_ms = interval.as_millis(), "Next poll scheduled");

            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                () = self.cancel.cancelled() => return,
            }
        }
    }

    fn apply_poll(&self, positions: Vec<lbwatch_core::Position>) {
        let count = positions.len();
        let new_snapshot: Snapshot = positions
            .into_iter()
            .map(|p| (p.symbol.clone(), p))
            .collect();
        let symbols: Vec<String> = new_snapshot.keys().cloned().collect();

        let (previous, diff, was_initialized) = self.store.replace(new_snapshot.clone());

        // Cold start is silent: the first populated poll shows pre-existing
        // positions, not ones that appeared while watching.
        if was_initialized {
            for symbol in &diff.opened {
                if let Some(position) = new_snapshot.get(symbol) {
                    emit(
                        &self.events,
                        MonitorEvent::Opened {
                            symbol: symbol.clone(),
                            side: position.side,
                            size: position.size,
                        },
                    );
                }
            }
            self.store.set_highlights(diff.opened.clone());
            for symbol in &diff.closed {
                if let Some(position) = previous.get(symbol) {
                    emit(
                        &self.events,
                        MonitorEvent::Closed {
                            symbol: symbol.clone(),
                            side: position.side,
                            pnl: position.pnl,
                        },
                    );
                }
            }
        }

        emit(&self.events, MonitorEvent::Fetched { count });

        // Hand the current symbol set to the live channel; an empty set
        // keeps it disconnected.
        if let Some(tx) = &self.symbols_tx {
            let _ = tx.send(symbols);
        }
    }

    fn pick_interval(&self) -> Duration {
        let ms = self
            .config
            .poll_intervals_ms
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(FALLBACK_INTERVAL_MS);
        Duration::from_millis(ms)
    }
}
