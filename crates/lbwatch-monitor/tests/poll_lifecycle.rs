//! End-to-end poll scheduler lifecycle tests with a scripted source.

use async_trait::async_trait;
use lbwatch_monitor::{events, MonitorConfig, MonitorEvent, MonitorSession, MonitorState, SnapshotStore};
use lbwatch_source::{PositionSource, SourceError, SourceResult};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{watch, Notify};

/// A source that replays a fixed script of responses, then hangs.
struct ScriptedSource {
    responses: Mutex<VecDeque<SourceResult<Value>>>,
}

impl ScriptedSource {
    fn new(responses: Vec<SourceResult<Value>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl PositionSource for ScriptedSource {
    async fn fetch_positions(&self, _uid: &str) -> SourceResult<Value> {
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            // Script exhausted: park forever so no further cycles complete.
            None => std::future::pending().await,
        }
    }
}

/// A source whose single response is withheld until released.
struct GatedSource {
    gate: Notify,
    payload: Value,
}

#[async_trait]
impl PositionSource for GatedSource {
    async fn fetch_positions(&self, _uid: &str) -> SourceResult<Value> {
        self.gate.notified().await;
        Ok(self.payload.clone())
    }
}

fn payload(entries: &[(&str, i64)]) -> Value {
    let list: Vec<Value> = entries
        .iter()
        .map(|(symbol, amount)| {
            json!({
                "symbol": symbol,
                "amount": amount,
                "entryPrice": 100,
                "markPrice": 110,
                "leverage": 10
            })
        })
        .collect();
    json!({
        "success": true,
        "data": { "otherPositionRetList": list }
    })
}

fn fast_config() -> MonitorConfig {
    MonitorConfig {
        poll_intervals_ms: vec![1],
    }
}

async fn recv_events(rx: &mut events::EventReceiver, count: usize) -> Vec<MonitorEvent> {
    let mut received = Vec::with_capacity(count);
    while received.len() < count {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for monitor event")
            .expect("event channel closed");
        received.push(event);
    }
    received
}

#[tokio::test]
async fn test_cold_start_silent_then_opened_and_closed() {
    let source = ScriptedSource::new(vec![
        Ok(payload(&[("BTCUSDT", 1)])),
        Ok(payload(&[("BTCUSDT", 1), ("ETHUSDT", -2)])),
        Ok(payload(&[("ETHUSDT", -2)])),
    ]);
    let store = Arc::new(SnapshotStore::new());
    let (tx, mut rx) = events::channel();
    let session = MonitorSession::new(source, store.clone(), tx, fast_config());

    session.start("UID1").unwrap();

    // Started, Fetched(1), Opened(ETHUSDT), Fetched(2), Closed(BTCUSDT), Fetched(1)
    let received = recv_events(&mut rx, 6).await;

    assert!(matches!(&received[0], MonitorEvent::Started { uid } if uid == "UID1"));
    // Cold start: pre-existing BTCUSDT is not announced as opened.
    assert_eq!(received[1], MonitorEvent::Fetched { count: 1 });
    assert!(
        matches!(&received[2], MonitorEvent::Opened { symbol, .. } if symbol == "ETHUSDT"),
        "expected Opened(ETHUSDT), got {:?}",
        received[2]
    );
    assert_eq!(received[3], MonitorEvent::Fetched { count: 2 });
    assert!(
        matches!(&received[4], MonitorEvent::Closed { symbol, .. } if symbol == "BTCUSDT"),
        "expected Closed(BTCUSDT), got {:?}",
        received[4]
    );
    assert_eq!(received[5], MonitorEvent::Fetched { count: 1 });

    // Highlights track the latest opened set.
    assert!(store.highlighted().is_empty());
    assert_eq!(store.position_count(), 1);

    session.stop();
}

#[tokio::test]
async fn test_highlights_follow_opened_set() {
    let source = ScriptedSource::new(vec![
        Ok(payload(&[("BTCUSDT", 1)])),
        Ok(payload(&[("BTCUSDT", 1), ("ETHUSDT", -2)])),
    ]);
    let store = Arc::new(SnapshotStore::new());
    let (tx, mut rx) = events::channel();
    let session = MonitorSession::new(source, store.clone(), tx, fast_config());

    session.start("UID1").unwrap();
    let _ = recv_events(&mut rx, 4).await;

    assert_eq!(
        store.highlighted(),
        std::collections::BTreeSet::from(["ETHUSDT".to_string()])
    );

    // Stop clears highlights but keeps the last snapshot visible.
    session.stop();
    assert!(store.highlighted().is_empty());
    assert_eq!(store.position_count(), 2);
}

#[tokio::test]
async fn test_empty_baseline_counts_after_cold_start() {
    let source = ScriptedSource::new(vec![
        Ok(payload(&[])),
        Ok(payload(&[("BTCUSDT", 1)])),
    ]);
    let store = Arc::new(SnapshotStore::new());
    let (tx, mut rx) = events::channel();
    let session = MonitorSession::new(source, store, tx, fast_config());

    session.start("UID1").unwrap();
    let received = recv_events(&mut rx, 4).await;

    assert_eq!(received[1], MonitorEvent::Fetched { count: 0 });
    // The empty first poll is a real baseline; the next arrival is opened.
    assert!(matches!(&received[2], MonitorEvent::Opened { symbol, .. } if symbol == "BTCUSDT"));
    assert_eq!(received[3], MonitorEvent::Fetched { count: 1 });

    session.stop();
}

#[tokio::test]
async fn test_fatal_error_fails_closed() {
    let source = ScriptedSource::new(vec![Err(SourceError::PrivatePositions)]);
    let store = Arc::new(SnapshotStore::new());
    let (tx, mut rx) = events::channel();
    let session = MonitorSession::new(source, store, tx, fast_config());

    session.start("UID1").unwrap();
    let received = recv_events(&mut rx, 2).await;

    assert!(matches!(&received[0], MonitorEvent::Started { .. }));
    match &received[1] {
        MonitorEvent::Error { kind, message } => {
            assert_eq!(*kind, "private_positions");
            assert!(message.to_lowercase().contains("private"));
        }
        other => panic!("expected Error event, got {other:?}"),
    }

    // No automatic retry: the scheduler settles in Idle and stays there.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.state(), MonitorState::Idle);
    assert!(
        tokio::time::timeout(Duration::from_millis(50), rx.recv())
            .await
            .is_err(),
        "no further events expected after a fatal error"
    );
}

#[tokio::test]
async fn test_transport_and_malformed_are_fatal_too() {
    for error in [
        SourceError::Transport("HTTP 500".to_string()),
        SourceError::MalformedPayload("unexpected shape".to_string()),
        SourceError::UserNotFound,
    ] {
        let expected_kind = error.kind();
        let source = ScriptedSource::new(vec![Err(error)]);
        let (tx, mut rx) = events::channel();
        let session =
            MonitorSession::new(source, Arc::new(SnapshotStore::new()), tx, fast_config());

        session.start("UID1").unwrap();
        let received = recv_events(&mut rx, 2).await;
        assert!(
            matches!(&received[1], MonitorEvent::Error { kind, .. } if *kind == expected_kind)
        );
    }
}

#[tokio::test]
async fn test_stop_discards_inflight_fetch() {
    let source = Arc::new(GatedSource {
        gate: Notify::new(),
        payload: payload(&[("BTCUSDT", 1)]),
    });
    let store = Arc::new(SnapshotStore::new());
    let (tx, mut rx) = events::channel();
    let session = MonitorSession::new(source.clone(), store.clone(), tx, fast_config());

    session.start("UID1").unwrap();
    let received = recv_events(&mut rx, 1).await;
    assert!(matches!(&received[0], MonitorEvent::Started { .. }));
    assert_eq!(session.state(), MonitorState::Fetching);

    // Stop while the fetch is pending, then let it resolve.
    session.stop();
    let received = recv_events(&mut rx, 1).await;
    assert_eq!(received[0], MonitorEvent::Stopped);
    source.gate.notify_one();

    tokio::time::sleep(Duration::from_millis(50)).await;

    // The stale resolution produced no snapshot replacement and no events.
    assert!(!store.is_initialized());
    assert_eq!(store.position_count(), 0);
    assert!(
        tokio::time::timeout(Duration::from_millis(50), rx.recv())
            .await
            .is_err()
    );
    assert_eq!(session.state(), MonitorState::Idle);
}

#[tokio::test]
async fn test_start_is_idempotent_while_running() {
    let source = Arc::new(GatedSource {
        gate: Notify::new(),
        payload: payload(&[]),
    });
    let (tx, mut rx) = events::channel();
    let session = MonitorSession::new(source, Arc::new(SnapshotStore::new()), tx, fast_config());

    session.start("UID1").unwrap();
    session.start("UID1").unwrap();

    let received = recv_events(&mut rx, 1).await;
    assert!(matches!(&received[0], MonitorEvent::Started { .. }));
    assert!(
        tokio::time::timeout(Duration::from_millis(50), rx.recv())
            .await
            .is_err(),
        "re-entrant start must not emit a second Started"
    );

    session.stop();
}

#[tokio::test]
async fn test_start_requires_identifier() {
    let source = ScriptedSource::new(vec![]);
    let (tx, _rx) = events::channel();
    let session = MonitorSession::new(source, Arc::new(SnapshotStore::new()), tx, fast_config());

    assert!(session.start("  ").is_err());
    assert_eq!(session.state(), MonitorState::Idle);
}

#[tokio::test]
async fn test_symbol_set_pushed_to_live_channel() {
    let source = ScriptedSource::new(vec![Ok(payload(&[("BTCUSDT", 1), ("ETHUSDT", 1)]))]);
    let (symbols_tx, symbols_rx) = watch::channel(Vec::new());
    let (tx, mut rx) = events::channel();
    let session = MonitorSession::new(source, Arc::new(SnapshotStore::new()), tx, fast_config())
        .with_symbol_subscriber(symbols_tx);

    session.start("UID1").unwrap();
    let _ = recv_events(&mut rx, 2).await;

    let mut symbols = symbols_rx.borrow().clone();
    symbols.sort();
    assert_eq!(symbols, vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]);

    session.stop();
}

#[tokio::test]
async fn test_restart_after_fault_follows_cold_start_rule() {
    let source = ScriptedSource::new(vec![
        Ok(payload(&[("BTCUSDT", 1)])),
        Err(SourceError::Transport("HTTP 502".to_string())),
        // After restart: BTCUSDT is gone, ETHUSDT present.
        Ok(payload(&[("ETHUSDT", 1)])),
    ]);
    let store = Arc::new(SnapshotStore::new());
    let (tx, mut rx) = events::channel();
    let session = MonitorSession::new(source, store.clone(), tx, fast_config());

    session.start("UID1").unwrap();
    // Started, Fetched(1), Error
    let received = recv_events(&mut rx, 3).await;
    assert!(matches!(&received[2], MonitorEvent::Error { .. }));
    tokio::time::sleep(Duration::from_millis(20)).await;

    session.start("UID1").unwrap();
    let received = recv_events(&mut rx, 2).await;
    assert!(matches!(&received[0], MonitorEvent::Started { .. }));
    // The position that vanished across the fault boundary is not
    // announced as closed, and ETHUSDT is silent pre-existing state.
    assert_eq!(received[1], MonitorEvent::Fetched { count: 1 });

    session.stop();
}
