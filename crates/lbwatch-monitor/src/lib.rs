//! Snapshot store and poll scheduler.
//!
//! Owns the monitoring lifecycle: a strictly sequential poll loop
//! (fetch → normalize → diff → replace → notify), a jittered re-schedule
//! between cycles, fail-closed error handling, and a stale-result guard
//! so a stopped session's in-flight fetch can never reanimate the
//! notification path. The live mark-price channel runs concurrently and
//! only ever repricing-patches the store.

pub mod error;
pub mod events;
pub mod live;
pub mod scheduler;
pub mod store;

pub use error::{MonitorError, MonitorResult};
pub use events::{EventReceiver, EventSender, MonitorEvent};
pub use live::run_live_apply;
pub use scheduler::{MonitorConfig, MonitorSession, MonitorState};
pub use store::SnapshotStore;
