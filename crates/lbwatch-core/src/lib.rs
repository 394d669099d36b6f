//! Core domain types for the lbwatch position monitor.
//!
//! This crate provides the fundamental types used throughout the monitor:
//! - `Price`, `Size`: precision-safe numeric types
//! - `Position`, `PositionSide`: a canonical open position with derived PnL/ROE
//! - `Snapshot`, `SnapshotDiff`: the position set as of one poll, and the
//!   opened/closed sets between two consecutive polls
//! - `PriceTick`: one live mark-price update

pub mod decimal;
pub mod error;
pub mod position;
pub mod snapshot;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use position::{Position, PositionSide, PriceTick};
pub use snapshot::{diff, Snapshot, SnapshotDiff};
