//! Live mark-price WebSocket channel.
//!
//! An advisory push path with a failure domain independent of the poll
//! loop: transport errors here are logged and retried with backoff, and
//! never stop position monitoring. Malformed frames are dropped silently;
//! stream data refines prices, it is not the source of truth for position
//! existence.

pub mod connection;
pub mod error;
pub mod message;

pub use connection::{spawn_price_stream, PriceStreamConfig, PriceStreamHandle};
pub use error::{StreamError, StreamResult};
pub use message::parse_frame;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
