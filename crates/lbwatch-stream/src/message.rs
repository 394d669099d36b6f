//! Mark-price stream frame parsing.
//!
//! The venue sends numeric values as strings. Frames arrive either bare
//! or wrapped in a combined-stream envelope:
//! `{"stream": "btcusdt@markPrice", "data": {...}}`.

use lbwatch_core::{Price, PriceTick};
use serde::Deserialize;
use std::str::FromStr;
use tracing::trace;

/// Raw mark-price update payload.
#[derive(Debug, Deserialize)]
struct RawMarkPrice {
    /// Event type; only "markPriceUpdate" is consumed.
    #[serde(rename = "e")]
    event: String,
    /// Symbol, e.g. "BTCUSDT".
    #[serde(rename = "s", default)]
    symbol: String,
    /// Mark price as a string.
    #[serde(rename = "p", default)]
    price: String,
}

/// Combined-stream envelope.
#[derive(Debug, Deserialize)]
struct StreamFrame {
    data: RawMarkPrice,
}

/// Parse one text frame into a price tick.
///
/// Returns `None` for anything that is not a well-formed mark-price
/// update: malformed stream messages are dropped, not errors.
pub fn parse_frame(text: &str) -> Option<PriceTick> {
    let raw = serde_json::from_str::<RawMarkPrice>(text)
        .or_else(|_| serde_json::from_str::<StreamFrame>(text).map(|frame| frame.data))
        .ok()?;

    if raw.event != "markPriceUpdate" {
        trace!(event = %raw.event, "Ignoring non-mark-price frame");
        return None;
    }
    if raw.symbol.is_empty() {
        return None;
    }

    let price = Price::from_str(&raw.price).ok()?;
    if !price.is_positive() {
        return None;
    }

    Some(PriceTick {
        symbol: raw.symbol,
        price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_bare_frame() {
        let tick = parse_frame(r#"{"e":"markPriceUpdate","s":"BTCUSDT","p":"60123.45"}"#).unwrap();
        assert_eq!(tick.symbol, "BTCUSDT");
        assert_eq!(tick.price, Price::new(dec!(60123.45)));
    }

    #[test]
    fn test_parse_combined_stream_frame() {
        let frame = r#"{"stream":"btcusdt@markPrice","data":{"e":"markPriceUpdate","s":"BTCUSDT","p":"60000"}}"#;
        let tick = parse_frame(frame).unwrap();
        assert_eq!(tick.symbol, "BTCUSDT");
    }

    #[test]
    fn test_malformed_frames_dropped() {
        // Not JSON.
        assert!(parse_frame("not json").is_none());
        // Wrong event type.
        assert!(parse_frame(r#"{"e":"aggTrade","s":"BTCUSDT","p":"1"}"#).is_none());
        // Missing symbol.
        assert!(parse_frame(r#"{"e":"markPriceUpdate","p":"1"}"#).is_none());
        // Missing or unparsable price.
        assert!(parse_frame(r#"{"e":"markPriceUpdate","s":"BTCUSDT"}"#).is_none());
        assert!(parse_frame(r#"{"e":"markPriceUpdate","s":"BTCUSDT","p":"x"}"#).is_none());
        // Non-positive price.
        assert!(parse_frame(r#"{"e":"markPriceUpdate","s":"BTCUSDT","p":"0"}"#).is_none());
    }
}
