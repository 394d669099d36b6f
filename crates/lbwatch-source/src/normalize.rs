//! The position record normalizer.
//!
//! Converts a raw payload (an API envelope, a bare entry list, or a DOM
//! dump) into canonical `Position` records or a classified failure.
//! Pure and synchronous; all I/O lives in the client.
//!
//! Per-entry failures (missing symbol, unresolvable side, fields that
//! cannot form a valid position) skip that entry and continue. Error
//! envelopes are fatal and never yield a partial list.

use crate::envelope::Envelope;
use crate::error::{SourceError, SourceResult};
use crate::markup::{extract_entries, MarkupNode, MarkupProfile, RawMarkupEntry};
use lbwatch_core::{Position, PositionSide, Price, Size};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

/// Lenient numeric parse: keep digits, decimal points, and a leading
/// minus sign; drop everything else ("1,234.56 USDT" → 1234.56).
/// An unparsable field yields zero, never an error.
pub fn scrub_decimal(text: &str) -> Decimal {
    let mut scrubbed = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '0'..='9' | '.' => scrubbed.push(ch),
            '-' if scrubbed.is_empty() => scrubbed.push(ch),
            _ => {}
        }
    }
    Decimal::from_str(&scrubbed).unwrap_or(Decimal::ZERO)
}

/// Read a numeric field that may arrive as a JSON number or a formatted
/// string. `None` means the field is absent; a present-but-garbage value
/// degrades to zero.
fn lenient_field(entry: &Value, key: &str) -> Option<Decimal> {
    match entry.get(key)? {
        Value::Number(n) => Some(scrub_decimal(&n.to_string())),
        Value::String(s) => Some(scrub_decimal(s)),
        _ => None,
    }
}

/// Normalize a raw JSON payload into canonical positions.
pub fn normalize(raw: &Value) -> SourceResult<Vec<Position>> {
    match Envelope::classify(raw) {
        Envelope::Positions(entries) => {
            let mut positions = Vec::with_capacity(entries.len());
            for entry in &entries {
                match extract_entry(entry) {
                    Some(position) => positions.push(position),
                    None => debug!(?entry, "Skipping unextractable position entry"),
                }
            }
            Ok(positions)
        }
        Envelope::PrivatePositions => Err(SourceError::PrivatePositions),
        Envelope::UserNotFound => Err(SourceError::UserNotFound),
        Envelope::Unrecognized => Err(SourceError::MalformedPayload(
            "payload matches neither the success envelope nor a known error envelope".to_string(),
        )),
    }
}

/// Normalize a pasted document: a DOM dump (markup node tree) or any JSON
/// payload `normalize` accepts. Non-JSON input is a malformed payload.
pub fn normalize_document(text: &str) -> SourceResult<Vec<Position>> {
    let raw: Value =
        serde_json::from_str(text).map_err(|e| SourceError::MalformedPayload(e.to_string()))?;

    // A DOM dump deserializes as a node tree; everything else goes through
    // envelope classification.
    if raw.get("tag").is_some() && raw.get("children").is_some() {
        let root: MarkupNode = serde_json::from_value(raw)?;
        return Ok(normalize_markup(&root, &MarkupProfile::default()));
    }

    normalize(&raw)
}

/// Normalize a markup node tree using the given class profile.
pub fn normalize_markup(root: &MarkupNode, profile: &MarkupProfile) -> Vec<Position> {
    let entries = extract_entries(root, profile);
    let mut positions = Vec::with_capacity(entries.len());
    for entry in &entries {
        match markup_entry_to_position(entry) {
            Some(position) => positions.push(position),
            None => debug!(symbol = %entry.symbol, "Skipping unextractable markup entry"),
        }
    }
    positions
}

/// Extract one canonical position from a JSON entry.
///
/// The side comes from the signed `amount` field; the venue's `roe`
/// arrives as a fraction and is scaled to percent here, exactly once.
fn extract_entry(entry: &Value) -> Option<Position> {
    let symbol = entry.get("symbol")?.as_str()?.trim();
    if symbol.is_empty() {
        return None;
    }

    // Signed size resolves the side; without it the side is unresolvable.
    let amount = lenient_field(entry, "amount")?;
    let side = PositionSide::from_signed_amount(amount);
    let size = Size::new(amount.abs());

    let leverage = lenient_field(entry, "leverage").unwrap_or(Decimal::ZERO);
    let entry_price = Price::new(lenient_field(entry, "entryPrice").unwrap_or(Decimal::ZERO));
    let mark_price = Price::new(lenient_field(entry, "markPrice").unwrap_or(Decimal::ZERO));

    let mut position =
        Position::new(symbol, side, leverage, size, entry_price, mark_price).ok()?;

    // Keep the venue's own metrics when it reports them; derive otherwise.
    if let Some(pnl) = lenient_field(entry, "pnl") {
        position.pnl = pnl;
    }
    if let Some(roe) = lenient_field(entry, "roe") {
        position.roe = roe * Decimal::ONE_HUNDRED;
    }

    Some(position)
}

/// Extract one canonical position from a raw markup entry.
///
/// The markup has no signed size field; the profit color marker resolves
/// the side. The parenthesized ROE text is already in percent units.
fn markup_entry_to_position(entry: &RawMarkupEntry) -> Option<Position> {
    let symbol = entry.symbol.replace("Perp", "");
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return None;
    }

    if entry.stat_cells.len() < 3 {
        return None;
    }
    let size = Size::new(scrub_decimal(&entry.stat_cells[0]).abs());
    let entry_price = Price::new(scrub_decimal(&entry.stat_cells[1]));
    let mark_price = Price::new(scrub_decimal(&entry.stat_cells[2]));
    let leverage = scrub_decimal(&entry.leverage_text);

    let side = if entry.profit_marker {
        PositionSide::Long
    } else {
        PositionSide::Short
    };

    let mut position =
        Position::new(symbol, side, leverage, size, entry_price, mark_price).ok()?;

    // "+1,234.56 ( +12.30% )" → pnl before the paren, percent inside it.
    let mut parts = entry.pnl_text.splitn(2, '(');
    if let Some(pnl_text) = parts.next() {
        if !pnl_text.trim().is_empty() {
            position.pnl = scrub_decimal(pnl_text);
        }
    }
    if let Some(roe_text) = parts.next() {
        position.roe = scrub_decimal(roe_text);
    }

    Some(position)
}
