//! Payload envelope classification.
//!
//! The leaderboard endpoint is public, versionless, and best-effort: the
//! same URL has been observed returning a success envelope, two distinct
//! error envelopes, and (via the paste path) a bare entry list. The shape
//! is decided once here; downstream code only ever sees the tagged result.

use serde_json::Value;

/// Success code used by the venue's public API.
const SUCCESS_CODE: &str = "000000";

/// Recognized envelope shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Success envelope; carries the raw position entries. An empty or
    /// missing list means "no open positions", not an error.
    Positions(Vec<Value>),
    /// The trader's positions exist but are not shared.
    PrivatePositions,
    /// Unknown identifier, or leaderboard sharing disabled entirely.
    UserNotFound,
    /// Neither a success envelope nor a known error envelope.
    Unrecognized,
}

impl Envelope {
    /// Classify a raw payload into one of the recognized shapes.
    pub fn classify(raw: &Value) -> Self {
        // A bare array is a pasted entry list.
        if let Some(entries) = raw.as_array() {
            return Self::Positions(entries.clone());
        }

        let Some(obj) = raw.as_object() else {
            return Self::Unrecognized;
        };

        let code = obj.get("code").and_then(Value::as_str);
        let success = obj.get("success").and_then(Value::as_bool);

        let is_success = success == Some(true) || code == Some(SUCCESS_CODE);
        if is_success {
            return Self::Positions(Self::entry_list(obj.get("data")));
        }

        // Error envelope: classify by message text. Codes churn across
        // deployments; the message wording has been stable longer.
        if success == Some(false) || code.is_some() {
            let message = obj
                .get("message")
                .or_else(|| obj.get("msg"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase();

            if message.contains("private") {
                return Self::PrivatePositions;
            }
            if message.contains("not found")
                || message.contains("not exist")
                || message.contains("sharing")
            {
                return Self::UserNotFound;
            }
        }

        Self::Unrecognized
    }

    /// Pull the entry list out of the success envelope's `data` field.
    fn entry_list(data: Option<&Value>) -> Vec<Value> {
        match data {
            // {"data": {"otherPositionRetList": [...]}}
            Some(Value::Object(obj)) => obj
                .get("otherPositionRetList")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            // {"data": [...]}
            Some(Value::Array(entries)) => entries.clone(),
            // Null or missing list: no open positions.
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_with_entries() {
        let raw = json!({
            "code": "000000",
            "message": null,
            "data": { "otherPositionRetList": [{"symbol": "BTCUSDT"}] },
            "success": true
        });
        match Envelope::classify(&raw) {
            Envelope::Positions(entries) => assert_eq!(entries.len(), 1),
            other => panic!("expected Positions, got {other:?}"),
        }
    }

    #[test]
    fn test_success_envelope_null_list_is_empty() {
        let raw = json!({
            "code": "000000",
            "data": { "otherPositionRetList": null },
            "success": true
        });
        assert_eq!(Envelope::classify(&raw), Envelope::Positions(vec![]));

        let raw = json!({ "success": true, "data": {} });
        assert_eq!(Envelope::classify(&raw), Envelope::Positions(vec![]));
    }

    #[test]
    fn test_bare_array_is_entry_list() {
        let raw = json!([{"symbol": "ETHUSDT"}]);
        match Envelope::classify(&raw) {
            Envelope::Positions(entries) => assert_eq!(entries.len(), 1),
            other => panic!("expected Positions, got {other:?}"),
        }
    }

    #[test]
    fn test_private_positions_envelope() {
        let raw = json!({
            "code": "000002",
            "message": "These positions are private.",
            "success": false
        });
        assert_eq!(Envelope::classify(&raw), Envelope::PrivatePositions);
    }

    #[test]
    fn test_user_not_found_envelope() {
        let raw = json!({
            "code": "000001",
            "message": "User not found or sharing disabled.",
            "success": false
        });
        assert_eq!(Envelope::classify(&raw), Envelope::UserNotFound);
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert_eq!(Envelope::classify(&json!("huh")), Envelope::Unrecognized);
        assert_eq!(Envelope::classify(&json!(42)), Envelope::Unrecognized);
        assert_eq!(
            Envelope::classify(&json!({"unexpected": true})),
            Envelope::Unrecognized
        );
        assert_eq!(
            Envelope::classify(&json!({"success": false, "message": "teapot"})),
            Envelope::Unrecognized
        );
    }
}
