//! Event types broadcast to embedding applications.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` so hosts can
//! forward them over whatever event bus they use (camelCase fields,
//! lowercase enum tags on the wire).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Transport status events
// ---------------------------------------------------------------------------

/// Emitted when the engine's transport state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportStatusEvent {
    pub status: TransportStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Current state of the time-shift engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportStatus {
    /// Engine created but `start()` not yet called.
    Idle,
    /// Opening audio devices.
    Priming,
    /// Capturing live audio and serving the delayed read cursor.
    Shifting,
    /// Session stopped; the engine may be restarted.
    Stopped,
    /// Unrecoverable error — restart required.
    Error,
}

// ---------------------------------------------------------------------------
// Playhead events
// ---------------------------------------------------------------------------

/// Periodic snapshot of the relationship between the live write cursor and
/// the delayed read cursor, emitted by the ingest loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayheadEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// Seconds the read cursor currently trails the live edge.
    pub delay_secs: f64,
    /// Seconds of valid audio held in the window.
    pub buffered_secs: f64,
    /// Stale-cursor recoveries since the session started.
    pub re_anchors: u64,
    /// Reads answered with silence since the session started.
    pub underruns: u64,
    /// Seek requests clamped at a margin since the session started.
    pub clamped_seeks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playhead_event_serializes_with_camel_case_fields() {
        let event = PlayheadEvent {
            seq: 42,
            delay_secs: 3.25,
            buffered_secs: 90.0,
            re_anchors: 1,
            underruns: 7,
            clamped_seeks: 2,
        };

        let json = serde_json::to_value(&event).expect("serialize playhead event");
        assert_eq!(json["seq"], 42);
        let delay = json["delaySecs"]
            .as_f64()
            .expect("delaySecs should serialize as number");
        assert!((delay - 3.25).abs() < 1e-9);
        assert_eq!(json["reAnchors"], 1);
        assert_eq!(json["clampedSeeks"], 2);

        let round_trip: PlayheadEvent =
            serde_json::from_value(json).expect("deserialize playhead event");
        assert_eq!(round_trip.seq, 42);
        assert_eq!(round_trip.underruns, 7);
    }

    #[test]
    fn status_event_serializes_with_lowercase_status() {
        let event = TransportStatusEvent {
            status: TransportStatus::Priming,
            detail: Some("opening devices".into()),
        };

        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["status"], "priming");
        assert_eq!(json["detail"], "opening devices");

        let round_trip: TransportStatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip.status, TransportStatus::Priming);
        assert_eq!(round_trip.detail.as_deref(), Some("opening devices"));
    }

    #[test]
    fn transport_status_rejects_non_lowercase_values() {
        let invalid = r#""Shifting""#;
        let err = serde_json::from_str::<TransportStatus>(invalid);
        assert!(err.is_err(), "expected invalid casing to fail");
    }
}
