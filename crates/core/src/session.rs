use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One recorded interaction with a tracked form, as returned by the upstream API.
///
/// The four nested containers are kept as raw JSON so that a record with a
/// missing, null or oddly shaped container still deserializes; the flattener
/// decides what to do with each shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_touched_field: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Value>,
    /// Every other top-level field (timestamps, flags, counters, ...).
    #[serde(flatten)]
    pub scalars: Map<String, Value>,
}

impl Session {
    /// Session with only an id; handy for building fixtures.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: None,
            last_touched_field: None,
            fields: None,
            events: None,
            scalars: Map::new(),
        }
    }
}

/// Upstream ids are strings, but a numeric id is accepted and stringified.
/// A null id reads as empty; the loader skips such rows.
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("session id must be a string, got {other}"))),
    }
}

/// Closed UTC interval `[from, to]` used to query sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// Window covering the `days_back` days that end at `now`.
    #[must_use]
    pub fn last_days(days_back: u32, now: DateTime<Utc>) -> Self {
        Self { from: now - Duration::days(i64::from(days_back)), to: now }
    }

    /// Lower bound in the wire format (`2024-05-01T10:00:00Z`).
    #[must_use]
    pub fn from_param(&self) -> String {
        format_bound(self.from)
    }

    /// Upper bound in the wire format.
    #[must_use]
    pub fn to_param(&self) -> String {
        format_bound(self.to)
    }
}

fn format_bound(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    #[expect(clippy::unwrap_used, reason = "test code")]
    fn session_keeps_unknown_fields() {
        let session: Session = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "completed": true,
            "duration": 42,
            "attributes": {"deviceType": "mobile"},
            "events": null
        }))
        .unwrap();

        assert_eq!(session.id, "s1");
        assert_eq!(session.scalars.get("completed"), Some(&Value::Bool(true)));
        assert_eq!(session.scalars.get("duration"), Some(&serde_json::json!(42)));
        assert!(session.events.is_none());
        assert!(session.fields.is_none());
        assert!(!session.scalars.contains_key("attributes"));
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "test code")]
    fn numeric_id_is_stringified() {
        let session: Session = serde_json::from_value(serde_json::json!({"id": 17})).unwrap();
        assert_eq!(session.id, "17");
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "test code")]
    fn missing_or_null_id_reads_as_empty() {
        let missing: Session = serde_json::from_value(serde_json::json!({"time": "x"})).unwrap();
        let null: Session = serde_json::from_value(serde_json::json!({"id": null})).unwrap();
        assert_eq!((missing.id.as_str(), null.id.as_str()), ("", ""));
    }

    #[test]
    fn structured_id_is_rejected() {
        let result: Result<Session, _> =
            serde_json::from_value(serde_json::json!({"id": {"a": 1}}));
        assert!(result.is_err());
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "test code")]
    fn window_formats_with_second_precision() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 8, 30, 15).unwrap();
        let window = TimeWindow::last_days(3, now);
        assert_eq!(window.from_param(), "2024-05-07T08:30:15Z");
        assert_eq!(window.to_param(), "2024-05-10T08:30:15Z");
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "test code")]
    fn zero_day_window_is_a_point() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let window = TimeWindow::last_days(0, now);
        assert_eq!(window.from, window.to);
    }
}
