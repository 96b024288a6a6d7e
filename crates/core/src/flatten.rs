//! Session → flat record projection.
//!
//! Nested mappings are promoted to prefixed top-level columns; nested
//! sequences collapse to a count plus their verbatim JSON text. Nothing is
//! dropped: a container with an unexpected shape is kept under its own key.

use serde_json::Value;

use crate::session::Session;
use crate::tabular::FlatRecord;

const ATTRIBUTES: &str = "attributes";
const LAST_TOUCHED_FIELD: &str = "last_touched_field";
const FIELDS: &str = "fields";
const EVENTS: &str = "events";

/// Flatten one session. Pure and infallible.
#[must_use]
pub fn flatten_session(session: &Session) -> FlatRecord {
    let mut flat: FlatRecord =
        session.scalars.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    flat.insert("id".to_owned(), Value::String(session.id.clone()));

    promote(&mut flat, ATTRIBUTES, session.attributes.as_ref());
    promote(&mut flat, LAST_TOUCHED_FIELD, session.last_touched_field.as_ref());
    collapse(&mut flat, FIELDS, session.fields.as_ref());
    collapse(&mut flat, EVENTS, session.events.as_ref());

    flat
}

fn promote(flat: &mut FlatRecord, prefix: &str, nested: Option<&Value>) {
    match nested {
        None | Some(Value::Null) => {},
        Some(Value::Object(map)) => {
            for (key, value) in map {
                flat.insert(format!("{prefix}_{key}"), value.clone());
            }
        },
        Some(other) => {
            flat.insert(prefix.to_owned(), other.clone());
        },
    }
}

fn collapse(flat: &mut FlatRecord, name: &str, nested: Option<&Value>) {
    let empty = Vec::new();
    let items = match nested {
        None | Some(Value::Null) => &empty,
        Some(Value::Array(items)) => items,
        Some(other) => {
            flat.insert(name.to_owned(), other.clone());
            &empty
        },
    };
    flat.insert(format!("{name}_count"), Value::from(items.len()));
    flat.insert(
        format!("{name}_json"),
        Value::String(Value::Array(items.clone()).to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[expect(clippy::unwrap_used, reason = "test code")]
    fn session(value: Value) -> Session {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn promotes_mappings_with_prefix() {
        let flat = flatten_session(&session(json!({
            "id": "a",
            "attributes": {"deviceType": "mobile", "autofillTriggered": false},
            "last_touched_field": {"html_id": "email", "label": "Email"}
        })));

        assert_eq!(flat["attributes_deviceType"], json!("mobile"));
        assert_eq!(flat["attributes_autofillTriggered"], json!(false));
        assert_eq!(flat["last_touched_field_html_id"], json!("email"));
        assert_eq!(flat["last_touched_field_label"], json!("Email"));
        assert!(!flat.contains_key("attributes"));
        assert!(!flat.contains_key("last_touched_field"));
    }

    #[test]
    fn collapses_sequences_to_count_and_json() {
        let flat = flatten_session(&session(json!({
            "id": "a",
            "fields": [{"name": "email", "returns": 2}],
            "events": [{"type": "view"}, {"type": "submit"}]
        })));

        assert_eq!(flat["fields_count"], json!(1));
        assert_eq!(flat["events_count"], json!(2));
        let raw = flat["events_json"].as_str().unwrap_or_default();
        let events: Value = serde_json::from_str(raw).unwrap_or_default();
        assert_eq!(events, json!([{"type": "view"}, {"type": "submit"}]));
        assert!(!flat.contains_key("fields"));
        assert!(!flat.contains_key("events"));
    }

    #[test]
    fn record_without_containers_only_gains_count_columns() {
        let input = session(json!({
            "id": "plain",
            "completed": true,
            "duration": 12,
            "time": "2024-05-01T10:00:00Z"
        }));
        let flat = flatten_session(&input);

        let mut expected = FlatRecord::new();
        expected.insert("id".to_owned(), json!("plain"));
        expected.insert("completed".to_owned(), json!(true));
        expected.insert("duration".to_owned(), json!(12));
        expected.insert("time".to_owned(), json!("2024-05-01T10:00:00Z"));
        expected.insert("fields_count".to_owned(), json!(0));
        expected.insert("fields_json".to_owned(), json!("[]"));
        expected.insert("events_count".to_owned(), json!(0));
        expected.insert("events_json".to_owned(), json!("[]"));
        assert_eq!(flat, expected);
    }

    #[test]
    fn null_containers_behave_like_absent_ones() {
        let flat = flatten_session(&session(json!({
            "id": "n",
            "attributes": null,
            "fields": null
        })));
        assert_eq!(flat["fields_count"], json!(0));
        assert_eq!(flat["fields_json"], json!("[]"));
        assert!(!flat.contains_key("attributes"));
    }

    #[test]
    fn misshapen_containers_are_kept_verbatim() {
        let flat = flatten_session(&session(json!({
            "id": "odd",
            "attributes": "not-a-map",
            "events": {"type": "view"}
        })));
        assert_eq!(flat["attributes"], json!("not-a-map"));
        assert_eq!(flat["events"], json!({"type": "view"}));
        assert_eq!(flat["events_count"], json!(0));
    }

    #[test]
    fn flattening_is_deterministic() {
        let input = session(json!({
            "id": "a",
            "attributes": {"b": 1, "a": 2},
            "events": [{"type": "view"}]
        }));
        assert_eq!(flatten_session(&input), flatten_session(&input));
    }
}
