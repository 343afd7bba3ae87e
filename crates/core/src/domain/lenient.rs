//! Field readers that never fail on odd shapes.
//!
//! Payloads come from a batch pipeline that is free to drop fields, emit numbers as strings
//! or write `NaN`. A field that cannot be read becomes `None` and the row still renders.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn number<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(as_number(&v))
}

pub fn text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(as_text(&v))
}

pub fn numbers<'de, D>(d: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Array(items) => items.iter().filter_map(as_number).collect(),
        _ => Vec::new(),
    })
}

/// Finite numbers only; numeric strings are accepted.
pub fn as_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|x| x.is_finite())
}

pub fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads the primary array of a payload.
///
/// A bare array is accepted as-is; otherwise the first of `keys` holding an array wins.
/// Entries that do not decode into `T` are skipped.
pub fn items<T: DeserializeOwned>(payload: &Value, keys: &[&str]) -> Vec<T> {
    let array = match payload {
        Value::Array(items) => Some(items),
        Value::Object(obj) => keys
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array)),
        _ => None,
    };

    let Some(array) = array else {
        return Vec::new();
    };

    array
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::debug!(error = %err, "skipping undecodable payload entry");
                None
            }
        })
        .collect()
}

pub fn field_text(payload: &Value, key: &str) -> Option<String> {
    payload.get(key).and_then(as_text)
}

pub fn field_number(payload: &Value, key: &str) -> Option<f64> {
    payload.get(key).and_then(as_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "text")]
        name: Option<String>,
        #[serde(default, deserialize_with = "number")]
        value: Option<f64>,
    }

    #[test]
    fn numbers_accept_strings_and_reject_nan() {
        assert_eq!(as_number(&json!(1.5)), Some(1.5));
        assert_eq!(as_number(&json!(" 2.25 ")), Some(2.25));
        assert_eq!(as_number(&json!("NaN")), None);
        assert_eq!(as_number(&json!("abc")), None);
        assert_eq!(as_number(&Value::Null), None);
    }

    #[test]
    fn rows_survive_missing_and_mistyped_fields() {
        let payload = json!({"rows": [
            {"name": "a", "value": "oops"},
            {"value": 3},
            "not an object",
        ]});
        let rows: Vec<Row> = items(&payload, &["rows"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name.as_deref(), Some("a"));
        assert_eq!(rows[0].value, None);
        assert_eq!(rows[1].name, None);
        assert_eq!(rows[1].value, Some(3.0));
    }

    #[test]
    fn items_falls_through_keys_and_accepts_bare_arrays() {
        let keyed = json!({"picks": [{"name": "x"}]});
        assert_eq!(items::<Row>(&keyed, &["top_picks", "picks"]).len(), 1);

        let bare = json!([{"name": "x"}, {"name": "y"}]);
        assert_eq!(items::<Row>(&bare, &["ignored"]).len(), 2);

        assert!(items::<Row>(&json!({"other": 1}), &["rows"]).is_empty());
        assert!(items::<Row>(&Value::Null, &["rows"]).is_empty());
    }
}
