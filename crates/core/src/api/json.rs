use crate::api::error::{ApiError, ApiErrorKind};
use serde_json::Value;
use std::borrow::Cow;

/// Rewrites bare `NaN`, `Infinity` and `-Infinity` tokens to `null`.
///
/// The pipeline serializes pandas frames straight to JSON, which leaks these tokens into
/// bodies that strict parsers reject. String contents are left alone.
pub fn sanitize_non_finite(text: &str) -> Cow<'_, str> {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    if !TOKENS.iter().any(|t| text.contains(t)) {
        return Cow::Borrowed(text);
    }

    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    let mut copied_from = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }

        if let Some(token) = TOKENS.iter().find(|t| bytes[i..].starts_with(t.as_bytes())) {
            let end = i + token.len();
            let boundary_before = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
            let boundary_after = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
            if boundary_before && boundary_after {
                out.push_str(&text[copied_from..i]);
                out.push_str("null");
                i = end;
                copied_from = end;
                continue;
            }
        }
        i += 1;
    }

    out.push_str(&text[copied_from..]);
    Cow::Owned(out)
}

pub fn parse_body(endpoint: &str, text: &str) -> anyhow::Result<Value> {
    let cleaned = sanitize_non_finite(text);
    serde_json::from_str::<Value>(&cleaned).map_err(|e| {
        ApiError::new(
            endpoint,
            ApiErrorKind::Decode,
            format!("response is not valid JSON ({e}): {}", truncate(text, 200)),
        )
        .into()
    })
}

/// The `{"error": "..."}` message of a failed response, or the raw text when absent.
pub fn error_message(text: &str) -> String {
    serde_json::from_str::<Value>(&sanitize_non_finite(text))
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| truncate(text, 200).to_string())
}

/// A 200 response can still carry `{"error": "..."}` when the pipeline had nothing to serve.
pub fn error_message_field(payload: &Value) -> Option<String> {
    payload
        .get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaves_clean_bodies_borrowed() {
        let body = r#"{"a": 1.5, "b": "text"}"#;
        assert!(matches!(sanitize_non_finite(body), Cow::Borrowed(_)));
    }

    #[test]
    fn replaces_bare_tokens_outside_strings() {
        let body = r#"{"a": NaN, "b": [Infinity, -Infinity], "c": "NaN stays", "d": "say \"NaN\""}"#;
        let v: Value = serde_json::from_str(&sanitize_non_finite(body)).unwrap();
        assert_eq!(
            v,
            json!({"a": null, "b": [null, null], "c": "NaN stays", "d": "say \"NaN\""})
        );
    }

    #[test]
    fn parse_body_reports_decode_errors() {
        let err = parse_body("/api/us/calendar", "<html>oops</html>").unwrap_err();
        assert_eq!(ApiError::kind_of(&err), ApiErrorKind::Decode);
    }

    #[test]
    fn error_message_prefers_structured_error() {
        assert_eq!(error_message(r#"{"error": "No data available"}"#), "No data available");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
