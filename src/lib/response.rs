//! This module declares all types that may be used as response payloads.
//!
//! Both services wrap every payload in an envelope object whose `content`
//! field holds the actual data.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the bearer token in the login content.
pub const ACCESS_TOKEN: &str = "accessToken";

/// Key of the company identifier in the create company content.
pub const COMPANY_ID: &str = "companyID";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub content: Option<T>,
}

/// Decodes a response body into its envelope content.
///
/// An empty body has no content. Anything else must be a JSON object.
pub fn decode_content(body: &str) -> Result<Option<Value>, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let envelope: Envelope<Value> = serde_json::from_str(body)?;

    Ok(envelope.content)
}

/// Whether a value counts as empty: null, an empty string, array or
/// object, `false`, or zero.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Flattens an object into a map of strings. Strings are kept as they are,
/// other scalars are rendered as JSON and nulls are dropped.
pub fn into_string_map(content: Value) -> Result<HashMap<String, String>, serde_json::Error> {
    let fields: HashMap<String, Value> = serde_json::from_value(content)?;

    Ok(fields
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}

/// A company as listed by the account service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRecord {
    #[serde(rename = "companyID")]
    pub company_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Parses the content string returned by
/// [`Client::read_all_companies`](crate::Client::read_all_companies).
pub fn parse_companies(content: &str) -> Result<Vec<CompanyRecord>, serde_json::Error> {
    let companies: Option<Vec<CompanyRecord>> = serde_json::from_str(content)?;

    Ok(companies.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_body_has_no_content() {
        assert_eq!(decode_content("").unwrap(), None);
        assert_eq!(decode_content("  \n").unwrap(), None);
    }

    #[test]
    fn missing_content_is_not_a_decode_error() {
        assert_eq!(decode_content(r#"{"code": 200}"#).unwrap(), None);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        assert!(decode_content("<html>bad gateway</html>").is_err());
        assert!(decode_content(r#""just a string""#).is_err());
    }

    #[test]
    fn emptiness_matches_zero_values() {
        let empty = [
            json!(null),
            json!(""),
            json!([]),
            json!({}),
            json!(false),
            json!(0),
            json!(0.0),
        ];

        for value in empty {
            assert!(is_empty_value(&value), "{value} should be empty");
        }

        for value in [json!("x"), json!([1]), json!({"a": 1}), json!(true), json!(3)] {
            assert!(!is_empty_value(&value), "{value} should not be empty");
        }
    }

    #[test]
    fn string_map_renders_scalars() {
        let map = into_string_map(json!({
            "accessToken": "abc",
            "isApplicationAdmin": true,
            "expiresIn": 3600,
            "refreshToken": null,
        }))
        .unwrap();

        assert_eq!(map.get(ACCESS_TOKEN).map(String::as_str), Some("abc"));
        assert_eq!(map.get("isApplicationAdmin").map(String::as_str), Some("true"));
        assert_eq!(map.get("expiresIn").map(String::as_str), Some("3600"));
        assert!(!map.contains_key("refreshToken"));
    }

    #[test]
    fn string_map_rejects_non_objects() {
        assert!(into_string_map(json!("logged in")).is_err());
    }

    #[test]
    fn parses_listed_companies() {
        let companies = parse_companies(
            r#"[{"companyID": "c-1", "name": "acme", "role": "admin", "extra": 1}]"#,
        )
        .unwrap();

        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].company_id, "c-1");
        assert_eq!(companies[0].role.as_deref(), Some("admin"));
        assert!(parse_companies("null").unwrap().is_empty());
    }
}
