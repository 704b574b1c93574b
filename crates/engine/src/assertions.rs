//! Status, payload and membership assertions over captured calls

use serde_json::{Map, Value};

use crate::error::{EngineError, EngineResult};
use crate::form::PayloadMatch;
use crate::intercept::Interception;

pub fn assert_status(interception: &Interception, expected: u16) -> EngineResult<()> {
    if interception.status != expected {
        return Err(EngineError::validation(
            format!(
                "status of @{} ({} {})",
                interception.alias, interception.method, interception.url
            ),
            expected,
            interception.status,
        ));
    }
    Ok(())
}

/// Compare a request body with the payload a fixture should produce
///
/// Arrays are compared as unordered collections; everything else must be
/// deep-equal.
pub fn assert_payload(
    actual: &Value,
    expected: &Map<String, Value>,
    mode: PayloadMatch,
) -> EngineResult<()> {
    let Some(body) = actual.as_object() else {
        return Err(EngineError::validation(
            "request body is a JSON object",
            Value::Object(expected.clone()),
            actual,
        ));
    };

    if mode == PayloadMatch::Exact {
        let unexpected: Vec<&str> = body
            .keys()
            .filter(|k| !expected.contains_key(*k))
            .map(String::as_str)
            .collect();
        if !unexpected.is_empty() {
            return Err(EngineError::validation(
                format!("request body has no keys beyond the fixture (extra: {:?})", unexpected),
                Value::Object(expected.clone()),
                actual,
            ));
        }
    }

    for (key, want) in expected {
        let Some(got) = body.get(key) else {
            return Err(EngineError::validation(
                format!("request body contains '{}'", key),
                want,
                actual,
            ));
        };

        match want {
            Value::Array(members) => assert_members(key, got, members)?,
            _ if got != want => {
                return Err(EngineError::validation(
                    format!("request body field '{}'", key),
                    want,
                    got,
                ));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Same members, any order
pub fn assert_members(field: &str, actual: &Value, expected: &[Value]) -> EngineResult<()> {
    let Some(got) = actual.as_array() else {
        return Err(EngineError::validation(
            format!("field '{}' is an array", field),
            Value::Array(expected.to_vec()),
            actual,
        ));
    };

    if !same_members(got, expected, |a, b| a == b) {
        return Err(EngineError::validation(
            format!("members of '{}'", field),
            Value::Array(expected.to_vec()),
            actual,
        ));
    }
    Ok(())
}

fn same_members(got: &[Value], want: &[Value], eq: impl Fn(&Value, &Value) -> bool) -> bool {
    if got.len() != want.len() {
        return false;
    }
    let mut used = vec![false; got.len()];
    want.iter().all(|w| {
        match got
            .iter()
            .enumerate()
            .find(|(i, g)| !used[*i] && eq(*g, w))
        {
            Some((i, _)) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Scalar equality that tolerates the API echoing strings back as numbers
/// or booleans (`"101"` == `101`, `"true"` == `true`)
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => same_members(x, y, loose_eq),
        (Value::Object(_), _) | (_, Value::Object(_)) => a == b,
        (Value::Array(_), _) | (_, Value::Array(_)) => false,
        _ => scalar_text(a) == scalar_text(b),
    }
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Find the entry of a listing response that carries every expected field
pub fn find_listing_entry<'a>(
    body: &'a Value,
    items_key: Option<&str>,
    expected: &Map<String, Value>,
) -> EngineResult<&'a Value> {
    let items = match items_key {
        Some(key) => body.get(key),
        None => Some(body),
    }
    .and_then(Value::as_array)
    .ok_or_else(|| {
        EngineError::validation(
            format!(
                "listing response holds an array{}",
                items_key.map(|k| format!(" under '{}'", k)).unwrap_or_default()
            ),
            "array of entries",
            body,
        )
    })?;

    items
        .iter()
        .find(|entry| {
            expected
                .iter()
                .all(|(k, v)| entry.get(k).map(|got| loose_eq(got, v)).unwrap_or(false))
        })
        .ok_or_else(|| {
            EngineError::validation(
                "listing contains the created entity",
                Value::Object(expected.clone()),
                format!("no match among {} entries", items.len()),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn expected(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn call(status: u16) -> Interception {
        Interception {
            alias: "postMessage".into(),
            method: "POST".into(),
            url: "/message".into(),
            status,
            request_body: Value::Null,
            response_body: Value::Null,
        }
    }

    #[test]
    fn test_status() {
        assert!(assert_status(&call(201), 201).is_ok());
        let err = assert_status(&call(400), 201).unwrap_err();
        assert!(err.to_string().contains("@postMessage"));
    }

    #[test]
    fn test_exact_payload_rejects_extra_keys() {
        let want = expected(json!({"name": "Jane", "email": "j@example.com"}));
        let body = json!({"name": "Jane", "email": "j@example.com", "phone": "1"});
        assert!(assert_payload(&body, &want, PayloadMatch::Exact).is_err());
        assert!(assert_payload(&body, &want, PayloadMatch::Include).is_ok());
    }

    #[test]
    fn test_payload_missing_key() {
        let want = expected(json!({"name": "Jane", "email": "j@example.com"}));
        let body = json!({"name": "Jane"});
        let err = assert_payload(&body, &want, PayloadMatch::Include).unwrap_err();
        assert!(err.to_string().contains("'email'"));
    }

    #[test]
    fn test_payload_arrays_are_unordered() {
        let want = expected(json!({"features": ["WiFi", "TV", "Safe"]}));
        let body = json!({"features": ["Safe", "WiFi", "TV"]});
        assert!(assert_payload(&body, &want, PayloadMatch::Exact).is_ok());

        let body = json!({"features": ["Safe", "WiFi"]});
        assert!(assert_payload(&body, &want, PayloadMatch::Exact).is_err());
    }

    #[test]
    fn test_members_requires_array() {
        let err = assert_members("features", &json!("WiFi"), &[json!("WiFi")]).unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[test_case(json!("101"), json!(101), true ; "string vs number")]
    #[test_case(json!("true"), json!(true), true ; "string vs bool")]
    #[test_case(json!("false"), json!(true), false ; "different bools")]
    #[test_case(json!(["TV", "Radio"]), json!(["Radio", "TV"]), true ; "arrays unordered")]
    #[test_case(json!(["TV"]), json!("TV"), false ; "array vs scalar")]
    fn test_loose_eq(a: Value, b: Value, equal: bool) {
        assert_eq!(loose_eq(&a, &b), equal);
    }

    #[test]
    fn test_find_listing_entry() {
        let body = json!({"rooms": [
            {"roomName": "101", "type": "Single", "roomPrice": 100, "features": []},
            {"roomName": "7", "type": "Suite", "roomPrice": 250, "accessible": true,
             "features": ["TV", "WiFi"]}
        ]});
        let want = expected(json!({
            "roomName": "7", "type": "Suite", "roomPrice": "250",
            "accessible": "true", "features": ["WiFi", "TV"]
        }));
        let entry = find_listing_entry(&body, Some("rooms"), &want).unwrap();
        assert_eq!(entry["roomName"], "7");

        let missing = expected(json!({"roomName": "8"}));
        assert!(find_listing_entry(&body, Some("rooms"), &missing).is_err());
        assert!(find_listing_entry(&body, None, &want).is_err());
    }
}
