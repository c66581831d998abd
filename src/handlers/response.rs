use crate::constants::SENSITIVE_FIELDS;
use crate::error::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Removes credential fields from every object nested in `value`
pub fn strip_sensitive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for field in SENSITIVE_FIELDS {
                map.remove(*field);
            }
            map.values_mut().for_each(strip_sensitive);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_sensitive),
        _ => {}
    }
}

/// Serializes `record` and strips its credential fields
pub fn public_json<T: Serialize>(record: &T) -> Result<Value> {
    let mut value = serde_json::to_value(record)?;
    strip_sensitive(&mut value);
    Ok(value)
}

/// JSON body with password and refresh token hashes stripped out
pub struct Sanitized<T>(pub T);

impl<T: Serialize> IntoResponse for Sanitized<T> {
    fn into_response(self) -> Response {
        match public_json(&self.0) {
            Ok(value) => Json(value).into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// `201 Created` with a sanitized body
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let mut response = Sanitized(self.0).into_response();
        if response.status().is_success() {
            *response.status_mut() = StatusCode::CREATED;
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_nested_credentials() {
        let mut value = json!({
            "username": "jane",
            "password": "$argon2id$...",
            "refresh_token": null,
            "doctors": [{ "username": "house", "password": "$argon2id$..." }],
            "user": { "refresh_token": "$argon2id$..." }
        });
        strip_sensitive(&mut value);

        assert_eq!(value["username"], "jane");
        assert!(value.get("password").is_none());
        assert!(value.get("refresh_token").is_none());
        assert!(value["doctors"][0].get("password").is_none());
        assert_eq!(value["doctors"][0]["username"], "house");
        assert!(value["user"].get("refresh_token").is_none());
    }

    #[test]
    fn test_scalars_and_lists_pass_through() {
        let value = public_json(&vec![json!({ "count": 2, "password": "x" }), json!(7)]).unwrap();
        assert_eq!(value, json!([{ "count": 2 }, 7]));
    }
}
