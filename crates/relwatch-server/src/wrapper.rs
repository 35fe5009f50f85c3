//! Response envelopes.
//!
//! Every `/api` response is `{success: bool, ...}`: successes carry `data`
//! (plus endpoint-specific siblings), failures carry `message`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::error;

/// `{success: true, data}`.
pub fn success(data: Value) -> Value {
    json!({
        "success": true,
        "data": data,
    })
}

/// `{success: true, data}` with extra top-level fields appended.
pub fn success_with<I>(data: Value, extra: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    let mut envelope = Map::new();
    envelope.insert("success".into(), Value::Bool(true));
    for (key, value) in extra {
        envelope.insert(key.into(), value);
    }
    envelope.insert("data".into(), data);
    Value::Object(envelope)
}

/// `{success: false, message}`.
pub fn failure(message: impl Into<String>) -> Value {
    json!({
        "success": false,
        "message": message.into(),
    })
}

/// Serialize a record for embedding in an envelope.
pub fn to_data<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(ApiError::from)
}

/// A failure envelope with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: failure(message),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Add a field next to `success` and `message`.
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(map) = &mut self.body {
            map.insert(key.to_string(), value);
        }
        self
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        error!("Failed to serialize response: {}", err);
        ApiError::internal("Failed to serialize response")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let value = success(json!({"php": {}}));
        assert_eq!(value["success"], true);
        assert!(value["data"]["php"].is_object());
    }

    #[test]
    fn test_success_with_extra_fields() {
        let value = success_with(json!({}), [("package", json!("react"))]);
        assert_eq!(value["success"], true);
        assert_eq!(value["package"], "react");
        assert!(value.get("data").is_some());
    }

    #[test]
    fn test_error_with_field() {
        let err = ApiError::new(StatusCode::NOT_FOUND, "Repository not found or has no releases")
            .with_field("status_code", json!(404));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.body["success"], false);
        assert_eq!(err.body["status_code"], 404);
    }
}
