//! Error types for the HTTP layer

use serde_json::Value;

use crate::storage::StorageError;

/// Decoded response body
///
/// JSON responses are parsed; anything else is kept as text.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Human-readable message for a failed response
    ///
    /// Text bodies are used verbatim; JSON bodies contribute their `detail`
    /// or `message` field. Anything else falls back to `HTTP <status>`.
    pub fn error_message(&self, status: u16) -> String {
        let found = match self {
            ResponseBody::Text(text) => Some(text.trim()).filter(|t| !t.is_empty()),
            ResponseBody::Json(value) => ["detail", "message"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str)),
        };
        match found {
            Some(message) => message.to_string(),
            None => format!("HTTP {}", status),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }
}

/// Errors produced by [`super::HttpClient`] and the gateways built on it
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No access token is stored; nothing was sent
    #[error("Not logged in")]
    Unauthenticated,

    /// The request never produced a response
    #[error("Network error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        body: ResponseBody,
    },

    /// A 2xx response did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

impl ApiError {
    /// Build a status error from a failed response body
    pub fn from_status(status: u16, body: ResponseBody) -> Self {
        ApiError::Status {
            status,
            message: body.error_message(status),
            body,
        }
    }

    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure means the caller is not (or no longer) signed in
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthenticated) || self.status() == Some(401)
    }

    /// Per-field validation errors, as returned by the backend's serializers
    ///
    /// `{"email": ["already used"]}` yields `[("email", ["already used"])]`.
    /// The `detail`/`message` keys are not field errors and are skipped.
    pub fn field_errors(&self) -> Vec<(String, Vec<String>)> {
        match self {
            ApiError::Status { body, .. } => body.as_json().map(field_errors).unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// Per-field messages of a serializer error document
///
/// Non-object documents have no field errors.
pub fn field_errors(document: &Value) -> Vec<(String, Vec<String>)> {
    let Value::Object(map) = document else {
        return Vec::new();
    };

    map.iter()
        .filter(|(key, _)| key.as_str() != "detail" && key.as_str() != "message")
        .filter_map(|(key, value)| {
            let messages: Vec<String> = match value {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
                _ => return None,
            };
            (!messages.is_empty()).then(|| (key.clone(), messages))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_prefers_detail() {
        let body = ResponseBody::Json(json!({"detail": "Bad Request", "message": "ignored"}));
        assert_eq!(body.error_message(400), "Bad Request");
    }

    #[test]
    fn test_error_message_uses_message_field() {
        let body = ResponseBody::Json(json!({"message": "Nope"}));
        assert_eq!(body.error_message(403), "Nope");
    }

    #[test]
    fn test_error_message_text_and_fallback() {
        assert_eq!(ResponseBody::Text("Server exploded".into()).error_message(500), "Server exploded");
        assert_eq!(ResponseBody::Text("  ".into()).error_message(502), "HTTP 502");
        assert_eq!(ResponseBody::Json(json!({"email": ["x"]})).error_message(400), "HTTP 400");
        assert_eq!(ResponseBody::Json(Value::Null).error_message(404), "HTTP 404");
    }

    #[test]
    fn test_status_error_display_is_message() {
        let err = ApiError::from_status(400, ResponseBody::Json(json!({"detail": "Bad Request"})));
        assert_eq!(err.to_string(), "Bad Request");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_field_errors() {
        let err = ApiError::from_status(
            400,
            ResponseBody::Json(json!({
                "email": ["already used"],
                "password": "too short",
                "detail": "Invalid",
                "count": 3
            })),
        );

        let mut fields = err.field_errors();
        fields.sort();
        assert_eq!(
            fields,
            vec![
                ("email".to_string(), vec!["already used".to_string()]),
                ("password".to_string(), vec!["too short".to_string()]),
            ]
        );
        assert!(ApiError::Unauthenticated.field_errors().is_empty());
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(ApiError::Unauthenticated.is_unauthorized());
        assert!(ApiError::from_status(401, ResponseBody::Json(Value::Null)).is_unauthorized());
        assert!(!ApiError::from_status(403, ResponseBody::Json(Value::Null)).is_unauthorized());
    }
}
