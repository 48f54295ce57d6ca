//! Account and authentication payloads

use serde::{Deserialize, Serialize};

/// The signed-in user's profile (`GET /me/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date_joined: Option<String>,
    /// Administrators may delete any review
    #[serde(default)]
    pub is_admin: bool,
}

/// Credentials submitted to `POST /token/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Account details submitted to `POST /register/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Password confirmation, checked by the backend
    pub password2: String,
}

/// Response of a successful login
///
/// Both fields are optional on the wire: a response without `access` is a
/// failed login even if the status was 2xx.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Response of `POST /token/refresh/`
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    pub access: String,
}

/// Response of `POST /register/`
///
/// A success carries `message`. Anything else in the body is kept in
/// `errors`, where the backend puts per-field validation messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub errors: serde_json::Map<String, serde_json::Value>,
}
