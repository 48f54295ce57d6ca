//! Authentication service
//!
//! Starts and ends sessions:
//! - Login stores the issued token pair
//! - Registration reports the backend's message or its field errors
//! - Logout forgets both tokens

use std::sync::Arc;

use crate::gateways::AuthGateway;
use crate::http::{field_errors, ApiError};
use crate::models::{LoginInput, RegisterInput};
use crate::storage::{Credentials, StorageError, TokenStore};

/// Error types for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Login refused, or answered without an access token
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Registration refused; `fields` holds per-field messages verbatim
    #[error("{message}")]
    Rejected {
        message: String,
        fields: Vec<(String, Vec<String>)>,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Session lifecycle
pub struct AuthService {
    gateway: AuthGateway,
    tokens: Arc<TokenStore>,
}

impl AuthService {
    pub fn new(gateway: AuthGateway, tokens: Arc<TokenStore>) -> Self {
        Self { gateway, tokens }
    }

    /// Log in and store the issued token pair
    pub async fn login(&self, input: &LoginInput) -> Result<(), AuthServiceError> {
        let pair = match self.gateway.login(input).await {
            Ok(pair) => pair,
            Err(e) if matches!(e.status(), Some(400 | 401)) => {
                tracing::debug!("Login refused for {}: {}", input.username, e);
                return Err(AuthServiceError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(access) = pair.access.filter(|a| !a.is_empty()) else {
            return Err(AuthServiceError::InvalidCredentials);
        };
        self.tokens.store(Credentials {
            access: Some(access),
            refresh: pair.refresh,
        })?;
        tracing::info!("Logged in as {}", input.username);
        Ok(())
    }

    /// Create an account; returns the backend's confirmation message
    ///
    /// Registration does not log the new user in.
    pub async fn register(&self, input: &RegisterInput) -> Result<String, AuthServiceError> {
        let response = match self.gateway.register(input).await {
            Ok(response) => response,
            Err(e @ ApiError::Status { .. }) => {
                return Err(AuthServiceError::Rejected {
                    fields: e.field_errors(),
                    message: e.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        match response.message {
            Some(message) => Ok(message),
            None => Err(AuthServiceError::Rejected {
                message: "Registration failed".to_string(),
                fields: field_errors(&serde_json::Value::Object(response.errors)),
            }),
        }
    }

    pub fn logout(&self) -> Result<(), AuthServiceError> {
        self.tokens.clear()?;
        tracing::info!("Logged out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_signed_in()
    }
}
