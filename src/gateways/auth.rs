//! Account endpoints of the review backend

use crate::http::{ApiError, HttpClient};
use crate::models::{LoginInput, RegisterInput, RegisterResponse, TokenPair};

/// `POST /register/` and `POST /token/`
///
/// Both endpoints are public: they are how a session starts.
#[derive(Debug, Clone)]
pub struct AuthGateway {
    http: HttpClient,
}

impl AuthGateway {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn register(&self, input: &RegisterInput) -> Result<RegisterResponse, ApiError> {
        self.http.public_post_json("/register/", input).await
    }

    pub async fn login(&self, input: &LoginInput) -> Result<TokenPair, ApiError> {
        self.http.public_post_json("/token/", input).await
    }
}
