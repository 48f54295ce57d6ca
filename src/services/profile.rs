//! Profile service

use std::sync::Arc;

use crate::gateways::ProfileGateway;
use crate::http::ApiError;
use crate::models::{Profile, Review};
use crate::storage::TokenStore;

/// Shown when a signed-out user opens the profile
pub const PROFILE_REQUIRES_LOGIN: &str = "You must be logged in to view your profile.";

#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    #[error("{0}")]
    NotLoggedIn(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Profile page data: the account and the reviews it wrote
#[derive(Debug, Clone)]
pub struct ProfileOverview {
    pub profile: Profile,
    pub reviews: Vec<Review>,
}

pub struct ProfileService {
    gateway: ProfileGateway,
    tokens: Arc<TokenStore>,
}

impl ProfileService {
    pub fn new(gateway: ProfileGateway, tokens: Arc<TokenStore>) -> Self {
        Self { gateway, tokens }
    }

    fn require_login(&self) -> Result<(), ProfileServiceError> {
        if self.tokens.is_signed_in() {
            Ok(())
        } else {
            Err(ProfileServiceError::NotLoggedIn(PROFILE_REQUIRES_LOGIN))
        }
    }

    pub async fn me(&self) -> Result<Profile, ProfileServiceError> {
        self.require_login()?;
        Ok(self.gateway.me().await?)
    }

    pub async fn my_reviews(&self) -> Result<Vec<Review>, ProfileServiceError> {
        self.require_login()?;
        Ok(self.gateway.my_reviews().await?)
    }

    /// Profile, then the user's reviews
    pub async fn overview(&self) -> Result<ProfileOverview, ProfileServiceError> {
        let profile = self.me().await?;
        let reviews = self.my_reviews().await?;
        Ok(ProfileOverview { profile, reviews })
    }

    /// Whether the signed-in user is an administrator
    ///
    /// Any failure, including being signed out, counts as "no".
    pub async fn is_admin(&self) -> bool {
        match self.me().await {
            Ok(profile) => profile.is_admin,
            Err(e) => {
                tracing::debug!("Admin check failed: {}", e);
                false
            }
        }
    }
}
