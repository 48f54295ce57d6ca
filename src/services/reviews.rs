//! Review service
//!
//! Listing is public. Creating and deleting require a session, checked
//! locally before any request is sent.

use serde_json::Value;
use std::sync::Arc;

use crate::gateways::ReviewsGateway;
use crate::http::ApiError;
use crate::models::{NewReview, Review, ReviewQuery};
use crate::storage::TokenStore;

/// Shown when a signed-out user tries to post a review
pub const SUBMIT_REQUIRES_LOGIN: &str = "You must be logged in to submit a review.";
/// Shown when a signed-out user tries to delete a review
pub const DELETE_REQUIRES_LOGIN: &str = "You must be logged in to delete a review.";

/// Error types for review operations
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("{0}")]
    NotLoggedIn(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct ReviewService {
    gateway: ReviewsGateway,
    tokens: Arc<TokenStore>,
}

impl ReviewService {
    pub fn new(gateway: ReviewsGateway, tokens: Arc<TokenStore>) -> Self {
        Self { gateway, tokens }
    }

    /// All reviews, or those of one Spotify artist
    pub async fn list(&self, artist_id: Option<&str>) -> Result<Vec<Review>, ReviewServiceError> {
        let query = artist_id.map(ReviewQuery::for_artist).unwrap_or_default();
        Ok(self.gateway.list(&query).await?)
    }

    /// Validate and post a new review; returns the created record as sent
    /// back by the backend
    pub async fn submit(&self, review: &NewReview) -> Result<Value, ReviewServiceError> {
        if !self.tokens.is_signed_in() {
            return Err(ReviewServiceError::NotLoggedIn(SUBMIT_REQUIRES_LOGIN));
        }
        review.validate().map_err(ReviewServiceError::Validation)?;

        let created = self.gateway.create(review).await?;
        tracing::info!("Submitted review '{}' for {}", review.title, review.artist);
        Ok(created)
    }

    /// Delete a review on the backend
    ///
    /// Local collections must only drop the review once this returns `Ok`.
    pub async fn delete(&self, id: i64) -> Result<(), ReviewServiceError> {
        if !self.tokens.is_signed_in() {
            return Err(ReviewServiceError::NotLoggedIn(DELETE_REQUIRES_LOGIN));
        }
        self.gateway.delete(id).await?;
        tracing::info!("Deleted review {}", id);
        Ok(())
    }
}
