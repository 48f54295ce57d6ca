//! Review endpoints of the review backend

use serde_json::Value;

use crate::http::{ApiError, HttpClient};
use crate::models::{NewReview, Review, ReviewQuery};

/// Review listing, creation and moderation
#[derive(Debug, Clone)]
pub struct ReviewsGateway {
    http: HttpClient,
}

impl ReviewsGateway {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Public listing, optionally narrowed to one artist
    ///
    /// Sent without a token so that it works for anonymous visitors.
    pub async fn list(&self, query: &ReviewQuery) -> Result<Vec<Review>, ApiError> {
        let path = format!("/reviews/{}", query.to_query_string());
        self.http.public_get_json(&path).await
    }

    /// Create a review owned by the signed-in user
    pub async fn create(&self, review: &NewReview) -> Result<Value, ApiError> {
        self.http.post_json("/reviews/", review).await
    }

    /// Delete a review (administrators only, enforced by the backend)
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.http.delete_json(&format!("/reviews/{}/", id)).await?;
        Ok(())
    }
}
