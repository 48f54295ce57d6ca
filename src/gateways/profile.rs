//! Profile endpoints of the review backend

use crate::http::{ApiError, HttpClient};
use crate::models::{Profile, Review};

/// `GET /me/` and `GET /my-reviews/`, both authenticated
#[derive(Debug, Clone)]
pub struct ProfileGateway {
    http: HttpClient,
}

impl ProfileGateway {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn me(&self) -> Result<Profile, ApiError> {
        self.http.get_json("/me/").await
    }

    pub async fn my_reviews(&self) -> Result<Vec<Review>, ApiError> {
        self.http.get_json("/my-reviews/").await
    }
}
