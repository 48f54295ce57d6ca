//! Artist service
//!
//! Combines the Spotify catalog with the review backend: artist search,
//! the artist detail page (artist, albums, reviews) and reviewing an artist
//! or one of its albums.

use std::sync::Arc;

use crate::gateways::{SpotifyError, SpotifyGateway};
use crate::models::{Album, Artist, NewReview, Review, Track, MAX_RATING};
use crate::services::reviews::{ReviewService, ReviewServiceError};

#[derive(Debug, thiserror::Error)]
pub enum ArtistServiceError {
    #[error(transparent)]
    Spotify(#[from] SpotifyError),

    #[error(transparent)]
    Reviews(#[from] ReviewServiceError),
}

/// Everything the artist page shows
#[derive(Debug, Clone)]
pub struct ArtistDetail {
    pub artist: Artist,
    pub albums: Vec<Album>,
    pub reviews: Vec<Review>,
}

/// User-entered part of a review; the artist and album come from the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub title: String,
    pub content: String,
    pub rating: u8,
}

impl Default for ReviewDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            rating: MAX_RATING,
        }
    }
}

pub struct ArtistService {
    spotify: SpotifyGateway,
    reviews: Arc<ReviewService>,
}

impl ArtistService {
    pub fn new(spotify: SpotifyGateway, reviews: Arc<ReviewService>) -> Self {
        Self { spotify, reviews }
    }

    /// Search artists by name; a blank query finds nothing without asking
    pub async fn search(&self, query: &str) -> Result<Vec<Artist>, ArtistServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.spotify.search_artists(query).await?)
    }

    /// Load the artist, then its albums, then its reviews
    ///
    /// The first failure aborts the remaining loads.
    pub async fn detail(&self, artist_id: &str) -> Result<ArtistDetail, ArtistServiceError> {
        let artist = self.spotify.get_artist(artist_id).await?;
        let albums = self.spotify.get_artist_albums(artist_id).await?;
        let reviews = self.reviews.list(Some(artist_id)).await?;
        tracing::debug!(
            "Loaded {}: {} albums, {} reviews",
            artist.name,
            albums.len(),
            reviews.len()
        );
        Ok(ArtistDetail {
            artist,
            albums,
            reviews,
        })
    }

    pub async fn top_tracks(&self, artist_id: &str, market: &str) -> Result<Vec<Track>, ArtistServiceError> {
        Ok(self.spotify.get_artist_top_tracks(artist_id, market).await?)
    }

    /// Review an artist, or one of its albums, and reload its reviews
    pub async fn submit_review(
        &self,
        artist: &Artist,
        album: Option<&Album>,
        draft: &ReviewDraft,
    ) -> Result<Vec<Review>, ArtistServiceError> {
        let review = review_payload(artist, album, draft);
        self.reviews.submit(&review).await?;
        Ok(self.reviews.list(Some(&artist.id)).await?)
    }
}

/// Payload tying a draft to the Spotify artist and album it is about
pub fn review_payload(artist: &Artist, album: Option<&Album>, draft: &ReviewDraft) -> NewReview {
    NewReview {
        title: draft.title.clone(),
        content: draft.content.clone(),
        rating: draft.rating,
        artist: artist.name.clone(),
        artist_id: Some(artist.id.clone()),
        album: album.map(|a| a.name.clone()),
        album_id: album.map(|a| a.id.clone()),
    }
}
