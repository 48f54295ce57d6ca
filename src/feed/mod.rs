//! Review collection view-model
//!
//! [`ReviewFeed`] owns a loaded review collection plus the user's filter
//! settings and keeps the derived views (the visible list and the artist and
//! album choices) in sync. Derived views are recomputed only when one of
//! their inputs actually changes.

pub mod filter;

pub use filter::{apply, AlbumFilter, FilterChoice, ReviewFilter, SortKey};

use crate::models::Review;

/// Memoized filter/sort state over one review collection
#[derive(Debug, Clone, Default)]
pub struct ReviewFeed {
    reviews: Vec<Review>,
    filter: ReviewFilter,
    visible: Vec<Review>,
    artist_choices: Vec<FilterChoice>,
    album_choices: Vec<FilterChoice>,
    recomputations: usize,
}

impl ReviewFeed {
    pub fn new(reviews: Vec<Review>) -> Self {
        Self::with_filter(reviews, ReviewFilter::default())
    }

    pub fn with_filter(reviews: Vec<Review>, filter: ReviewFilter) -> Self {
        let mut feed = Self {
            reviews,
            filter,
            ..Default::default()
        };
        feed.refresh_choices();
        feed.refresh_visible();
        feed
    }

    /// Replace the source collection
    ///
    /// Returns whether anything changed.
    pub fn set_reviews(&mut self, reviews: Vec<Review>) -> bool {
        if reviews == self.reviews {
            return false;
        }
        self.reviews = reviews;
        self.refresh_choices();
        self.refresh_visible();
        true
    }

    /// Replace the filter; returns whether anything changed
    pub fn set_filter(&mut self, filter: ReviewFilter) -> bool {
        if filter == self.filter {
            return false;
        }
        self.filter = filter;
        self.refresh_visible();
        true
    }

    /// Edit the filter in place
    pub fn update_filter(&mut self, edit: impl FnOnce(&mut ReviewFilter)) -> bool {
        let mut filter = self.filter.clone();
        edit(&mut filter);
        self.set_filter(filter)
    }

    /// Reset every constraint and the sort order
    pub fn clear_filters(&mut self) -> bool {
        self.set_filter(ReviewFilter::default())
    }

    /// Drop a review after the backend confirmed its deletion
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.reviews.len();
        self.reviews.retain(|r| r.id != id);
        if self.reviews.len() == before {
            return false;
        }
        self.refresh_choices();
        self.refresh_visible();
        true
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn filter(&self) -> &ReviewFilter {
        &self.filter
    }

    pub fn visible(&self) -> &[Review] {
        &self.visible
    }

    /// Size of the source collection
    pub fn total(&self) -> usize {
        self.reviews.len()
    }

    /// Number of reviews passing the filter
    pub fn shown(&self) -> usize {
        self.visible.len()
    }

    pub fn artist_choices(&self) -> &[FilterChoice] {
        &self.artist_choices
    }

    pub fn album_choices(&self) -> &[FilterChoice] {
        &self.album_choices
    }

    /// How many times the visible list has been derived
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    fn refresh_visible(&mut self) {
        self.visible = apply(&self.reviews, &self.filter);
        self.recomputations += 1;
        tracing::debug!(
            "Review feed recomputed: {} of {} visible",
            self.visible.len(),
            self.reviews.len()
        );
    }

    fn refresh_choices(&mut self) {
        self.artist_choices = filter::choices(self.reviews.iter().map(|r| Some(r.artist.as_str())));
        self.album_choices = filter::choices(self.reviews.iter().map(|r| r.album.as_deref()));
    }
}
