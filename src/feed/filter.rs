//! Pure filter and sort over a review collection

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::models::Review;

/// Sort order of the visible reviews
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    RatingDesc,
    RatingAsc,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Newest,
        SortKey::Oldest,
        SortKey::RatingDesc,
        SortKey::RatingAsc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::RatingDesc => "rating_desc",
            SortKey::RatingAsc => "rating_asc",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown sort order '{}', expected one of: newest, oldest, rating_desc, rating_asc",
                    s
                )
            })
    }
}

/// Album constraint
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum AlbumFilter {
    /// No constraint
    #[default]
    Any,
    /// Only reviews that are not attached to an album
    Untitled,
    /// Exact album title
    Named(String),
}

impl AlbumFilter {
    pub fn matches(&self, review: &Review) -> bool {
        match self {
            AlbumFilter::Any => true,
            AlbumFilter::Untitled => review.album_title().is_none(),
            AlbumFilter::Named(title) => review.album_title() == Some(title.as_str()),
        }
    }
}

/// One entry of an artist or album dropdown
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterChoice {
    All,
    Value(String),
}

impl fmt::Display for FilterChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterChoice::All => f.write_str("all"),
            FilterChoice::Value(v) => f.write_str(v),
        }
    }
}

/// Filter and sort configuration of the review list
///
/// All constraints are conjunctive. The default constrains nothing and
/// sorts newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReviewFilter {
    /// Free-text search, trimmed and matched case-insensitively
    pub search: String,
    /// Exact artist name
    pub artist: Option<String>,
    pub album: AlbumFilter,
    /// Inclusive lower bound on the rating
    pub min_rating: Option<u8>,
    pub sort: SortKey,
}

impl ReviewFilter {
    /// Whether any constraint other than the sort order is active
    pub fn is_constrained(&self) -> bool {
        !self.search.trim().is_empty()
            || self.artist.is_some()
            || self.album != AlbumFilter::Any
            || self.min_rating.is_some()
    }

    /// Whether a review passes every constraint
    pub fn matches(&self, review: &Review) -> bool {
        self.matches_needle(review, &self.needle())
    }

    fn needle(&self) -> String {
        self.search.trim().to_lowercase()
    }

    fn matches_needle(&self, review: &Review, needle: &str) -> bool {
        if let Some(artist) = &self.artist {
            if &review.artist != artist {
                return false;
            }
        }
        if !self.album.matches(review) {
            return false;
        }
        if let Some(min) = self.min_rating {
            if review.rating < min {
                return false;
            }
        }
        needle.is_empty() || haystack(review).contains(needle)
    }
}

/// Searchable text of a review: its non-empty text fields joined by spaces
fn haystack(review: &Review) -> String {
    [
        review.title.as_str(),
        review.content.as_str(),
        review.user.as_str(),
        review.artist.as_str(),
        review.album.as_deref().unwrap_or(""),
    ]
    .into_iter()
    .filter(|field| !field.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// Filter then sort `reviews`, leaving the source untouched
///
/// Sorting is stable: reviews that compare equal keep their source order.
pub fn apply(reviews: &[Review], filter: &ReviewFilter) -> Vec<Review> {
    let needle = filter.needle();
    let mut visible: Vec<Review> = reviews
        .iter()
        .filter(|r| filter.matches_needle(r, &needle))
        .cloned()
        .collect();
    sort(&mut visible, filter.sort);
    visible
}

/// Stable in-place sort by `key`
pub fn sort(reviews: &mut [Review], key: SortKey) {
    match key {
        SortKey::Newest => reviews.sort_by_cached_key(|r| Reverse(r.created_millis())),
        SortKey::Oldest => reviews.sort_by_cached_key(|r| r.created_millis()),
        SortKey::RatingDesc => reviews.sort_by_key(|r| Reverse(r.rating)),
        SortKey::RatingAsc => reviews.sort_by_key(|r| r.rating),
    }
}

/// `All` followed by the distinct non-empty values, sorted
pub fn choices<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<FilterChoice> {
    let mut distinct: Vec<&str> = values.flatten().filter(|v| !v.is_empty()).collect();
    distinct.sort_unstable();
    distinct.dedup();

    std::iter::once(FilterChoice::All)
        .chain(distinct.into_iter().map(|v| FilterChoice::Value(v.to_string())))
        .collect()
}
