//! Review model

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Lowest accepted rating
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating
pub const MAX_RATING: u8 = 5;

/// Review as returned by the backend
///
/// Records are server-owned. The client never edits one in place; after a
/// create or delete it replaces its local collection wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    /// Author's display name
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: String,
    /// Creation timestamp as sent by the server
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Review {
    /// Album title, treating an empty string as "no album"
    pub fn album_title(&self) -> Option<&str> {
        self.album.as_deref().filter(|a| !a.is_empty())
    }

    /// Creation time in milliseconds since the epoch
    ///
    /// Missing or unparsable timestamps map to `0` so that they sort as the
    /// oldest possible records instead of failing a comparison.
    pub fn created_millis(&self) -> i64 {
        self.created_at.as_deref().map(parse_timestamp).unwrap_or(0)
    }
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse the timestamp formats the backend is known to emit
fn parse_timestamp(raw: &str) -> i64 {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.timestamp_millis();
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_utc().timestamp_millis();
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Payload for creating a review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub title: String,
    pub content: String,
    pub rating: u8,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    pub album: Option<String>,
    pub album_id: Option<String>,
}

impl NewReview {
    /// Review of an artist as a whole, with no album attached
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        rating: u8,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            rating,
            artist: artist.into(),
            artist_id: None,
            album: None,
            album_id: None,
        }
    }

    /// Check the fields the backend would otherwise reject
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }
        if self.content.trim().is_empty() {
            return Err("Content cannot be empty".to_string());
        }
        if self.artist.trim().is_empty() {
            return Err("Artist cannot be empty".to_string());
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            ));
        }
        Ok(())
    }
}

/// Query for the public review listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewQuery {
    /// Restrict to reviews of one Spotify artist
    pub artist_id: Option<String>,
}

impl ReviewQuery {
    pub fn for_artist(artist_id: impl Into<String>) -> Self {
        Self {
            artist_id: Some(artist_id.into()),
        }
    }

    /// Query string including the leading `?`, or empty when unconstrained
    pub fn to_query_string(&self) -> String {
        match &self.artist_id {
            Some(id) => format!("?artist_id={}", urlencoding::encode(id)),
            None => String::new(),
        }
    }
}
