//! Plain-text rendering of domain values

use chrono::DateTime;

use crate::feed::{FilterChoice, ReviewFeed};
use crate::models::{Album, Artist, Profile, Review, Track};

pub const NO_MATCHES: &str = "No reviews match your filters.";
pub const NO_REVIEWS: &str = "No reviews yet.";

/// Calendar date of a review, if it has a usable timestamp
pub fn review_date(review: &Review) -> Option<String> {
    match review.created_millis() {
        0 => None,
        millis => DateTime::from_timestamp_millis(millis).map(|dt| dt.format("%Y-%m-%d").to_string()),
    }
}

/// Two-line summary of a review
pub fn review(review: &Review) -> String {
    let mut meta = format!("{}/5 by {}", review.rating, display_or(&review.user, "anonymous"));
    meta.push_str(&format!(" | {}", review.artist));
    if let Some(album) = review.album_title() {
        meta.push_str(&format!(" | Album: {}", album));
    }
    if let Some(date) = review_date(review) {
        meta.push_str(&format!(" | {}", date));
    }

    let mut out = format!("#{} {}\n    {}", review.id, review.title, meta);
    if !review.content.is_empty() {
        out.push_str(&format!("\n    {}", review.content));
    }
    out
}

pub fn choices(label: &str, choices: &[FilterChoice]) -> String {
    let values: Vec<String> = choices.iter().map(|c| c.to_string()).collect();
    format!("{}: {}", label, values.join(", "))
}

/// The review list page: counts, choices, then the visible reviews
pub fn feed(feed: &ReviewFeed) -> String {
    let mut lines = vec![
        choices("Artists", feed.artist_choices()),
        choices("Albums", feed.album_choices()),
        format!("Showing {} of {}", feed.shown(), feed.total()),
    ];
    if feed.visible().is_empty() {
        lines.push(NO_MATCHES.to_string());
    } else {
        lines.extend(feed.visible().iter().map(review));
    }
    lines.join("\n")
}

pub fn reviews(reviews: &[Review]) -> String {
    if reviews.is_empty() {
        return NO_REVIEWS.to_string();
    }
    reviews.iter().map(review).collect::<Vec<_>>().join("\n")
}

pub fn artist_line(artist: &Artist) -> String {
    match artist.follower_count() {
        Some(followers) => format!("{}  {} ({} followers)", artist.id, artist.name, followers),
        None => format!("{}  {}", artist.id, artist.name),
    }
}

pub fn artist(artist: &Artist) -> String {
    let mut lines = vec![artist.name.clone()];
    if let Some(followers) = artist.follower_count() {
        lines.push(format!("Followers: {}", followers));
    }
    if !artist.genres.is_empty() {
        lines.push(format!("Genres: {}", artist.genres.join(", ")));
    }
    if let Some(url) = &artist.external_urls.spotify {
        lines.push(format!("Spotify: {}", url));
    }
    lines.join("\n")
}

pub fn album(album: &Album) -> String {
    match album.release_year() {
        Some(year) => format!("{}  {} ({})", album.id, album.name, year),
        None => format!("{}  {}", album.id, album.name),
    }
}

/// `m:ss`
pub fn duration(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn track(position: usize, track: &Track) -> String {
    format!("{:>2}. {} [{}]", position, track.name, duration(track.duration_ms))
}

pub fn profile(profile: &Profile) -> String {
    let joined = profile
        .date_joined
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut lines = vec![
        format!("Username: {}", profile.username),
        format!("Email: {}", display_or(&profile.email, "-")),
        format!("Joined: {}", joined),
    ];
    if profile.is_admin {
        lines.push("Role: administrator".to_string());
    }
    lines.join("\n")
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}
