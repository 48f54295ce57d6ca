//! Data models
//!
//! This module contains the data structures exchanged with the two remote
//! services the client talks to:
//! - The review backend (reviews, profiles, auth payloads)
//! - The Spotify Web API (artists, albums, tracks)

mod review;
mod spotify;
mod user;

pub use review::{NewReview, Review, ReviewQuery, MAX_RATING, MIN_RATING};
pub use spotify::{Album, Artist, ClientToken, ExternalUrls, Followers, Image, Track};
pub use user::{LoginInput, Profile, RefreshedToken, RegisterInput, RegisterResponse, TokenPair};
