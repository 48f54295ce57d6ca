//! Domain gateways
//!
//! Each gateway translates domain calls into HTTP requests against one
//! remote service:
//! - [`ReviewsGateway`], [`ProfileGateway`], [`AuthGateway`] - the review backend
//! - [`SpotifyGateway`] - the Spotify Web API (read-only)

pub mod auth;
pub mod profile;
pub mod reviews;
pub mod spotify;

pub use auth::AuthGateway;
pub use profile::ProfileGateway;
pub use reviews::ReviewsGateway;
pub use spotify::{CatalogCall, SpotifyError, SpotifyGateway};
