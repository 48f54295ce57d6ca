//! Services layer - use cases
//!
//! Services sit between the front end and the gateways. They are
//! responsible for:
//! - Checking preconditions (a session) before any request is sent
//! - Validating input
//! - Sequencing multi-step loads and mapping failures to user messages

pub mod artist;
pub mod auth;
pub mod container;
pub mod profile;
pub mod reviews;

pub use artist::{ArtistDetail, ArtistService, ArtistServiceError, ReviewDraft};
pub use auth::{AuthService, AuthServiceError};
pub use container::ServiceContainer;
pub use profile::{ProfileOverview, ProfileService, ProfileServiceError};
pub use reviews::{ReviewService, ReviewServiceError};
