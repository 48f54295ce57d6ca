//! Service wiring
//!
//! Builds the transport, the session store, every gateway and every service
//! from a [`Config`], once, at startup.

use anyhow::Context;
use std::sync::Arc;

use crate::config::Config;
use crate::gateways::{AuthGateway, ProfileGateway, ReviewsGateway, SpotifyGateway};
use crate::http::{HttpClient, ReqwestTransport, Transport};
use crate::services::{ArtistService, AuthService, ProfileService, ReviewService};
use crate::storage::{FileTokenBackend, TokenStore};

/// Every service, sharing one transport and one session store
pub struct ServiceContainer {
    pub tokens: Arc<TokenStore>,
    pub auth: AuthService,
    pub reviews: Arc<ReviewService>,
    pub profile: ProfileService,
    pub artists: ArtistService,
}

impl ServiceContainer {
    /// Wire the production stack: reqwest transport, file-backed session
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(config.api.timeout())
            .context("Failed to build HTTP transport")?;
        let tokens = TokenStore::open(FileTokenBackend::new(&config.session.path))
            .with_context(|| format!("Failed to open session at {}", config.session.path.display()))?;

        tracing::debug!(
            "Services ready (backend: {}, signed in: {})",
            config.api.base_url,
            tokens.is_signed_in()
        );
        Ok(Self::with_parts(config, Arc::new(transport), Arc::new(tokens)))
    }

    /// Wire services over an arbitrary transport and store
    pub fn with_parts(config: &Config, transport: Arc<dyn Transport>, tokens: Arc<TokenStore>) -> Self {
        let http = HttpClient::new(config.api.base_url.clone(), transport.clone(), tokens.clone());

        let reviews = Arc::new(ReviewService::new(ReviewsGateway::new(http.clone()), tokens.clone()));
        let spotify = SpotifyGateway::new(config.spotify.clone(), transport);

        Self {
            auth: AuthService::new(AuthGateway::new(http.clone()), tokens.clone()),
            profile: ProfileService::new(ProfileGateway::new(http), tokens.clone()),
            artists: ArtistService::new(spotify, reviews.clone()),
            reviews,
            tokens,
        }
    }
}
