//! Spotify Web API gateway
//!
//! Read-only access to the public catalog using the client-credentials flow.
//! The capability token is cached in a [`TokenCache`] and fetched lazily
//! whenever it is missing or expired.

use data_encoding::BASE64;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

use crate::cache::TokenCache;
use crate::config::SpotifyConfig;
use crate::http::{ApiError, HttpRequest, Transport};
use crate::models::{Album, Artist, ClientToken, Track};

/// Number of artists returned by a search
const SEARCH_LIMIT: u32 = 10;
/// Number of albums listed for an artist
const ALBUM_LIMIT: u32 = 20;

/// Catalog operation, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogCall {
    SearchArtists,
    ArtistDetails,
    ArtistAlbums,
    TopTracks,
}

impl CatalogCall {
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::SearchArtists => "Failed to search artists",
            Self::ArtistDetails => "Failed to fetch artist details",
            Self::ArtistAlbums => "Failed to fetch albums",
            Self::TopTracks => "Failed to fetch top tracks",
        }
    }
}

/// Spotify gateway errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SpotifyError {
    #[error("Spotify client credentials are not configured")]
    NotConfigured,

    /// The accounts service refused or could not be reached
    #[error("Failed to get access token")]
    Token { status: Option<u16>, detail: String },

    /// A catalog request failed
    #[error("{}", .call.failure_message())]
    Request {
        call: CatalogCall,
        status: Option<u16>,
        detail: String,
    },
}

#[derive(Deserialize)]
struct Page<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct ArtistSearch {
    artists: Page<Artist>,
}

#[derive(Deserialize)]
struct TopTracks {
    tracks: Vec<Track>,
}

/// Gateway to the Spotify catalog
#[derive(Clone)]
pub struct SpotifyGateway {
    config: SpotifyConfig,
    transport: Arc<dyn Transport>,
    tokens: TokenCache,
}

impl std::fmt::Debug for SpotifyGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyGateway")
            .field("api_url", &self.config.api_url)
            .field("tokens", &self.tokens)
            .finish()
    }
}

impl SpotifyGateway {
    pub fn new(config: SpotifyConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_cache(config, transport, TokenCache::new())
    }

    pub fn with_cache(config: SpotifyConfig, transport: Arc<dyn Transport>, tokens: TokenCache) -> Self {
        Self {
            config,
            transport,
            tokens,
        }
    }

    /// Search artists by name (first page only)
    pub async fn search_artists(&self, name: &str) -> Result<Vec<Artist>, SpotifyError> {
        let url = format!(
            "{}/search?q={}&type=artist&limit={}",
            self.api_url(),
            urlencoding::encode(name),
            SEARCH_LIMIT
        );
        let found: ArtistSearch = self.get(CatalogCall::SearchArtists, &url).await?;
        Ok(found.artists.items)
    }

    pub async fn get_artist(&self, artist_id: &str) -> Result<Artist, SpotifyError> {
        let url = format!("{}/artists/{}", self.api_url(), urlencoding::encode(artist_id));
        self.get(CatalogCall::ArtistDetails, &url).await
    }

    /// Albums and singles of an artist
    pub async fn get_artist_albums(&self, artist_id: &str) -> Result<Vec<Album>, SpotifyError> {
        let url = format!(
            "{}/artists/{}/albums?include_groups=album,single&limit={}",
            self.api_url(),
            urlencoding::encode(artist_id),
            ALBUM_LIMIT
        );
        let page: Page<Album> = self.get(CatalogCall::ArtistAlbums, &url).await?;
        Ok(page.items)
    }

    pub async fn get_artist_top_tracks(
        &self,
        artist_id: &str,
        market: &str,
    ) -> Result<Vec<Track>, SpotifyError> {
        let url = format!(
            "{}/artists/{}/top-tracks?market={}",
            self.api_url(),
            urlencoding::encode(artist_id),
            urlencoding::encode(market)
        );
        let top: TopTracks = self.get(CatalogCall::TopTracks, &url).await?;
        Ok(top.tracks)
    }

    fn api_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    async fn get<T: DeserializeOwned>(&self, call: CatalogCall, url: &str) -> Result<T, SpotifyError> {
        let token = self.access_token().await?;

        let mut request = HttpRequest::new(Method::GET, url);
        request
            .headers
            .insert(AUTHORIZATION, bearer(&token).map_err(|detail| request_error(call, None, detail))?);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| request_error(call, None, e.to_string()))?;

        if response.status == StatusCode::UNAUTHORIZED {
            // Revoked before its advertised expiry; start over next time
            self.tokens.invalidate().await;
        }
        if !response.is_success() {
            return Err(request_error(
                call,
                Some(response.status.as_u16()),
                response.text(),
            ));
        }

        response
            .json_as()
            .map_err(|e| request_error(call, Some(response.status.as_u16()), e.to_string()))
    }

    /// Cached client-credentials token, fetched on demand
    async fn access_token(&self) -> Result<String, SpotifyError> {
        if !self.config.is_configured() {
            return Err(SpotifyError::NotConfigured);
        }
        self.tokens
            .get_or_fetch(|| self.fetch_token())
            .await
            .map_err(|e| (*e).clone())
    }

    async fn fetch_token(&self) -> Result<ClientToken, SpotifyError> {
        let credentials = BASE64.encode(
            format!("{}:{}", self.config.client_id, self.config.client_secret).as_bytes(),
        );
        let authorization = HeaderValue::from_str(&format!("Basic {}", credentials))
            .map_err(|e| token_error(None, e.to_string()))?;

        let mut request = HttpRequest::new(Method::POST, self.config.accounts_url.clone());
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request.headers.insert(AUTHORIZATION, authorization);
        request.body = Some("grant_type=client_credentials".to_string());

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e: ApiError| token_error(None, e.to_string()))?;
        if !response.is_success() {
            tracing::warn!("Spotify token request rejected with {}", response.status);
            return Err(token_error(Some(response.status.as_u16()), response.text()));
        }
        response
            .json_as()
            .map_err(|e| token_error(Some(response.status.as_u16()), e.to_string()))
    }
}

fn bearer(token: &str) -> Result<HeaderValue, String> {
    HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| e.to_string())
}

fn token_error(status: Option<u16>, detail: String) -> SpotifyError {
    SpotifyError::Token { status, detail }
}

fn request_error(call: CatalogCall, status: Option<u16>, detail: String) -> SpotifyError {
    SpotifyError::Request {
        call,
        status,
        detail,
    }
}
