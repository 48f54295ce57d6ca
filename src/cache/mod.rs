//! Capability token cache
//!
//! The Spotify catalog is read with a client-credentials token that is valid
//! for `expires_in` seconds. [`TokenCache`] keeps that token in memory (moka)
//! until it expires and fetches a new one lazily on the next dependent call.
//!
//! Concurrent callers arriving while a fetch is in flight wait for that fetch
//! instead of issuing their own, so a burst of catalog requests costs a single
//! token request.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::Expiry;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ClientToken;

/// The cache holds a single capability, so it has a single key
const TOKEN_KEY: &str = "client-credentials";

/// Token plus the lifetime it was issued with
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: String,
    pub lifetime: Duration,
    pub expires_at: DateTime<Utc>,
}

impl From<ClientToken> for CachedToken {
    fn from(issued: ClientToken) -> Self {
        let lifetime = Duration::from_secs(issued.expires_in);
        let expires_at = Utc::now()
            + chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            token: issued.access_token,
            lifetime,
            expires_at,
        }
    }
}

/// Per-entry expiry taken from the token's own lifetime
struct IssuedLifetime;

impl Expiry<&'static str, CachedToken> for IssuedLifetime {
    fn expire_after_create(
        &self,
        _key: &&'static str,
        value: &CachedToken,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.lifetime)
    }
}

/// In-memory cache for one expiring capability token
#[derive(Clone)]
pub struct TokenCache {
    cache: Cache<&'static str, CachedToken>,
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .expire_after(IssuedLifetime)
            .build();
        Self { cache }
    }

    /// Return the cached token, fetching a new one if absent or expired
    ///
    /// A failed fetch caches nothing; every waiter of that fetch receives the
    /// same error.
    pub async fn get_or_fetch<F, Fut, E>(&self, fetch: F) -> Result<String, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ClientToken, E>>,
        E: Send + Sync + 'static,
    {
        let cached = self
            .cache
            .try_get_with(TOKEN_KEY, async move {
                let issued = fetch().await?;
                tracing::debug!("Fetched client token valid for {}s", issued.expires_in);
                Ok(CachedToken::from(issued))
            })
            .await?;
        Ok(cached.token)
    }

    /// Currently cached token, if one is still valid
    pub async fn current(&self) -> Option<CachedToken> {
        self.cache.get(&TOKEN_KEY).await
    }

    /// Drop the cached token so the next call fetches a fresh one
    pub async fn invalidate(&self) {
        self.cache.invalidate(&TOKEN_KEY).await;
    }
}
