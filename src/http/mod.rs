//! Authenticated request gateway
//!
//! [`HttpClient`] issues requests against the review backend. Authenticated
//! requests carry the stored access token and recover from exactly one kind
//! of failure, an expired access token, without involving the caller:
//!
//! ```text
//! no access token ─────────────────────────────► Unauthenticated (nothing sent)
//! send ── status != 401 ───────────────────────► response as-is
//!      └─ 401 ── no refresh token ─────────────► clear session, original 401
//!              └─ POST /token/refresh/
//!                   ├─ ok ── store access, retry once ─► retry response
//!                   └─ failed ── clear session ────────► original 401
//! ```
//!
//! The refresh is awaited before the retry is issued, and the retry is never
//! followed by another refresh. A single call therefore makes at most two
//! primary sends plus one refresh.

mod error;
#[cfg(test)]
pub(crate) mod testing;
mod transport;

pub use error::{field_errors, ApiError, ResponseBody};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::models::RefreshedToken;
use crate::storage::TokenStore;

/// Token refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "/token/refresh/";

/// Method, body and headers of a backend request
///
/// The URL and the `Authorization` header are filled in by [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    body: Option<String>,
    headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Attach a raw body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a JSON-serialized body
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        let encoded = serde_json::to_string(body)
            .map_err(|e| ApiError::InvalidRequest(format!("failed to encode body: {}", e)))?;
        Ok(self.body(encoded))
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Build the wire request for `url`, optionally bearing `token`
    fn to_http(&self, url: &str, token: Option<&str>) -> Result<HttpRequest, ApiError> {
        let mut headers = self.headers.clone();
        if self.body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("access token is not a valid header value".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(HttpRequest {
            method: self.method.clone(),
            url: url.to_string(),
            headers,
            body: self.body.clone(),
        })
    }
}

/// HTTP client for the review backend
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenStore>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        tokens: Arc<TokenStore>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send an authenticated request
    ///
    /// Fails with [`ApiError::Unauthenticated`] before touching the network
    /// when no access token is stored. Any response other than a 401 is
    /// returned unchanged, including other error statuses.
    pub async fn request(&self, path: &str, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        let Some(access) = self.tokens.access().filter(|t| !t.is_empty()) else {
            tracing::debug!("{} {}: no access token, not sending", request.method, path);
            return Err(ApiError::Unauthenticated);
        };
        let refresh = self.tokens.refresh().filter(|t| !t.is_empty());
        let url = self.url(path);

        let original = self
            .transport
            .send(request.to_http(&url, Some(&access))?)
            .await?;
        if original.status != StatusCode::UNAUTHORIZED {
            return Ok(original);
        }

        let Some(refresh) = refresh else {
            tracing::warn!("{} {}: access token rejected and no refresh token, signing out", request.method, path);
            self.sign_out();
            return Ok(original);
        };

        tracing::debug!("{} {}: access token rejected, refreshing", request.method, path);
        match self.refresh_access(&refresh).await? {
            Some(renewed) => {
                self.tokens.set_access(&renewed)?;
                tracing::debug!("{} {}: retrying with refreshed token", request.method, path);
                self.transport
                    .send(request.to_http(&url, Some(&renewed))?)
                    .await
            }
            None => {
                tracing::warn!("{} {}: token refresh failed, signing out", request.method, path);
                self.sign_out();
                Ok(original)
            }
        }
    }

    /// Forget a dead session; the caller still gets the original 401
    fn sign_out(&self) {
        if let Err(e) = self.tokens.clear() {
            tracing::error!("Failed to clear session: {}", e);
        }
    }

    /// Exchange the refresh token for a new access token
    ///
    /// `Ok(None)` means the backend refused (the session is dead); transport
    /// failures propagate and leave the stored tokens alone.
    async fn refresh_access(&self, refresh: &str) -> Result<Option<String>, ApiError> {
        let request = ApiRequest::post()
            .json(&json!({ "refresh": refresh }))?
            .to_http(&self.url(REFRESH_PATH), None)?;
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            tracing::debug!("Token refresh rejected with {}", response.status);
            return Ok(None);
        }
        match response.json_as::<RefreshedToken>() {
            Ok(token) if !token.access.is_empty() => Ok(Some(token.access)),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!("Token refresh returned an unusable body: {}", e);
                Ok(None)
            }
        }
    }

    /// Send a request that needs no session (login, registration, listings)
    ///
    /// No token is attached and there is no refresh cycle.
    pub async fn request_public(
        &self,
        path: &str,
        request: ApiRequest,
    ) -> Result<HttpResponse, ApiError> {
        let url = self.url(path);
        self.transport.send(request.to_http(&url, None)?).await
    }

    /// Decode a response, turning non-2xx statuses into [`ApiError::Status`]
    pub fn read_body(response: HttpResponse) -> Result<ResponseBody, ApiError> {
        let status = response.status.as_u16();
        let body = response.decode_body()?;
        if response.is_success() {
            Ok(body)
        } else {
            Err(ApiError::from_status(status, body))
        }
    }

    /// Decode a successful body into `T`
    pub fn decode<T: DeserializeOwned>(body: ResponseBody) -> Result<T, ApiError> {
        match body {
            ResponseBody::Json(value) => {
                serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
            }
            ResponseBody::Text(text) => Err(ApiError::Decode(format!(
                "expected JSON, got text: {}",
                truncate(&text, 120)
            ))),
        }
    }

    /// Authenticated request expecting a body (JSON or text)
    pub async fn send_json(&self, path: &str, request: ApiRequest) -> Result<ResponseBody, ApiError> {
        Self::read_body(self.request(path, request).await?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        Self::decode(self.send_json(path, ApiRequest::get()).await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Self::decode(self.send_json(path, ApiRequest::post().json(body)?).await?)
    }

    pub async fn delete_json(&self, path: &str) -> Result<ResponseBody, ApiError> {
        self.send_json(path, ApiRequest::delete()).await
    }

    pub async fn public_get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request_public(path, ApiRequest::get()).await?;
        Self::decode(Self::read_body(response)?)
    }

    pub async fn public_post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request_public(path, ApiRequest::post().json(body)?)
            .await?;
        Self::decode(Self::read_body(response)?)
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use crate::storage::{Credentials, StorageError, TokenBackend};
    use serde_json::Value;

    const BASE: &str = "https://api.example.com";

    fn client(transport: &Arc<ScriptedTransport>, credentials: Credentials) -> HttpClient {
        let store = Arc::new(TokenStore::in_memory_with(credentials));
        HttpClient::new(BASE, transport.clone(), store)
    }

    fn pair() -> Credentials {
        Credentials::pair("ACCESS", "REFRESH")
    }

    #[tokio::test]
    async fn test_no_access_token_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        let http = client(&transport, Credentials::default());

        let result = http.request("/me/", ApiRequest::get()).await;

        assert!(matches!(result, Err(ApiError::Unauthenticated)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_token_alone_is_not_a_session() {
        let transport = Arc::new(ScriptedTransport::new());
        let http = client(
            &transport,
            Credentials {
                access: None,
                refresh: Some("REFRESH".into()),
            },
        );

        let result = http.get_json::<Value>("/me/").await;

        assert!(matches!(result, Err(ApiError::Unauthenticated)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_attaches_bearer_and_default_content_type() {
        let transport = Arc::new(ScriptedTransport::new().reply(201, json!({"ok": true})));
        let http = client(&transport, pair());

        let result: Value = http.post_json("/things", &json!({"a": 1})).await.unwrap();

        assert_eq!(result, json!({"ok": true}));
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "https://api.example.com/things");
        assert_eq!(sent[0].method, Method::POST);
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(sent[0].header("content-type"), Some("application/json"));
        assert_eq!(sent[0].header("authorization"), Some("Bearer ACCESS"));
    }

    #[tokio::test]
    async fn test_explicit_content_type_is_kept() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, json!({})));
        let http = client(&transport, pair());

        let request = ApiRequest::post()
            .body("{\"a\":1}")
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        http.request("/x", request).await.unwrap();

        assert_eq!(transport.requests()[0].header("content-type"), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_bodyless_request_has_no_content_type() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, json!([])));
        let http = client(&transport, pair());

        http.request("/my-reviews/", ApiRequest::get()).await.unwrap();

        assert_eq!(transport.requests()[0].header("content-type"), None);
    }

    #[tokio::test]
    async fn test_non_auth_errors_pass_through_without_refresh() {
        let transport = Arc::new(ScriptedTransport::new().reply(403, json!({"detail": "Forbidden"})));
        let http = client(&transport, pair());

        let response = http.request("/reviews/1/", ApiRequest::delete()).await.unwrap();

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(transport.request_count(), 1);
        assert_eq!(http.tokens().credentials(), pair());
    }

    #[tokio::test]
    async fn test_401_refreshes_once_and_retries_with_new_token() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(401, json!({"detail": "Token expired"}))
                .reply(200, json!({"access": "NEW"}))
                .reply(200, json!({"username": "ana"})),
        );
        let http = client(&transport, pair());

        let me: Value = http.get_json("/me/").await.unwrap();

        assert_eq!(me["username"], "ana");
        let sent = transport.requests();
        assert_eq!(sent.len(), 3);

        assert_eq!(sent[1].url, "https://api.example.com/token/refresh/");
        assert_eq!(sent[1].method, Method::POST);
        assert_eq!(sent[1].header("authorization"), None);
        let refresh_body: Value = serde_json::from_str(sent[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(refresh_body, json!({"refresh": "REFRESH"}));

        assert_eq!(sent[2].url, "https://api.example.com/me/");
        assert_eq!(sent[2].header("authorization"), Some("Bearer NEW"));

        assert_eq!(http.tokens().access().as_deref(), Some("NEW"));
        assert_eq!(http.tokens().refresh().as_deref(), Some("REFRESH"));
    }

    #[tokio::test]
    async fn test_retry_failure_is_returned_without_second_refresh() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(401, json!({}))
                .reply(200, json!({"access": "NEW"}))
                .reply(401, json!({"detail": "Still no"})),
        );
        let http = client(&transport, pair());

        let response = http.request("/me/", ApiRequest::get()).await.unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(transport.request_count(), 3);
        assert_eq!(transport.remaining(), 0);
        // The refreshed token stays; only a failed refresh ends the session
        assert_eq!(http.tokens().access().as_deref(), Some("NEW"));
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_session_and_returns_original_401() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(401, json!({"detail": "Token expired"}))
                .reply(401, json!({"detail": "Token is invalid or expired"})),
        );
        let http = client(&transport, pair());
        let mut signed_in = http.tokens().subscribe();
        signed_in.borrow_and_update();

        let result = http.get_json::<Value>("/me/").await;

        match result {
            Err(ApiError::Status { status, message, .. }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Token expired");
            }
            other => panic!("expected original 401, got {:?}", other),
        }
        assert_eq!(transport.request_count(), 2);
        assert!(http.tokens().credentials().is_empty());
        assert!(signed_in.has_changed().unwrap());
        assert!(!*signed_in.borrow());
    }

    #[tokio::test]
    async fn test_refresh_without_access_field_counts_as_failure() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(401, json!({}))
                .reply(200, json!({"detail": "weird"})),
        );
        let http = client(&transport, pair());

        let response = http.request("/me/", ApiRequest::get()).await.unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(transport.request_count(), 2);
        assert!(http.tokens().credentials().is_empty());
    }

    #[tokio::test]
    async fn test_401_without_refresh_token_clears_session() {
        let transport = Arc::new(ScriptedTransport::new().reply(401, json!({})));
        let http = client(
            &transport,
            Credentials {
                access: Some("ACCESS".into()),
                refresh: None,
            },
        );

        let response = http.request("/me/", ApiRequest::get()).await.unwrap();

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(transport.request_count(), 1);
        assert!(!http.tokens().is_signed_in());
    }

    struct ReadOnlyBackend(Credentials);

    impl TokenBackend for ReadOnlyBackend {
        fn load(&self) -> Result<Credentials, StorageError> {
            Ok(self.0.clone())
        }

        fn save(&self, _credentials: &Credentials) -> Result<(), StorageError> {
            Err(StorageError::Encode("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_unwritable_session_still_returns_original_401() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(401, json!({"detail": "expired"}))
                .reply(401, json!({"detail": "refresh expired"})),
        );
        let store = Arc::new(TokenStore::open(ReadOnlyBackend(pair())).unwrap());
        let http = HttpClient::new(BASE, transport.clone(), store);

        let result = http.get_json::<Value>("/me/").await;

        match result {
            Err(ApiError::Status { status, message, .. }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "expired");
            }
            other => panic!("expected original 401, got {:?}", other),
        }
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_refresh_transport_failure_keeps_tokens() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(401, json!({}))
                .fail("connection reset"),
        );
        let http = client(&transport, pair());

        let result = http.request("/me/", ApiRequest::get()).await;

        assert!(matches!(result, Err(ApiError::Transport(_))));
        assert_eq!(http.tokens().credentials(), pair());
    }

    #[tokio::test]
    async fn test_public_request_sends_no_token_and_never_refreshes() {
        let transport = Arc::new(ScriptedTransport::new().reply(401, json!({"detail": "No active account"})));
        let http = client(&transport, pair());

        let result: Result<Value, _> = http
            .public_post_json("/token/", &json!({"username": "u", "password": "p"}))
            .await;

        assert_eq!(result.unwrap_err().status(), Some(401));
        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.requests()[0].header("authorization"), None);
        assert_eq!(http.tokens().credentials(), pair());
    }

    #[tokio::test]
    async fn test_json_layer_returns_text_bodies() {
        let mut response = HttpResponse::new(StatusCode::OK, "HELLO");
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let transport = Arc::new(ScriptedTransport::new().reply_raw(response));
        let http = client(&transport, pair());

        let body = http.send_json("/hello", ApiRequest::get()).await.unwrap();

        assert_eq!(body, ResponseBody::Text("HELLO".into()));
    }

    #[tokio::test]
    async fn test_json_layer_error_carries_status_and_body() {
        let transport = Arc::new(ScriptedTransport::new().reply(400, json!({"detail": "Bad Request"})));
        let http = client(&transport, pair());

        let err = http.get_json::<Value>("/bad").await.unwrap_err();

        match err {
            ApiError::Status { status, message, body } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Bad Request");
                assert_eq!(body, ResponseBody::Json(json!({"detail": "Bad Request"})));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let transport: Arc<dyn Transport> = Arc::new(ScriptedTransport::new());
        let http = HttpClient::new("http://localhost:8000/api/", transport, Arc::new(TokenStore::in_memory()));
        assert_eq!(http.url("/reviews/"), "http://localhost:8000/api/reviews/");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
