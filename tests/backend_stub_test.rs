//! End-to-end tests against an in-process stub of the review backend and
//! the Spotify endpoints, over real HTTP.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mytune::config::{Config, SpotifyConfig};
use mytune::feed::{ReviewFeed, ReviewFilter};
use mytune::gateways::SpotifyGateway;
use mytune::http::{ApiError, HttpClient, ReqwestTransport};
use mytune::models::{LoginInput, Profile, RegisterInput};
use mytune::services::{AuthServiceError, ReviewServiceError, ServiceContainer};
use mytune::storage::{Credentials, FileTokenBackend, TokenStore};

/// What the stub saw
#[derive(Clone, Default)]
struct Stub {
    /// Authorization header of every backend request, in order
    auth: Arc<Mutex<Vec<Option<String>>>>,
    token_requests: Arc<Mutex<Vec<(Option<String>, String)>>>,
}

impl Stub {
    fn record(&self, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.auth.lock().unwrap().push(auth);
    }

    fn seen(&self) -> Vec<Option<String>> {
        self.auth.lock().unwrap().clone()
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn me(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    stub.record(&headers);
    match bearer(&headers) {
        Some("NEW") | Some("GOOD") => Json(json!({
            "id": 1,
            "username": "ana",
            "email": "ana@example.com",
            "is_admin": false
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Given token not valid for any token type"})),
        )
            .into_response(),
    }
}

async fn refresh(Json(body): Json<Value>) -> Response {
    if body["refresh"] == "R" {
        Json(json!({"access": "NEW"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired"})),
        )
            .into_response()
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] == "ana" && body["password"] == "pw" {
        Json(json!({"access": "GOOD", "refresh": "R"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response()
    }
}

async fn register() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"email": ["user with this email already exists."]})),
    )
        .into_response()
}

async fn list_reviews(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    stub.record(&headers);
    let all = vec![
        json!({"id": 1, "title": "Kid A", "content": "", "rating": 5, "artist": "Radiohead", "artist_id": "rh", "album": "Kid A", "user": "ana", "created_at": "2024-01-01T00:00:00Z"}),
        json!({"id": 2, "title": "OK Computer", "content": "", "rating": 4, "artist": "Radiohead", "artist_id": "rh", "album": "OK Computer", "user": "ana", "created_at": "2024-01-02T00:00:00Z"}),
        json!({"id": 3, "title": "Discovery", "content": "", "rating": 3, "artist": "Daft Punk", "artist_id": "dp", "album": "Discovery", "user": "bo", "created_at": "2024-01-03T00:00:00Z"}),
    ];
    let visible: Vec<Value> = match params.get("artist_id") {
        Some(id) => all.into_iter().filter(|r| r["artist_id"] == id.as_str()).collect(),
        None => all,
    };
    Json(Value::Array(visible))
}

async fn delete_review(State(stub): State<Stub>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    stub.record(&headers);
    if id == 1 {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::FORBIDDEN, "Only administrators may delete reviews").into_response()
    }
}

async fn spotify_token(State(stub): State<Stub>, headers: HeaderMap, body: String) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    stub.token_requests.lock().unwrap().push((auth, body));
    Json(json!({"access_token": "SPOTIFY", "token_type": "Bearer", "expires_in": 3600}))
}

async fn spotify_search(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    if bearer(&headers) != Some("SPOTIFY") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let name = params.get("q").cloned().unwrap_or_default();
    Json(json!({"artists": {"items": [{"id": "x1", "name": name}]}})).into_response()
}

async fn spawn_stub() -> (String, Stub) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/api/me/", get(me))
        .route("/api/token/", post(login))
        .route("/api/token/refresh/", post(refresh))
        .route("/api/register/", post(register))
        .route("/api/reviews/", get(list_reviews))
        .route("/api/reviews/{id}/", delete(delete_review))
        .route("/spotify/token", post(spotify_token))
        .route("/spotify/v1/search", get(spotify_search))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), stub)
}

fn client(root: &str, credentials: Credentials) -> HttpClient {
    let transport = Arc::new(ReqwestTransport::new(None).unwrap());
    let tokens = Arc::new(TokenStore::in_memory_with(credentials));
    HttpClient::new(format!("{}/api", root), transport, tokens)
}

fn services(root: &str, tokens: TokenStore) -> ServiceContainer {
    let mut config = Config::default();
    config.api.base_url = format!("{}/api", root);
    let transport = Arc::new(ReqwestTransport::new(None).unwrap());
    ServiceContainer::with_parts(&config, transport, Arc::new(tokens))
}

#[tokio::test]
async fn test_expired_access_is_refreshed_and_retried_once() {
    let (root, stub) = spawn_stub().await;
    let http = client(&root, Credentials::pair("OLD", "R"));

    let profile: Profile = http.get_json("/me/").await.unwrap();

    assert_eq!(profile.username, "ana");
    assert_eq!(http.tokens().credentials(), Credentials::pair("NEW", "R"));
    assert_eq!(
        stub.seen(),
        vec![Some("Bearer OLD".to_string()), Some("Bearer NEW".to_string())]
    );
}

#[tokio::test]
async fn test_dead_refresh_signs_out_and_returns_original_401() {
    let (root, stub) = spawn_stub().await;
    let http = client(&root, Credentials::pair("OLD", "EXPIRED"));

    let err = http.get_json::<Profile>("/me/").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "Given token not valid for any token type");
    assert!(http.tokens().credentials().is_empty());
    assert_eq!(stub.seen().len(), 1);
}

#[tokio::test]
async fn test_signed_out_request_never_reaches_the_backend() {
    let (root, stub) = spawn_stub().await;
    let http = client(&root, Credentials::default());

    let err = http.get_json::<Profile>("/me/").await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthenticated));
    assert!(stub.seen().is_empty());
}

#[tokio::test]
async fn test_public_listing_sends_no_token_and_feeds_the_view_model() {
    let (root, stub) = spawn_stub().await;
    let services = services(&root, TokenStore::in_memory_with(Credentials::pair("GOOD", "R")));

    let reviews = services.reviews.list(None).await.unwrap();
    let feed = ReviewFeed::with_filter(
        reviews,
        ReviewFilter {
            min_rating: Some(4),
            ..Default::default()
        },
    );
    assert_eq!(feed.total(), 3);
    assert_eq!(feed.visible().iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1]);

    let daft_punk = services.reviews.list(Some("dp")).await.unwrap();
    assert_eq!(daft_punk.len(), 1);
    assert_eq!(daft_punk[0].title, "Discovery");

    assert_eq!(stub.seen(), vec![None, None]);
}

#[tokio::test]
async fn test_error_bodies_are_decoded() {
    let (root, _stub) = spawn_stub().await;
    let services = services(&root, TokenStore::in_memory_with(Credentials::pair("GOOD", "R")));

    // Plain text body
    let err = services.reviews.delete(2).await.unwrap_err();
    match err {
        ReviewServiceError::Api(ApiError::Status { status, message, .. }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "Only administrators may delete reviews");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // Empty 204 body
    services.reviews.delete(1).await.unwrap();

    // Field errors
    let err = services
        .auth
        .register(&RegisterInput {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "pw".to_string(),
            password2: "pw".to_string(),
        })
        .await
        .unwrap_err();
    match err {
        AuthServiceError::Rejected { fields, .. } => assert_eq!(
            fields,
            vec![(
                "email".to_string(),
                vec!["user with this email already exists.".to_string()]
            )]
        ),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_login_persists_session_to_file() {
    let (root, _stub) = spawn_stub().await;
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("session.json");

    let services = services(&root, TokenStore::open(FileTokenBackend::new(&path)).unwrap());
    let err = services
        .auth
        .login(&LoginInput {
            username: "ana".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidCredentials));
    assert!(!path.exists() || TokenStore::open(FileTokenBackend::new(&path)).unwrap().credentials().is_empty());

    services
        .auth
        .login(&LoginInput {
            username: "ana".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();

    let reopened = TokenStore::open(FileTokenBackend::new(&path)).unwrap();
    assert_eq!(reopened.credentials(), Credentials::pair("GOOD", "R"));

    services.auth.logout().unwrap();
    let reopened = TokenStore::open(FileTokenBackend::new(&path)).unwrap();
    assert!(!reopened.is_signed_in());
}

#[tokio::test]
async fn test_spotify_token_is_fetched_once_over_http() {
    let (root, stub) = spawn_stub().await;
    let config = SpotifyConfig {
        client_id: "id".to_string(),
        client_secret: "secret".to_string(),
        accounts_url: format!("{}/spotify/token", root),
        api_url: format!("{}/spotify/v1", root),
        ..Default::default()
    };
    let spotify = SpotifyGateway::new(config, Arc::new(ReqwestTransport::new(None).unwrap()));

    let (a, b) = tokio::join!(spotify.search_artists("Daft Punk"), spotify.search_artists("Air"));

    assert_eq!(a.unwrap()[0].name, "Daft Punk");
    assert_eq!(b.unwrap()[0].name, "Air");
    let token_requests = stub.token_requests.lock().unwrap().clone();
    assert_eq!(token_requests.len(), 1);
    assert_eq!(token_requests[0].0.as_deref(), Some("Basic aWQ6c2VjcmV0"));
    assert_eq!(token_requests[0].1, "grant_type=client_credentials");
}
