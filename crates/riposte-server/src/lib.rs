//! Riposte Server - HTTP API for the comment service.
//!
//! ## Endpoints
//!
//! Public:
//! - `GET /health` - Liveness probe
//! - `GET /articles/{article_id}/comments` - Approved comments as a tree
//! - `POST /articles/{article_id}/comments` - Submit a comment
//! - `POST /articles/{article_id}/likes` - Like an article
//! - `GET /email/approve`, `GET /email/delete` - One-click moderation links
//!
//! Admin, authenticated by the access gateway's email header:
//! - `GET /admin/comments` - Moderation listing with a status filter
//! - `PUT /admin/comments/{id}` - Edit content or change status
//! - `DELETE /admin/comments/{id}` - Remove a comment and its replies
//! - `POST /admin/comments/{id}/reply` - Reply as the operator
//! - `GET /admin/settings`, `PUT /admin/settings` - Runtime settings
//! - `GET /admin/stats` - Totals and most-liked articles
//! - `GET /admin/health` - Storage health report
//! - `POST /admin/backup`, `POST /admin/restore` - Snapshot management
//!
//! ## Example
//!
//! ```no_run
//! use riposte_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::new(ServerConfig::default()).await.unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod extract;
mod handlers;
pub mod models;
pub mod state;

use std::net::SocketAddr;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use riposte_storage::{Database, StorageError};

pub use error::{ApiError, ErrorResponse, Result};
pub use extract::OPERATOR_EMAIL_HEADER;
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 8080).
    pub port: u16,
    /// Database path (None = in-memory).
    pub db_path: Option<String>,
    /// Origins allowed by CORS. `"*"` anywhere in the list allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            db_path: None,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    /// Creates a config for in-memory testing.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Creates a config with a specific database path.
    pub fn with_db_path(path: impl Into<String>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] StorageError),

    /// Runtime error.
    #[error("server runtime error: {0}")]
    Runtime(String),
}

/// The API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a new server with the given configuration.
    pub async fn new(config: ServerConfig) -> std::result::Result<Self, ServerError> {
        let db = if let Some(ref path) = config.db_path {
            Database::with_path(path)?
        } else {
            Database::in_memory()?
        };

        Self::with_database(config, db)
    }

    /// Creates a server with an existing database.
    pub fn with_database(
        config: ServerConfig,
        db: Database,
    ) -> std::result::Result<Self, ServerError> {
        let state = AppState::new(db);
        Self::with_state(config, state)
    }

    /// Creates a server with custom application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        let router = build_router(state).layer(cors_layer(&config.cors_origins));

        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self { router, addr })
    }

    /// Returns the address the server will bind to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns a clone of the router, for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        info!("Starting Riposte API server on {}", self.addr);

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }
}

/// Builds the route table over the given state.
fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/articles/{article_id}/comments",
            get(handlers::get_comments),
        )
        .route(
            "/articles/{article_id}/comments",
            post(handlers::post_comment),
        )
        .route("/articles/{article_id}/likes", post(handlers::post_like))
        .route("/email/approve", get(handlers::email_approve))
        .route("/email/delete", get(handlers::email_delete))
        .route("/admin/comments", get(handlers::admin_list_comments))
        .route("/admin/comments/{id}", put(handlers::admin_update_comment))
        .route(
            "/admin/comments/{id}",
            delete(handlers::admin_delete_comment),
        )
        .route("/admin/comments/{id}/reply", post(handlers::admin_reply))
        .route("/admin/settings", get(handlers::admin_get_settings))
        .route("/admin/settings", put(handlers::admin_put_settings))
        .route("/admin/stats", get(handlers::admin_stats))
        .route("/admin/health", get(handlers::admin_health))
        .route("/admin/backup", post(handlers::admin_backup))
        .route("/admin/restore", post(handlers::admin_restore))
        .with_state(state)
}

/// CORS layer for the configured origin allow-list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let list: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(list)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use riposte_core::{ActionKind, AdminDirectory, CommentStatus, TokenClaims};
    use riposte_storage::NewComment;

    const OPERATOR: &str = "ops@example.com";

    fn test_state() -> AppState {
        let mut state = AppState::in_memory();
        state.admins = Arc::new(
            AdminDirectory::from_json(
                r#"[{"email": "ops@example.com", "name": "Ops", "id": "ops"}]"#,
            )
            .unwrap(),
        );
        state
    }

    fn create_test_app() -> (Router, AppState) {
        let state = test_state();
        (build_router(state.clone()), state)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn admin_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(OPERATOR_EMAIL_HEADER, OPERATOR);
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn seed_comment(state: &AppState, article: &str, status: CommentStatus) -> i64 {
        state
            .db
            .insert_comment(NewComment {
                article_id: article.to_string(),
                author_name: "Ada".to_string(),
                author_email: "ada@example.com".to_string(),
                content: "A thoughtful remark".to_string(),
                status,
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    // ===== Public API =====

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_post_comment_held_for_review() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(post_json(
                "/articles/post-1/comments",
                json!({
                    "author_name": "Ada",
                    "author_email": "ada@example.com",
                    "content": "What a lovely article, thank you!"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = response_json(response).await;
        assert_eq!(json["status"], "pending");
        assert!(json["id"].is_number());
    }

    #[tokio::test]
    async fn test_post_comment_requires_email_by_default() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(post_json(
                "/articles/post-1/comments",
                json!({"author_name": "Ada", "author_email": "  ", "content": "Lovely!"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["code"], "validation_failed");
    }

    #[tokio::test]
    async fn test_anonymous_comment_allowed_when_configured() {
        let (app, state) = create_test_app();
        state
            .db
            .put_settings(vec![("require_email".to_string(), "false".to_string())])
            .await
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/articles/post-1/comments",
                json!({"author_name": "Ada", "content": "No email this time, still fine."}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_post_comment_rejects_bad_email() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(post_json(
                "/articles/post-1/comments",
                json!({
                    "author_name": "Ada",
                    "author_email": "not-an-email",
                    "content": "Interesting read."
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_comment_honors_length_settings() {
        let (app, state) = create_test_app();
        state
            .db
            .put_settings(vec![("max_comment_length".to_string(), "10".to_string())])
            .await
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/articles/post-1/comments",
                json!({
                    "author_name": "Ada",
                    "author_email": "ada@example.com",
                    "content": "This runs well past ten characters."
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_comment_sanitizes_markup() {
        let (app, state) = create_test_app();

        let response = app
            .oneshot(post_json(
                "/articles/post-1/comments",
                json!({
                    "author_name": "Ada",
                    "author_email": "ada@example.com",
                    "content": "look <script>alert(1)</script><b>bold</b>"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = response_json(response).await;

        let stored = state
            .db
            .comment(json["id"].as_i64().unwrap())
            .unwrap()
            .unwrap();
        assert!(!stored.content.contains("<script>"));
        assert!(stored.content.contains("<b>bold</b>"));
    }

    #[tokio::test]
    async fn test_post_comment_rejects_unknown_parent() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(post_json(
                "/articles/post-1/comments",
                json!({
                    "author_name": "Ada",
                    "author_email": "ada@example.com",
                    "content": "Replying to nothing at all.",
                    "parent_id": 999
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auto_approve_publishes_clean_comments() {
        let (app, state) = create_test_app();
        state
            .db
            .put_settings(vec![("auto_approve".to_string(), "true".to_string())])
            .await
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/articles/post-1/comments",
                json!({
                    "author_name": "Ada",
                    "author_email": "ada@example.com",
                    "content": "Measured, on-topic, and reasonably long."
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response_json(response).await["status"], "approved");
    }

    #[tokio::test]
    async fn test_burst_submissions_get_flagged() {
        let (app, _) = create_test_app();

        let mut last = None;
        for i in 0..7 {
            let request = Request::builder()
                .method("POST")
                .uri("/articles/post-1/comments")
                .header("content-type", "application/json")
                .header("cf-connecting-ip", "198.51.100.4")
                .body(Body::from(
                    json!({
                        "author_name": "Bot",
                        "author_email": "bot@mailinator.com",
                        "content": "buy now"
                    })
                    .to_string(),
                ))
                .unwrap();

            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::CREATED, "submission {}", i);
            last = Some(response_json(response).await);
        }

        assert_eq!(last.unwrap()["status"], "spam");
    }

    #[tokio::test]
    async fn test_comment_tree_nests_replies() {
        let (app, state) = create_test_app();

        let root = seed_comment(&state, "post-1", CommentStatus::Approved).await;
        state
            .db
            .insert_comment(NewComment {
                article_id: "post-1".to_string(),
                parent_id: Some(root),
                reply_to_id: Some(root),
                author_name: "Bea".to_string(),
                author_email: "bea@example.com".to_string(),
                content: "And a reply".to_string(),
                status: CommentStatus::Approved,
                ..Default::default()
            })
            .await
            .unwrap();
        // Held and flagged rows stay invisible.
        seed_comment(&state, "post-1", CommentStatus::Pending).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/articles/post-1/comments")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cache = response.headers().get("cache-control").cloned();
        let json = response_json(response).await;

        assert_eq!(cache.unwrap(), "public, max-age=60, s-maxage=300");
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["children"].as_array().unwrap().len(), 1);
        assert_eq!(data[0]["children"][0]["reply_to_name"], "Ada");
        assert!(data[0]["avatar_url"]
            .as_str()
            .unwrap()
            .contains("gravatar"));
        // Emails never serialize into the public payload.
        assert!(!json.to_string().contains("ada@example.com"));
    }

    #[tokio::test]
    async fn test_like_counted_once_per_client() {
        let (app, _) = create_test_app();

        let like = |app: &Router| {
            let request = Request::builder()
                .method("POST")
                .uri("/articles/post-1/likes")
                .header("content-type", "application/json")
                .header("x-real-ip", "203.0.113.9")
                .body(Body::from(json!({"fingerprint": "fp-123456"}).to_string()))
                .unwrap();
            app.clone().oneshot(request)
        };

        let first = like(&app).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let json = response_json(first).await;
        assert_eq!(json["article_id"], "post-1");
        assert_eq!(json["likes"], 1);

        let second = like(&app).await.unwrap();
        assert_eq!(response_json(second).await["likes"], 1);
    }

    #[tokio::test]
    async fn test_like_requires_client_address() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(post_json(
                "/articles/post-1/likes",
                json!({"fingerprint": "fp-123456"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // ===== Emailed action links =====

    #[tokio::test]
    async fn test_email_approve_link_flips_status() {
        let (app, state) = create_test_app();
        let id = seed_comment(&state, "post-1", CommentStatus::Pending).await;

        let token = state
            .signer
            .sign(&TokenClaims::new(ActionKind::Approve, id))
            .unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/email/approve?token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.db.comment(id).unwrap().unwrap().status,
            CommentStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_email_delete_link_removes_comment() {
        let (app, state) = create_test_app();
        let id = seed_comment(&state, "post-1", CommentStatus::Pending).await;

        let token = state
            .signer
            .sign(&TokenClaims::new(ActionKind::Delete, id))
            .unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/email/delete?token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.db.comment(id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_garbage_email_token_rejected() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/email/approve?token=garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_expired_email_token_changes_nothing() {
        let (app, state) = create_test_app();
        let id = seed_comment(&state, "post-1", CommentStatus::Pending).await;

        let claims = TokenClaims {
            action: ActionKind::Approve,
            comment_id: id,
            exp: (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp_millis(),
        };
        let token = state.signer.sign(&claims).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/email/approve?token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            state.db.comment(id).unwrap().unwrap().status,
            CommentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_token_bound_to_its_action() {
        let (app, state) = create_test_app();
        let id = seed_comment(&state, "post-1", CommentStatus::Pending).await;

        let token = state
            .signer
            .sign(&TokenClaims::new(ActionKind::Approve, id))
            .unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/email/delete?token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.db.comment(id).unwrap().is_some());
    }

    // ===== Admin API =====

    #[tokio::test]
    async fn test_admin_routes_require_operator_header() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/comments")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_operator_rejected() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/comments")
                    .header(OPERATOR_EMAIL_HEADER, "mallory@example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_listing_filters_by_status() {
        let (app, state) = create_test_app();
        seed_comment(&state, "post-1", CommentStatus::Pending).await;
        seed_comment(&state, "post-1", CommentStatus::Approved).await;

        let response = app
            .oneshot(admin_request("GET", "/admin/comments?status=pending", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["status"], "pending");
    }

    #[tokio::test]
    async fn test_admin_listing_rejects_bad_filter() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(admin_request(
                "GET",
                "/admin/comments?status=published",
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_approval_publishes_comment() {
        let (app, state) = create_test_app();
        let id = seed_comment(&state, "post-1", CommentStatus::Pending).await;

        let response = app
            .clone()
            .oneshot(admin_request(
                "PUT",
                &format!("/admin/comments/{}", id),
                Some(json!({"status": "approved"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["ok"], true);
        assert_eq!(
            state.db.comment(id).unwrap().unwrap().status,
            CommentStatus::Approved
        );

        let tree = app
            .oneshot(
                Request::builder()
                    .uri("/articles/post-1/comments")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = response_json(tree).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admin_content_edit_keeps_status() {
        let (app, state) = create_test_app();
        let id = seed_comment(&state, "post-1", CommentStatus::Pending).await;

        let response = app
            .oneshot(admin_request(
                "PUT",
                &format!("/admin/comments/{}", id),
                Some(json!({"content": "edited <i>text</i>"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let stored = state.db.comment(id).unwrap().unwrap();
        assert_eq!(stored.content, "edited <i>text</i>");
        assert_eq!(stored.status, CommentStatus::Pending);
    }

    #[tokio::test]
    async fn test_admin_update_validates_input() {
        let (app, state) = create_test_app();
        let id = seed_comment(&state, "post-1", CommentStatus::Pending).await;

        let empty = app
            .clone()
            .oneshot(admin_request(
                "PUT",
                &format!("/admin/comments/{}", id),
                Some(json!({})),
            ))
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let bad = app
            .oneshot(admin_request(
                "PUT",
                &format!("/admin/comments/{}", id),
                Some(json!({"status": "published"})),
            ))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_update_missing_comment() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(admin_request(
                "PUT",
                "/admin/comments/999",
                Some(json!({"status": "approved"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_delete_removes_subtree() {
        let (app, state) = create_test_app();
        let root = seed_comment(&state, "post-1", CommentStatus::Approved).await;
        let child = state
            .db
            .insert_comment(NewComment {
                article_id: "post-1".to_string(),
                parent_id: Some(root),
                author_name: "Bea".to_string(),
                author_email: "bea@example.com".to_string(),
                content: "A reply that goes with it".to_string(),
                status: CommentStatus::Approved,
                ..Default::default()
            })
            .await
            .unwrap()
            .id;

        let response = app
            .oneshot(admin_request(
                "DELETE",
                &format!("/admin/comments/{}", root),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.db.comment(root).unwrap().is_none());
        assert!(state.db.comment(child).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_admin_reply_nests_under_target() {
        let (app, state) = create_test_app();
        let root = seed_comment(&state, "post-1", CommentStatus::Approved).await;

        let response = app
            .oneshot(admin_request(
                "POST",
                &format!("/admin/comments/{}/reply", root),
                Some(json!({"content": "Thanks for reading!"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = response_json(response).await;
        assert_eq!(json["status"], "approved");

        let stored = state
            .db
            .comment(json["id"].as_i64().unwrap())
            .unwrap()
            .unwrap();
        assert!(stored.is_admin);
        assert_eq!(stored.parent_id, Some(root));
        assert_eq!(stored.reply_to_id, Some(root));
        assert_eq!(stored.author_name, "Ops");
        assert_eq!(stored.admin_id.as_deref(), Some("ops"));
    }

    #[tokio::test]
    async fn test_admin_reply_to_reply_stays_one_level_deep() {
        let (app, state) = create_test_app();
        let root = seed_comment(&state, "post-1", CommentStatus::Approved).await;
        let child = state
            .db
            .insert_comment(NewComment {
                article_id: "post-1".to_string(),
                parent_id: Some(root),
                author_name: "Bea".to_string(),
                author_email: "bea@example.com".to_string(),
                content: "A nested remark".to_string(),
                status: CommentStatus::Approved,
                ..Default::default()
            })
            .await
            .unwrap()
            .id;

        let response = app
            .oneshot(admin_request(
                "POST",
                &format!("/admin/comments/{}/reply", child),
                Some(json!({"content": "Answering the nested remark."})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = response_json(response).await;

        let stored = state
            .db
            .comment(json["id"].as_i64().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(stored.parent_id, Some(root));
        assert_eq!(stored.reply_to_id, Some(child));
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let (app, _) = create_test_app();

        let before = app
            .clone()
            .oneshot(admin_request("GET", "/admin/settings", None))
            .await
            .unwrap();
        assert_eq!(response_json(before).await["auto_approve"], false);

        let put = app
            .clone()
            .oneshot(admin_request(
                "PUT",
                "/admin/settings",
                Some(json!({"auto_approve": true, "max_comment_length": 280})),
            ))
            .await
            .unwrap();
        assert_eq!(put.status(), StatusCode::OK);
        let json = response_json(put).await;
        assert_eq!(json["auto_approve"], true);
        assert_eq!(json["max_comment_length"], 280);

        let after = app
            .oneshot(admin_request("GET", "/admin/settings", None))
            .await
            .unwrap();
        assert_eq!(response_json(after).await["auto_approve"], true);
    }

    #[tokio::test]
    async fn test_settings_reject_unknown_keys() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(admin_request(
                "PUT",
                "/admin/settings",
                Some(json!({"theme": "dark"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_stats() {
        let (app, state) = create_test_app();
        seed_comment(&state, "post-1", CommentStatus::Approved).await;
        seed_comment(&state, "post-2", CommentStatus::Pending).await;

        let response = app
            .oneshot(admin_request("GET", "/admin/stats", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["total_comments"], 2);
        assert_eq!(json["pending_comments"], 1);
        assert_eq!(json["approved_comments"], 1);
        assert!(json["top_liked"].is_array());
    }

    #[tokio::test]
    async fn test_admin_health_reports_ok() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(admin_request("GET", "/admin/health", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["queue_depth"], 0);
    }

    // ===== Configuration =====

    #[tokio::test]
    async fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.db_path.is_none());
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
    }

    #[tokio::test]
    async fn test_server_config_builders() {
        let config = ServerConfig::with_db_path("/tmp/riposte.db")
            .with_port(9000)
            .with_cors_origins(vec!["https://blog.example".to_string()]);

        assert_eq!(config.port, 9000);
        assert_eq!(config.db_path.as_deref(), Some("/tmp/riposte.db"));
        assert_eq!(config.cors_origins.len(), 1);
    }
}
