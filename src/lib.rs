pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod rate_limit;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use api::create_api_router;
use auth::{AllowList, AuthLayerState, AuthService, authenticate};
use db::Database;
use jwt::JwtConfig;
use rate_limit::RateLimitConfig;
use store::TokenStore;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// In-memory refresh-record and blacklist store
    pub store: Arc<TokenStore>,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Browser origin allowed by CORS, or None to skip the CORS layer
    pub allow_origin: Option<HeaderValue>,
    /// Paths the authentication layer skips entirely
    pub allow_list: Vec<String>,
}

/// Paths that never require authentication. An entry ending in `/` is a
/// prefix match, anything else is exact.
pub fn default_allow_list() -> Vec<String> {
    vec![
        "/auth/login".to_string(),
        "/auth/signup".to_string(),
        "/auth/refresh".to_string(),
    ]
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret));
    let service = AuthService::new(config.db.clone(), config.store.clone(), jwt.clone());
    let rate_limits = Arc::new(RateLimitConfig::new());

    let api_router = create_api_router(config.db.clone(), service.clone(), rate_limits);

    let auth_state = AuthLayerState {
        jwt,
        service,
        allow_list: Arc::new(AllowList::new(config.allow_list.clone())),
    };

    let router = api_router.layer(middleware::from_fn_with_state(auth_state, authenticate));

    match &config.allow_origin {
        Some(origin) => router.layer(cors_layer(origin.clone())),
        None => router,
    }
}

fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Run cleanup on startup and spawn the background scheduler.
/// Call this before starting the server.
pub fn init_cleanup(store: Arc<TokenStore>) {
    cleanup::run_cleanup(&store);
    cleanup::spawn_cleanup_scheduler(store);
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to start the token-store sweeper.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    init_cleanup(config.store.clone());

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
