use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::auth::{JwtError, JwtKeys};
use crate::config::AppConfig;
use crate::database::UserRepository;
use crate::handlers::{home, users};
use crate::middleware::{format_errors, jwt_auth_middleware};

/// Everything a request handler may need, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub jwt: Arc<JwtKeys>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, users: Arc<dyn UserRepository>) -> Result<Self, JwtError> {
        let jwt = JwtKeys::from_config(&config.security)?;
        Ok(Self {
            users,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        })
    }
}

/// The full middleware pipeline, outermost first: request tracing, CORS,
/// body size limit, JSON error formatting, then routing.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .merge(home_routes())
        .merge(user_routes(state.clone()))
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(middleware::from_fn_with_state(config.environment, format_errors))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn home_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/login", post(home::login))
        .route("/register", post(home::register))
}

fn user_routes(state: AppState) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, jwt_auth_middleware);

    Router::new()
        .route("/users", get(users::find).post(users::create))
        .route(
            "/users/:id",
            get(users::find_by_id).merge(
                put(users::update)
                    .merge(delete(users::delete))
                    .route_layer(auth),
            ),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}
