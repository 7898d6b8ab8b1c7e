use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::redirect;

use super::handlers::{health_check, issue_uuid, leaderboard, root, shorten, AppState};
use super::middleware::access_log;

/// Assemble the full application router: API endpoints, the short-path
/// redirect routes, CORS, and the access log. Static routes win over the
/// `/{short_path}` capture, so a short path can never shadow an endpoint.
pub fn create_api_router(state: Arc<AppState>, allowed_origins: Option<&[String]>) -> Router {
    let redirect_router = redirect::create_redirect_router(Arc::clone(&state.links));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/uuixd", get(issue_uuid))
        .route("/leaderboard", get(leaderboard))
        .route("/shorten", post(shorten))
        .with_state(state)
        .merge(redirect_router)
        .layer(cors_layer(allowed_origins))
        .layer(middleware::from_fn(access_log))
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    match allowed_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "ignoring unparsable CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}
