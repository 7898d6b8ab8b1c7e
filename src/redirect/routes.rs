use axum::{routing::get, Router};
use std::sync::Arc;

use crate::store::LinkStore;

use super::handlers::{redirect_short_path, RedirectState};

pub fn create_redirect_router(links: Arc<LinkStore>) -> Router {
    let state = Arc::new(RedirectState { links });

    Router::new()
        .route("/{short_path}", get(redirect_short_path))
        .with_state(state)
}
