use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::store::LinkStore;

pub struct RedirectState {
    pub links: Arc<LinkStore>,
}

/// Redirect a short path to its destination.
///
/// Responds `302 Found` with the destination in `Location`, built from
/// `StatusCode` directly since axum's `Redirect` helpers only offer
/// 303/307/308.
pub async fn redirect_short_path(
    State(state): State<Arc<RedirectState>>,
    Path(short_path): Path<String>,
) -> Result<Response, ApiError> {
    match state.links.resolve(&short_path).await {
        Some(long_url) => {
            Ok((StatusCode::FOUND, [(header::LOCATION, long_url)]).into_response())
        }
        None => Err(ApiError::NotFound(format!(
            "Short URL path '{short_path}' not found"
        ))),
    }
}
