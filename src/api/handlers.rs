use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use url::Url;

use crate::error::ApiError;
use crate::geo::CountryResolver;
use crate::rate_limit::{Admission, DailyRateLimiter};
use crate::store::{format_sequential_uuid, CounterStore, LinkError, LinkStore, TallyStore};

use super::client_ip::client_ip;

pub struct AppState {
    pub counter: Arc<CounterStore>,
    pub links: Arc<LinkStore>,
    pub tally: Arc<TallyStore>,
    pub limiter: Arc<DailyRateLimiter>,
    pub geo: Arc<CountryResolver>,
    pub public_base_url: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct UuidResponse {
    pub uuid: String,
}

#[derive(Serialize)]
pub struct LeaderboardEntry {
    pub country: String,
    pub count: u64,
}

#[derive(Deserialize)]
pub struct ShortenRequest {
    pub long_url: String,
    pub short_path: String,
}

#[derive(Serialize)]
pub struct ShortenResponse {
    pub message: String,
    pub short_url: String,
    pub long_url: String,
}

/// Issue the next sequential identifier.
///
/// The request first passes the daily quota check (a denied caller still
/// consumes quota and gets 429 without touching any store), then the
/// resolved country tally is bumped, and only then is the identifier
/// issued.
pub async fn issue_uuid(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<UuidResponse>, ApiError> {
    let client = client_ip(&headers, addr.ip());

    if state.limiter.admit(client) == Admission::Denied {
        return Err(ApiError::RateLimited {
            limit: state.limiter.limit(),
        });
    }

    let country = state.geo.resolve(client).await;
    state.tally.increment(&country).await;

    let value = state.counter.issue().await;
    Ok(Json(UuidResponse {
        uuid: format_sequential_uuid(value),
    }))
}

/// Top three countries by issued-identifier count.
pub async fn leaderboard(State(state): State<Arc<AppState>>) -> Json<Vec<LeaderboardEntry>> {
    let entries = state
        .tally
        .top_n(3)
        .await
        .into_iter()
        .map(|(country, count)| LeaderboardEntry { country, count })
        .collect();
    Json(entries)
}

/// Bind a short path to a destination URL.
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, ApiError> {
    let long_url = Url::parse(&payload.long_url)
        .map_err(|_| ApiError::Validation("long_url must be a valid absolute URL".to_string()))?;
    if !matches!(long_url.scheme(), "http" | "https") {
        return Err(ApiError::Validation(
            "long_url must be an http or https URL".to_string(),
        ));
    }

    state
        .links
        .create(&payload.short_path, long_url.as_str())
        .await
        .map_err(|err| match err {
            LinkError::InvalidPath => ApiError::Validation(err.to_string()),
            LinkError::Taken(_) => ApiError::Conflict(err.to_string()),
        })?;

    Ok(Json(ShortenResponse {
        message: "Short URL created successfully".to_string(),
        short_url: format!("{}/{}", state.public_base_url, payload.short_path),
        long_url: long_url.into(),
    }))
}

#[derive(Serialize)]
pub struct RootUsage {
    pub issue_uuid: &'static str,
    pub leaderboard: &'static str,
    pub create_short_url: &'static str,
    pub redirect: &'static str,
}

#[derive(Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub usage: RootUsage,
}

/// Root endpoint with basic usage information.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Magpie identifier and link shortener service",
        usage: RootUsage {
            issue_uuid: "GET /uuixd for the next sequential identifier",
            leaderboard: "GET /leaderboard for the top countries by request count",
            create_short_url: "POST /shorten with JSON body containing 'long_url' and 'short_path'",
            redirect: "GET /{short_path} to redirect to the long URL",
        },
    })
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
