//! API integration tests
//!
//! These tests drive the assembled router end to end: identifier issuance
//! with per-address quotas and country tallying, the leaderboard, and the
//! service endpoints.

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use magpie::api::create_api_router;
use magpie::api::handlers::AppState;
use magpie::geo::{CountryLookup, CountryResolver};
use magpie::rate_limit::DailyRateLimiter;
use magpie::store::{format_sequential_uuid, CounterStore, LinkStore, TallyStore};
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::{Layer, ServiceExt};

/// Lookup collaborator that returns a fixed country and counts calls
struct FixedLookup {
    country: &'static str,
    calls: AtomicUsize,
}

impl FixedLookup {
    fn new(country: &'static str) -> Arc<Self> {
        Arc::new(Self {
            country,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CountryLookup for FixedLookup {
    async fn country_for(&self, _addr: IpAddr) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.country.to_string())
    }
}

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("magpie-api-{}-{}", std::process::id(), name))
}

/// Helper to build application state over fresh scratch snapshots
async fn build_state(test: &str, limit: u64, lookup: Arc<FixedLookup>) -> Arc<AppState> {
    let counter_path = scratch(&format!("{test}-counter"));
    let tally_path = scratch(&format!("{test}-tally"));
    let links_path = scratch(&format!("{test}-links"));
    for path in [&counter_path, &tally_path, &links_path] {
        let _ = tokio::fs::remove_file(path).await;
    }

    Arc::new(AppState {
        counter: Arc::new(CounterStore::load(counter_path).await.unwrap()),
        links: Arc::new(LinkStore::load(links_path).await.unwrap()),
        tally: Arc::new(TallyStore::load(tally_path).await.unwrap()),
        limiter: Arc::new(DailyRateLimiter::new(limit)),
        geo: Arc::new(CountryResolver::new(lookup)),
        public_base_url: "http://localhost:5000".to_string(),
    })
}

async fn cleanup(test: &str) {
    for file in ["counter", "tally", "links"] {
        let _ = tokio::fs::remove_file(scratch(&format!("{test}-{file}"))).await;
    }
}

/// Helper layer to inject ConnectInfo for tests
#[derive(Clone)]
struct TestConnectInfoLayer;

impl<S> Layer<S> for TestConnectInfoLayer {
    type Service = TestConnectInfoMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TestConnectInfoMiddleware { inner }
    }
}

#[derive(Clone)]
struct TestConnectInfoMiddleware<S> {
    inner: S,
}

impl<S, B> tower::Service<Request<B>> for TestConnectInfoMiddleware<S>
where
    S: tower::Service<Request<B>> + Clone,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // Insert test ConnectInfo extension
        let addr = SocketAddr::from(([127, 0, 0, 1], 12345));
        req.extensions_mut()
            .insert(axum::extract::connect_info::ConnectInfo(addr));

        self.inner.call(req)
    }
}

fn get_request(path: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(xff) = forwarded_for {
        builder = builder.header("x-forwarded-for", xff);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_uuixd_issues_sequential_identifiers() {
    let state = build_state("sequential", 100, FixedLookup::new("Sweden")).await;
    let app = create_api_router(state, None).layer(TestConnectInfoLayer);

    let response = app
        .clone()
        .oneshot(get_request("/uuixd", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["uuid"], "00000000-0000-0000-0000-000000000000");

    let response = app.oneshot(get_request("/uuixd", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["uuid"], "00000000-0000-0000-0000-000000000001");

    cleanup("sequential").await;
}

#[tokio::test]
async fn test_concurrent_uuixd_requests_get_distinct_identifiers() {
    let state = build_state("concurrent", 100, FixedLookup::new("Sweden")).await;
    let app = create_api_router(state, None).layer(TestConnectInfoLayer);

    let mut handles = vec![];
    for _ in 0..25 {
        let app_clone = app.clone();
        handles.push(tokio::spawn(async move {
            let response = app_clone
                .oneshot(get_request("/uuixd", None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = json_body(response).await;
            json["uuid"].as_str().unwrap().to_string()
        }));
    }

    let mut uuids = vec![];
    for handle in handles {
        uuids.push(handle.await.unwrap());
    }
    uuids.sort();

    let expected: Vec<String> = (0..25).map(format_sequential_uuid).collect();
    assert_eq!(
        uuids, expected,
        "25 concurrent requests must cover the first 25 identifiers exactly once"
    );

    cleanup("concurrent").await;
}

#[tokio::test]
async fn test_rate_limit_rejects_after_quota() {
    let state = build_state("ratelimit", 3, FixedLookup::new("Sweden")).await;
    let app = create_api_router(state, None).layer(TestConnectInfoLayer);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(get_request("/uuixd", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get_request("/uuixd", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = json_body(response).await;
    assert_eq!(
        json["error"],
        "Rate limit exceeded: 3 requests per IP per day."
    );

    cleanup("ratelimit").await;
}

#[tokio::test]
async fn test_quota_is_tracked_per_client_address() {
    let state = build_state("perclient", 1, FixedLookup::new("Sweden")).await;
    let app = create_api_router(state, None).layer(TestConnectInfoLayer);

    // The first client burns its single request
    let response = app
        .clone()
        .oneshot(get_request("/uuixd", Some("203.0.113.5")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/uuixd", Some("203.0.113.5")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different client is unaffected
    let response = app
        .oneshot(get_request("/uuixd", Some("203.0.113.6")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    cleanup("perclient").await;
}

#[tokio::test]
async fn test_leaderboard_returns_top_three() {
    let state = build_state("leaderboard", 100, FixedLookup::new("Sweden")).await;
    for _ in 0..3 {
        state.tally.increment("United States").await;
        state.tally.increment("France").await;
    }
    state.tally.increment("Germany").await;
    state.tally.increment("Germany").await;
    state.tally.increment("Spain").await;

    let app = create_api_router(state, None).layer(TestConnectInfoLayer);
    let response = app.oneshot(get_request("/leaderboard", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 3, "leaderboard is capped at three entries");

    // Ties break alphabetically, so France beats United States at 3 apiece
    assert_eq!(entries[0]["country"], "France");
    assert_eq!(entries[0]["count"], 3);
    assert_eq!(entries[1]["country"], "United States");
    assert_eq!(entries[1]["count"], 3);
    assert_eq!(entries[2]["country"], "Germany");
    assert_eq!(entries[2]["count"], 2);

    cleanup("leaderboard").await;
}

#[tokio::test]
async fn test_local_client_tallies_local_without_lookup() {
    let lookup = FixedLookup::new("Sweden");
    let state = build_state("local", 100, Arc::clone(&lookup)).await;
    let app = create_api_router(Arc::clone(&state), None).layer(TestConnectInfoLayer);

    // No forwarding header, so the peer address (127.0.0.1) is the client
    let response = app.oneshot(get_request("/uuixd", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(lookup.calls(), 0, "local peer must not trigger an outbound lookup");
    assert_eq!(state.tally.top_n(1).await, vec![("Local".to_string(), 1)]);

    cleanup("local").await;
}

#[tokio::test]
async fn test_forwarded_client_is_resolved_once_and_tallied() {
    let lookup = FixedLookup::new("Sweden");
    let state = build_state("forwarded", 100, Arc::clone(&lookup)).await;
    let app = create_api_router(Arc::clone(&state), None).layer(TestConnectInfoLayer);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(get_request("/uuixd", Some("203.0.113.80")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(lookup.calls(), 1, "second request must come from the cache");
    assert_eq!(state.tally.top_n(1).await, vec![("Sweden".to_string(), 2)]);

    cleanup("forwarded").await;
}

#[tokio::test]
async fn test_health_and_root_endpoints() {
    let state = build_state("health", 100, FixedLookup::new("Sweden")).await;
    let app = create_api_router(state, None).layer(TestConnectInfoLayer);

    let response = app
        .clone()
        .oneshot(get_request("/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["message"], "OK");

    let response = app.oneshot(get_request("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["usage"]["issue_uuid"]
        .as_str()
        .unwrap()
        .contains("/uuixd"));

    cleanup("health").await;
}

#[tokio::test]
async fn test_quota_only_applies_to_identifier_endpoint() {
    let state = build_state("unlimited", 1, FixedLookup::new("Sweden")).await;
    let app = create_api_router(state, None).layer(TestConnectInfoLayer);

    // Exhaust the identifier quota
    let response = app
        .clone()
        .oneshot(get_request("/uuixd", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .clone()
        .oneshot(get_request("/uuixd", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // The rest of the service stays reachable
    for path in ["/leaderboard", "/health", "/"] {
        let response = app.clone().oneshot(get_request(path, None)).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::OK,
            "{path} must not be rate limited"
        );
    }

    cleanup("unlimited").await;
}
