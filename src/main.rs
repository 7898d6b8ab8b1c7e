use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use magpie::api::create_api_router;
use magpie::api::handlers::AppState;
use magpie::config::Config;
use magpie::geo::{CountryResolver, IpApiLookup};
use magpie::rate_limit::DailyRateLimiter;
use magpie::store::{CounterStore, LinkStore, TallyStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Load the stores from their snapshots
    let counter = Arc::new(CounterStore::load(&config.snapshots.counter_file).await?);
    info!(
        "Counter sequence resumed at {} from {}",
        counter.current().await,
        config.snapshots.counter_file.display()
    );

    let tally = Arc::new(TallyStore::load(&config.snapshots.tally_file).await?);
    info!(
        "Country tally loaded with {} labels from {}",
        tally.len().await,
        config.snapshots.tally_file.display()
    );

    let links = Arc::new(LinkStore::load(&config.snapshots.links_file).await?);
    info!(
        "Link table loaded with {} mappings from {}",
        links.len().await,
        config.snapshots.links_file.display()
    );

    // Rate limiting and geolocation
    let limiter = Arc::new(DailyRateLimiter::new(config.rate_limit_per_day));
    info!(
        "Rate limit: {} requests per IP per day",
        config.rate_limit_per_day
    );

    let lookup = IpApiLookup::new(
        config.geo.api_base.clone(),
        Duration::from_secs(config.geo.timeout_secs),
    )?;
    let geo = Arc::new(CountryResolver::new(Arc::new(lookup)));
    info!(
        "🌍 Country lookups via {} (timeout {}s)",
        config.geo.api_base, config.geo.timeout_secs
    );

    // Assemble the router
    let state = Arc::new(AppState {
        counter,
        links,
        tally,
        limiter,
        geo,
        public_base_url: config.public_base_url.clone(),
    });
    let app = create_api_router(state, config.allowed_origins.as_deref());

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 magpie listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
