//! Country resolution for client addresses.
//!
//! The outbound lookup sits behind a trait so the resolver can be exercised
//! with a mock. The production implementation calls an ipapi.co-compatible
//! endpoint; results are cached per address for the life of the process.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Label for addresses in loopback, private, or link-local ranges.
pub const LOCAL_COUNTRY: &str = "Local";
/// Label when the outbound lookup fails or returns nothing.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Outbound geolocation collaborator.
#[async_trait]
pub trait CountryLookup: Send + Sync {
    /// Country name for a public address.
    async fn country_for(&self, addr: IpAddr) -> Result<String>;
}

/// HTTP lookup against an ipapi.co-compatible endpoint
/// (`GET {base}/{ip}/country_name/`).
pub struct IpApiLookup {
    client: reqwest::Client,
    base_url: String,
}

impl IpApiLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("magpie/0.1.0")
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for country lookups")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CountryLookup for IpApiLookup {
    async fn country_for(&self, addr: IpAddr) -> Result<String> {
        let url = format!("{}/{}/country_name/", self.base_url, addr);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("country lookup request to {url} failed"))?
            .error_for_status()
            .context("country lookup returned an error status")?;

        let body = response
            .text()
            .await
            .context("failed to read country lookup response")?;

        let country = body.trim();
        if country.is_empty() {
            bail!("country lookup returned an empty body");
        }

        Ok(country.to_string())
    }
}

/// Caching resolver in front of a [`CountryLookup`].
///
/// Private and loopback addresses short-circuit to "Local" without an
/// outbound call. Every resolved label, including the "Unknown" produced by
/// a failed lookup, is cached for the life of the process, so each address
/// costs at most one outbound call.
pub struct CountryResolver {
    lookup: Arc<dyn CountryLookup>,
    cache: Cache<IpAddr, String>,
}

impl CountryResolver {
    pub fn new(lookup: Arc<dyn CountryLookup>) -> Self {
        // Unbounded and without TTL: one entry per distinct caller address,
        // and a resolved label never changes.
        Self {
            lookup,
            cache: Cache::builder().build(),
        }
    }

    pub async fn resolve(&self, addr: IpAddr) -> String {
        if let Some(country) = self.cache.get(&addr).await {
            return country;
        }

        let country = if is_local(addr) {
            LOCAL_COUNTRY.to_string()
        } else {
            match self.lookup.country_for(addr).await {
                Ok(country) => country,
                Err(err) => {
                    warn!(addr = %addr, error = %err, "country lookup failed");
                    UNKNOWN_COUNTRY.to_string()
                }
            }
        };

        self.cache.insert(addr, country.clone()).await;
        country
    }
}

/// Addresses that never leave the machine or the LAN.
fn is_local(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            // fc00::/7 unique-local, fe80::/10 link-local
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}
