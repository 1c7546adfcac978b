pub mod cache;
pub mod provider;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::{env_parse, Settings};
use provider::{HttpFmpProvider, MarketDataProvider};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PROFILE_CACHE_TTL_SECS: u64 = 300;

/// HTTP provider wrapped in a profile cache unless `PEER_CACHE_TTL_SECS=0`.
pub fn provider_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn MarketDataProvider>> {
    let http = HttpFmpProvider::from_settings(settings)?;
    let ttl_secs = env_parse("PEER_CACHE_TTL_SECS", DEFAULT_PROFILE_CACHE_TTL_SECS);
    if ttl_secs == 0 {
        tracing::debug!("profile cache disabled");
        return Ok(Arc::new(http));
    }
    Ok(Arc::new(cache::CachedProvider::new(
        http,
        Duration::from_secs(ttl_secs),
    )))
}
