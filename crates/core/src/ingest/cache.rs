use crate::domain::profile::{symbol_key, CompanyProfile};
use crate::ingest::provider::{MarketDataProvider, ScreenerQuery};
use anyhow::Result;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedProfile {
    profile: CompanyProfile,
    fetched_at: Instant,
}

/// Wraps a provider with a short-lived profile cache. Only resolved profiles are cached;
/// misses and failures always go back to the inner provider.
pub struct CachedProvider<P> {
    inner: P,
    ttl: Duration,
    profiles: tokio::sync::Mutex<HashMap<String, CachedProfile>>,
}

impl<P: MarketDataProvider> CachedProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            profiles: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachedProvider<P> {
    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    async fn company_profile(&self, symbol: &str) -> Result<Option<CompanyProfile>> {
        let key = symbol_key(symbol);
        {
            let guard = self.profiles.lock().await;
            if let Some(cached) = guard.get(&key) {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(Some(cached.profile.clone()));
                }
            }
        }

        // Lock is not held across the fetch so concurrent lookups of other symbols proceed.
        let fetched = self.inner.company_profile(symbol).await?;
        if let Some(profile) = &fetched {
            let mut guard = self.profiles.lock().await;
            let ttl = self.ttl;
            guard.retain(|_, cached| cached.fetched_at.elapsed() < ttl);
            guard.insert(
                key,
                CachedProfile {
                    profile: profile.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }
        Ok(fetched)
    }

    async fn screen_companies(&self, query: &ScreenerQuery) -> Result<Vec<CompanyProfile>> {
        self.inner.screen_companies(query).await
    }

    async fn stock_peers(&self, symbol: &str) -> Result<Vec<String>> {
        self.inner.stock_peers(symbol).await
    }
}
