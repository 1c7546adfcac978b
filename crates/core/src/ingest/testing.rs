use crate::domain::profile::{symbol_key, CompanyProfile};
use crate::ingest::provider::{MarketDataProvider, ScreenerQuery};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn profile(
    symbol: &str,
    sector: &str,
    industry: &str,
    market_cap: f64,
    revenue: f64,
    country: &str,
) -> CompanyProfile {
    CompanyProfile {
        symbol: symbol.to_string(),
        company_name: format!("{symbol} Corp"),
        sector: sector.to_string(),
        industry: industry.to_string(),
        market_cap,
        revenue,
        country: country.to_string(),
    }
}

/// In-memory provider. `None` screener/peers responses behave as endpoint failures.
#[derive(Default)]
pub(crate) struct FakeProvider {
    profiles: HashMap<String, CompanyProfile>,
    failing_profiles: HashSet<String>,
    slow_profiles: HashSet<String>,
    industry_screen: Option<Vec<CompanyProfile>>,
    sector_screen: Option<Vec<CompanyProfile>>,
    peers: Option<Vec<String>>,
    pub profile_calls: AtomicUsize,
    pub screen_queries: Mutex<Vec<ScreenerQuery>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, p: CompanyProfile) -> Self {
        self.profiles.insert(symbol_key(&p.symbol), p);
        self
    }

    pub fn with_failing_profile(mut self, symbol: &str) -> Self {
        self.failing_profiles.insert(symbol_key(symbol));
        self
    }

    pub fn with_slow_profile(mut self, symbol: &str) -> Self {
        self.slow_profiles.insert(symbol_key(symbol));
        self
    }

    pub fn with_industry_screen(mut self, items: Vec<CompanyProfile>) -> Self {
        self.industry_screen = Some(items);
        self
    }

    pub fn with_sector_screen(mut self, items: Vec<CompanyProfile>) -> Self {
        self.sector_screen = Some(items);
        self
    }

    pub fn with_peers(mut self, symbols: &[&str]) -> Self {
        self.peers = Some(symbols.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn profile_call_count(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn recorded_queries(&self) -> Vec<ScreenerQuery> {
        self.screen_queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for FakeProvider {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn company_profile(&self, symbol: &str) -> Result<Option<CompanyProfile>> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        let key = symbol_key(symbol);
        if self.slow_profiles.contains(&key) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if self.failing_profiles.contains(&key) {
            anyhow::bail!("profile endpoint down for {key}");
        }
        Ok(self.profiles.get(&key).cloned())
    }

    async fn screen_companies(&self, query: &ScreenerQuery) -> Result<Vec<CompanyProfile>> {
        self.screen_queries.lock().unwrap().push(query.clone());
        let response = if query.industry.is_some() {
            &self.industry_screen
        } else {
            &self.sector_screen
        };
        match response {
            Some(items) => Ok(items.clone()),
            None => anyhow::bail!("screener unavailable"),
        }
    }

    async fn stock_peers(&self, _symbol: &str) -> Result<Vec<String>> {
        match &self.peers {
            Some(p) => Ok(p.clone()),
            None => anyhow::bail!("peers endpoint unavailable"),
        }
    }
}
