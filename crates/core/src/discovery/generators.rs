use crate::discovery::get_company_profile;
use crate::domain::peer::{CandidateSource, PeerCandidate};
use crate::domain::profile::{symbol_key, CompanyProfile};
use crate::ingest::provider::{MarketDataProvider, ScreenerQuery};
use std::collections::HashSet;
use std::sync::Arc;

/// Page size requested from the screener per query.
const SCREENER_PAGE_SIZE: usize = 100;

/// The screener returns this multiple of `limit` so later threshold filtering still has headroom.
const SCREENER_OVERFETCH: usize = 3;

/// Bound on profile fetches issued by the curated-peers strategy.
const MAX_CURATED_PEERS: usize = 10;

/// Inputs shared by every candidate generator for one discovery run.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryContext<'a> {
    pub symbol: &'a str,
    pub target: &'a CompanyProfile,
    pub target_sector: &'a str,
    pub max_peers: usize,
}

#[async_trait::async_trait]
pub trait CandidateGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, ctx: &DiscoveryContext<'_>) -> anyhow::Result<Vec<PeerCandidate>>;
}

pub struct ScreenerGenerator {
    provider: Arc<dyn MarketDataProvider>,
}

impl ScreenerGenerator {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for ScreenerGenerator {
    fn name(&self) -> &'static str {
        "screener"
    }

    async fn generate(&self, ctx: &DiscoveryContext<'_>) -> anyhow::Result<Vec<PeerCandidate>> {
        let limit = ctx.max_peers.saturating_mul(SCREENER_OVERFETCH);
        let found =
            discover_via_screener(self.provider.as_ref(), ctx.target, ctx.target_sector, limit)
                .await;
        Ok(found)
    }
}

pub struct CuratedPeersGenerator {
    provider: Arc<dyn MarketDataProvider>,
}

impl CuratedPeersGenerator {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for CuratedPeersGenerator {
    fn name(&self) -> &'static str {
        "curated_peers"
    }

    async fn generate(&self, ctx: &DiscoveryContext<'_>) -> anyhow::Result<Vec<PeerCandidate>> {
        Ok(discover_via_fmp_peers(self.provider.as_ref(), ctx.symbol, ctx.target).await)
    }
}

/// Slot for a broader unfiltered-then-locally-filtered search. Contributes nothing today.
#[derive(Debug, Default)]
pub struct ManualFilterGenerator;

#[async_trait::async_trait]
impl CandidateGenerator for ManualFilterGenerator {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn generate(&self, ctx: &DiscoveryContext<'_>) -> anyhow::Result<Vec<PeerCandidate>> {
        tracing::info!(symbol = ctx.symbol, "manual filtering strategy has no candidate source");
        Ok(Vec::new())
    }
}

/// Industry+sector screen, then (if short of `2 * limit`) a sector-only screen. Merged
/// first-wins by symbol, ordered by market-cap distance to the target, capped at `3 * limit`.
/// A failing query contributes nothing.
pub async fn discover_via_screener(
    provider: &dyn MarketDataProvider,
    target: &CompanyProfile,
    target_sector: &str,
    limit: usize,
) -> Vec<PeerCandidate> {
    let sector = non_empty(target_sector);
    let industry = non_empty(&target.industry);
    let mut pooled: Vec<PeerCandidate> = Vec::new();

    if let Some(industry) = industry {
        let query = ScreenerQuery {
            sector: sector.map(str::to_string),
            industry: Some(industry.to_string()),
            is_actively_trading: Some(true),
            limit: SCREENER_PAGE_SIZE,
            ..Default::default()
        };
        match provider.screen_companies(&query).await {
            Ok(found) => {
                tracing::info!(industry, count = found.len(), "industry screener results");
                pooled.extend(
                    found
                        .into_iter()
                        .map(|p| PeerCandidate::new(p, CandidateSource::ScreenerIndustry)),
                );
            }
            Err(err) => tracing::warn!(industry, error = %err, "industry screener failed"),
        }
    }

    if pooled.len() < limit.saturating_mul(2) {
        match sector {
            Some(sector) => {
                let query = ScreenerQuery {
                    sector: Some(sector.to_string()),
                    is_actively_trading: Some(true),
                    limit: SCREENER_PAGE_SIZE,
                    ..Default::default()
                };
                match provider.screen_companies(&query).await {
                    Ok(found) => {
                        tracing::info!(sector, count = found.len(), "sector screener results");
                        pooled.extend(
                            found
                                .into_iter()
                                .map(|p| PeerCandidate::new(p, CandidateSource::ScreenerSector)),
                        );
                    }
                    Err(err) => tracing::warn!(sector, error = %err, "sector screener failed"),
                }
            }
            None => tracing::warn!("target has no sector; skipping sector screener"),
        }
    }

    let mut seen = HashSet::new();
    let mut candidates: Vec<PeerCandidate> = pooled
        .into_iter()
        .filter(|c| seen.insert(c.profile.symbol_key()))
        .collect();

    let target_cap = target.market_cap;
    if target_cap > 0.0 {
        candidates.sort_by(|a, b| {
            let da = (a.profile.market_cap - target_cap).abs();
            let db = (b.profile.market_cap - target_cap).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    candidates.truncate(limit.saturating_mul(SCREENER_OVERFETCH));
    tracing::info!(
        sector = target_sector,
        count = candidates.len(),
        "screener returning closest market-cap candidates"
    );
    candidates
}

/// Curated peer list (primary endpoint with versioned fallback inside the provider), each
/// resolved to a full profile. Unresolvable symbols are dropped.
pub async fn discover_via_fmp_peers(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    target: &CompanyProfile,
) -> Vec<PeerCandidate> {
    let peer_symbols = match provider.stock_peers(symbol).await {
        Ok(symbols) => symbols,
        Err(err) => {
            tracing::warn!(symbol, error = %err, "curated peers lookup failed");
            return Vec::new();
        }
    };

    let target_key = target.symbol_key();
    let mut candidates = Vec::new();
    for peer in peer_symbols
        .iter()
        .filter(|s| symbol_key(s) != target_key)
        .take(MAX_CURATED_PEERS)
    {
        if let Some(profile) = get_company_profile(provider, peer).await {
            candidates.push(PeerCandidate::new(profile, CandidateSource::FmpPeers));
        }
    }

    tracing::info!(symbol, count = candidates.len(), "curated peers resolved");
    candidates
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}
