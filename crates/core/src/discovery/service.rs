use crate::discovery::error::PeerDiscoveryError;
use crate::discovery::generators::{
    CandidateGenerator, CuratedPeersGenerator, DiscoveryContext, ManualFilterGenerator,
    ScreenerGenerator,
};
use crate::discovery::get_company_profile;
use crate::discovery::options::{DiscoveryOptions, StrategyKind};
use crate::discovery::ranking::{
    deduplicate_peers, peer_type_counts, rank_peers, round_scores, score_candidate,
    score_candidates,
};
use crate::domain::peer::{CandidateSource, PeerCandidate, ScoredPeer};
use crate::domain::profile::{symbol_key, CompanyProfile};
use crate::ingest::provider::MarketDataProvider;
use std::collections::HashSet;
use std::sync::Arc;

pub struct PeerDiscoveryService {
    provider: Arc<dyn MarketDataProvider>,
    options: DiscoveryOptions,
    primary: Vec<Arc<dyn CandidateGenerator>>,
    fallback: Vec<Arc<dyn CandidateGenerator>>,
}

impl PeerDiscoveryService {
    pub fn new(provider: Arc<dyn MarketDataProvider>, options: DiscoveryOptions) -> Self {
        let primary = build_generators(&provider, &options.primary);
        let fallback = build_generators(&provider, &options.fallback);
        Self::with_generators(provider, options, primary, fallback)
    }

    pub fn with_generators(
        provider: Arc<dyn MarketDataProvider>,
        options: DiscoveryOptions,
        primary: Vec<Arc<dyn CandidateGenerator>>,
        fallback: Vec<Arc<dyn CandidateGenerator>>,
    ) -> Self {
        Self {
            provider,
            options,
            primary,
            fallback,
        }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    pub fn provider(&self) -> &Arc<dyn MarketDataProvider> {
        &self.provider
    }

    /// Ranked peers for `symbol`, at most `max_peers`, ordered by weighted score.
    ///
    /// Only an unresolvable target profile (or an invalid request) is an error; every
    /// strategy or per-candidate failure degrades to fewer results. An empty list is a
    /// valid outcome.
    pub async fn identify_peers(
        &self,
        symbol: &str,
        max_peers: usize,
        sector_override: Option<&str>,
        manual_override_peers: &[String],
    ) -> anyhow::Result<Vec<ScoredPeer>> {
        let target_key = symbol_key(symbol);
        if target_key.is_empty() {
            return Err(PeerDiscoveryError::InvalidRequest {
                detail: "symbol must be non-empty".to_string(),
            }
            .into());
        }
        if max_peers == 0 {
            return Err(PeerDiscoveryError::InvalidRequest {
                detail: "max_peers must be >= 1".to_string(),
            }
            .into());
        }

        tracing::info!(symbol = %target_key, max_peers, "starting peer discovery");

        let Some(target) = get_company_profile(self.provider.as_ref(), &target_key).await else {
            tracing::error!(symbol = %target_key, "peer discovery failed: no target profile");
            return Err(PeerDiscoveryError::TargetProfileUnavailable { symbol: target_key }.into());
        };

        let target_sector = sector_override
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&target.sector)
            .to_string();

        tracing::info!(
            symbol = %target_key,
            sector = %target_sector,
            industry = %target.industry,
            market_cap = target.market_cap,
            "target profile resolved"
        );

        let ctx = DiscoveryContext {
            symbol: &target_key,
            target: &target,
            target_sector: &target_sector,
            max_peers,
        };

        let mut candidates = run_generators(&self.primary, &ctx).await;
        if candidates.len() < max_peers {
            candidates.extend(run_generators(&self.fallback, &ctx).await);
        }

        let scored = score_candidates(&target, &candidates, self.options.similarity_threshold);
        let mut peers = deduplicate_peers(scored);
        rank_peers(&mut peers, max_peers);

        let [(_, industry), (_, sector), (_, financial)] = peer_type_counts(&peers);
        tracing::info!(
            symbol = %target_key,
            candidates = candidates.len(),
            industry,
            sector,
            financial,
            "peer type distribution"
        );

        if !manual_override_peers.is_empty() {
            peers = self
                .merge_manual_overrides(&target, peers, manual_override_peers, max_peers)
                .await;
        }

        round_scores(&mut peers);

        tracing::info!(
            symbol = %target_key,
            peers = ?peers.iter().map(|p| p.symbol.as_str()).collect::<Vec<_>>(),
            "peer discovery completed"
        );
        Ok(peers)
    }

    /// Adds override symbols not already present while the list is under `max_peers`,
    /// scored and boosted like any other candidate.
    async fn merge_manual_overrides(
        &self,
        target: &CompanyProfile,
        peers: Vec<ScoredPeer>,
        overrides: &[String],
        max_peers: usize,
    ) -> Vec<ScoredPeer> {
        let target_key = target.symbol_key();
        let mut present: HashSet<String> = peers.iter().map(|p| symbol_key(&p.symbol)).collect();
        let mut combined = peers;

        for raw in overrides {
            let key = symbol_key(raw);
            if key.is_empty() || key == target_key || present.contains(&key) {
                continue;
            }
            if combined.len() >= max_peers {
                break;
            }

            let Some(profile) = get_company_profile(self.provider.as_ref(), &key).await else {
                tracing::warn!(symbol = %key, "manual override peer has no profile; skipping");
                continue;
            };

            let candidate = PeerCandidate::new(profile, CandidateSource::ManualOverride);
            match score_candidate(target, &candidate, self.options.similarity_threshold) {
                Some(peer) => {
                    present.insert(key);
                    combined.push(peer);
                }
                None => {
                    tracing::info!(
                        symbol = %key,
                        "manual override peer below similarity threshold"
                    );
                }
            }
        }

        rank_peers(&mut combined, max_peers);
        combined
    }
}

fn build_generators(
    provider: &Arc<dyn MarketDataProvider>,
    kinds: &[StrategyKind],
) -> Vec<Arc<dyn CandidateGenerator>> {
    kinds
        .iter()
        .map(|kind| -> Arc<dyn CandidateGenerator> {
            match kind {
                StrategyKind::Screener => Arc::new(ScreenerGenerator::new(provider.clone())),
                StrategyKind::CuratedPeers => {
                    Arc::new(CuratedPeersGenerator::new(provider.clone()))
                }
                StrategyKind::ManualFilter => Arc::new(ManualFilterGenerator),
            }
        })
        .collect()
}

async fn run_generators(
    generators: &[Arc<dyn CandidateGenerator>],
    ctx: &DiscoveryContext<'_>,
) -> Vec<PeerCandidate> {
    let mut out = Vec::new();
    for generator in generators {
        match generator.generate(ctx).await {
            Ok(found) => {
                tracing::info!(
                    strategy = generator.name(),
                    count = found.len(),
                    "strategy finished"
                );
                out.extend(found);
            }
            Err(err) => {
                tracing::warn!(strategy = generator.name(), error = %err, "strategy failed");
            }
        }
    }
    out
}
