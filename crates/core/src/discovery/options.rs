use crate::config::env_parse;
use std::str::FromStr;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Screener,
    CuratedPeers,
    ManualFilter,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "screener" => Ok(StrategyKind::Screener),
            "curated_peers" | "fmp_peers" | "peers" => Ok(StrategyKind::CuratedPeers),
            "manual" | "manual_filter" => Ok(StrategyKind::ManualFilter),
            other => anyhow::bail!("unknown discovery strategy: {other}"),
        }
    }
}

/// Immutable discovery configuration; built once and handed to the service.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOptions {
    /// Candidates whose raw similarity falls below this are discarded.
    pub similarity_threshold: f64,

    /// Always run, in order.
    pub primary: Vec<StrategyKind>,

    /// Run only when the primary strategies produced fewer than `max_peers` candidates.
    pub fallback: Vec<StrategyKind>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            primary: vec![StrategyKind::Screener],
            fallback: vec![StrategyKind::ManualFilter],
        }
    }
}

impl DiscoveryOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        let threshold = env_parse("PEER_SIMILARITY_THRESHOLD", out.similarity_threshold);
        if (0.0..=1.0).contains(&threshold) {
            out.similarity_threshold = threshold;
        } else {
            tracing::warn!(threshold, "PEER_SIMILARITY_THRESHOLD out of range; using default");
        }

        if let Ok(s) = std::env::var("PEER_PRIMARY_STRATEGIES") {
            out.primary = parse_strategy_list(&s);
        }
        if let Ok(s) = std::env::var("PEER_FALLBACK_STRATEGIES") {
            out.fallback = parse_strategy_list(&s);
        }

        out
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

pub fn parse_strategy_list(s: &str) -> Vec<StrategyKind> {
    let mut out = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.parse::<StrategyKind>() {
            Ok(kind) if !out.contains(&kind) => out.push(kind),
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "ignoring discovery strategy"),
        }
    }
    out
}
