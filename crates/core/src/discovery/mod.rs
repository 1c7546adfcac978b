//! Peer discovery: candidate generation, similarity scoring, classification and ranking.

pub mod classify;
pub mod error;
pub mod generators;
pub mod geography;
pub mod options;
pub mod ranking;
pub mod service;
pub mod similarity;

pub use error::PeerDiscoveryError;
pub use options::{DiscoveryOptions, StrategyKind};
pub use service::PeerDiscoveryService;

use crate::domain::profile::CompanyProfile;
use crate::ingest::provider::MarketDataProvider;

/// Profile lookup that never fails: provider errors and unknown symbols both yield `None`.
pub async fn get_company_profile(
    provider: &dyn MarketDataProvider,
    symbol: &str,
) -> Option<CompanyProfile> {
    match provider.company_profile(symbol).await {
        Ok(Some(profile)) => Some(profile),
        Ok(None) => {
            tracing::debug!(symbol, provider = provider.provider_name(), "no profile returned");
            None
        }
        Err(err) => {
            tracing::warn!(
                symbol,
                provider = provider.provider_name(),
                error = %err,
                "profile fetch failed"
            );
            None
        }
    }
}
