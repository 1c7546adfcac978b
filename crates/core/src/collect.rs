use crate::config::env_parse;
use crate::domain::profile::{symbol_key, CompanyProfile};
use crate::ingest::provider::MarketDataProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Concurrent profile fetches (1..=16).
    pub max_concurrency: usize,

    /// Per-company budget; exceeding it marks only that company unavailable.
    pub per_company_timeout: Duration,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            per_company_timeout: Duration::from_secs(120),
        }
    }
}

impl CollectOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrency: env_parse("COLLECT_MAX_CONCURRENCY", defaults.max_concurrency)
                .clamp(1, 16),
            per_company_timeout: Duration::from_secs(env_parse(
                "COLLECT_TIMEOUT_SECS",
                defaults.per_company_timeout.as_secs(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompanyData {
    Available(CompanyProfile),
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectedCompany {
    pub symbol: String,
    pub data: CompanyData,
}

impl CollectedCompany {
    pub fn profile(&self) -> Option<&CompanyProfile> {
        match &self.data {
            CompanyData::Available(p) => Some(p),
            CompanyData::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionReport {
    /// Same order as the requested symbols.
    pub companies: Vec<CollectedCompany>,
}

impl CollectionReport {
    pub fn available_count(&self) -> usize {
        self.companies.iter().filter(|c| c.profile().is_some()).count()
    }

    pub fn ensure_coverage(&self, min_available: usize) -> anyhow::Result<()> {
        let available = self.available_count();
        anyhow::ensure!(
            available >= min_available,
            "insufficient data: need at least {min_available} companies, got {available} of {}",
            self.companies.len()
        );
        Ok(())
    }
}

/// Fetches profiles for `symbols` with bounded concurrency and a per-company timeout.
/// Duplicate symbols are fetched once.
pub async fn collect_profiles(
    provider: Arc<dyn MarketDataProvider>,
    symbols: &[String],
    opts: &CollectOptions,
) -> CollectionReport {
    let mut unique: Vec<String> = Vec::with_capacity(symbols.len());
    for s in symbols {
        let key = symbol_key(s);
        if !key.is_empty() && !unique.contains(&key) {
            unique.push(key);
        }
    }

    let semaphore = Arc::new(Semaphore::new(opts.max_concurrency.max(1)));
    let timeout = opts.per_company_timeout;
    let mut tasks = JoinSet::new();

    for (idx, symbol) in unique.iter().cloned().enumerate() {
        let provider = Arc::clone(&provider);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let data = match semaphore.acquire_owned().await {
                Ok(_permit) => fetch_one(provider.as_ref(), &symbol, timeout).await,
                Err(err) => CompanyData::Unavailable {
                    reason: format!("collector closed: {err}"),
                },
            };
            (idx, CollectedCompany { symbol, data })
        });
    }

    let mut slots: Vec<Option<CollectedCompany>> = vec![None; unique.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, company)) => slots[idx] = Some(company),
            Err(err) => tracing::error!(error = %err, "profile collection task failed"),
        }
    }

    let companies: Vec<CollectedCompany> = unique
        .into_iter()
        .zip(slots)
        .map(|(symbol, slot)| {
            slot.unwrap_or(CollectedCompany {
                symbol,
                data: CompanyData::Unavailable {
                    reason: "collection task aborted".to_string(),
                },
            })
        })
        .collect();

    let report = CollectionReport { companies };
    tracing::info!(
        available = report.available_count(),
        total = report.companies.len(),
        "profile collection complete"
    );
    report
}

async fn fetch_one(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    timeout: Duration,
) -> CompanyData {
    match tokio::time::timeout(timeout, provider.company_profile(symbol)).await {
        Ok(Ok(Some(profile))) => CompanyData::Available(profile),
        Ok(Ok(None)) => CompanyData::Unavailable {
            reason: "no profile".to_string(),
        },
        Ok(Err(err)) => {
            tracing::warn!(symbol, error = %err, "profile collection failed");
            CompanyData::Unavailable {
                reason: format!("{err:#}"),
            }
        }
        Err(_) => {
            tracing::warn!(symbol, ?timeout, "profile collection timed out");
            CompanyData::Unavailable {
                reason: format!("timed out after {}s", timeout.as_secs_f64()),
            }
        }
    }
}
