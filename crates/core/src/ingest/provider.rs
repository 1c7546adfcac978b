use crate::config::{env_parse, Settings};
use crate::domain::profile::CompanyProfile;
use crate::ingest::types::{decode_company_list, parse_peer_symbols};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const PROFILE_PATH: &str = "/api/v3/profile";
const SCREENER_PATH: &str = "/stable/company-screener";
const PEERS_PATH_PRIMARY: &str = "/api/v4/stock_peers";
const PEERS_PATH_FALLBACK: &str = "/api/v3/stock-peers";

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// `Ok(None)` when the provider knows nothing about `symbol`.
    async fn company_profile(&self, symbol: &str) -> Result<Option<CompanyProfile>>;

    async fn screen_companies(&self, query: &ScreenerQuery) -> Result<Vec<CompanyProfile>>;

    async fn stock_peers(&self, symbol: &str) -> Result<Vec<String>>;
}

/// Filter set accepted by the company screener.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenerQuery {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap_more_than: Option<f64>,
    pub market_cap_lower_than: Option<f64>,
    pub is_actively_trading: Option<bool>,
    pub country: Option<String>,
    pub limit: usize,
}

impl ScreenerQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(sector) = self.sector.as_deref().filter(|s| !s.is_empty()) {
            out.push(("sector", sector.to_string()));
        }
        if let Some(industry) = self.industry.as_deref().filter(|s| !s.is_empty()) {
            out.push(("industry", industry.to_string()));
        }
        if let Some(v) = self.market_cap_more_than {
            out.push(("marketCapMoreThan", format!("{v:.0}")));
        }
        if let Some(v) = self.market_cap_lower_than {
            out.push(("marketCapLowerThan", format!("{v:.0}")));
        }
        if let Some(v) = self.is_actively_trading {
            out.push(("isActivelyTrading", v.to_string()));
        }
        if let Some(country) = self.country.as_deref().filter(|s| !s.is_empty()) {
            out.push(("country", country.to_string()));
        }
        if self.limit > 0 {
            out.push(("limit", self.limit.to_string()));
        }
        out
    }
}

/// Financial Modeling Prep over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpFmpProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpFmpProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_fmp_api_key()?.to_string();
        let base_url = settings
            .fmp_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = env_parse("FMP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn fetch_raw(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<(StatusCode, String)> {
        let res = self
            .http
            .get(self.url(path))
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .with_context(|| format!("market data request failed: {path}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read market data response: {path}"))?;
        Ok((status, text))
    }

    async fn get_json(&self, path: &str, params: &[(&'static str, String)]) -> Result<Value> {
        let (status, text) = self.fetch_raw(path, params).await?;
        decode_body(path, status, &text)
    }
}

fn decode_body(path: &str, status: StatusCode, text: &str) -> Result<Value> {
    if !status.is_success() {
        anyhow::bail!("market data HTTP {status} for {path}");
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    let raw = serde_json::from_str::<Value>(text)
        .with_context(|| format!("market data response is not valid JSON: {path}"))?;

    if let Some(msg) = raw.get("Error Message").and_then(Value::as_str) {
        anyhow::bail!("market data API error for {path}: {msg}");
    }
    Ok(raw)
}

/// `Ok(None)` asks for the fallback endpoint; only a non-success status does that.
/// An error payload on a successful status is a hard failure.
fn primary_peers_body(status: StatusCode, text: &str) -> Result<Option<Value>> {
    if !status.is_success() {
        return Ok(None);
    }
    decode_body(PEERS_PATH_PRIMARY, status, text).map(Some)
}

#[async_trait::async_trait]
impl MarketDataProvider for HttpFmpProvider {
    fn provider_name(&self) -> &'static str {
        "fmp"
    }

    async fn company_profile(&self, symbol: &str) -> Result<Option<CompanyProfile>> {
        let path = format!("{PROFILE_PATH}/{}", symbol.trim());
        let raw = self.get_json(&path, &[]).await?;
        Ok(decode_company_list(raw).into_iter().next())
    }

    async fn screen_companies(&self, query: &ScreenerQuery) -> Result<Vec<CompanyProfile>> {
        let raw = self.get_json(SCREENER_PATH, &query.params()).await?;
        Ok(decode_company_list(raw))
    }

    async fn stock_peers(&self, symbol: &str) -> Result<Vec<String>> {
        let params = [("symbol", symbol.trim().to_string())];

        let (status, text) = self.fetch_raw(PEERS_PATH_PRIMARY, &params).await?;
        let raw = match primary_peers_body(status, &text)? {
            Some(raw) => raw,
            None => {
                tracing::debug!(%status, symbol, "primary peers endpoint failed; trying fallback");
                self.get_json(PEERS_PATH_FALLBACK, &params).await?
            }
        };

        Ok(parse_peer_symbols(raw))
    }
}
