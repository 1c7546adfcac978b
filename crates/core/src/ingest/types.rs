use crate::domain::profile::{symbol_key, CompanyProfile};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Company record as returned by the profile and screener endpoints.
/// The two endpoints disagree on the market-cap key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompany {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub mkt_cap: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub revenue: Option<f64>,
}

impl RawCompany {
    /// Returns `None` for records without a usable symbol.
    pub fn into_profile(self) -> Option<CompanyProfile> {
        let symbol = self.symbol.map(|s| s.trim().to_string())?;
        if symbol.is_empty() {
            return None;
        }

        Some(CompanyProfile {
            symbol,
            company_name: clean_text(self.company_name),
            sector: clean_text(self.sector),
            industry: clean_text(self.industry),
            market_cap: finite_or_zero(self.mkt_cap.or(self.market_cap)),
            revenue: finite_or_zero(self.revenue),
            country: clean_text(self.country),
        })
    }
}

fn clean_text(v: Option<String>) -> String {
    v.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn finite_or_zero(v: Option<f64>) -> f64 {
    v.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Decodes a JSON array of company records one at a time; malformed records are skipped.
pub fn decode_company_list(raw: Value) -> Vec<CompanyProfile> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Null => return Vec::new(),
        other => vec![other],
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RawCompany>(item) {
            Ok(raw) => {
                if let Some(profile) = raw.into_profile() {
                    out.push(profile);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed company record");
            }
        }
    }
    out
}

#[derive(Debug, Clone, Deserialize)]
struct PeersEntry {
    #[serde(rename = "peersList", alias = "peers")]
    peers_list: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PeerRecord {
    symbol: String,
}

/// Shapes the curated-peers endpoints have been observed to return, tried in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PeersPayload {
    /// `[{"symbol": "AAPL", "peersList": ["MSFT", ...]}]`
    Nested(Vec<PeersEntry>),
    /// `[{"symbol": "MSFT", "companyName": ...}, ...]`
    Records(Vec<PeerRecord>),
    /// `["MSFT", "GOOGL"]`
    Symbols(Vec<String>),
    /// `{"peersList": ["MSFT", ...]}`
    Keyed(PeersEntry),
}

/// Extracts peer symbols from any supported payload shape. Never fails; unknown shapes
/// yield an empty list.
pub fn parse_peer_symbols(raw: Value) -> Vec<String> {
    let symbols = match serde_json::from_value::<PeersPayload>(raw) {
        Ok(PeersPayload::Nested(entries)) => entries
            .into_iter()
            .next()
            .map(|e| e.peers_list)
            .unwrap_or_default(),
        Ok(PeersPayload::Records(records)) => records.into_iter().map(|r| r.symbol).collect(),
        Ok(PeersPayload::Symbols(symbols)) => symbols,
        Ok(PeersPayload::Keyed(entry)) => entry.peers_list,
        Err(err) => {
            tracing::debug!(error = %err, "unrecognized peers payload shape");
            Vec::new()
        }
    };

    let mut seen = BTreeSet::new();
    symbols
        .into_iter()
        .map(|s| symbol_key(&s))
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_mkt_cap_over_market_cap() {
        let raw: RawCompany =
            serde_json::from_value(json!({"symbol": "AAPL", "mktCap": 10.0, "marketCap": 20.0}))
                .unwrap();
        assert_eq!(raw.into_profile().unwrap().market_cap, 10.0);

        let raw: RawCompany =
            serde_json::from_value(json!({"symbol": "AAPL", "marketCap": 20.0})).unwrap();
        assert_eq!(raw.into_profile().unwrap().market_cap, 20.0);
    }

    #[test]
    fn missing_fields_normalize_to_defaults() {
        let raw: RawCompany =
            serde_json::from_value(json!({"symbol": " KO ", "sector": null})).unwrap();
        let p = raw.into_profile().unwrap();
        assert_eq!(p.symbol, "KO");
        assert_eq!(p.sector, "");
        assert_eq!(p.market_cap, 0.0);
        assert_eq!(p.revenue, 0.0);
    }

    #[test]
    fn records_without_symbol_are_dropped() {
        let raw: RawCompany = serde_json::from_value(json!({"companyName": "Nameless"})).unwrap();
        assert!(raw.into_profile().is_none());
    }

    #[test]
    fn company_list_skips_malformed_records() {
        let v = json!([
            {"symbol": "MSFT", "marketCap": 1.0},
            {"symbol": "BAD", "marketCap": "lots"},
            {"symbol": "GOOGL", "mktCap": 2.0},
        ]);
        let out = decode_company_list(v);
        let symbols: Vec<_> = out.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["MSFT", "GOOGL"]);
    }

    #[test]
    fn peers_nested_shape() {
        let v = json!([{"symbol": "AAPL", "peersList": ["msft", "GOOGL", "MSFT"]}]);
        assert_eq!(parse_peer_symbols(v), vec!["MSFT", "GOOGL"]);
    }

    #[test]
    fn peers_record_shape() {
        let v = json!([
            {"symbol": "MSFT", "companyName": "Microsoft", "mktCap": 1.0},
            {"symbol": "GOOGL", "companyName": "Alphabet"}
        ]);
        assert_eq!(parse_peer_symbols(v), vec!["MSFT", "GOOGL"]);
    }

    #[test]
    fn peers_plain_list_shape() {
        assert_eq!(parse_peer_symbols(json!(["MSFT", " "])), vec!["MSFT"]);
    }

    #[test]
    fn peers_keyed_shape() {
        assert_eq!(parse_peer_symbols(json!({"peersList": ["DELL"]})), vec!["DELL"]);
        assert_eq!(parse_peer_symbols(json!({"peers": ["HPQ"]})), vec!["HPQ"]);
    }

    #[test]
    fn peers_unknown_shape_is_empty() {
        assert!(parse_peer_symbols(json!({"error": "nope"})).is_empty());
        assert!(parse_peer_symbols(json!(42)).is_empty());
        assert!(parse_peer_symbols(json!(null)).is_empty());
        assert!(parse_peer_symbols(json!([])).is_empty());
    }
}
