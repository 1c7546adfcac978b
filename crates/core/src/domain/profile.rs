use serde::{Deserialize, Serialize};

/// Canonical company profile. Field-name differences between provider endpoints
/// (`mktCap` vs `marketCap`) are reconciled before a value of this type exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    pub company_name: String,
    pub sector: String,
    pub industry: String,
    pub market_cap: f64,
    pub revenue: f64,
    pub country: String,
}

impl CompanyProfile {
    pub fn symbol_key(&self) -> String {
        symbol_key(&self.symbol)
    }
}

/// Upper-cased, trimmed ticker used for identity comparisons.
pub fn symbol_key(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}
