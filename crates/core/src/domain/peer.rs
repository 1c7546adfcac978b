use crate::domain::profile::CompanyProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    ScreenerIndustry,
    ScreenerSector,
    FmpPeers,
    Manual,
    ManualOverride,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::ScreenerIndustry => "screener_industry",
            CandidateSource::ScreenerSector => "screener_sector",
            CandidateSource::FmpPeers => "fmp_peers",
            CandidateSource::Manual => "manual",
            CandidateSource::ManualOverride => "manual_override",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "screener_industry" => Ok(CandidateSource::ScreenerIndustry),
            "screener_sector" => Ok(CandidateSource::ScreenerSector),
            "fmp_peers" => Ok(CandidateSource::FmpPeers),
            "manual" => Ok(CandidateSource::Manual),
            "manual_override" => Ok(CandidateSource::ManualOverride),
            other => anyhow::bail!("unknown candidate source: {other}"),
        }
    }
}

/// Structural relationship between target and peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerType {
    Industry,
    Sector,
    Financial,
}

impl PeerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerType::Industry => "industry",
            PeerType::Sector => "sector",
            PeerType::Financial => "financial",
        }
    }

    /// Multiplier applied to the raw similarity score before ranking.
    pub fn boost(&self) -> f64 {
        match self {
            PeerType::Industry => 1.3,
            PeerType::Sector => 1.1,
            PeerType::Financial => 1.0,
        }
    }
}

impl fmt::Display for PeerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeerType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "industry" => Ok(PeerType::Industry),
            "sector" => Ok(PeerType::Sector),
            "financial" => Ok(PeerType::Financial),
            other => anyhow::bail!("unknown peer type: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeerCandidate {
    pub profile: CompanyProfile,
    pub source: CandidateSource,
}

impl PeerCandidate {
    pub fn new(profile: CompanyProfile, source: CandidateSource) -> Self {
        Self { profile, source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerComponents {
    pub sector_score: f64,
    pub market_cap_score: f64,
    pub revenue_score: f64,
    pub geographic_score: f64,
}

/// Ranked output record. `weighted_score` is capped at 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPeer {
    pub symbol: String,
    pub name: String,
    pub similarity_score: f64,
    pub weighted_score: f64,
    pub source: CandidateSource,
    pub peer_type: PeerType,
    pub components: PeerComponents,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scored_peer_serializes_camel_case_with_snake_tags() {
        let peer = ScoredPeer {
            symbol: "MSFT".to_string(),
            name: "Microsoft".to_string(),
            similarity_score: 0.8,
            weighted_score: 0.88,
            source: CandidateSource::ScreenerSector,
            peer_type: PeerType::Sector,
            components: PeerComponents {
                sector_score: 1.0,
                market_cap_score: 0.9,
                revenue_score: 0.5,
                geographic_score: 1.0,
            },
            explanation: "x".to_string(),
        };

        let v = serde_json::to_value(&peer).unwrap();
        assert_eq!(v["similarityScore"], json!(0.8));
        assert_eq!(v["source"], json!("screener_sector"));
        assert_eq!(v["peerType"], json!("sector"));
        assert_eq!(v["components"]["marketCapScore"], json!(0.9));
    }

    #[test]
    fn source_and_peer_type_round_trip_through_str() {
        for s in ["screener_industry", "fmp_peers", "manual_override"] {
            assert_eq!(s.parse::<CandidateSource>().unwrap().as_str(), s);
        }
        assert_eq!("financial".parse::<PeerType>().unwrap(), PeerType::Financial);
        assert!("peer".parse::<PeerType>().is_err());
    }

    #[test]
    fn boosts_are_ordered() {
        assert!(PeerType::Industry.boost() > PeerType::Sector.boost());
        assert!(PeerType::Sector.boost() > PeerType::Financial.boost());
    }
}
