use crate::discovery::geography::geographic_score;
use crate::domain::peer::PeerComponents;
use crate::domain::profile::CompanyProfile;

// Component weights in tenths (0.4 / 0.3 / 0.2 / 0.1). Summing integers then dividing keeps
// a perfect match at exactly 1.0.
const SECTOR_WEIGHT: f64 = 4.0;
const MARKET_CAP_WEIGHT: f64 = 3.0;
const REVENUE_WEIGHT: f64 = 2.0;
const GEOGRAPHIC_WEIGHT: f64 = 1.0;
const WEIGHT_TOTAL: f64 = 10.0;

/// Per-pair similarity breakdown. Every component and `final_score` lie in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityComponents {
    pub sector_score: f64,
    pub market_cap_score: f64,
    pub revenue_score: f64,
    pub geographic_score: f64,
    pub final_score: f64,
    pub explanation: String,
}

impl SimilarityComponents {
    pub fn is_finite(&self) -> bool {
        [
            self.sector_score,
            self.market_cap_score,
            self.revenue_score,
            self.geographic_score,
            self.final_score,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    pub fn components(&self) -> PeerComponents {
        PeerComponents {
            sector_score: self.sector_score,
            market_cap_score: self.market_cap_score,
            revenue_score: self.revenue_score,
            geographic_score: self.geographic_score,
        }
    }
}

pub fn calculate_similarity_score(
    target: &CompanyProfile,
    candidate: &CompanyProfile,
) -> SimilarityComponents {
    let sector_score = sector_score(
        &target.sector,
        &target.industry,
        &candidate.sector,
        &candidate.industry,
    );
    let market_cap_score = log_ratio_score(target.market_cap, candidate.market_cap);
    let revenue_score = log_ratio_score(target.revenue, candidate.revenue);
    let geographic_score = geographic_score(&target.country, &candidate.country);

    let final_score = ((sector_score * SECTOR_WEIGHT
        + market_cap_score * MARKET_CAP_WEIGHT
        + revenue_score * REVENUE_WEIGHT
        + geographic_score * GEOGRAPHIC_WEIGHT)
        / WEIGHT_TOTAL)
        .clamp(0.0, 1.0);

    let explanation = format!(
        "Sector: {sector_score:.2}, MCap: {market_cap_score:.2}, Revenue: {revenue_score:.2}, Geo: {geographic_score:.2}"
    );

    SimilarityComponents {
        sector_score,
        market_cap_score,
        revenue_score,
        geographic_score,
        final_score,
        explanation,
    }
}

/// 1.0 on the same sector, 0.5 on the same industry only, else 0.0.
/// Comparison is trimmed and case-insensitive. Two empty labels count as equal.
pub fn sector_score(
    target_sector: &str,
    target_industry: &str,
    candidate_sector: &str,
    candidate_industry: &str,
) -> f64 {
    if label_eq(target_sector, candidate_sector) {
        1.0
    } else if label_eq(target_industry, candidate_industry) {
        0.5
    } else {
        0.0
    }
}

fn label_eq(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Like `label_eq`, but an empty label matches nothing.
pub(crate) fn same_label(a: &str, b: &str) -> bool {
    !a.trim().is_empty() && !b.trim().is_empty() && label_eq(a, b)
}

/// `1 - |log10(target / candidate)|` clamped to [0, 1]. A 10x size gap scores 0.
/// Returns 0.0 whenever either side is non-positive or the ratio is not finite.
pub fn log_ratio_score(target: f64, candidate: f64) -> f64 {
    if !(target > 0.0 && candidate > 0.0) {
        return 0.0;
    }

    let ratio = target / candidate;
    if !ratio.is_finite() || ratio <= 0.0 {
        return 0.0;
    }

    let score = 1.0 - ratio.log10().abs();
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::testing::profile;

    #[test]
    fn sector_match_variants() {
        assert_eq!(sector_score("Technology", "Software", "technology", "Hardware"), 1.0);
        assert_eq!(sector_score("Technology", "Software", "Financial", "software"), 0.5);
        assert_eq!(sector_score("Technology", "Software", "Healthcare", "Pharma"), 0.0);
        assert_eq!(sector_score("", "", "", ""), 1.0);
        assert_eq!(sector_score("", "Software", "Technology", "software"), 0.5);
    }

    #[test]
    fn unknown_labels_and_country_on_both_sides_still_match() {
        let a = profile("AAA", "", "", 1e10, 1e9, "");
        let b = profile("BBB", "", "", 1e10, 1e9, "");
        let s = calculate_similarity_score(&a, &b);
        assert_eq!(s.sector_score, 1.0);
        assert_eq!(s.geographic_score, 1.0);
        assert_eq!(s.final_score, 1.0);
    }

    #[test]
    fn same_label_rejects_empty() {
        assert!(same_label("Tech", " tech "));
        assert!(!same_label("", ""));
        assert!(!same_label("Tech", ""));
    }

    #[test]
    fn log_ratio_equal_and_double() {
        assert_eq!(log_ratio_score(1e9, 1e9), 1.0);
        let expected = 1.0 - 0.5f64.log10().abs();
        assert!((log_ratio_score(1e9, 2e9) - expected).abs() < 1e-12);
        assert!((log_ratio_score(2e9, 1e9) - expected).abs() < 1e-12);
    }

    #[test]
    fn log_ratio_degenerate_inputs_are_zero() {
        assert_eq!(log_ratio_score(0.0, 1e9), 0.0);
        assert_eq!(log_ratio_score(1e9, 0.0), 0.0);
        assert_eq!(log_ratio_score(-5.0, 1e9), 0.0);
        assert_eq!(log_ratio_score(f64::NAN, 1e9), 0.0);
        assert_eq!(log_ratio_score(f64::INFINITY, 1e9), 0.0);
        assert_eq!(log_ratio_score(f64::MAX, f64::MIN_POSITIVE), 0.0);
    }

    #[test]
    fn exact_match_scores_one() {
        let a = profile("AAA", "Technology", "Software", 5e10, 1e10, "US");
        let b = profile("BBB", "Technology", "Software", 5e10, 1e10, "USA");
        let s = calculate_similarity_score(&a, &b);
        assert_eq!(s.final_score, 1.0);
        assert_eq!(s.explanation, "Sector: 1.00, MCap: 1.00, Revenue: 1.00, Geo: 1.00");
    }

    #[test]
    fn ten_x_market_cap_gap_zeroes_component() {
        let a = profile("AAA", "Technology", "Software", 1e10, 1e9, "US");
        let b = profile("BBB", "Technology", "Software", 1e11, 1e9, "US");
        let s = calculate_similarity_score(&a, &b);
        assert!(s.market_cap_score.abs() < 1e-9);
        let expected = 0.4 * 1.0 + 0.3 * 0.0 + 0.2 * s.revenue_score + 0.1 * 1.0;
        assert!((s.final_score - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_target_market_cap_is_zero_component() {
        let a = profile("AAA", "Technology", "Software", 0.0, 1e9, "US");
        let b = profile("BBB", "Technology", "Software", 1e11, 1e9, "US");
        let s = calculate_similarity_score(&a, &b);
        assert_eq!(s.market_cap_score, 0.0);
        assert!(s.is_finite());
    }

    #[test]
    fn weighted_sum_matches_components() {
        let a = profile("AAPL", "Technology", "Consumer Electronics", 3e12, 3.9e11, "US");
        let b = profile("MSFT", "Technology", "Software", 2.8e12, 2.1e11, "US");
        let s = calculate_similarity_score(&a, &b);
        let expected = s.sector_score * 0.4
            + s.market_cap_score * 0.3
            + s.revenue_score * 0.2
            + s.geographic_score * 0.1;
        assert!((s.final_score - expected).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&s.final_score));
    }

    #[test]
    fn scores_stay_bounded_for_hostile_values() {
        let values = [0.0, -1.0, 1e-300, 1e300, f64::NAN, f64::INFINITY, 42.0];
        for &x in &values {
            for &y in &values {
                let a = profile("A", "S", "I", x, y, "US");
                let b = profile("B", "S", "J", y, x, "JP");
                let s = calculate_similarity_score(&a, &b);
                assert!(s.is_finite());
                assert!((0.0..=1.0).contains(&s.final_score));
            }
        }
    }
}
