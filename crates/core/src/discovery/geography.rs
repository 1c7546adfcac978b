#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    NorthAmerica,
    Europe,
    AsiaPacific,
}

// Keys are normalized country codes or upper-cased names, as produced by `normalize_country_code`.
const REGIONS: &[(Region, &[&str])] = &[
    (
        Region::NorthAmerica,
        &["US", "CA", "CANADA", "MX", "MEXICO"],
    ),
    (
        Region::Europe,
        &[
            "UK", "DE", "GERMANY", "FR", "FRANCE", "IT", "ITALY", "ES", "SPAIN", "NL",
            "NETHERLANDS", "CH", "SWITZERLAND", "SE", "SWEDEN", "NO", "NORWAY",
        ],
    ),
    (
        Region::AsiaPacific,
        &[
            "CN", "CHINA", "JP", "JAPAN", "IN", "INDIA", "AU", "AUSTRALIA", "SG", "SINGAPORE",
            "KR", "SOUTH KOREA", "HK", "HONG KONG",
        ],
    ),
];

/// Folds known aliases onto a single code (`USA` -> `US`, `GREAT BRITAIN` -> `UK`).
pub fn normalize_country_code(country: &str) -> String {
    let upper = country.trim().to_uppercase();
    match upper.as_str() {
        "USA" | "UNITED STATES" | "UNITED STATES OF AMERICA" => "US".to_string(),
        "GB" | "UNITED KINGDOM" | "GREAT BRITAIN" | "BRITAIN" => "UK".to_string(),
        _ => upper,
    }
}

pub fn region_of(country: &str) -> Option<Region> {
    let code = normalize_country_code(country);
    REGIONS
        .iter()
        .find(|(_, members)| members.contains(&code.as_str()))
        .map(|(region, _)| *region)
}

/// 1.0 for the same normalized code (two empty countries included), 0.5 for the
/// same region, otherwise 0.0.
pub fn geographic_score(target_country: &str, candidate_country: &str) -> f64 {
    if normalize_country_code(target_country) == normalize_country_code(candidate_country) {
        return 1.0;
    }

    match (region_of(target_country), region_of(candidate_country)) {
        (Some(a), Some(b)) if a == b => 0.5,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_fold_to_same_code() {
        assert_eq!(normalize_country_code("usa"), "US");
        assert_eq!(normalize_country_code(" United States "), "US");
        assert_eq!(normalize_country_code("Great Britain"), "UK");
        assert_eq!(normalize_country_code("Japan"), "JAPAN");
    }

    #[test]
    fn same_country_scores_full() {
        assert_eq!(geographic_score("US", "USA"), 1.0);
        assert_eq!(geographic_score("United Kingdom", "uk"), 1.0);
        assert_eq!(geographic_score("GB", "UK"), 1.0);
    }

    #[test]
    fn same_region_scores_half() {
        assert_eq!(geographic_score("US", "Canada"), 0.5);
        assert_eq!(geographic_score("DE", "France"), 0.5);
        assert_eq!(geographic_score("Japan", "KR"), 0.5);
    }

    #[test]
    fn different_regions_score_zero() {
        assert_eq!(geographic_score("US", "Germany"), 0.0);
        assert_eq!(geographic_score("US", "Atlantis"), 0.0);
        assert_eq!(geographic_score("", "US"), 0.0);
    }

    #[test]
    fn two_unknown_countries_match() {
        assert_eq!(geographic_score("", ""), 1.0);
        assert_eq!(geographic_score(" ", ""), 1.0);
    }

    #[test]
    fn region_lookup() {
        assert_eq!(region_of("US"), Some(Region::NorthAmerica));
        assert_eq!(region_of("Germany"), Some(Region::Europe));
        assert_eq!(region_of("Japan"), Some(Region::AsiaPacific));
        assert_eq!(region_of("Unknown Country"), None);
    }
}
