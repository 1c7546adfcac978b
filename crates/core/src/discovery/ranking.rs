use crate::discovery::classify::{classify_peer_type, weighted_score};
use crate::discovery::similarity::calculate_similarity_score;
use crate::domain::peer::{PeerCandidate, PeerType, ScoredPeer};
use crate::domain::profile::{symbol_key, CompanyProfile};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Scores and classifies one candidate. `None` when the score is unusable or below `threshold`.
pub fn score_candidate(
    target: &CompanyProfile,
    candidate: &PeerCandidate,
    threshold: f64,
) -> Option<ScoredPeer> {
    let profile = &candidate.profile;
    let similarity = calculate_similarity_score(target, profile);
    if !similarity.is_finite() {
        tracing::warn!(symbol = %profile.symbol, "non-finite similarity; skipping candidate");
        return None;
    }
    if similarity.final_score < threshold {
        tracing::debug!(
            symbol = %profile.symbol,
            score = similarity.final_score,
            threshold,
            "candidate below similarity threshold"
        );
        return None;
    }

    let peer_type = classify_peer_type(target, profile);
    Some(ScoredPeer {
        symbol: profile.symbol.clone(),
        name: profile.company_name.clone(),
        similarity_score: similarity.final_score,
        weighted_score: weighted_score(similarity.final_score, peer_type),
        source: candidate.source,
        peer_type,
        components: similarity.components(),
        explanation: similarity.explanation,
    })
}

/// Scores every candidate except the target itself, preserving candidate order.
pub fn score_candidates(
    target: &CompanyProfile,
    candidates: &[PeerCandidate],
    threshold: f64,
) -> Vec<ScoredPeer> {
    let target_key = target.symbol_key();
    candidates
        .iter()
        .filter(|c| c.profile.symbol_key() != target_key)
        .filter_map(|c| score_candidate(target, c, threshold))
        .collect()
}

/// One entry per symbol, keeping the highest raw similarity (first seen on ties).
/// First-seen order of symbols is preserved.
pub fn deduplicate_peers(peers: Vec<ScoredPeer>) -> Vec<ScoredPeer> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<ScoredPeer> = Vec::with_capacity(peers.len());

    for peer in peers {
        let key = symbol_key(&peer.symbol);
        match index.get(&key) {
            Some(&i) => {
                if peer.similarity_score > out[i].similarity_score {
                    out[i] = peer;
                }
            }
            None => {
                index.insert(key, out.len());
                out.push(peer);
            }
        }
    }

    out
}

/// Weighted score descending, then raw similarity descending, then symbol ascending.
pub fn compare_ranked(a: &ScoredPeer, b: &ScoredPeer) -> Ordering {
    b.weighted_score
        .partial_cmp(&a.weighted_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.symbol.cmp(&b.symbol))
}

pub fn rank_peers(peers: &mut Vec<ScoredPeer>, max_peers: usize) {
    peers.sort_by(compare_ranked);
    peers.truncate(max_peers);
}

pub fn round_scores(peers: &mut [ScoredPeer]) {
    for p in peers {
        p.similarity_score = round3(p.similarity_score);
        p.weighted_score = round3(p.weighted_score);
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

pub fn peer_type_counts(peers: &[ScoredPeer]) -> [(PeerType, usize); 3] {
    let count = |t: PeerType| peers.iter().filter(|p| p.peer_type == t).count();
    [
        (PeerType::Industry, count(PeerType::Industry)),
        (PeerType::Sector, count(PeerType::Sector)),
        (PeerType::Financial, count(PeerType::Financial)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::peer::{CandidateSource, PeerComponents};
    use crate::ingest::testing::profile;

    fn scored(symbol: &str, similarity: f64, weighted: f64, source: CandidateSource) -> ScoredPeer {
        ScoredPeer {
            symbol: symbol.to_string(),
            name: String::new(),
            similarity_score: similarity,
            weighted_score: weighted,
            source,
            peer_type: PeerType::Financial,
            components: PeerComponents {
                sector_score: 0.0,
                market_cap_score: 0.0,
                revenue_score: 0.0,
                geographic_score: 0.0,
            },
            explanation: String::new(),
        }
    }

    #[test]
    fn dedup_keeps_highest_similarity() {
        let peers = vec![
            scored("MSFT", 0.75, 0.75, CandidateSource::ScreenerIndustry),
            scored("GOOGL", 0.85, 0.85, CandidateSource::FmpPeers),
            scored("msft", 0.90, 0.90, CandidateSource::Manual),
        ];
        let out = deduplicate_peers(peers);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].similarity_score, 0.90);
        assert_eq!(out[0].source, CandidateSource::Manual);
        assert_eq!(out[1].symbol, "GOOGL");
    }

    #[test]
    fn dedup_keeps_first_on_tie() {
        let out = deduplicate_peers(vec![
            scored("MSFT", 0.5, 0.5, CandidateSource::ScreenerIndustry),
            scored("MSFT", 0.5, 0.5, CandidateSource::ScreenerSector),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, CandidateSource::ScreenerIndustry);
    }

    #[test]
    fn ranking_breaks_ties_deterministically() {
        let mut peers = vec![
            scored("B", 0.5, 0.6, CandidateSource::Manual),
            scored("A", 0.5, 0.6, CandidateSource::Manual),
            scored("C", 0.6, 0.6, CandidateSource::Manual),
            scored("D", 0.9, 0.9, CandidateSource::Manual),
        ];
        rank_peers(&mut peers, 3);
        let order: Vec<_> = peers.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(order, vec!["D", "C", "A"]);
    }

    #[test]
    fn scoring_excludes_target_and_applies_threshold() {
        let target = profile("AAPL", "Technology", "Consumer Electronics", 1e12, 1e11, "US");
        let candidates = vec![
            PeerCandidate::new(target.clone(), CandidateSource::ScreenerIndustry),
            PeerCandidate::new(
                profile("aapl", "Technology", "Consumer Electronics", 1e12, 1e11, "US"),
                CandidateSource::ScreenerSector,
            ),
            PeerCandidate::new(
                profile("XOM", "Energy", "Oil", 1e9, 1e8, "JP"),
                CandidateSource::ScreenerSector,
            ),
            PeerCandidate::new(
                profile("SONY", "Technology", "Consumer Electronics", 1e11, 8e10, "JP"),
                CandidateSource::ScreenerIndustry,
            ),
        ];

        let out = score_candidates(&target, &candidates, 0.30);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].symbol, "SONY");
        assert_eq!(out[0].peer_type, PeerType::Industry);
        assert!(out[0].weighted_score <= 1.0);
        assert!(out[0].weighted_score >= out[0].similarity_score);
    }

    #[test]
    fn rounding_is_three_decimals() {
        let mut peers = vec![scored("A", 0.123456, 0.98765, CandidateSource::Manual)];
        round_scores(&mut peers);
        assert_eq!(peers[0].similarity_score, 0.123);
        assert_eq!(peers[0].weighted_score, 0.988);
    }
}
