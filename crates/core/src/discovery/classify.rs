use crate::discovery::similarity::same_label;
use crate::domain::peer::PeerType;
use crate::domain::profile::CompanyProfile;

/// Structural classification by industry, then sector. Independent of the numeric score
/// and only used to boost ranking.
pub fn classify_peer_type(target: &CompanyProfile, candidate: &CompanyProfile) -> PeerType {
    if same_label(&target.industry, &candidate.industry) {
        PeerType::Industry
    } else if same_label(&target.sector, &candidate.sector) {
        PeerType::Sector
    } else {
        PeerType::Financial
    }
}

/// Raw similarity times the peer-type boost, capped at 1.0.
pub fn weighted_score(similarity: f64, peer_type: PeerType) -> f64 {
    (similarity * peer_type.boost()).clamp(0.0, 1.0)
}
