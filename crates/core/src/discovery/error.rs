use std::fmt;

/// Failures of `identify_peers` that callers are expected to surface.
/// Carried inside `anyhow::Error`; use `downcast_ref` to inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerDiscoveryError {
    TargetProfileUnavailable { symbol: String },
    InvalidRequest { detail: String },
}

impl fmt::Display for PeerDiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerDiscoveryError::TargetProfileUnavailable { symbol } => {
                write!(f, "could not retrieve profile for target company {symbol}")
            }
            PeerDiscoveryError::InvalidRequest { detail } => {
                write!(f, "invalid peer discovery request: {detail}")
            }
        }
    }
}

impl std::error::Error for PeerDiscoveryError {}
