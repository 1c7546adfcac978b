use crate::domain::peer::{CandidateSource, PeerComponents, PeerType, ScoredPeer};
use crate::domain::profile::symbol_key;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Replaces the active peer set of `target_symbol` in one transaction. Peers from a previous
/// run that are not in `peers` stay in the table but are marked inactive.
pub async fn persist_peer_set(
    pool: &sqlx::PgPool,
    target_symbol: &str,
    peers: &[ScoredPeer],
) -> anyhow::Result<u64> {
    let target = symbol_key(target_symbol);
    anyhow::ensure!(!target.is_empty(), "target symbol must be non-empty");

    let mut tx = pool.begin().await.context("begin transaction failed")?;

    sqlx::query("UPDATE peer_relationships SET is_active = FALSE WHERE target_symbol = $1")
        .bind(&target)
        .execute(&mut *tx)
        .await
        .context("deactivate peer_relationships failed")?;

    let discovered_at: DateTime<Utc> = Utc::now();
    let mut affected: u64 = 0;
    for peer in peers {
        let components = serde_json::to_value(peer.components)
            .context("failed to serialize similarity components")?;

        let res = sqlx::query(
            "INSERT INTO peer_relationships \
               (id, target_symbol, peer_symbol, peer_name, similarity_score, weighted_score, \
                source_method, peer_type, similarity_components, explanation, discovered_at, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE) \
             ON CONFLICT (target_symbol, peer_symbol) DO UPDATE \
               SET peer_name = EXCLUDED.peer_name, \
                   similarity_score = EXCLUDED.similarity_score, \
                   weighted_score = EXCLUDED.weighted_score, \
                   source_method = EXCLUDED.source_method, \
                   peer_type = EXCLUDED.peer_type, \
                   similarity_components = EXCLUDED.similarity_components, \
                   explanation = EXCLUDED.explanation, \
                   discovered_at = EXCLUDED.discovered_at, \
                   is_active = TRUE",
        )
        .bind(Uuid::new_v4())
        .bind(&target)
        .bind(symbol_key(&peer.symbol))
        .bind(&peer.name)
        .bind(peer.similarity_score)
        .bind(peer.weighted_score)
        .bind(peer.source.as_str())
        .bind(peer.peer_type.as_str())
        .bind(components)
        .bind(&peer.explanation)
        .bind(discovered_at)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("upsert peer_relationships failed for {target}/{}", peer.symbol))?;

        affected += res.rows_affected();
    }

    tx.commit().await.context("commit transaction failed")?;

    tracing::debug!(symbol = %target, peers = peers.len(), "persisted peer set");
    Ok(affected)
}

type PeerRow = (String, String, f64, f64, String, String, Option<Value>, String);

/// Active peers discovered within `max_age`, best first. `None` when nothing fresh exists.
pub async fn load_active_peer_set(
    pool: &sqlx::PgPool,
    target_symbol: &str,
    max_age: chrono::Duration,
) -> anyhow::Result<Option<Vec<ScoredPeer>>> {
    let target = symbol_key(target_symbol);
    let cutoff = Utc::now() - max_age;

    let rows = sqlx::query_as::<_, PeerRow>(
        "SELECT peer_symbol, peer_name, similarity_score, weighted_score, source_method, \
                peer_type, similarity_components, explanation \
         FROM peer_relationships \
         WHERE target_symbol = $1 AND is_active AND discovered_at >= $2 \
         ORDER BY weighted_score DESC, similarity_score DESC, peer_symbol ASC",
    )
    .bind(&target)
    .bind(cutoff)
    .fetch_all(pool)
    .await
    .with_context(|| format!("select peer_relationships failed for {target}"))?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(row_to_peer(row)?);
    }
    Ok(Some(out))
}

fn row_to_peer(row: PeerRow) -> anyhow::Result<ScoredPeer> {
    let (
        symbol,
        name,
        similarity_score,
        weighted_score,
        source,
        peer_type,
        components,
        explanation,
    ) = row;

    let source: CandidateSource = source
        .parse()
        .with_context(|| format!("invalid source_method in DB for peer {symbol}"))?;
    let peer_type: PeerType = peer_type
        .parse()
        .with_context(|| format!("invalid peer_type in DB for peer {symbol}"))?;
    let components: PeerComponents = serde_json::from_value(components.unwrap_or(Value::Null))
        .with_context(|| format!("invalid similarity_components in DB for peer {symbol}"))?;

    Ok(ScoredPeer {
        symbol,
        name,
        similarity_score,
        weighted_score,
        source,
        peer_type,
        components,
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_maps_back_to_scored_peer() {
        let row: PeerRow = (
            "MSFT".to_string(),
            "Microsoft".to_string(),
            0.9,
            1.0,
            "screener_industry".to_string(),
            "industry".to_string(),
            Some(json!({
                "sectorScore": 1.0,
                "marketCapScore": 0.9,
                "revenueScore": 0.8,
                "geographicScore": 1.0
            })),
            "Sector: 1.00".to_string(),
        );

        let peer = row_to_peer(row).unwrap();
        assert_eq!(peer.source, CandidateSource::ScreenerIndustry);
        assert_eq!(peer.peer_type, PeerType::Industry);
        assert_eq!(peer.components.revenue_score, 0.8);
    }

    #[test]
    fn row_with_unknown_peer_type_is_rejected() {
        let row: PeerRow = (
            "MSFT".to_string(),
            String::new(),
            0.9,
            1.0,
            "manual".to_string(),
            "cousin".to_string(),
            None,
            String::new(),
        );
        assert!(row_to_peer(row).is_err());
    }
}
