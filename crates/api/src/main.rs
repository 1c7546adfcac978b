use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use peerscope_core::discovery::{DiscoveryOptions, PeerDiscoveryError, PeerDiscoveryService};
use peerscope_core::domain::peer::ScoredPeer;
use peerscope_core::domain::profile::symbol_key;
use peerscope_core::storage::lock::{release_symbol_lock, try_acquire_symbol_lock};
use peerscope_core::storage::peer_relationships::{load_active_peer_set, persist_peer_set};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_MAX_PEERS: usize = 5;
const DEFAULT_STORE_MAX_AGE_HOURS: i64 = 24;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = peerscope_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let provider = peerscope_core::ingest::provider_from_settings(&settings)?;
    let service = PeerDiscoveryService::new(provider, DiscoveryOptions::from_env());

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match peerscope_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; serving without peer store");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; serving without peer store");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "DATABASE_URL missing; serving without peer store");
            None
        }
    };

    let max_age_hours =
        peerscope_core::config::env_parse("PEER_STORE_MAX_AGE_HOURS", DEFAULT_STORE_MAX_AGE_HOURS);

    let state = AppState {
        service: Arc::new(service),
        pool,
        store_max_age: chrono::Duration::hours(max_age_hours.max(0)),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/peers/:symbol", get(get_peers))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    service: Arc<PeerDiscoveryService>,
    pool: Option<PgPool>,
    store_max_age: chrono::Duration,
}

#[derive(Debug, Default, Deserialize)]
struct PeersQuery {
    max_peers: Option<usize>,
    sector: Option<String>,
    /// Comma-separated manual overrides.
    peers: Option<String>,
}

impl PeersQuery {
    fn manual_peers(&self) -> Vec<String> {
        self.peers
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(symbol_key)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn sector(&self) -> Option<&str> {
        self.sector.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Serialize)]
struct PeersResponse {
    symbol: String,
    from_store: bool,
    generated_at: DateTime<Utc>,
    peers: Vec<ScoredPeer>,
}

async fn get_peers(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<PeersQuery>,
) -> Result<Json<PeersResponse>, StatusCode> {
    let symbol = symbol_key(&symbol);
    let max_peers = query.max_peers.unwrap_or(DEFAULT_MAX_PEERS);
    let manual = query.manual_peers();
    let reusable = manual.is_empty() && query.sector().is_none();

    if reusable {
        if let Some(pool) = &state.pool {
            match load_active_peer_set(pool, &symbol, state.store_max_age).await {
                Ok(Some(stored)) => {
                    if let Some(peers) = reuse_stored(stored, max_peers) {
                        return Ok(Json(PeersResponse {
                            symbol,
                            from_store: true,
                            generated_at: Utc::now(),
                            peers,
                        }));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::warn!(
                        symbol = %symbol,
                        error = %e,
                        "stored peer set unreadable; rediscovering"
                    );
                }
            }
        }
    }

    let peers = state
        .service
        .identify_peers(&symbol, max_peers, query.sector(), &manual)
        .await
        .map_err(|e| status_for(&symbol, e))?;

    if reusable {
        if let Some(pool) = &state.pool {
            if let Err(e) = persist_locked(pool, &symbol, &peers).await {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(symbol = %symbol, error = %e, "persist peer set failed");
            }
        }
    }

    Ok(Json(PeersResponse {
        symbol,
        from_store: false,
        generated_at: Utc::now(),
        peers,
    }))
}

/// A stored set answers a request only when it holds at least `max_peers` entries;
/// a set persisted for a smaller request cannot stand in for a larger one.
fn reuse_stored(mut stored: Vec<ScoredPeer>, max_peers: usize) -> Option<Vec<ScoredPeer>> {
    if max_peers == 0 || stored.len() < max_peers {
        return None;
    }
    stored.truncate(max_peers);
    Some(stored)
}

/// Writes the peer set under the per-symbol advisory lock. Skips the write when another
/// refresh of the same symbol holds the lock.
async fn persist_locked(pool: &PgPool, symbol: &str, peers: &[ScoredPeer]) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await.context("acquire connection failed")?;
    if !try_acquire_symbol_lock(&mut conn, symbol).await? {
        tracing::info!(symbol, "peer set lock held elsewhere; skipping persist");
        return Ok(());
    }

    let res = persist_peer_set(pool, symbol, peers).await;
    let _ = release_symbol_lock(&mut conn, symbol).await;

    let affected = res?;
    tracing::debug!(symbol, affected, "persisted peer set");
    Ok(())
}

fn status_for(symbol: &str, err: anyhow::Error) -> StatusCode {
    match err.downcast_ref::<PeerDiscoveryError>() {
        Some(PeerDiscoveryError::TargetProfileUnavailable { .. }) => {
            tracing::info!(symbol, error = %err, "target not found");
            StatusCode::NOT_FOUND
        }
        Some(PeerDiscoveryError::InvalidRequest { .. }) => StatusCode::BAD_REQUEST,
        None => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(symbol, error = %err, "peer discovery failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &peerscope_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
