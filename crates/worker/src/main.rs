use anyhow::Context;
use clap::Parser;
use peerscope_core::collect::{collect_profiles, CollectOptions, CompanyData};
use peerscope_core::discovery::{DiscoveryOptions, PeerDiscoveryError, PeerDiscoveryService};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "peerscope_worker")]
struct Args {
    /// Target ticker.
    symbol: String,

    /// Maximum number of peers to return.
    #[arg(long, default_value_t = 5)]
    max_peers: usize,

    /// Sector used for screening instead of the target's own.
    #[arg(long)]
    sector: Option<String>,

    /// Peer symbols to force into the result (repeatable).
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Also fetch target and peer profiles concurrently and print availability.
    #[arg(long)]
    collect: bool,

    /// Write the peer set to the database.
    #[arg(long)]
    persist: bool,

    /// Write the JSON result to this file instead of stdout.
    #[arg(long)]
    output: Option<std::path::PathBuf>,
}

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

    let args = Args::parse();

    let provider = peerscope_core::ingest::provider_from_settings(&settings)?;
    let service = PeerDiscoveryService::new(provider.clone(), DiscoveryOptions::from_env());

    let peers = match service
        .identify_peers(
            &args.symbol,
            args.max_peers,
            args.sector.as_deref(),
            &args.peers,
        )
        .await
    {
        Ok(peers) => peers,
        Err(err) => {
            if let Some(domain) = err.downcast_ref::<PeerDiscoveryError>() {
                tracing::error!(symbol = %args.symbol, error = %domain, "peer discovery rejected");
            } else {
                sentry_anyhow::capture_anyhow(&err);
            }
            return Err(err);
        }
    };

    let mut result = serde_json::json!({
        "symbol": args.symbol.trim().to_ascii_uppercase(),
        "generated_at": chrono::Utc::now(),
        "peers": peers,
    });

    if args.collect {
        let mut symbols = vec![args.symbol.clone()];
        symbols.extend(peers.iter().map(|p| p.symbol.clone()));
        let report =
            collect_profiles(provider.clone(), &symbols, &CollectOptions::from_env()).await;

        let companies: Vec<_> = report
            .companies
            .iter()
            .map(|c| match &c.data {
                CompanyData::Available(profile) => serde_json::json!({
                    "symbol": c.symbol,
                    "available": true,
                    "profile": profile,
                }),
                CompanyData::Unavailable { reason } => serde_json::json!({
                    "symbol": c.symbol,
                    "available": false,
                    "error": reason,
                }),
            })
            .collect();
        result["collection"] = serde_json::json!({
            "available": report.available_count(),
            "companies": companies,
        });

        if let Err(err) = report.ensure_coverage(3) {
            tracing::warn!(error = %err, "collection coverage below target + 2 peers");
        }
    }

    if args.persist {
        persist(&settings, &args.symbol, &peers).await?;
    }

    let rendered = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), peers = peers.len(), "wrote peer set");
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

async fn persist(
    settings: &peerscope_core::config::Settings,
    symbol: &str,
    peers: &[peerscope_core::domain::peer::ScoredPeer],
) -> anyhow::Result<()> {
    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    peerscope_core::storage::migrate(&pool).await?;

    let mut conn = pool.acquire().await.context("acquire connection failed")?;
    let acquired = peerscope_core::storage::lock::try_acquire_symbol_lock(&mut conn, symbol).await?;
    if !acquired {
        tracing::warn!(symbol, "peer set lock not acquired; another refresh in progress");
        return Ok(());
    }

    let res =
        peerscope_core::storage::peer_relationships::persist_peer_set(&pool, symbol, peers).await;
    let _ = peerscope_core::storage::lock::release_symbol_lock(&mut conn, symbol).await;

    let affected = res?;
    tracing::info!(symbol, affected, "persisted peer set");
    Ok(())
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
