use anyhow::Context;

// Advisory locks are scoped to the Postgres session, so acquire and release must run on the
// same connection. Used to keep two refreshes of the same
// target's peer set from interleaving their deactivate/upsert steps.
const LOCK_NAMESPACE: i64 = 0x5045_4552_5343; // "PEERSC"

/// FNV-1a over the normalized symbol; stable across builds and processes.
fn lock_key_for_symbol(symbol: &str) -> i64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in symbol.trim().to_ascii_uppercase().bytes() {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    LOCK_NAMESPACE ^ (hash as i64)
}

pub async fn try_acquire_symbol_lock(
    conn: &mut sqlx::PgConnection,
    symbol: &str,
) -> anyhow::Result<bool> {
    let key = lock_key_for_symbol(symbol);
    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;
    Ok(acquired.0)
}

pub async fn release_symbol_lock(
    conn: &mut sqlx::PgConnection,
    symbol: &str,
) -> anyhow::Result<()> {
    let key = lock_key_for_symbol(symbol);
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .persistent(false)
        .bind(key)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("failed to release advisory lock (key={key})"))?;
    Ok(())
}
