/// Local station store
///
/// SQLite persistence for pending requests, play history, the request log
/// and the persisted station config. The scheduling kernel never touches
/// this module directly — the station layer reads snapshots here and hands
/// them to the kernel, then writes the resulting mutations back.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};

use crate::config::StationConfig;
use crate::scheduler::PendingRequests;

/// Initialise (or migrate) the local SQLite database at `db_path`.
/// Creates all tables if they don't exist.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    let url = format!("sqlite:{db_path}?mode=rwc");
    let pool = SqlitePool::connect(&url).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS requests (
            song_id        TEXT    NOT NULL,
            requester_hash TEXT    NOT NULL,
            slot_time      INTEGER NOT NULL,
            PRIMARY KEY (song_id, requester_hash)
        );

        CREATE TABLE IF NOT EXISTS history (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id   TEXT    NOT NULL,
            played_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_history_played_at ON history(played_at);

        CREATE TABLE IF NOT EXISTS request_log (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id        TEXT    NOT NULL,
            requester_hash TEXT    NOT NULL,
            requester_name TEXT,
            query          TEXT,
            requested_at   INTEGER NOT NULL,
            slot_time      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS station_config (
            id          INTEGER PRIMARY KEY CHECK (id = 1),
            config_json TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

// ── Pending requests ──────────────────────────────────────────────────────────

/// Read the full pending-request snapshot: song id → requester → slot time.
pub async fn get_pending_requests(pool: &SqlitePool) -> Result<PendingRequests, sqlx::Error> {
    let rows = sqlx::query("SELECT song_id, requester_hash, slot_time FROM requests")
        .fetch_all(pool)
        .await?;

    let mut pending: PendingRequests = HashMap::new();
    for r in rows {
        pending
            .entry(r.get("song_id"))
            .or_default()
            .insert(r.get("requester_hash"), r.get("slot_time"));
    }
    Ok(pending)
}

/// Atomically set (insert or replace) a requester's slot time for a song.
pub async fn set_requester_slot(
    pool: &SqlitePool,
    song_id: &str,
    requester_hash: &str,
    slot_time: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO requests (song_id, requester_hash, slot_time)
        VALUES (?, ?, ?)
        ON CONFLICT(song_id, requester_hash) DO UPDATE SET slot_time = excluded.slot_time
        "#,
    )
    .bind(song_id)
    .bind(requester_hash)
    .bind(slot_time)
    .execute(pool)
    .await?;
    Ok(())
}

/// Atomically clear every requester for a song (the song was fulfilled).
/// Returns the number of requesters cleared.
pub async fn clear_requesters(pool: &SqlitePool, song_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM requests WHERE song_id = ?")
        .bind(song_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ── Play history ──────────────────────────────────────────────────────────────

/// Song ids played strictly after `cutoff_ms` — the recently-played
/// exclusion set for the fulfillment selector.
pub async fn recently_played(
    pool: &SqlitePool,
    cutoff_ms: i64,
) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query("SELECT song_id FROM history WHERE played_at > ?")
        .bind(cutoff_ms)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.get("song_id")).collect())
}

pub async fn record_played(
    pool: &SqlitePool,
    song_id: &str,
    played_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO history (song_id, played_at) VALUES (?, ?)")
        .bind(song_id)
        .bind(played_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drop history entries at or before `cutoff_ms`. Returns the number pruned.
pub async fn prune_history(pool: &SqlitePool, cutoff_ms: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM history WHERE played_at <= ?")
        .bind(cutoff_ms)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ── Request log ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub id: Option<i64>,
    pub song_id: String,
    pub requester_hash: String,
    pub requester_name: Option<String>,
    /// Free-text search query the requester typed, if any.
    pub query: Option<String>,
    pub requested_at: i64,
    pub slot_time: i64,
}

pub async fn insert_request_log(
    pool: &SqlitePool,
    entry: &RequestLogEntry,
) -> Result<i64, sqlx::Error> {
    let r = sqlx::query(
        r#"
        INSERT INTO request_log (song_id, requester_hash, requester_name, query, requested_at, slot_time)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.song_id)
    .bind(&entry.requester_hash)
    .bind(&entry.requester_name)
    .bind(&entry.query)
    .bind(entry.requested_at)
    .bind(entry.slot_time)
    .execute(pool)
    .await?;
    Ok(r.last_insert_rowid())
}

pub async fn recent_request_log(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<RequestLogEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, song_id, requester_hash, requester_name, query, requested_at, slot_time
        FROM request_log ORDER BY requested_at DESC, id DESC LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| RequestLogEntry {
            id: r.get("id"),
            song_id: r.get("song_id"),
            requester_hash: r.get("requester_hash"),
            requester_name: r.get("requester_name"),
            query: r.get("query"),
            requested_at: r.get("requested_at"),
            slot_time: r.get("slot_time"),
        })
        .collect())
}

// ── Persisted config ──────────────────────────────────────────────────────────

pub async fn load_station_config(pool: &SqlitePool) -> Result<StationConfig, sqlx::Error> {
    let row: Option<String> =
        sqlx::query_scalar("SELECT config_json FROM station_config WHERE id = 1")
            .fetch_optional(pool)
            .await?;

    let cfg = row
        .and_then(|j| serde_json::from_str::<StationConfig>(&j).ok())
        .unwrap_or_default()
        .normalized();
    Ok(cfg)
}

pub async fn save_station_config(
    pool: &SqlitePool,
    config: &StationConfig,
) -> Result<(), sqlx::Error> {
    let normalized = config.normalized();
    let json = serde_json::to_string(&normalized).unwrap_or_else(|_| "{}".to_string());
    sqlx::query(
        r#"
        INSERT INTO station_config (id, config_json)
        VALUES (1, ?)
        ON CONFLICT(id) DO UPDATE SET config_json = excluded.config_json
        "#,
    )
    .bind(json)
    .execute(pool)
    .await?;
    Ok(())
}

// ── Test support ──────────────────────────────────────────────────────────────

/// Single-connection in-memory pool for tests. One connection only — each
/// pooled SQLite `:memory:` connection would otherwise get its own database.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    let _ = env_logger::builder().is_test(true).try_init();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}
