/// Station control
///
/// Composes the scheduling kernel with the catalog snapshot and the local
/// store: admitting listener requests, picking the next song to play, and
/// recording play history. Each operation reads a consistent snapshot,
/// runs the pure kernel, then writes the resulting mutation back.
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sqlx::sqlite::SqlitePool;

use crate::catalog::{Catalog, SongEntry};
use crate::config::{QosConfig, StationPolicy};
use crate::db::local;
use crate::scheduler::admission::{admit_request, RequestRejection};
use crate::scheduler::fulfillment::select_fulfillable;
use crate::scheduler::weighter::{WeightedIndexer, WeighterError};
use crate::scheduler::PendingRequests;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Requester ids are stored and logged only in hashed form.
pub fn hash_requester_id(requester_id: &str) -> String {
    format!("{:x}", md5::compute(requester_id))
}

// ── Selection ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SongSelection {
    pub song: SongEntry,
    /// True when the song fulfills a pending request.
    pub requested: bool,
    /// Requester hash → slot time, present when `requested` is true.
    pub requesters: Option<HashMap<String, i64>>,
}

/// Pick the next song from in-memory snapshots: the top fulfillable request
/// when one exists in the catalog, otherwise a weighted random draw using
/// `fraction` (uniform in [0,1)).
///
/// A fulfillable song id missing from the catalog falls back to the draw and
/// leaves the pending entry untouched — the catalog may simply be a stale
/// snapshot, and the request stays serviceable.
pub fn choose_next(
    catalog: &Catalog,
    pending: &PendingRequests,
    recently_played: &HashSet<String>,
    fraction: f64,
) -> Result<SongSelection, WeighterError> {
    if let Some(song_id) = select_fulfillable(pending, recently_played) {
        if let Some(song) = catalog.get(&song_id) {
            return Ok(SongSelection {
                song: song.clone(),
                requested: true,
                requesters: pending.get(&song_id).cloned(),
            });
        }
        log::warn!("Fulfillable request {song_id} is not in the catalog, drawing at random");
    }

    let indexer = WeightedIndexer::new(&catalog.weights())?;
    let song = catalog.songs()[indexer.index(fraction)].clone();
    Ok(SongSelection {
        song,
        requested: false,
        requesters: None,
    })
}

/// Store-backed selection. Reads the pending and recently-played snapshots,
/// draws the random fraction, and — when a request is fulfilled — atomically
/// clears all of its requesters.
pub async fn next_song(
    pool: &SqlitePool,
    catalog: &Catalog,
    policy: &StationPolicy,
) -> Result<SongSelection, Box<dyn std::error::Error + Send + Sync>> {
    let now = now_ms();
    let pending = local::get_pending_requests(pool).await?;
    let recent = local::recently_played(pool, now - policy.history_window_ms).await?;

    let selection = choose_next(catalog, &pending, &recent, rand::random::<f64>())?;
    if selection.requested {
        let cleared = local::clear_requesters(pool, &selection.song.song_id).await?;
        log::info!(
            "Fulfilling request: {} ({cleared} requester(s))",
            selection.song.stream_title()
        );
    } else {
        log::info!("Weighted pick: {}", selection.song.stream_title());
    }
    Ok(selection)
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Result of a request attempt, with the text surfaced to the requester.
#[derive(Debug, Clone, Serialize)]
pub struct RequestOutcome {
    pub queued: bool,
    /// Assigned slot time when queued. Informational only — playback order
    /// is decided by popularity, not slot time.
    pub slot_time: Option<i64>,
    pub text: String,
}

/// Admit a listener request against the stored pending set and persist the
/// assigned slot. Rejections (unknown song, quota) come back as unqueued
/// outcomes, never as errors; only store failures surface as `Err`.
#[allow(clippy::too_many_arguments)]
pub async fn request_song(
    pool: &SqlitePool,
    catalog: &Catalog,
    song_id: &str,
    requester_id: &str,
    requester_name: Option<&str>,
    query: Option<&str>,
    qos: &QosConfig,
    policy: &StationPolicy,
) -> Result<RequestOutcome, sqlx::Error> {
    let Some(song) = catalog.get(song_id) else {
        return Ok(RequestOutcome {
            queued: false,
            slot_time: None,
            text: RequestRejection::SongNotFound {
                song_id: song_id.to_string(),
            }
            .message(),
        });
    };

    let requester_hash = hash_requester_id(requester_id);
    let mut pending = local::get_pending_requests(pool).await?;
    let now = now_ms();

    match admit_request(
        &song.song_id,
        &requester_hash,
        now,
        &mut pending,
        qos,
        policy.max_active_requests,
    ) {
        Ok(slot_time) => {
            local::set_requester_slot(pool, &song.song_id, &requester_hash, slot_time).await?;
            local::insert_request_log(
                pool,
                &local::RequestLogEntry {
                    id: None,
                    song_id: song.song_id.clone(),
                    requester_hash,
                    requester_name: requester_name.map(str::to_string),
                    query: query.map(str::to_string),
                    requested_at: now,
                    slot_time,
                },
            )
            .await?;
            Ok(RequestOutcome {
                queued: true,
                slot_time: Some(slot_time),
                text: format!("Requested: {}", song.stream_title()),
            })
        }
        Err(rejection) => {
            log::info!("Request for {song_id} rejected: {rejection:?}");
            Ok(RequestOutcome {
                queued: false,
                slot_time: None,
                text: rejection.message(),
            })
        }
    }
}

// ── History ───────────────────────────────────────────────────────────────────

/// Record a played song and prune history that fell out of the trailing
/// window. Returns the number of pruned entries.
pub async fn record_played(
    pool: &SqlitePool,
    song_id: &str,
    played_at: i64,
    policy: &StationPolicy,
) -> Result<u64, sqlx::Error> {
    local::record_played(pool, song_id, played_at).await?;
    local::prune_history(pool, played_at - policy.history_window_ms).await
}
