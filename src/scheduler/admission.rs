/// Admission control
///
/// Decides whether a new request may enter the pending set and at what slot
/// time it queues. Rejections are typed and carry the user-facing message
/// shown to the requester; nothing is mutated on rejection.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::QosConfig;

use super::{qos, PendingRequests};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RequestRejection {
    /// The requester already holds the maximum number of active requests.
    QuotaExceeded { limit: u32 },
    /// The requested song id is not in the catalog. Raised by the station
    /// layer before admission runs.
    SongNotFound { song_id: String },
}

impl RequestRejection {
    /// Message surfaced to the requester.
    pub fn message(&self) -> String {
        match self {
            Self::QuotaExceeded { limit } => format!(
                "You already reached a maximum limit of {limit} active song requests. \
                 Please wait for your requested song to be played first before retrying the request."
            ),
            Self::SongNotFound { .. } => {
                "Sorry, didn’t find the song you requested...".to_string()
            }
        }
    }
}

impl fmt::Display for RequestRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for RequestRejection {}

/// Admit a request and record its slot time under
/// `pending[song_id][requester_id]`.
///
/// Slot placement considers the slots already held by *other* requesters of
/// the same song, plus every slot across all songs for the fairness
/// adjustment. Fails with `QuotaExceeded` — leaving `pending` untouched —
/// when the requester already has `max_active` requests waiting.
pub fn admit_request(
    song_id: &str,
    requester_id: &str,
    now: i64,
    pending: &mut PendingRequests,
    config: &QosConfig,
    max_active: u32,
) -> Result<i64, RequestRejection> {
    let mut active_requests = 0u32;
    let mut slots_for_this_song = Vec::new();
    let mut slots_globally = Vec::new();

    for (pending_song, requesters) in pending.iter() {
        for (pending_requester, &slot_time) in requesters {
            if pending_requester == requester_id {
                active_requests += 1;
            } else if pending_song == song_id {
                slots_for_this_song.push(slot_time);
            }
            slots_globally.push(slot_time);
        }
    }

    if active_requests >= max_active {
        return Err(RequestRejection::QuotaExceeded { limit: max_active });
    }

    let slot_time = qos::time_to_enqueue(now, &slots_for_this_song, &slots_globally, config);
    if slot_time > now + config.margin_ms {
        log::info!(
            "Request for {song_id} shifted by {} ms due to QoS",
            slot_time - now - config.margin_ms
        );
    }

    pending
        .entry(song_id.to_string())
        .or_default()
        .insert(requester_id.to_string(), slot_time);
    Ok(slot_time)
}
