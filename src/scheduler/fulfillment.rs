/// Fulfillment selector
///
/// Picks at most one pending request to play next. Popularity wins (more
/// requesters served first); the earliest assigned slot time breaks ties,
/// and the song id breaks ties after that so repeated calls on the same
/// snapshot are deterministic.
use std::collections::HashSet;

use super::{earliest_request_time, request_count, PendingRequests};

/// Select the next fulfillable request, skipping anything in the
/// recently-played set. Returns `None` when nothing is eligible.
pub fn select_fulfillable(
    pending: &PendingRequests,
    recently_played: &HashSet<String>,
) -> Option<String> {
    pending
        .iter()
        .filter(|(song_id, _)| !recently_played.contains(*song_id))
        .min_by(|(a_id, a), (b_id, b)| {
            // One composite comparator: count desc, earliest asc, id asc.
            request_count(b)
                .cmp(&request_count(a))
                .then_with(|| earliest_request_time(a).cmp(&earliest_request_time(b)))
                .then_with(|| a_id.cmp(b_id))
        })
        .map(|(song_id, _)| song_id.clone())
}
