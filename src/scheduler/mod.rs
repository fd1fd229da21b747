/// Scheduling kernel
///
/// The algorithmic core of the station: queue-slot assignment for incoming
/// requests (`qos`), weighted random catalog sampling (`weighter`),
/// pending-request ranking (`fulfillment`) and admission control
/// (`admission`). Everything in here is pure — it operates on in-memory
/// snapshots and never touches the store.
use std::collections::HashMap;

pub mod admission;
pub mod fulfillment;
pub mod qos;
pub mod weighter;

/// All pending requests: song id → (requester id → assigned slot time in
/// epoch ms). A song has at most one entry; each requester of that song has
/// exactly one slot time.
pub type PendingRequests = HashMap<String, HashMap<String, i64>>;

/// Number of requesters currently waiting on a song.
pub fn request_count(requesters: &HashMap<String, i64>) -> usize {
    requesters.len()
}

/// Earliest slot time across a song's requesters. An entry with no
/// requesters ranks as time zero (top priority) rather than panicking on
/// malformed state.
pub fn earliest_request_time(requesters: &HashMap<String, i64>) -> i64 {
    requesters.values().copied().min().unwrap_or(0)
}
