/// Queue-slot scheduler
///
/// Assigns the internal slot time at which a newly admitted request
/// conceptually queues. Two stages: a global fairness adjustment that keeps
/// brand-new requests from slipping in ahead of an already congested
/// front-of-queue window, then a per-song gap search that inserts into the
/// earliest gap wide enough for `insert_space_ms` (appending past the last
/// slot when the queue is packed).
use crate::config::QosConfig;

/// Compute the slot time for a new request.
///
/// * `current_time` — wall clock of the admission attempt (epoch ms).
/// * `requested_times` — slot times already held by other requesters of the
///   same song.
/// * `all_requested_times` — every slot time across all songs; used only for
///   the fairness adjustment.
///
/// The returned slot time is always ≥ `current_time + margin_ms`.
pub fn time_to_enqueue(
    current_time: i64,
    requested_times: &[i64],
    all_requested_times: &[i64],
    config: &QosConfig,
) -> i64 {
    let QosConfig {
        margin_ms,
        insert_space_ms,
    } = *config;

    // Stage 1: raise the baseline just past the congestion window at the
    // front of the global queue. `max_in_margin` is the latest slot packed
    // within one margin of the earliest queued slot.
    let mut baseline = current_time;
    if let Some(&earliest) = all_requested_times.iter().min() {
        let max_in_margin = all_requested_times
            .iter()
            .copied()
            .filter(|&t| t < earliest + margin_ms)
            .max()
            .unwrap_or(earliest);
        baseline = baseline.max(max_in_margin - margin_ms + 1);
    }

    // Stage 2: a candidate insertion point is valid when no other candidate
    // occupies the insert-space window immediately after it. Strict
    // inequalities: a candidate equal to another is not a conflict.
    let mut candidates = Vec::with_capacity(requested_times.len() + 1);
    candidates.push(baseline);
    candidates.extend_from_slice(requested_times);

    let earliest_free = candidates
        .iter()
        .copied()
        .filter(|&t| {
            !candidates
                .iter()
                .any(|&x| t < x && x < t + insert_space_ms)
        })
        .min()
        // The largest candidate has nothing after it, so the filtered set is
        // never empty.
        .unwrap_or(baseline);

    earliest_free.max(baseline) + margin_ms
}
