/// Station configuration
///
/// Tuning knobs for the queue-slot scheduler and the admission/playback
/// policy. Both structs serialize to JSON and are persisted as a single
/// config row by `db::local`.
use serde::{Deserialize, Serialize};

// ── QoS scheduler config ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QosConfig {
    /// Minimum offset added past the chosen insertion point when assigning
    /// a slot time (ms).
    pub margin_ms: i64,
    /// Minimum gap required between two slot times of the same song before
    /// a new one may be inserted between them (ms). Zero or negative is a
    /// legal degenerate configuration: every gap counts as free.
    pub insert_space_ms: i64,
}

impl Default for QosConfig {
    fn default() -> Self {
        Self {
            margin_ms: 600_000,
            insert_space_ms: 960_000,
        }
    }
}

// ── Station policy ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StationPolicy {
    /// Maximum number of active (not yet played) requests per requester.
    pub max_active_requests: u32,
    /// Trailing window for the recently-played exclusion set and for history
    /// pruning (ms).
    pub history_window_ms: i64,
}

impl Default for StationPolicy {
    fn default() -> Self {
        Self {
            max_active_requests: 20,
            history_window_ms: 3_600_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct StationConfig {
    pub qos: QosConfig,
    pub policy: StationPolicy,
}

impl StationConfig {
    /// Clamp values that would make the station misbehave. The QoS knobs are
    /// deliberately left alone — a non-positive insert space is allowed.
    pub fn normalized(mut self) -> Self {
        self.policy.max_active_requests = self.policy.max_active_requests.max(1);
        self.policy.history_window_ms = self.policy.history_window_ms.max(0);
        self
    }
}
