//! Metric names and recording helpers
//!
//! Uses the `metrics` facade; nothing is exported until the embedding process
//! installs a recorder.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub const REFRESH_TOTAL: &str = "lake_rewards_refresh_total";
pub const REFRESH_DURATION: &str = "lake_rewards_refresh_duration_seconds";
pub const TOTAL_VALUE: &str = "lake_rewards_total_value";
pub const SNAPSHOT_EPOCH: &str = "lake_rewards_snapshot_epoch";
pub const DROPPED_ROWS: &str = "lake_rewards_dropped_rows_total";

pub(crate) fn record_refresh(outcome: &'static str, elapsed: Duration) {
    counter!(REFRESH_TOTAL, "outcome" => outcome).increment(1);
    histogram!(REFRESH_DURATION, "outcome" => outcome).record(elapsed.as_secs_f64());
}

pub(crate) fn record_snapshot(total: f64, epoch: i64) {
    gauge!(TOTAL_VALUE).set(total);
    gauge!(SNAPSHOT_EPOCH).set(epoch as f64);
}

pub(crate) fn record_dropped(kind: &'static str, count: usize) {
    if count > 0 {
        counter!(DROPPED_ROWS, "kind" => kind).increment(count as u64);
    }
}
