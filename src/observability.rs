use crate::engine::Rejection;
use crate::model::StoredState;

/// Counter: booking attempts. Labels: outcome (`accepted` or a rejection tag).
pub const BOOKINGS_TOTAL: &str = "rentcal_bookings_total";

/// Counter: explicit state transitions. Labels: state.
pub const STATE_CHANGES_TOTAL: &str = "rentcal_state_changes_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "rentcal_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "rentcal_wal_flush_batch_size";

/// Install the stderr log subscriber, filtered by `RUST_LOG` (default `info`).
/// Stdout is left alone for command output.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Label for `BOOKINGS_TOTAL`.
pub fn booking_outcome_label(outcome: Result<(), &Rejection>) -> &'static str {
    match outcome {
        Ok(()) => "accepted",
        Err(rejection) => rejection.tag(),
    }
}

pub fn record_booking(outcome: Result<(), &Rejection>) {
    metrics::counter!(BOOKINGS_TOTAL, "outcome" => booking_outcome_label(outcome)).increment(1);
}

pub fn record_state_change(state: StoredState) {
    metrics::counter!(STATE_CHANGES_TOTAL, "state" => state.as_str()).increment(1);
}
