//! Load metrics.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

pub const LOADS_TOTAL: &str = "fi_loads_total";
pub const LOAD_DURATION_SECONDS: &str = "fi_load_duration_seconds";
pub const INSTRUMENTS_LOADED: &str = "fi_instruments_loaded";

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(LOADS_TOTAL, "Total instrument loads by outcome");
    describe_histogram!(
        LOAD_DURATION_SECONDS,
        "Duration of successful instrument loads in seconds"
    );
    describe_gauge!(
        INSTRUMENTS_LOADED,
        "Number of instruments in the current table"
    );
}

pub(crate) fn record_load_success(elapsed: Duration, instruments: usize) {
    counter!(LOADS_TOTAL, "outcome" => "success").increment(1);
    histogram!(LOAD_DURATION_SECONDS).record(elapsed.as_secs_f64());
    gauge!(INSTRUMENTS_LOADED).set(instruments as f64);
}

pub(crate) fn record_load_failure() {
    counter!(LOADS_TOTAL, "outcome" => "failure").increment(1);
}
