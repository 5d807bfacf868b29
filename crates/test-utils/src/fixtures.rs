//! Common test fixtures for NWP run tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

/// Model name used for test artifacts.
pub const TEST_MODEL: &str = "test";

/// Step between consecutive lead times of the test runs.
pub const TIMESTEP_MINUTES: i64 = 5;

/// A fixed analysis time for tests (2021-07-04T12:00:00Z).
pub fn analysis_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 7, 4, 12, 0, 0)
        .single()
        .expect("fixed analysis time is valid")
}

/// Valid times of a regular run with `count` lead times starting at the
/// analysis time.
pub fn valid_times(count: usize) -> Vec<DateTime<Utc>> {
    (0..count)
        .map(|i| analysis_time() + Duration::minutes(TIMESTEP_MINUTES * i as i64))
        .collect()
}

/// The valid time of lead time index `index`.
pub fn valid_time(index: usize) -> DateTime<Utc> {
    analysis_time() + Duration::minutes(TIMESTEP_MINUTES * index as i64)
}

/// A fresh temporary artifact directory, removed when dropped.
pub fn temp_output_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}
