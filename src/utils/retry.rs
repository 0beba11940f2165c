//! Retry utilities: backoff builders for store polling.
//!
//! Uses `backon` for the polling schedule.

use backon::ConstantBuilder;

use crate::config::DeletionConfig;

/// Fixed-delay schedule for polling a table deletion.
///
/// - Delay: `poll_interval_ms`
/// - Max attempts: `max_retries` after the first check
/// - No jitter
pub fn deletion_backoff(config: &DeletionConfig) -> ConstantBuilder {
    ConstantBuilder::default()
        .with_delay(config.poll_interval())
        .with_max_times(config.max_retries)
}
