//! Strictly increasing history timestamps.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Issues wall-clock timestamps that never repeat within one clock.
///
/// Two saves landing in the same clock tick get distinct range keys, so the
/// second cannot overwrite the first. Clocks in different processes give no
/// such guarantee.
#[derive(Debug, Default)]
pub struct HistoryClock {
    last_nanos: AtomicI64,
}

impl HistoryClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let mut last = self.last_nanos.load(Ordering::Acquire);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self.last_nanos.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return DateTime::from_timestamp_nanos(candidate),
                Err(actual) => last = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_strictly_increase() {
        let clock = HistoryClock::new();
        let stamps: Vec<_> = (0..1000).map(|_| clock.next()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_formatted_timestamps_sort_like_instants() {
        let clock = HistoryClock::new();
        let a = super::super::format_timestamp(clock.next());
        let b = super::super::format_timestamp(clock.next());
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }
}
