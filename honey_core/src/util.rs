//! Common time/period helpers for honey_core.
use std::time::Duration;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Control period from a configured millisecond value, clamped to [1, 1000] ms.
#[inline]
pub fn period_from_ms(ms: u64) -> Duration {
    Duration::from_millis(ms.clamp(1, MILLIS_PER_SEC))
}

/// Sample time in seconds as used by the controller.
#[inline]
pub fn dt_seconds(period: Duration) -> f32 {
    period.as_secs_f32()
}

/// Whole milliseconds of `d` for log fields, saturating at `u64::MAX`.
#[inline]
pub fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_is_clamped() {
        assert_eq!(period_from_ms(0), Duration::from_millis(1));
        assert_eq!(period_from_ms(20), Duration::from_millis(20));
        assert_eq!(period_from_ms(5_000), Duration::from_millis(1_000));
    }

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_millis(20)), 20);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn dt_of_default_period() {
        assert!((dt_seconds(period_from_ms(20)) - 0.02).abs() < 1e-6);
    }
}
