//! Refresh interval jitter.
//!
//! Connectors sharing a refresh value would otherwise fire in lockstep.

use std::time::Duration;

use rand::Rng;

/// Maximum jitter applied to the nominal refresh, in seconds.
pub const JITTER_SECS: i64 = 120;

/// Intervals at or below this many seconds are replaced.
pub const MIN_INTERVAL_SECS: i64 = 60;

/// Range the replacement interval is drawn from, in seconds.
pub const FALLBACK_RANGE_SECS: std::ops::RangeInclusive<u64> = 61..=300;

/// Period for a connector refreshing every `minutes` minutes.
///
/// `minutes * 60 ± 120s`. A result of 60 seconds or less (including zero
/// and negative) is replaced by a uniform draw from 61 to 300 seconds.
pub fn randomized_refresh(minutes: u64) -> Duration {
    randomized_refresh_with(minutes, &mut rand::rng())
}

pub fn randomized_refresh_with<R: Rng + ?Sized>(minutes: u64, rng: &mut R) -> Duration {
    let base = i64::try_from(minutes.saturating_mul(60)).unwrap_or(i64::MAX);
    let secs = base.saturating_add(rng.random_range(-JITTER_SECS..=JITTER_SECS));
    if secs <= MIN_INTERVAL_SECS {
        return Duration::from_secs(rng.random_range(FALLBACK_RANGE_SECS));
    }
    Duration::from_secs(secs as u64)
}
