//! Property-based tests for time base rescaling.
//!
//! Uses proptest to check the rounding contract of `TimeBase::rescale`
//! against exact 128-bit arithmetic.

use proptest::prelude::*;
use transcode_core::{Packet, RescaleMode, TimeBase, Timestamp};

fn time_base() -> impl Strategy<Value = TimeBase> {
    (1i64..=1001, 1i64..=192_000).prop_map(|(num, den)| TimeBase::new(num, den))
}

// =============================================================================
// Rounding
// =============================================================================

proptest! {
    /// The result is the exact quotient rounded to nearest, never off by more than half a tick.
    #[test]
    fn rescale_within_half_tick(value in -1_000_000_000i64..1_000_000_000, src in time_base(), dst in time_base()) {
        let out = src.rescale(value, dst, RescaleMode::TIMESTAMP);

        let s = src.as_rational();
        let d = dst.as_rational();
        let num = value as i128 * s.num as i128 * d.den as i128;
        let den = s.den as i128 * d.num as i128;

        prop_assert!(2 * (out as i128 * den - num).abs() <= den);
    }

    /// Rescaling into the same time base is the identity.
    #[test]
    fn rescale_identity(value in any::<i64>(), tb in time_base()) {
        prop_assert_eq!(tb.rescale(value, tb, RescaleMode::TIMESTAMP), value);
    }

    /// Rescaling never reorders timestamps.
    #[test]
    fn rescale_is_monotonic(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000, src in time_base(), dst in time_base()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(src.rescale(lo, dst, RescaleMode::TIMESTAMP) <= src.rescale(hi, dst, RescaleMode::TIMESTAMP));
    }

    /// Going to a finer time base and back loses nothing.
    #[test]
    fn rescale_through_finer_base_roundtrips(value in -10_000_000i64..10_000_000, rate in 1i64..=120, factor in 1i64..=1000) {
        let coarse = TimeBase::new(1, rate);
        let fine = TimeBase::new(1, rate * factor);
        let up = coarse.rescale(value, fine, RescaleMode::TIMESTAMP);
        prop_assert_eq!(fine.rescale(up, coarse, RescaleMode::TIMESTAMP), value);
    }
}

// =============================================================================
// Sentinels
// =============================================================================

proptest! {
    /// An unset timestamp survives any conversion.
    #[test]
    fn unset_timestamp_passes_through(src in time_base(), dst in time_base()) {
        let ts = Timestamp::none(src).rescale(dst);
        prop_assert!(!ts.is_valid());
        prop_assert_eq!(ts.time_base, dst);
    }

    /// Packet conversion leaves non-positive durations alone.
    #[test]
    fn packet_duration_only_scaled_when_positive(duration in -100i64..=0, src in time_base(), dst in time_base()) {
        let mut packet = Packet::new(vec![0])
            .with_duration(transcode_core::Duration::new(duration, src));
        packet.rescale_ts(src, dst);
        prop_assert_eq!(packet.duration.value, duration);
    }
}
