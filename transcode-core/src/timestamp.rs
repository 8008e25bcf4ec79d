//! Timestamp and time base handling.
//!
//! Every stage of a transcode counts time in its own unit: a demuxer in the
//! container's stream time base, an encoder in `1 / frame_rate`, a muxer in
//! whatever the output container prefers. [`TimeBase::rescale`] moves a tick
//! count between those units.

use crate::error::{Error, Result};
use crate::rational::{Rational, Rounding};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a value is rounded when moved between time bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RescaleMode {
    /// Rounding rule for inexact results.
    pub rounding: Rounding,
    /// Leave `i64::MIN` and `i64::MAX` untouched instead of scaling them.
    pub pass_min_max: bool,
}

impl RescaleMode {
    /// Mode used for packet pts/dts: nearest, halves away from zero, sentinels preserved.
    pub const TIMESTAMP: Self = Self {
        rounding: Rounding::NearInf,
        pass_min_max: true,
    };

    /// Plain round-to-nearest.
    pub const NEAREST: Self = Self {
        rounding: Rounding::NearInf,
        pass_min_max: false,
    };
}

/// A time base for converting between timestamp units.
///
/// Common time bases:
/// - 1/90000 for MPEG-TS
/// - 1/25 for 25 fps video counted in frames
/// - 1/1000 for milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "(i64, i64)", into = "(i64, i64)")]
pub struct TimeBase(pub Rational);

impl TimeBase {
    /// Create a new time base from numerator and denominator.
    ///
    /// # Panics
    ///
    /// Panics if `den` is zero; use [`TimeBase::try_new`] for untrusted input.
    pub fn new(num: i64, den: i64) -> Self {
        Self(Rational::new(num, den))
    }

    /// Create a time base, rejecting a zero denominator.
    pub fn try_new(num: i64, den: i64) -> Result<Self> {
        Rational::checked_new(num, den)
            .map(Self)
            .ok_or_else(|| Error::invalid_param(format!("time base {}/{} has a zero denominator", num, den)))
    }

    /// Standard MPEG time base (1/90000).
    pub const MPEG: Self = Self(Rational { num: 1, den: 90000 });

    /// Millisecond time base (1/1000).
    pub const MILLISECONDS: Self = Self(Rational { num: 1, den: 1000 });

    /// Microsecond time base (1/1000000).
    pub const MICROSECONDS: Self = Self(Rational { num: 1, den: 1000000 });

    /// Time base of a frame counter at the given rate (the inverse of the rate).
    ///
    /// Returns `None` for a zero rate.
    pub fn from_frame_rate(rate: Rational) -> Option<Self> {
        rate.recip().map(Self)
    }

    /// Convert a value to another time base, rounding to nearest.
    pub fn convert(&self, value: i64, target: TimeBase) -> i64 {
        self.0.rescale(value, target.0)
    }

    /// Convert a value to another time base with an explicit mode.
    pub fn rescale(&self, value: i64, target: TimeBase, mode: RescaleMode) -> i64 {
        if mode.pass_min_max && (value == i64::MIN || value == i64::MAX) {
            return value;
        }
        self.0.rescale_rnd(value, target.0, mode.rounding)
    }

    /// Convert to seconds as f64.
    pub fn to_seconds(&self, value: i64) -> f64 {
        value as f64 * self.0.to_f64()
    }

    /// Get the time base as a rational.
    pub fn as_rational(&self) -> Rational {
        self.0
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::MPEG
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0.num, self.0.den)
    }
}

impl From<Rational> for TimeBase {
    fn from(r: Rational) -> Self {
        Self(r)
    }
}

impl TryFrom<(i64, i64)> for TimeBase {
    type Error = Error;

    fn try_from((num, den): (i64, i64)) -> Result<Self> {
        Self::try_new(num, den)
    }
}

impl From<TimeBase> for (i64, i64) {
    fn from(tb: TimeBase) -> Self {
        (tb.0.num, tb.0.den)
    }
}

/// A timestamp with an associated time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// The raw timestamp value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Timestamp {
    /// Value representing an undefined timestamp.
    pub const NONE: i64 = i64::MIN;

    /// Create a new timestamp.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// Create an undefined timestamp in the given time base.
    pub fn none(time_base: TimeBase) -> Self {
        Self {
            value: Self::NONE,
            time_base,
        }
    }

    /// Check if this timestamp is defined.
    pub fn is_valid(&self) -> bool {
        self.value != Self::NONE
    }

    /// Get the value if defined.
    pub fn get(&self) -> Option<i64> {
        self.is_valid().then_some(self.value)
    }

    /// Convert to a different time base, rounding to nearest.
    ///
    /// An undefined timestamp stays undefined.
    pub fn rescale(&self, target: TimeBase) -> Self {
        self.rescale_with(self.time_base, target)
    }

    /// Reinterpret the value as counted in `source` and convert it to `target`.
    ///
    /// Pts/dts conversion between stages, where the producer's unit is known
    /// from the stage rather than from the value itself. Sentinels pass through.
    pub fn rescale_with(&self, source: TimeBase, target: TimeBase) -> Self {
        Self {
            value: source.rescale(self.value, target, RescaleMode::TIMESTAMP),
            time_base: target,
        }
    }

    /// Keep the value but label it with a different time base.
    pub fn relabel(&self, time_base: TimeBase) -> Self {
        Self {
            value: self.value,
            time_base,
        }
    }

    /// Convert to seconds.
    pub fn to_seconds(&self) -> Option<f64> {
        self.get().map(|v| self.time_base.to_seconds(v))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::none(TimeBase::default())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(secs) = self.to_seconds() {
            let sign = if secs < 0.0 { "-" } else { "" };
            let secs = secs.abs();
            let hours = (secs / 3600.0) as u32;
            let mins = ((secs % 3600.0) / 60.0) as u32;
            let secs = secs % 60.0;
            write!(f, "{}{:02}:{:02}:{:06.3}", sign, hours, mins, secs)
        } else {
            write!(f, "NONE")
        }
    }
}

/// A duration with an associated time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// The raw duration value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Duration {
    /// Create a new duration.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// Create a zero duration.
    pub fn zero(time_base: TimeBase) -> Self {
        Self {
            value: 0,
            time_base,
        }
    }

    /// Check if this duration is zero.
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Reinterpret the value as counted in `source` and convert it to `target`.
    ///
    /// Only positive durations are scaled; zero and negative values (unknown
    /// duration) are carried over as-is.
    pub fn rescale_with(&self, source: TimeBase, target: TimeBase) -> Self {
        let value = if self.value > 0 {
            source.rescale(self.value, target, RescaleMode::NEAREST)
        } else {
            self.value
        };
        Self {
            value,
            time_base: target,
        }
    }

    /// Keep the value but label it with a different time base.
    pub fn relabel(&self, time_base: TimeBase) -> Self {
        Self {
            value: self.value,
            time_base,
        }
    }

    /// Convert to seconds.
    pub fn to_seconds(&self) -> f64 {
        self.time_base.to_seconds(self.value)
    }
}
