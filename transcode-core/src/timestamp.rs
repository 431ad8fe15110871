//! Time bases and timestamp rescaling.
//!
//! Media units carry timestamps as plain integer ticks (`Option<i64>`, `None`
//! meaning unknown) together with the [`TimeBase`] the ticks are counted in.

use crate::rational::Rational;
use std::fmt;

/// Duration of one tick in seconds.
///
/// Common time bases:
/// - 1/90000 for MPEG-TS
/// - 1/48000 for 48kHz audio
/// - 1/1000 for milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeBase(pub Rational);

impl TimeBase {
    /// Create a new time base from numerator and denominator.
    pub const fn new(num: i64, den: i64) -> Self {
        Self(Rational::new(num, den))
    }

    /// Standard MPEG time base (1/90000).
    pub const MPEG: Self = Self::new(1, 90000);

    /// Millisecond time base (1/1000).
    pub const MILLISECONDS: Self = Self::new(1, 1000);

    /// Microsecond time base (1/1000000).
    pub const MICROSECONDS: Self = Self::new(1, 1_000_000);

    /// Unset time base.
    pub const UNKNOWN: Self = Self(Rational::unknown());

    /// Check whether this time base is usable for conversions.
    pub fn is_known(&self) -> bool {
        !self.0.is_unknown() && self.0.num != 0
    }

    /// Rescale a tick count into `target` units, rounding to nearest.
    pub fn rescale(&self, value: i64, target: TimeBase) -> Option<i64> {
        self.0.rescale(value, target.0)
    }

    /// Rescale an optional timestamp, keeping unknown values unknown.
    pub fn rescale_ts(&self, ts: Option<i64>, target: TimeBase) -> Option<i64> {
        ts.and_then(|v| self.rescale(v, target))
    }

    /// Convert ticks to seconds.
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
        Self::UNKNOWN
    }
}

impl From<Rational> for TimeBase {
    fn from(r: Rational) -> Self {
        Self(r)
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Format an optional timestamp the way logs print them.
pub fn display_ts(ts: Option<i64>) -> String {
    match ts {
        Some(v) => v.to_string(),
        None => "NOPTS".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_base_convert() {
        assert_eq!(TimeBase::MILLISECONDS.rescale(1000, TimeBase::MPEG), Some(90000));
    }

    #[test]
    fn test_rescale_unknown_stays_unknown() {
        assert_eq!(TimeBase::MPEG.rescale_ts(None, TimeBase::MILLISECONDS), None);
        assert_eq!(TimeBase::UNKNOWN.rescale_ts(Some(3), TimeBase::MPEG), None);
    }

    #[test]
    fn test_to_seconds() {
        let secs = TimeBase::MPEG.to_seconds(90000);
        assert!((secs - 1.0).abs() < 1e-9);
        assert!(!TimeBase::UNKNOWN.is_known());
    }

    #[test]
    fn test_display_ts() {
        assert_eq!(display_ts(Some(12)), "12");
        assert_eq!(display_ts(None), "NOPTS");
    }
}
