//! Rational numbers for time bases, frame rates and aspect ratios.

use std::fmt;
use std::str::FromStr;

/// A rational number `num / den`.
///
/// A zero denominator marks an unknown value (for example an unset sample
/// aspect ratio).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rational {
    /// Numerator.
    pub num: i64,
    /// Denominator.
    pub den: i64,
}

impl Rational {
    /// Create a new rational, normalising the sign onto the numerator.
    pub const fn new(num: i64, den: i64) -> Self {
        if den < 0 {
            Self { num: -num, den: -den }
        } else {
            Self { num, den }
        }
    }

    /// The unknown value `0/0`.
    pub const fn unknown() -> Self {
        Self { num: 0, den: 0 }
    }

    /// `0/1`.
    pub const fn zero() -> Self {
        Self { num: 0, den: 1 }
    }

    /// `1/1`.
    pub const fn one() -> Self {
        Self { num: 1, den: 1 }
    }

    /// Check whether the denominator is zero.
    pub fn is_unknown(&self) -> bool {
        self.den == 0
    }

    /// Check whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.num == 0 && self.den != 0
    }

    /// Reduce to lowest terms.
    pub fn reduce(&self) -> Self {
        if self.den == 0 || self.num == 0 {
            return *self;
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs()) as i64;
        Self::new(self.num / g, self.den / g)
    }

    /// Swap numerator and denominator.
    pub fn invert(&self) -> Self {
        Self::new(self.den, self.num)
    }

    /// Convert to f64 (`NaN` when unknown).
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Rescale `value` expressed in units of `self` into units of `target`,
    /// rounding to nearest with halves away from zero.
    ///
    /// Returns `None` if either rational is unknown or the result overflows.
    pub fn rescale(&self, value: i64, target: Rational) -> Option<i64> {
        if self.den == 0 || target.num == 0 || target.den == 0 {
            return None;
        }
        let num = value as i128 * self.num as i128 * target.den as i128;
        let den = self.den as i128 * target.num as i128;
        let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
        let half = den / 2;
        let rounded = if num >= 0 {
            (num + half) / den
        } else {
            (num - half) / den
        };
        i64::try_from(rounded).ok()
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i64, i64)> for Rational {
    fn from((num, den): (i64, i64)) -> Self {
        Self::new(num, den)
    }
}

impl FromStr for Rational {
    type Err = String;

    /// Parse `"num/den"`, `"num:den"` or a bare integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<i64>()
                .map_err(|e| format!("invalid rational '{s}': {e}"))
        };
        match s.split_once(['/', ':']) {
            Some((num, den)) => Ok(Self::new(parse(num)?, parse(den)?)),
            None => Ok(Self::new(parse(s)?, 1)),
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}
