//! Rational number type for precise time and rate representation.

use std::cmp::Ordering;
use std::fmt;

/// Rounding applied when a rescaled value falls between two integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rounding {
    /// Round toward zero (truncate).
    Zero,
    /// Round away from zero.
    Inf,
    /// Round toward negative infinity.
    Down,
    /// Round toward positive infinity.
    Up,
    /// Round to nearest, halfway cases away from zero.
    #[default]
    NearInf,
}

/// A rational number represented as a numerator and denominator.
///
/// Used for precise representation of frame rates, aspect ratios and time bases.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator
    pub num: i64,
    /// Denominator (always positive once constructed through `new`)
    pub den: i64,
}

impl Rational {
    /// Create a new rational number.
    ///
    /// A negative denominator is normalized by moving the sign to the numerator.
    ///
    /// # Panics
    ///
    /// Panics if denominator is zero.
    pub fn new(num: i64, den: i64) -> Self {
        assert!(den != 0, "Denominator cannot be zero");
        let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
        Self { num, den }
    }

    /// Create a rational, returning `None` if the denominator is zero.
    pub fn checked_new(num: i64, den: i64) -> Option<Self> {
        if den == 0 {
            None
        } else {
            Some(Self::new(num, den))
        }
    }

    /// Create a zero rational.
    pub const fn zero() -> Self {
        Self { num: 0, den: 1 }
    }

    /// Check if this rational is zero.
    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// Reduce the rational to its simplest form.
    pub fn reduce(&self) -> Self {
        if self.num == 0 {
            return Self { num: 0, den: 1 };
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs());
        Self {
            num: self.num / g as i64,
            den: self.den / g as i64,
        }
    }

    /// Convert to f64.
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Get the reciprocal of this rational.
    ///
    /// Returns `None` for zero, which has no reciprocal.
    pub fn recip(&self) -> Option<Self> {
        if self.num == 0 {
            None
        } else {
            Some(Self::new(self.den, self.num))
        }
    }

    /// Rescale a value from this unit to `target`, rounding to nearest.
    pub fn rescale(&self, value: i64, target: Rational) -> i64 {
        self.rescale_rnd(value, target, Rounding::NearInf)
    }

    /// Rescale a value from this unit to `target` with explicit rounding.
    ///
    /// Computes `value * self / target` in 128-bit precision. Results that do
    /// not fit in an `i64` (or a zero target) yield `i64::MIN`.
    pub fn rescale_rnd(&self, value: i64, target: Rational, rounding: Rounding) -> i64 {
        let num = (value as i128)
            .checked_mul(self.num as i128)
            .and_then(|n| n.checked_mul(target.den as i128));
        let den = (self.den as i128).checked_mul(target.num as i128);

        let (Some(mut num), Some(mut den)) = (num, den) else {
            return i64::MIN;
        };
        if den == 0 {
            return i64::MIN;
        }
        if den < 0 {
            num = -num;
            den = -den;
        }

        let quotient = num / den;
        let remainder = num % den;
        let rounded = if remainder == 0 {
            quotient
        } else {
            let away = quotient + num.signum();
            match rounding {
                Rounding::Zero => quotient,
                Rounding::Inf => away,
                Rounding::Down if num < 0 => away,
                Rounding::Down => quotient,
                Rounding::Up if num > 0 => away,
                Rounding::Up => quotient,
                Rounding::NearInf if 2 * remainder.abs() >= den => away,
                Rounding::NearInf => quotient,
            }
        };

        i64::try_from(rounded).unwrap_or(i64::MIN)
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rational({}/{})", self.num, self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.num as i128 * other.den as i128;
        let rhs = other.num as i128 * self.den as i128;
        lhs.cmp(&rhs)
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Self { num: n, den: 1 }
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self::new(num as i64, den as i64)
    }
}

impl From<(i64, i64)> for Rational {
    fn from((num, den): (i64, i64)) -> Self {
        Self::new(num, den)
    }
}

/// Calculate the greatest common divisor using Euclidean algorithm.
fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}
