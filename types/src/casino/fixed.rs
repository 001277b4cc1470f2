use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, iter::Sum};

// Scaling factor for fixed-point arithmetic
// Using 10000 for easy decimal representation (4 decimal places)
pub const SCALE: i64 = 10_000;
pub const HALF_SCALE: i64 = SCALE / 2;

/// Fixed-point number with 4 decimal places of precision.
///
/// Payout factors and spin payouts are carried as `Decimal` so that a table
/// entry such as `0.8` survives simulation, persistence and settlement
/// without float drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decimal(i64);

impl Decimal {
    pub const ZERO: Decimal = Decimal(0);
    pub const ONE: Decimal = Decimal(SCALE);

    /// Create from a raw scaled value (`raw / SCALE`).
    pub const fn from_raw(raw: i64) -> Self {
        Decimal(raw)
    }

    /// Create from an integer value
    pub fn from_int(value: i64) -> Self {
        Decimal(value.saturating_mul(SCALE))
    }

    /// Create from a fraction (numerator / denominator)
    pub fn from_frac(numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Decimal(0);
        }
        let num = Decimal::from_int(numerator);
        let den = Decimal::from_int(denominator);
        num.div(den)
    }

    /// Create from a float, rounding to the nearest representable value.
    pub fn from_f64(value: f64) -> Self {
        let scaled = (value * SCALE as f64).round();
        if scaled >= i64::MAX as f64 {
            Decimal(i64::MAX)
        } else if scaled <= i64::MIN as f64 {
            Decimal(i64::MIN)
        } else {
            Decimal(scaled as i64)
        }
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Convert to integer with rounding (half away from zero).
    ///
    /// Saturated values round toward zero instead of overflowing.
    pub fn to_int_rounded(self) -> i64 {
        if self.0 >= 0 {
            self.0.saturating_add(HALF_SCALE) / SCALE
        } else {
            self.0.saturating_sub(HALF_SCALE) / SCALE
        }
    }

    /// Round to `decimals` places (0..=4), half away from zero.
    pub fn round_to(self, decimals: u32) -> Self {
        if decimals >= 4 {
            return self;
        }
        let step = 10i64.pow(4 - decimals);
        let half = step / 2;
        let rounded = if self.0 >= 0 {
            self.0.saturating_add(half) / step
        } else {
            self.0.saturating_sub(half) / step
        };
        Decimal(rounded * step)
    }

    /// Get the raw scaled value
    pub fn raw(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Multiply by a whole number
    pub fn mul_int(self, other: i64) -> Self {
        Decimal(self.0.saturating_mul(other))
    }

    /// Multiply by a whole number, or `None` if the product does not fit.
    pub fn checked_mul_int(self, other: i64) -> Option<Self> {
        self.0.checked_mul(other).map(Decimal)
    }

    /// Divide by an integer
    pub fn div_int(self, other: i64) -> Self {
        if other == 0 {
            return Decimal(0);
        }
        Decimal(self.0 / other)
    }

    /// Multiply two fixed-point numbers
    pub fn mul(self, other: Self) -> Self {
        let scaled = (self.0 as i128) * (other.0 as i128);
        Decimal(clamp_i128(scaled / SCALE as i128))
    }

    /// Divide two fixed-point numbers
    pub fn div(self, other: Self) -> Self {
        if other.0 == 0 {
            return Decimal(0);
        }
        let scaled = (self.0 as i128) * (SCALE as i128);
        Decimal(clamp_i128(scaled / other.0 as i128))
    }
}

fn clamp_i128(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

impl std::ops::Add for Decimal {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Decimal(self.0.saturating_add(other.0))
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Decimal(self.0.saturating_sub(other.0))
    }
}

impl std::ops::Neg for Decimal {
    type Output = Self;
    fn neg(self) -> Self {
        Decimal(-self.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        Decimal::mul(self, other)
    }
}

impl std::ops::Div for Decimal {
    type Output = Self;
    fn div(self, other: Self) -> Self {
        Decimal::div(self, other)
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Decimal::ZERO, |acc, value| acc + value)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / SCALE as u64;
        let frac = abs % SCALE as u64;
        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let digits = format!("{frac:04}");
        write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(serde::de::Error::custom("decimal must be finite"));
        }
        Ok(Decimal::from_f64(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_int() {
        let f = Decimal::from_int(5);
        assert_eq!(f.raw(), 50000);

        let f = Decimal::from_int(-3);
        assert_eq!(f.raw(), -30000);
    }

    #[test]
    fn test_from_frac() {
        let half = Decimal::from_frac(1, 2);
        assert_eq!(half.raw(), 5000);

        let three_quarters = Decimal::from_frac(3, 4);
        assert_eq!(three_quarters.raw(), 7500);

        let neg_third = Decimal::from_frac(-1, 3);
        assert_eq!(neg_third.raw(), -3333); // Truncated

        let five_halves = Decimal::from_frac(5, 2);
        assert_eq!(five_halves.raw(), 25000);
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Decimal::from_f64(0.8).raw(), 8000);
        assert_eq!(Decimal::from_f64(1.5).raw(), 15000);
        assert_eq!(Decimal::from_f64(500.0), Decimal::from_int(500));
        assert_eq!(Decimal::from_f64(0.12345).raw(), 1235);
    }

    #[test]
    fn test_to_int_rounded() {
        let f = Decimal::from_frac(15499, 10000);
        assert_eq!(f.to_int_rounded(), 2);

        let f = Decimal::from_frac(15000, 10000);
        assert_eq!(f.to_int_rounded(), 2); // rounds up at exactly .5

        let f = Decimal::from_frac(14999, 10000);
        assert_eq!(f.to_int_rounded(), 1);

        let f = Decimal::from_frac(-15000, 10000);
        assert_eq!(f.to_int_rounded(), -2); // away from zero

        let f = Decimal::from_frac(-14999, 10000);
        assert_eq!(f.to_int_rounded(), -1);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(Decimal::from_f64(0.56).round_to(1), Decimal::from_f64(0.6));
        assert_eq!(Decimal::from_f64(1.05).round_to(1), Decimal::from_f64(1.1));
        assert_eq!(Decimal::from_f64(1.04).round_to(1), Decimal::from_int(1));
        assert_eq!(Decimal::from_f64(2.345).round_to(2), Decimal::from_f64(2.35));
        assert_eq!(Decimal::from_f64(2.3456).round_to(4), Decimal::from_f64(2.3456));
        assert_eq!(Decimal::from_f64(7.6).round_to(0), Decimal::from_int(8));
    }

    #[test]
    fn test_arithmetic() {
        let a = Decimal::from_int(10);
        let b = Decimal::from_int(3);

        assert_eq!((a + b).to_int_rounded(), 13);
        assert_eq!((a - b).to_int_rounded(), 7);
        assert_eq!((-a).to_int_rounded(), -10);
        assert_eq!(a.mul(b).to_int_rounded(), 30);
        assert_eq!(a.mul(Decimal::from_frac(1, 2)).to_int_rounded(), 5);
        assert_eq!(Decimal::from_f64(0.8).mul_int(5), Decimal::from_int(4));
    }

    #[test]
    fn test_division() {
        let a = Decimal::from_int(10);
        let b = Decimal::from_int(4);
        assert_eq!(a.div(b).raw(), 25000);
        assert_eq!(a.div_int(4).raw(), 25000);
    }

    #[test]
    fn test_division_by_zero_returns_zero() {
        let a = Decimal::from_int(10);
        assert_eq!(a.div_int(0).raw(), 0);
        assert_eq!(a.div(Decimal::from_int(0)).raw(), 0);
        assert_eq!(Decimal::from_frac(1, 0).raw(), 0);
    }

    #[test]
    fn test_sum_and_display() {
        let total: Decimal = [0.8, 1.5, 3.0].into_iter().map(Decimal::from_f64).sum();
        assert_eq!(total, Decimal::from_f64(5.3));
        assert_eq!(total.to_string(), "5.3");
        assert_eq!(Decimal::from_int(500).to_string(), "500");
        assert_eq!(Decimal::from_f64(-0.25).to_string(), "-0.25");
    }

    #[test]
    fn test_serde_as_float() {
        let json = serde_json::to_string(&Decimal::from_f64(0.8)).unwrap();
        assert_eq!(json, "0.8");
        let parsed: Decimal = serde_json::from_str("1.5").unwrap();
        assert_eq!(parsed, Decimal::from_f64(1.5));
    }
}
