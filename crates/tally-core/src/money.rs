//! # Money Module
//!
//! Provides the `Money` type used for prices, subtotals, refunds and lot costs.
//!
//! ## Integer Minor Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every amount is stored in the smallest currency unit (cents).         │
//! │                                                                         │
//! │  Lot costs:      5 units × 1000 cents = 5000 cents  (exact)            │
//! │  Weighted cost:  7400 cents / 7 units = 1057.14...  (NOT stored)       │
//! │                                                                         │
//! │  Totals stay exact; only per-unit averages are rounded, and only       │
//! │  when a single per-unit figure has to be persisted.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let unit_price = Money::from_cents(299);
//! let line = unit_price.multiply_quantity(3);
//! assert_eq!(line.cents(), 897);
//!
//! // 3 of 7 units refunded from a 1000 cent line
//! assert_eq!(Money::from_cents(1000).pro_rata(3, 7).cents(), 429);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents for USD).
///
/// Signed so that compensating amounts (reversals, negative adjustments) can
/// be expressed without a separate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit amount by a quantity, saturating at the `i64` bounds.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns `self × part / whole`, rounded half away from zero.
    ///
    /// Used for partial refunds (refunded units over purchased units) and for
    /// pricing legacy stock at the lot-weighted average.
    ///
    /// A `whole` of zero yields zero.
    pub fn pro_rata(&self, part: i64, whole: i64) -> Money {
        if whole == 0 {
            return Money::zero();
        }
        Money(div_round(self.0 as i128 * part as i128, whole as i128) as i64)
    }

    /// Divides a total evenly across `qty` units, rounded half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// // (5 × 1000 + 2 × 1200) / 7
    /// assert_eq!(Money::from_cents(7400).per_unit(7).cents(), 1057);
    /// ```
    pub fn per_unit(&self, qty: i64) -> Money {
        self.pro_rata(1, qty)
    }

    /// Clamps negative values to zero.
    #[inline]
    pub fn floor_zero(self) -> Money {
        Money(self.0.max(0))
    }
}

/// Integer division rounding half away from zero.
pub(crate) fn div_round(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        if (numerator < 0) != (denominator < 0) {
            quotient - 1
        } else {
            quotient + 1
        }
    } else {
        quotient
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering; the route layer formats for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
