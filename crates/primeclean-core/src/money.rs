//! # Money Module
//!
//! Provides the `Money` type for every price, tax amount and invoice total.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Inclusive tax back-calculation in floats:                              │
//! │    107.00 / 1.07 = 99.99999999999999   ❌ subtotal drifts               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    10700 × 10000 / 10700 = 10000 cents                                 │
//! │    tax = 10700 − 10000 = 700 cents, and total == subtotal + tax        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Areas and item quantities are fractional, so the only float entry point is
//! [`Money::scale`], which rounds straight back to whole cents.
//!
//! ## Usage
//! ```rust
//! use primeclean_core::money::Money;
//!
//! let base = Money::from_major_minor(100, 0); // $100.00
//! let priced = base.scale(2.0);               // 100 m² = 2 × baseline
//! assert_eq!(priced.cents(), 20_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents (USD).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Service.base_price ──► pricing::price() ──► Booking.total_price        │
/// │                                                  │                      │
/// │                                                  ▼                      │
/// │                              InvoiceItem.unit_price / total_price       │
/// │                                                  │                      │
/// │                                                  ▼                      │
/// │                    Invoice.subtotal + Invoice.tax_amount = total        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use primeclean_core::money::Money;
    ///
    /// let price = Money::from_cents(10_700); // $107.00
    /// assert_eq!(price.cents(), 10_700);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from dollars and cents.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Multiplies by a fractional factor and rounds half away from zero.
    ///
    /// Used for area multipliers and fractional item quantities.
    ///
    /// ## Example
    /// ```rust
    /// use primeclean_core::money::Money;
    ///
    /// let unit = Money::from_cents(4_999);
    /// assert_eq!(unit.scale(1.5).cents(), 7_499); // 7498.5 → 7499
    /// ```
    pub fn scale(&self, factor: f64) -> Money {
        Money((self.0 as f64 * factor).round() as i64)
    }

    /// Calculates tax on top of this amount (exclusive convention).
    ///
    /// Integer math: `(amount * bps + 5000) / 10000`, the +5000 rounds half up.
    ///
    /// ## Example
    /// ```rust
    /// use primeclean_core::money::Money;
    /// use primeclean_core::types::TaxRate;
    ///
    /// let net = Money::from_cents(10_000);
    /// assert_eq!(net.calculate_tax(TaxRate::from_bps(700)).cents(), 700);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Extracts the tax already contained in this gross amount (inclusive convention).
    ///
    /// ```text
    /// net = round(gross × 10000 / (10000 + bps))
    /// tax = gross − net
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use primeclean_core::money::Money;
    /// use primeclean_core::types::TaxRate;
    ///
    /// let gross = Money::from_cents(10_700);
    /// assert_eq!(gross.included_tax(TaxRate::from_bps(700)).cents(), 700);
    /// ```
    pub fn included_tax(&self, rate: TaxRate) -> Money {
        let divisor = 10_000i128 + rate.bps() as i128;
        let scaled = self.0 as i128 * 10_000;
        // Round half up on the net amount.
        let net = (scaled * 2 + divisor) / (divisor * 2);
        Money::from_cents(self.0 - net as i64)
    }

    /// Adds a percentage surcharge in basis points (2000 = 20%).
    pub fn apply_surcharge(&self, surcharge_bps: u32) -> Money {
        let extra = (self.0 as i128 * surcharge_bps as i128 + 5000) / 10000;
        Money::from_cents(self.0 + extra as i64)
    }

    /// Rounded mean over `count` items; zero when `count` is zero.
    pub fn average(total: Money, count: usize) -> Money {
        if count == 0 {
            return Money::zero();
        }
        Money::from_cents((total.0 as f64 / count as f64).round() as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
