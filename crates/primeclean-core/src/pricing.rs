//! # Pricing Calculator
//!
//! Maps a service's base price and the serviced area to a booking price.
//!
//! ```text
//! total = base × max(1, area / 50)
//!
//!   area  ≤ 50 m²  → base price (floor)
//!   area  = 100 m² → 2 × base
//!   area  = 125 m² → 2.5 × base
//! ```
//!
//! Quotes add a 20% complexity surcharge when the free-text requirements run
//! past 100 characters. Bookings never carry the surcharge.

use crate::error::CoreResult;
use crate::money::Money;
use crate::validation::validate_square_meters;

/// Area covered by the base price, in m².
pub const BASELINE_AREA_SQM: f64 = 50.0;

/// Requirements longer than this many characters make a quote "complex".
pub const COMPLEX_REQUIREMENTS_CHARS: usize = 100;

/// Surcharge applied to complex quotes, in basis points.
pub const COMPLEX_SURCHARGE_BPS: u32 = 2000;

/// Multiplier applied to the base price for a given area.
#[inline]
pub fn area_multiplier(square_meters: f64) -> f64 {
    (square_meters / BASELINE_AREA_SQM).max(1.0)
}

/// Prices a booking.
///
/// ## Errors
/// Rejects non-finite or non-positive areas.
///
/// ## Example
/// ```rust
/// use primeclean_core::money::Money;
/// use primeclean_core::pricing::price;
///
/// let base = Money::from_major_minor(100, 0);
/// assert_eq!(price(base, 100.0).unwrap(), Money::from_major_minor(200, 0));
/// assert_eq!(price(base, 20.0).unwrap(), base);
/// ```
pub fn price(base: Money, square_meters: f64) -> CoreResult<Money> {
    let area = validate_square_meters(square_meters)?;
    Ok(base.scale(area_multiplier(area)))
}

/// Whether free-text requirements trigger the complexity surcharge.
pub fn is_complex_request(special_requirements: Option<&str>) -> bool {
    special_requirements
        .map(|text| text.chars().count() > COMPLEX_REQUIREMENTS_CHARS)
        .unwrap_or(false)
}

/// Prices a quote: the booking price plus the surcharge for complex requests.
pub fn quote_estimate(
    base: Money,
    square_meters: f64,
    special_requirements: Option<&str>,
) -> CoreResult<Money> {
    let estimate = price(base, square_meters)?;
    if is_complex_request(special_requirements) {
        Ok(estimate.apply_surcharge(COMPLEX_SURCHARGE_BPS))
    } else {
        Ok(estimate)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
