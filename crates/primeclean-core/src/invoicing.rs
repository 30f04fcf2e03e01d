//! # Invoice Derivation
//!
//! Pure computation of everything an invoice carries: line items, tax,
//! totals, number, due date and the customer/billing snapshot.
//!
//! ## Derivation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Booking (price 107.00, address "12 Palm Ave, Miami, FL 33101")        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  build_line_items() ── caller items verbatim, else one synthesized     │
//! │       │                 "Cleaning Service - 12 Palm Ave, …" × 1         │
//! │       ▼                                                                 │
//! │  compute_totals(TaxPolicy { 700 bps, Inclusive })                      │
//! │       │     total 107.00 → subtotal 100.00 + tax 7.00                   │
//! │       ▼                                                                 │
//! │  resolve_customer() / resolve_billing() ── frozen snapshot             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  format_invoice_number(2025, 42) → "PP-2025-00042"                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{BillingAddress, BillingSnapshot, BookingOwner, TaxMode, TaxRate};
use crate::validation::{validate_positive_amount, validate_quantity, validate_required};

// =============================================================================
// Constants
// =============================================================================

/// Florida state sales tax, in basis points.
pub const STATE_SALES_TAX_BPS: u32 = 600;

/// County discretionary sales surtax, in basis points.
pub const DISCRETIONARY_SURTAX_BPS: u32 = 100;

/// Combined rate applied to non-exempt invoices (7%).
pub const DEFAULT_TAX_RATE: TaxRate =
    TaxRate::from_bps(STATE_SALES_TAX_BPS + DISCRETIONARY_SURTAX_BPS);

/// Payment terms when the caller does not override them.
pub const DEFAULT_NET_DAYS: i64 = 30;

/// Prefix of every invoice number.
pub const INVOICE_NUMBER_PREFIX: &str = "PP";

pub const DEFAULT_COUNTRY: &str = "United States";
pub const DEFAULT_STATE: &str = "FL";
pub const UNKNOWN_CITY: &str = "Unknown";

/// Name used when a registered customer has no profile on file.
pub const REGISTERED_CUSTOMER_NAME: &str = "Registered Customer";

// =============================================================================
// Line Items
// =============================================================================

/// A caller-supplied line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: f64,
    pub unit_price: Money,
    #[serde(default = "default_taxable")]
    pub taxable: bool,
}

fn default_taxable() -> bool {
    true
}

/// A validated line with its computed total.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: Money,
    pub total_price: Money,
    pub taxable: bool,
}

impl DerivedLine {
    /// Validates an input line and computes `round(unit_price × quantity)`.
    pub fn from_input(input: &LineItemInput) -> CoreResult<Self> {
        let description = validate_required("description", &input.description)?;
        let quantity = validate_quantity(input.quantity)?;
        let unit_price = validate_positive_amount("unit_price", input.unit_price)?;

        Ok(DerivedLine {
            description,
            quantity,
            unit_price,
            total_price: unit_price.scale(quantity),
            taxable: input.taxable,
        })
    }

    /// The single line used when no items were supplied.
    pub fn service_line(booking_price: Money, service_address: &str) -> Self {
        DerivedLine {
            description: format!("Cleaning Service - {}", service_address.trim()),
            quantity: 1.0,
            unit_price: booking_price,
            total_price: booking_price,
            taxable: true,
        }
    }
}

/// Most line items one invoice may carry.
pub const MAX_LINE_ITEMS: usize = 100;

/// Uses caller items verbatim, or synthesizes exactly one service line.
///
/// Per-line bounds and the item cap keep every total well inside `i64` cents.
pub fn build_line_items(
    inputs: &[LineItemInput],
    booking_price: Money,
    service_address: &str,
) -> CoreResult<Vec<DerivedLine>> {
    if inputs.is_empty() {
        return Ok(vec![DerivedLine::service_line(booking_price, service_address)]);
    }
    if inputs.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        }
        .into());
    }

    inputs.iter().map(DerivedLine::from_input).collect()
}

// =============================================================================
// Tax & Totals
// =============================================================================

/// The configured tax convention and rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxPolicy {
    pub rate: TaxRate,
    pub mode: TaxMode,
}

impl Default for TaxPolicy {
    fn default() -> Self {
        TaxPolicy {
            rate: DEFAULT_TAX_RATE,
            mode: TaxMode::default(),
        }
    }
}

/// Monetary summary of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub total_amount: Money,
}

/// Derives subtotal, tax and total from the lines.
///
/// Only taxable lines contribute to the tax base. Exempt invoices use a zero
/// rate so `total == subtotal`.
///
/// ## Example
/// ```rust
/// use primeclean_core::invoicing::{build_line_items, compute_totals, TaxPolicy};
/// use primeclean_core::money::Money;
///
/// let lines = build_line_items(&[], Money::from_cents(10_700), "12 Palm Ave").unwrap();
/// let totals = compute_totals(&lines, TaxPolicy::default(), false);
/// assert_eq!(totals.subtotal.cents(), 10_000);
/// assert_eq!(totals.tax_amount.cents(), 700);
/// assert_eq!(totals.total_amount.cents(), 10_700);
/// ```
pub fn compute_totals(lines: &[DerivedLine], policy: TaxPolicy, tax_exempt: bool) -> InvoiceTotals {
    let gross: Money = lines.iter().map(|l| l.total_price).sum();
    let taxable: Money = lines
        .iter()
        .filter(|l| l.taxable)
        .map(|l| l.total_price)
        .sum();

    if tax_exempt || policy.rate.is_zero() {
        return InvoiceTotals {
            subtotal: gross,
            tax_rate: TaxRate::zero(),
            tax_amount: Money::zero(),
            total_amount: gross,
        };
    }

    match policy.mode {
        TaxMode::Exclusive => {
            let tax_amount = taxable.calculate_tax(policy.rate);
            InvoiceTotals {
                subtotal: gross,
                tax_rate: policy.rate,
                tax_amount,
                total_amount: gross + tax_amount,
            }
        }
        TaxMode::Inclusive => {
            let tax_amount = taxable.included_tax(policy.rate);
            InvoiceTotals {
                subtotal: gross - tax_amount,
                tax_rate: policy.rate,
                tax_amount,
                total_amount: gross,
            }
        }
    }
}

// =============================================================================
// Numbering & Dates
// =============================================================================

/// `PP-{year}-{sequence:05}`.
pub fn format_invoice_number(year: i32, sequence: i64) -> String {
    format!("{INVOICE_NUMBER_PREFIX}-{year}-{sequence:05}")
}

/// Splits an invoice number back into (year, sequence).
pub fn parse_invoice_number(number: &str) -> Option<(i32, i64)> {
    let mut parts = number.splitn(3, '-');
    if parts.next()? != INVOICE_NUMBER_PREFIX {
        return None;
    }
    let year = parts.next()?.parse().ok()?;
    let sequence = parts.next()?.parse().ok()?;
    Some((year, sequence))
}

/// `issue_date + net_days`.
pub fn due_date(issue_date: NaiveDate, net_days: i64) -> CoreResult<NaiveDate> {
    let days = u64::try_from(net_days).map_err(|_| ValidationError::must_be_positive("net_days"))?;
    issue_date.checked_add_days(Days::new(days)).ok_or_else(|| {
        ValidationError::invalid_format("due_date", "falls outside the supported calendar").into()
    })
}

/// Standard terms printed on every invoice.
pub fn default_terms(company_name: &str, tax_id: &str, net_days: i64) -> String {
    format!(
        "Payment Terms: Net {net_days} days\n\
         Late Payment: 1.5% per month on past due amounts\n\
         Florida Sales Tax included where applicable\n\
         Tax ID: {tax_id}\n\
         \n\
         {company_name}\n\
         Licensed & Insured in Florida\n\
         Thank you for your business!"
    )
}

// =============================================================================
// Snapshots
// =============================================================================

/// City, state and zip pulled from a free-form "street, city, ST zip" address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Best-effort split of a comma-separated address.
///
/// ```text
/// "12 Palm Ave, Miami, FL 33101" → city "Miami", state "FL", zip "33101"
/// "12 Palm Ave, Miami"           → city "12 Palm Ave", state "FL", zip ""
/// "12 Palm Ave"                  → city "Unknown", state "FL", zip ""
/// ```
pub fn parse_address(address: &str) -> ParsedAddress {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();

    if parts.len() < 2 {
        return ParsedAddress {
            city: UNKNOWN_CITY.to_string(),
            state: DEFAULT_STATE.to_string(),
            zip: String::new(),
        };
    }

    let city = parts[parts.len() - 2].to_string();
    let tail: Vec<&str> = parts[parts.len() - 1].split_whitespace().collect();
    let (state, zip) = match tail.as_slice() {
        [state, zip, ..] => (state.to_string(), zip.to_string()),
        _ => (DEFAULT_STATE.to_string(), String::new()),
    };

    ParsedAddress { city, state, zip }
}

/// Picks the first billing source with a street address and fills the gaps.
///
/// Sources are tried in order; when none has an address the service address
/// is parsed instead.
pub fn resolve_billing(
    sources: &[&BillingAddress],
    service_address: &str,
    default_country: &str,
) -> BillingSnapshot {
    let chosen = sources.iter().find(|b| !b.is_empty());

    let Some(source) = chosen else {
        let parsed = parse_address(service_address);
        return BillingSnapshot {
            address: service_address.trim().to_string(),
            city: parsed.city,
            state: parsed.state,
            zip: parsed.zip,
            country: default_country.to_string(),
        };
    };

    let address = source.address.clone().unwrap_or_default().trim().to_string();
    let parsed = parse_address(&address);
    let pick = |value: &Option<String>, fallback: String| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or(fallback)
    };

    BillingSnapshot {
        city: pick(&source.city, parsed.city),
        state: pick(&source.state, parsed.state),
        zip: pick(&source.zip, parsed.zip),
        country: pick(&source.country, default_country.to_string()),
        address,
    }
}

/// Customer identity frozen onto an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Registered customer details available when snapshotting.
#[derive(Debug, Clone, Copy)]
pub struct ProfileIdentity<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
}

/// Request overrides win, then the guest contact, then the profile.
pub fn resolve_customer(
    overrides: &CustomerSnapshot,
    owner: &BookingOwner,
    profile: Option<ProfileIdentity<'_>>,
) -> CustomerSnapshot {
    let non_blank = |s: &str| {
        let t = s.trim();
        (!t.is_empty()).then(|| t.to_string())
    };

    let (owner_name, owner_email, owner_phone) = match (owner.guest(), profile) {
        (Some(guest), _) => (
            non_blank(&guest.name),
            non_blank(&guest.email),
            non_blank(&guest.phone),
        ),
        (None, Some(p)) => (
            non_blank(p.full_name),
            non_blank(p.email),
            p.phone.and_then(non_blank),
        ),
        (None, None) => (None, None, None),
    };

    CustomerSnapshot {
        name: non_blank(&overrides.name)
            .or(owner_name)
            .unwrap_or_else(|| REGISTERED_CUSTOMER_NAME.to_string()),
        email: non_blank(&overrides.email).or(owner_email).unwrap_or_default(),
        phone: overrides
            .phone
            .as_deref()
            .and_then(non_blank)
            .or(owner_phone),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
