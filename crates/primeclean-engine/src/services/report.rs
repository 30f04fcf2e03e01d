//! # Reports
//!
//! Read-only business report over a service-date range.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::EngineResult;
use primeclean_core::report::{aggregate, DateRange, Report};
use primeclean_core::transitions::ensure_staff;
use primeclean_core::Actor;

impl Engine {
    /// Bookings and invoices with a service date in `[start, end]`, optionally
    /// narrowed to customers whose name contains `client`.
    pub async fn report(
        &self,
        actor: &Actor,
        start: NaiveDate,
        end: NaiveDate,
        client: Option<&str>,
    ) -> EngineResult<Report> {
        ensure_staff(actor)?;
        let range = DateRange::new(start, end)?;
        debug!(%start, %end, ?client, "report");

        let bookings = self.db.reports().bookings_in(&range).await?;
        let invoices = self.db.reports().invoices_in(&range).await?;
        let report = aggregate(range, client, bookings, invoices);

        info!(
            bookings = report.analytics.total_bookings,
            invoices = report.analytics.total_invoices,
            "Report generated"
        );
        Ok(report)
    }
}
