use chrono::NaiveDate;
use std::str::FromStr;

use crate::models::InvoiceStatus;

/// Trait for status transitions of an invoice.
///
/// Statuses are `unpaid`, `paid` and `overdue`, with no terminal state:
/// - Creation -> `unpaid` unless the caller supplies a status
/// - `unpaid` -> `overdue` when read after the due date has passed
/// - Any state -> `paid` / `unpaid` through an explicit status change
pub trait Transition {
    /// Status given to an invoice created without one.
    fn initial_state() -> InvoiceStatus {
        InvoiceStatus::Unpaid
    }

    /// Determines whether reading an invoice on `today` moves it to a new
    /// status.
    ///
    /// # Arguments
    ///
    /// * `current` - The stored status string
    /// * `due_date` - The invoice's due date, if any
    /// * `today` - The current date (no time of day)
    ///
    /// # Returns
    ///
    /// Returns the new status, or `None` if the invoice keeps its status.
    fn on_read(current: &str, due_date: Option<NaiveDate>, today: NaiveDate)
        -> Option<InvoiceStatus>;

    /// Validates the target of an explicit status change.
    ///
    /// # Errors
    ///
    /// Returns the rejected value when it is not an allowed target.
    fn manual_change(requested: &str) -> Result<InvoiceStatus, String>;
}

/// Default implementation of [`Transition`] for invoices.
pub struct InvoiceStateMachine;

impl Transition for InvoiceStateMachine {
    fn on_read(
        current: &str,
        due_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Option<InvoiceStatus> {
        match (InvoiceStatus::from_str(current), due_date) {
            (Ok(InvoiceStatus::Unpaid), Some(due)) if due < today => Some(InvoiceStatus::Overdue),
            _ => None,
        }
    }

    fn manual_change(requested: &str) -> Result<InvoiceStatus, String> {
        // `overdue` is only ever reached through the due-date rule.
        match InvoiceStatus::from_str(requested) {
            Ok(status @ (InvoiceStatus::Paid | InvoiceStatus::Unpaid)) => Ok(status),
            _ => Err(requested.to_string()),
        }
    }
}
