//! Team-scoped sequential invoice numbers.
//!
//! Numbers are plain decimal strings ("1", "2", ...), derived from the
//! team's current maximum rather than a counter. Deleting an invoice can
//! leave a gap but never causes reuse under sequential creates. Concurrent
//! creates may derive the same number; the `(team_id, number)` unique
//! constraint rejects the loser, which re-derives and retries.

use tracing::debug;

use crate::error::AppError;
use crate::store::InvoiceStore;

/// Attempts made by the create operation before a numbering conflict is
/// surfaced to the caller.
pub const NUMBERING_MAX_ATTEMPTS: usize = 3;

/// Numeric value of an invoice number, if it is a plain decimal integer.
pub fn numeric_value(number: &str) -> Option<u128> {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    number.parse().ok()
}

/// Number following `highest`, or `"1"` for a team without invoices.
///
/// # Errors
///
/// Returns an error if `highest` is not a decimal integer. Stores only hand
/// back numeric numbers, so this indicates corrupted data.
pub fn successor(highest: Option<&str>) -> Result<String, AppError> {
    match highest {
        None => Ok("1".to_string()),
        Some(number) => numeric_value(number)
            .and_then(|value| value.checked_add(1))
            .map(|next| next.to_string())
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "Invoice number {:?} is not a decimal integer",
                    number
                ))
            }),
    }
}

/// Derives the next invoice number for `team_id`.
pub async fn next_number(store: &dyn InvoiceStore, team_id: i64) -> Result<String, AppError> {
    let highest = store.highest_number(team_id).await?;
    let next = successor(highest.as_deref())?;
    debug!(team_id, highest = ?highest, next = %next, "Derived next invoice number");
    Ok(next)
}
