use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Currency applied when a create request omits one.
pub const DEFAULT_CURRENCY: &str = "MAD";

/// Known invoice statuses.
///
/// The `status` column itself is free text: creation and the general
/// update operation store whatever string the caller supplies. This enum
/// names the three values the rest of the system gives meaning to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(InvoiceStatus::Unpaid),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            other => Err(format!("unknown invoice status: {}", other)),
        }
    }
}

/// Invoice model representing a row of the `invoices` table.
///
/// Every read and write is filtered by `team_id`; `number` is unique
/// only within that team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    /// Storage-assigned identifier
    pub id: i64,

    /// Owning team, fixed at creation
    pub team_id: i64,

    /// Client billed by this invoice (same team)
    pub client_id: i64,

    /// Team-scoped sequential number as a decimal string
    pub number: String,

    /// Current status, usually one of [`InvoiceStatus`]
    pub status: String,

    pub amount: Decimal,

    /// Currency code, displayed verbatim
    pub currency: String,

    /// Payment due date; without one the invoice never auto-transitions
    pub due_date: Option<NaiveDate>,

    pub created_at: Option<DateTime<Utc>>,
}

/// Values for a new invoice row. Only the invoice service builds these.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub team_id: i64,
    pub client_id: i64,
    pub number: String,
    pub status: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: Option<NaiveDate>,
}

/// Partial update of an invoice. `None` leaves a field untouched;
/// `due_date: Some(None)` clears the due date.
#[derive(Debug, Clone, Default)]
pub struct InvoiceChanges {
    pub client_id: Option<i64>,
    pub status: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl InvoiceChanges {
    pub fn apply_to(&self, invoice: &mut Invoice) {
        if let Some(client_id) = self.client_id {
            invoice.client_id = client_id;
        }
        if let Some(status) = &self.status {
            invoice.status = status.clone();
        }
        if let Some(amount) = self.amount {
            invoice.amount = amount;
        }
        if let Some(currency) = &self.currency {
            invoice.currency = currency.clone();
        }
        if let Some(due_date) = self.due_date {
            invoice.due_date = due_date;
        }
    }
}

/// Invoice response (public representation)
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceResponse {
    pub id: i64,
    pub number: String,
    pub client_id: i64,
    pub status: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        InvoiceResponse {
            id: invoice.id,
            number: invoice.number,
            client_id: invoice.client_id,
            status: invoice.status,
            amount: invoice.amount,
            currency: invoice.currency,
            due_date: invoice.due_date,
            created_at: invoice.created_at,
        }
    }
}
