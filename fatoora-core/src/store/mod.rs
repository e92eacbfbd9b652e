//! Persistence contracts for the invoice subsystem.
//!
//! The service layer only talks to these traits. [`postgres::PgStore`] is
//! the production backend; [`memory::MemoryStore`] backs tests and local
//! experiments. Both enforce the same uniqueness rules: `(team_id, number)`
//! on invoices, `external_id` and `email` on users.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Client, Invoice, InvoiceChanges, NewInvoice, NewUser, Team, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Invoice persistence. Every method takes the owning team so that no
/// query can reach another tenant's rows.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// All invoices of a team, oldest first.
    async fn list_invoices(&self, team_id: i64) -> StoreResult<Vec<Invoice>>;

    async fn find_invoice(&self, team_id: i64, invoice_id: i64) -> StoreResult<Option<Invoice>>;

    /// The number of the team's invoice with the greatest numeric number,
    /// ties broken by the most recently assigned id.
    async fn highest_number(&self, team_id: i64) -> StoreResult<Option<String>>;

    /// Inserts a new invoice. Fails with [`StoreError::Conflict`] when the
    /// team already has an invoice with the same number.
    async fn insert_invoice(&self, invoice: NewInvoice) -> StoreResult<Invoice>;

    /// Applies a partial update, returning the updated row or `None` when
    /// the invoice does not exist in the team.
    async fn update_invoice(
        &self,
        team_id: i64,
        invoice_id: i64,
        changes: &InvoiceChanges,
    ) -> StoreResult<Option<Invoice>>;

    /// Sets the status column only. Returns `false` if no row matched.
    async fn set_status(&self, team_id: i64, invoice_id: i64, status: &str) -> StoreResult<bool>;

    /// Moves the invoice to `overdue` only while it is still `unpaid`.
    /// Returns `false` if no row matched, including when a concurrent
    /// write already changed the status.
    async fn mark_overdue(&self, team_id: i64, invoice_id: i64) -> StoreResult<bool>;

    /// Permanently removes the invoice. Returns `false` if no row matched.
    async fn delete_invoice(&self, team_id: i64, invoice_id: i64) -> StoreResult<bool>;

    /// Cheap liveness probe of the backend.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn find_client(&self, team_id: i64, client_id: i64) -> StoreResult<Option<Client>>;
}

/// Storage needed to resolve a verified identity into a user and a team.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Records `external_id` on an existing user, refreshing the display
    /// name when one is given.
    async fn link_external_id(
        &self,
        user_id: i64,
        external_id: &str,
        name: Option<&str>,
    ) -> StoreResult<User>;

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Team of the user's first membership, if any.
    async fn team_for_user(&self, user_id: i64) -> StoreResult<Option<Team>>;

    /// Creates a team owned by `owner_id` together with its owner
    /// membership, atomically.
    async fn create_owned_team(&self, owner_id: i64, name: &str) -> StoreResult<Team>;
}
