use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, instrument};

use super::{ClientStore, IdentityStore, InvoiceStore, StoreError, StoreResult};
use crate::models::team::OWNER_ROLE;
use crate::models::{Client, Invoice, InvoiceChanges, NewInvoice, NewUser, Team, User};

const INVOICE_COLUMNS: &str =
    "id, team_id, client_id, number, status, amount, currency, due_date, created_at";

/// PostgreSQL-backed store sharing one connection pool.
///
/// Each method is a single statement, except team provisioning which runs
/// in a transaction. Connections return to the pool when the query future
/// completes or is dropped.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a sqlx error, turning unique violations into conflicts.
fn map_err(context: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(format!("{}: {}", context, db_err.message()))
        }
        _ => StoreError::Backend(format!("{}: {}", context, err)),
    }
}

#[async_trait]
impl InvoiceStore for PgStore {
    async fn list_invoices(&self, team_id: i64) -> StoreResult<Vec<Invoice>> {
        sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE team_id = $1 ORDER BY id ASC",
            INVOICE_COLUMNS
        ))
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_err("Failed to list invoices", e))
    }

    async fn find_invoice(&self, team_id: i64, invoice_id: i64) -> StoreResult<Option<Invoice>> {
        sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE id = $1 AND team_id = $2",
            INVOICE_COLUMNS
        ))
        .bind(invoice_id)
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("Failed to get invoice", e))
    }

    async fn highest_number(&self, team_id: i64) -> StoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT number
            FROM invoices
            WHERE team_id = $1 AND number ~ '^[0-9]+$'
            ORDER BY CAST(number AS NUMERIC) DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("Failed to read highest invoice number", e))?;

        Ok(row.map(|(number,)| number))
    }

    #[instrument(skip(self, invoice), fields(team_id = invoice.team_id, number = %invoice.number))]
    async fn insert_invoice(&self, invoice: NewInvoice) -> StoreResult<Invoice> {
        sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (team_id, client_id, number, status, amount, currency, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(invoice.team_id)
        .bind(invoice.client_id)
        .bind(&invoice.number)
        .bind(&invoice.status)
        .bind(invoice.amount)
        .bind(&invoice.currency)
        .bind(invoice.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err("Failed to create invoice", e))
    }

    async fn update_invoice(
        &self,
        team_id: i64,
        invoice_id: i64,
        changes: &InvoiceChanges,
    ) -> StoreResult<Option<Invoice>> {
        sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET
                client_id = COALESCE($3, client_id),
                status = COALESCE($4, status),
                amount = COALESCE($5, amount),
                currency = COALESCE($6, currency),
                due_date = CASE WHEN $7 THEN $8 ELSE due_date END
            WHERE id = $1 AND team_id = $2
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(invoice_id)
        .bind(team_id)
        .bind(changes.client_id)
        .bind(changes.status.as_deref())
        .bind(changes.amount)
        .bind(changes.currency.as_deref())
        .bind(changes.due_date.is_some())
        .bind(changes.due_date.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("Failed to update invoice", e))
    }

    async fn set_status(&self, team_id: i64, invoice_id: i64, status: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE invoices SET status = $3 WHERE id = $1 AND team_id = $2")
            .bind(invoice_id)
            .bind(team_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| map_err("Failed to update invoice status", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_overdue(&self, team_id: i64, invoice_id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE invoices SET status = 'overdue' \
             WHERE id = $1 AND team_id = $2 AND status = 'unpaid'",
        )
        .bind(invoice_id)
        .bind(team_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err("Failed to mark invoice overdue", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_invoice(&self, team_id: i64, invoice_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND team_id = $2")
            .bind(invoice_id)
            .bind(team_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_err("Failed to delete invoice", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_err("Health check failed", e))?;
        Ok(())
    }
}

#[async_trait]
impl ClientStore for PgStore {
    async fn find_client(&self, team_id: i64, client_id: i64) -> StoreResult<Option<Client>> {
        sqlx::query_as::<_, Client>(
            r#"
            SELECT id, team_id, name, phone, ice, if_number
            FROM clients
            WHERE id = $1 AND team_id = $2
            "#,
        )
        .bind(client_id)
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("Failed to get client", e))
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, external_id, email, name, created_at FROM users WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("Failed to look up user", e))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, external_id, email, name, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("Failed to look up user", e))
    }

    async fn link_external_id(
        &self,
        user_id: i64,
        external_id: &str,
        name: Option<&str>,
    ) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET external_id = $2, name = COALESCE($3, name)
            WHERE id = $1
            RETURNING id, external_id, email, name, created_at
            "#,
        )
        .bind(user_id)
        .bind(external_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err("Failed to link external id", e))
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, email, name)
            VALUES ($1, $2, $3)
            RETURNING id, external_id, email, name, created_at
            "#,
        )
        .bind(&user.external_id)
        .bind(&user.email)
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err("Failed to create user", e))
    }

    async fn team_for_user(&self, user_id: i64) -> StoreResult<Option<Team>> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT t.id, t.name, t.owner_id, t.logo_url
            FROM team_memberships m
            JOIN teams t ON t.id = m.team_id
            WHERE m.user_id = $1
            ORDER BY m.id ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_err("Failed to look up team membership", e))
    }

    #[instrument(skip(self))]
    async fn create_owned_team(&self, owner_id: i64, name: &str) -> StoreResult<Team> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_err("Failed to begin transaction", e))?;

        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, owner_id)
            VALUES ($1, $2)
            RETURNING id, name, owner_id, logo_url
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_err("Failed to create team", e))?;

        sqlx::query("INSERT INTO team_memberships (user_id, team_id, role) VALUES ($1, $2, $3)")
            .bind(owner_id)
            .bind(team.id)
            .bind(OWNER_ROLE)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_err("Failed to create team membership", e))?;

        // Dropping `tx` on any early return above rolls both inserts back.
        tx.commit()
            .await
            .map_err(|e| map_err("Failed to commit team provisioning", e))?;

        info!(team_id = team.id, owner_id, "Provisioned team");
        Ok(team)
    }
}
