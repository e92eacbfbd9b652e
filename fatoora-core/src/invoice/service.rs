//! Team-scoped invoice operations.
//!
//! Every method takes the caller's [`Team`], resolved once per request by
//! the context middleware, and never touches rows of another team. Scoping
//! and existence checks run before any mutation.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::numbering::{next_number, NUMBERING_MAX_ATTEMPTS};
use super::state_machine::{InvoiceStateMachine, Transition};
use super::types::{CreateInvoice, CreatedInvoice};
use crate::error::AppError;
use crate::models::invoice::DEFAULT_CURRENCY;
use crate::models::{Client, Invoice, InvoiceChanges, InvoiceStatus, NewInvoice, Team};
use crate::render;
use crate::store::{ClientStore, InvoiceStore, StoreError};

/// Content type of exported invoices.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A rendered invoice ready to be sent as a download.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Invoice service holding its storage handles.
///
/// Cheap to clone; the stores are shared behind `Arc`s.
#[derive(Clone)]
pub struct InvoiceService {
    invoices: Arc<dyn InvoiceStore>,
    clients: Arc<dyn ClientStore>,
    upload_dir: PathBuf,
}

impl InvoiceService {
    /// Creates a new service.
    ///
    /// # Arguments
    ///
    /// * `invoices` - Invoice persistence
    /// * `clients` - Read access to the team's clients
    /// * `upload_dir` - Directory holding uploaded team logos
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        clients: Arc<dyn ClientStore>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            invoices,
            clients,
            upload_dir: upload_dir.into(),
        }
    }

    /// Liveness of the invoice backend.
    pub async fn ping(&self) -> Result<(), AppError> {
        Ok(self.invoices.ping().await?)
    }

    /// Lists the team's invoices as of the current UTC date.
    pub async fn list(&self, team: &Team, status: Option<&str>) -> Result<Vec<Invoice>, AppError> {
        self.list_as_of(team, status, Utc::now().date_naive()).await
    }

    /// Lists the team's invoices, applying the auto-overdue rule for
    /// `today` and then the optional exact status filter. An empty filter
    /// is treated as absent.
    ///
    /// The overdue write only succeeds while the stored status is still
    /// `unpaid`; when a concurrent change got there first, the stored row is
    /// reported instead. Persisting is otherwise best-effort: a failed write
    /// is logged and the computed status is still returned.
    #[instrument(skip(self, team), fields(team_id = team.id))]
    pub async fn list_as_of(
        &self,
        team: &Team,
        status: Option<&str>,
        today: NaiveDate,
    ) -> Result<Vec<Invoice>, AppError> {
        let snapshot = self.invoices.list_invoices(team.id).await?;
        let mut invoices = Vec::with_capacity(snapshot.len());

        for mut invoice in snapshot {
            if let Some(next) = InvoiceStateMachine::on_read(&invoice.status, invoice.due_date, today)
            {
                match self.invoices.mark_overdue(team.id, invoice.id).await {
                    Ok(true) => {
                        info!(invoice_id = invoice.id, "Invoice {} is now {}", invoice.number, next);
                        invoice.status = next.as_str().to_string();
                    }
                    Ok(false) => {
                        // Changed or removed since the snapshot was read.
                        match self.invoices.find_invoice(team.id, invoice.id).await? {
                            Some(current) => invoice = current,
                            None => continue,
                        }
                    }
                    Err(e) => {
                        warn!(
                            invoice_id = invoice.id,
                            "Failed to persist {} transition: {}", next, e
                        );
                        invoice.status = next.as_str().to_string();
                    }
                }
            }
            invoices.push(invoice);
        }

        if let Some(wanted) = status.filter(|wanted| !wanted.is_empty()) {
            invoices.retain(|invoice| invoice.status == wanted);
        }

        Ok(invoices)
    }

    /// Creates an invoice with the team's next number.
    ///
    /// A numbering conflict means a concurrent create took the number; the
    /// number is re-derived and the insert retried up to
    /// [`NUMBERING_MAX_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// * [`AppError::InvalidReference`] - the client is not in the team
    /// * [`AppError::InvalidInput`] - the amount is negative
    /// * [`AppError::Conflict`] - every numbering attempt collided
    #[instrument(skip(self, team, req), fields(team_id = team.id, client_id = req.client_id))]
    pub async fn create(&self, team: &Team, req: CreateInvoice) -> Result<CreatedInvoice, AppError> {
        self.require_client(team, req.client_id).await?;
        check_amount(req.amount)?;

        let status = req
            .status
            .unwrap_or_else(|| InvoiceStateMachine::initial_state().as_str().to_string());
        let currency = req.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let mut attempt = 1;
        loop {
            let number = next_number(self.invoices.as_ref(), team.id).await?;
            let row = NewInvoice {
                team_id: team.id,
                client_id: req.client_id,
                number,
                status: status.clone(),
                amount: req.amount,
                currency: currency.clone(),
                due_date: req.due_date,
            };

            match self.invoices.insert_invoice(row).await {
                Ok(invoice) => {
                    info!(invoice_id = invoice.id, "Created invoice {}", invoice.number);
                    return Ok(CreatedInvoice {
                        id: invoice.id,
                        number: invoice.number,
                    });
                }
                Err(StoreError::Conflict(msg)) if attempt < NUMBERING_MAX_ATTEMPTS => {
                    warn!(attempt, "Invoice number taken, retrying: {}", msg);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fetches a single invoice of the team.
    #[instrument(skip(self, team), fields(team_id = team.id))]
    pub async fn get(&self, team: &Team, invoice_id: i64) -> Result<Invoice, AppError> {
        self.invoices
            .find_invoice(team.id, invoice_id)
            .await?
            .ok_or_else(|| invoice_not_found(invoice_id))
    }

    /// Applies a partial update. The status is stored as given; a changed
    /// client must belong to the team.
    #[instrument(skip(self, team, changes), fields(team_id = team.id))]
    pub async fn update(
        &self,
        team: &Team,
        invoice_id: i64,
        changes: InvoiceChanges,
    ) -> Result<Invoice, AppError> {
        self.get(team, invoice_id).await?;

        if let Some(client_id) = changes.client_id {
            self.require_client(team, client_id).await?;
        }
        if let Some(amount) = changes.amount {
            check_amount(amount)?;
        }

        let invoice = self
            .invoices
            .update_invoice(team.id, invoice_id, &changes)
            .await?
            .ok_or_else(|| invoice_not_found(invoice_id))?;

        info!(invoice_id, "Updated invoice {}", invoice.number);
        Ok(invoice)
    }

    /// Permanently removes an invoice.
    #[instrument(skip(self, team), fields(team_id = team.id))]
    pub async fn delete(&self, team: &Team, invoice_id: i64) -> Result<(), AppError> {
        if !self.invoices.delete_invoice(team.id, invoice_id).await? {
            return Err(invoice_not_found(invoice_id));
        }
        info!(invoice_id, "Deleted invoice");
        Ok(())
    }

    /// Sets the status to `paid` or `unpaid`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] before looking at the requested value,
    /// then [`AppError::InvalidInput`] for any other status.
    #[instrument(skip(self, team), fields(team_id = team.id))]
    pub async fn change_status(
        &self,
        team: &Team,
        invoice_id: i64,
        requested: &str,
    ) -> Result<InvoiceStatus, AppError> {
        self.get(team, invoice_id).await?;

        let status = InvoiceStateMachine::manual_change(requested).map_err(|rejected| {
            AppError::InvalidInput(format!(
                "Invalid status {:?}: expected \"paid\" or \"unpaid\"",
                rejected
            ))
        })?;

        if !self
            .invoices
            .set_status(team.id, invoice_id, status.as_str())
            .await?
        {
            return Err(invoice_not_found(invoice_id));
        }

        info!(invoice_id, "Invoice status changed to {}", status);
        Ok(status)
    }

    /// Renders an invoice to PDF.
    ///
    /// Rendering is CPU-bound and runs on the blocking pool so it never
    /// stalls other requests.
    #[instrument(skip(self, team), fields(team_id = team.id))]
    pub async fn export_pdf(&self, team: &Team, invoice_id: i64) -> Result<InvoiceDocument, AppError> {
        let invoice = self.get(team, invoice_id).await?;
        let client = self
            .clients
            .find_client(team.id, invoice.client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Client {} not found", invoice.client_id)))?;
        let logo = self.logo_path(team).await;

        let filename = format!("invoice_{}.pdf", invoice.number);
        let team = team.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            render::render_now(&invoice, &client, &team, logo.as_deref())
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Render task failed: {}", e)))??;

        info!(invoice_id, size = bytes.len(), "Rendered {}", filename);
        Ok(InvoiceDocument {
            filename,
            content_type: PDF_CONTENT_TYPE,
            bytes,
        })
    }

    async fn require_client(&self, team: &Team, client_id: i64) -> Result<Client, AppError> {
        self.clients
            .find_client(team.id, client_id)
            .await?
            .ok_or_else(|| {
                AppError::InvalidReference(format!("Client {} does not belong to this team", client_id))
            })
    }

    /// Uploaded logo of the team, if its file exists on disk.
    async fn logo_path(&self, team: &Team) -> Option<PathBuf> {
        let path = self.upload_dir.join(team.logo_file_name()?);
        if is_file(&path).await {
            Some(path)
        } else {
            warn!(team_id = team.id, path = %path.display(), "Team logo file is missing");
            None
        }
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

fn check_amount(amount: Decimal) -> Result<(), AppError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::InvalidInput("Amount must not be negative".to_string()));
    }
    Ok(())
}

fn invoice_not_found(invoice_id: i64) -> AppError {
    AppError::NotFound(format!("Invoice {} not found", invoice_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreResult};
    use async_trait::async_trait;
    use std::str::FromStr;

    struct Fixture {
        store: MemoryStore,
        service: InvoiceService,
        team: Team,
        client: Client,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let team = store.add_team("Atlas Studio", None).unwrap();
        let client = store
            .add_client(team.id, "Riad Consulting", None, None, None)
            .unwrap();
        let service = InvoiceService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            "does-not-exist",
        );
        Fixture {
            store,
            service,
            team,
            client,
        }
    }

    fn create_req(client_id: i64, amount: &str, due_date: Option<NaiveDate>) -> CreateInvoice {
        CreateInvoice {
            client_id,
            status: None,
            amount: Decimal::from_str(amount).unwrap(),
            currency: None,
            due_date,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let f = fixture();
        let created = f
            .service
            .create(&f.team, create_req(f.client.id, "99.90", None))
            .await
            .unwrap();

        assert_eq!(created.number, "1");
        let invoice = f.service.get(&f.team, created.id).await.unwrap();
        assert_eq!(invoice.status, "unpaid");
        assert_eq!(invoice.currency, "MAD");
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_client() {
        let f = fixture();
        let other = f.store.add_team("Other", None).unwrap();
        let foreign = f.store.add_client(other.id, "Elsewhere", None, None, None).unwrap();

        let err = f
            .service
            .create(&f.team, create_req(foreign.id, "10", None))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidReference(_)));
        assert_eq!(f.store.invoice_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_negative_amount() {
        let f = fixture();
        let err = f
            .service
            .create(&f.team, create_req(f.client.id, "-1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_numbers_continue_after_delete() {
        let f = fixture();
        for _ in 0..3 {
            f.service
                .create(&f.team, create_req(f.client.id, "1", None))
                .await
                .unwrap();
        }
        let invoices = f.service.list(&f.team, None).await.unwrap();
        f.service.delete(&f.team, invoices[1].id).await.unwrap();

        let next = f
            .service
            .create(&f.team, create_req(f.client.id, "1", None))
            .await
            .unwrap();
        assert_eq!(next.number, "4");
    }

    #[tokio::test]
    async fn test_list_marks_and_persists_overdue() {
        let f = fixture();
        let today = date(2024, 5, 10);
        let late = f
            .service
            .create(&f.team, create_req(f.client.id, "10", Some(date(2024, 5, 9))))
            .await
            .unwrap();
        f.service
            .create(&f.team, create_req(f.client.id, "10", Some(today)))
            .await
            .unwrap();

        let overdue = f
            .service
            .list_as_of(&f.team, Some("overdue"), today)
            .await
            .unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late.id);

        let stored = f.service.get(&f.team, late.id).await.unwrap();
        assert_eq!(stored.status, "overdue");

        let again = f.service.list_as_of(&f.team, None, today).await.unwrap();
        let statuses: Vec<_> = again.iter().map(|i| i.status.as_str()).collect();
        assert_eq!(statuses, vec!["overdue", "unpaid"]);
    }

    /// Delegates to a [`MemoryStore`], marking every listed invoice paid
    /// right after the list is read, the way a concurrent status change
    /// would.
    struct PaidAfterListStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl InvoiceStore for PaidAfterListStore {
        async fn list_invoices(&self, team_id: i64) -> StoreResult<Vec<Invoice>> {
            let snapshot = self.inner.list_invoices(team_id).await?;
            for invoice in &snapshot {
                self.inner.set_status(team_id, invoice.id, "paid").await?;
            }
            Ok(snapshot)
        }

        async fn find_invoice(&self, team_id: i64, invoice_id: i64) -> StoreResult<Option<Invoice>> {
            self.inner.find_invoice(team_id, invoice_id).await
        }

        async fn highest_number(&self, team_id: i64) -> StoreResult<Option<String>> {
            self.inner.highest_number(team_id).await
        }

        async fn insert_invoice(&self, invoice: NewInvoice) -> StoreResult<Invoice> {
            self.inner.insert_invoice(invoice).await
        }

        async fn update_invoice(
            &self,
            team_id: i64,
            invoice_id: i64,
            changes: &InvoiceChanges,
        ) -> StoreResult<Option<Invoice>> {
            self.inner.update_invoice(team_id, invoice_id, changes).await
        }

        async fn set_status(&self, team_id: i64, invoice_id: i64, status: &str) -> StoreResult<bool> {
            self.inner.set_status(team_id, invoice_id, status).await
        }

        async fn mark_overdue(&self, team_id: i64, invoice_id: i64) -> StoreResult<bool> {
            self.inner.mark_overdue(team_id, invoice_id).await
        }

        async fn delete_invoice(&self, team_id: i64, invoice_id: i64) -> StoreResult<bool> {
            self.inner.delete_invoice(team_id, invoice_id).await
        }
    }

    #[tokio::test]
    async fn test_list_keeps_status_paid_concurrently() {
        let f = fixture();
        let today = date(2024, 5, 10);
        let created = f
            .service
            .create(&f.team, create_req(f.client.id, "10", Some(date(2024, 5, 1))))
            .await
            .unwrap();

        let service = InvoiceService::new(
            Arc::new(PaidAfterListStore {
                inner: f.store.clone(),
            }),
            Arc::new(f.store.clone()),
            "does-not-exist",
        );
        let listed = service.list_as_of(&f.team, None, today).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, "paid");
        let stored = f.service.get(&f.team, created.id).await.unwrap();
        assert_eq!(stored.status, "paid");
    }

    #[tokio::test]
    async fn test_empty_status_filter_lists_everything() {
        let f = fixture();
        for _ in 0..2 {
            f.service
                .create(&f.team, create_req(f.client.id, "10", None))
                .await
                .unwrap();
        }

        let all = f.service.list(&f.team, Some("")).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(f.service.list(&f.team, Some("paid")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_omitted_fields_and_clears_due_date() {
        let f = fixture();
        let created = f
            .service
            .create(&f.team, create_req(f.client.id, "10", Some(date(2024, 1, 1))))
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                &f.team,
                created.id,
                InvoiceChanges {
                    status: Some("draft".to_string()),
                    due_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, "draft");
        assert_eq!(updated.due_date, None);
        assert_eq!(updated.amount, Decimal::from(10));
        assert_eq!(updated.currency, "MAD");
    }

    #[tokio::test]
    async fn test_update_missing_invoice_is_not_found_before_client_check() {
        let f = fixture();
        let err = f
            .service
            .update(
                &f.team,
                999,
                InvoiceChanges {
                    client_id: Some(12345),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_change_status_validation() {
        let f = fixture();
        let created = f
            .service
            .create(&f.team, create_req(f.client.id, "10", None))
            .await
            .unwrap();

        let err = f
            .service
            .change_status(&f.team, created.id, "shipped")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let status = f
            .service
            .change_status(&f.team, created.id, "paid")
            .await
            .unwrap();
        assert_eq!(status, InvoiceStatus::Paid);
        assert_eq!(f.service.get(&f.team, created.id).await.unwrap().status, "paid");
    }

    #[tokio::test]
    async fn test_other_team_cannot_reach_invoice() {
        let f = fixture();
        let created = f
            .service
            .create(&f.team, create_req(f.client.id, "10", None))
            .await
            .unwrap();
        let intruder = f.store.add_team("Intruder", None).unwrap();

        assert!(matches!(
            f.service.get(&intruder, created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.delete(&intruder, created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.change_status(&intruder, created.id, "paid").await,
            Err(AppError::NotFound(_))
        ));
        assert!(f.service.get(&f.team, created.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_export_pdf_without_logo_file() {
        let f = fixture();
        f.store
            .set_team_logo(f.team.id, Some("/api/teams/logo/missing.png"))
            .unwrap();
        let team = Team {
            logo_url: Some("/api/teams/logo/missing.png".to_string()),
            ..f.team.clone()
        };
        let created = f
            .service
            .create(&team, create_req(f.client.id, "1234.5", None))
            .await
            .unwrap();

        let doc = f.service.export_pdf(&team, created.id).await.unwrap();
        assert_eq!(doc.filename, "invoice_1.pdf");
        assert_eq!(doc.content_type, "application/pdf");
        assert!(doc.bytes.starts_with(b"%PDF-"));
    }
}
