//! In-memory store for tests and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ClientStore, IdentityStore, InvoiceStore, StoreError, StoreResult};
use crate::invoice::numbering::numeric_value;
use crate::models::team::OWNER_ROLE;
use crate::models::{
    Client, Invoice, InvoiceChanges, InvoiceStatus, Membership, NewInvoice, NewUser, Team, User,
};

#[derive(Default)]
struct Tables {
    invoices: BTreeMap<i64, Invoice>,
    clients: BTreeMap<i64, Client>,
    teams: BTreeMap<i64, Team>,
    users: BTreeMap<i64, User>,
    memberships: BTreeMap<i64, Membership>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Thread-safe store keeping every table in `BTreeMap`s behind one lock.
///
/// Identifiers come from a single increasing sequence, so ordering by id
/// matches insertion order just like `BIGSERIAL` columns.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire write lock: {}", e)))
    }

    /// Adds a team with no owner or members.
    pub fn add_team(&self, name: &str, logo_url: Option<&str>) -> StoreResult<Team> {
        let mut tables = self.write()?;
        let team = Team {
            id: tables.next_id(),
            name: name.to_string(),
            owner_id: None,
            logo_url: logo_url.map(str::to_string),
        };
        tables.teams.insert(team.id, team.clone());
        Ok(team)
    }

    /// Adds a client owned by `team_id`.
    pub fn add_client(
        &self,
        team_id: i64,
        name: &str,
        phone: Option<&str>,
        ice: Option<&str>,
        if_number: Option<&str>,
    ) -> StoreResult<Client> {
        let mut tables = self.write()?;
        let client = Client {
            id: tables.next_id(),
            team_id,
            name: name.to_string(),
            phone: phone.map(str::to_string),
            ice: ice.map(str::to_string),
            if_number: if_number.map(str::to_string),
        };
        tables.clients.insert(client.id, client.clone());
        Ok(client)
    }

    /// Sets a team's logo URL.
    pub fn set_team_logo(&self, team_id: i64, logo_url: Option<&str>) -> StoreResult<()> {
        let mut tables = self.write()?;
        if let Some(team) = tables.teams.get_mut(&team_id) {
            team.logo_url = logo_url.map(str::to_string);
        }
        Ok(())
    }

    /// Number of memberships held by a user.
    pub fn membership_count(&self, user_id: i64) -> StoreResult<usize> {
        Ok(self
            .read()?
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .count())
    }

    /// Number of invoices across all teams.
    pub fn invoice_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.invoices.len())
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn list_invoices(&self, team_id: i64) -> StoreResult<Vec<Invoice>> {
        Ok(self
            .read()?
            .invoices
            .values()
            .filter(|inv| inv.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn find_invoice(&self, team_id: i64, invoice_id: i64) -> StoreResult<Option<Invoice>> {
        Ok(self
            .read()?
            .invoices
            .get(&invoice_id)
            .filter(|inv| inv.team_id == team_id)
            .cloned())
    }

    async fn highest_number(&self, team_id: i64) -> StoreResult<Option<String>> {
        Ok(self
            .read()?
            .invoices
            .values()
            .filter(|inv| inv.team_id == team_id)
            .filter_map(|inv| numeric_value(&inv.number).map(|n| (n, inv.id, &inv.number)))
            .max_by_key(|(n, id, _)| (*n, *id))
            .map(|(_, _, number)| number.clone()))
    }

    async fn insert_invoice(&self, invoice: NewInvoice) -> StoreResult<Invoice> {
        let mut tables = self.write()?;

        let taken = tables
            .invoices
            .values()
            .any(|inv| inv.team_id == invoice.team_id && inv.number == invoice.number);
        if taken {
            return Err(StoreError::Conflict(format!(
                "Invoice number {} already exists for team {}",
                invoice.number, invoice.team_id
            )));
        }

        let row = Invoice {
            id: tables.next_id(),
            team_id: invoice.team_id,
            client_id: invoice.client_id,
            number: invoice.number,
            status: invoice.status,
            amount: invoice.amount,
            currency: invoice.currency,
            due_date: invoice.due_date,
            created_at: Some(Utc::now()),
        };
        tables.invoices.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_invoice(
        &self,
        team_id: i64,
        invoice_id: i64,
        changes: &InvoiceChanges,
    ) -> StoreResult<Option<Invoice>> {
        let mut tables = self.write()?;
        Ok(tables
            .invoices
            .get_mut(&invoice_id)
            .filter(|inv| inv.team_id == team_id)
            .map(|inv| {
                changes.apply_to(inv);
                inv.clone()
            }))
    }

    async fn set_status(&self, team_id: i64, invoice_id: i64, status: &str) -> StoreResult<bool> {
        let mut tables = self.write()?;
        match tables
            .invoices
            .get_mut(&invoice_id)
            .filter(|inv| inv.team_id == team_id)
        {
            Some(inv) => {
                inv.status = status.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_overdue(&self, team_id: i64, invoice_id: i64) -> StoreResult<bool> {
        let mut tables = self.write()?;
        match tables.invoices.get_mut(&invoice_id).filter(|inv| {
            inv.team_id == team_id && inv.status == InvoiceStatus::Unpaid.as_str()
        }) {
            Some(inv) => {
                inv.status = InvoiceStatus::Overdue.as_str().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_invoice(&self, team_id: i64, invoice_id: i64) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let owned = tables
            .invoices
            .get(&invoice_id)
            .is_some_and(|inv| inv.team_id == team_id);
        if owned {
            tables.invoices.remove(&invoice_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn find_client(&self, team_id: i64, client_id: i64) -> StoreResult<Option<Client>> {
        Ok(self
            .read()?
            .clients
            .get(&client_id)
            .filter(|c| c.team_id == team_id)
            .cloned())
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn link_external_id(
        &self,
        user_id: i64,
        external_id: &str,
        name: Option<&str>,
    ) -> StoreResult<User> {
        let mut tables = self.write()?;

        let claimed = tables
            .users
            .values()
            .any(|u| u.id != user_id && u.external_id.as_deref() == Some(external_id));
        if claimed {
            return Err(StoreError::Conflict(format!(
                "External id {} is linked to another user",
                external_id
            )));
        }

        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::Backend(format!("User {} vanished", user_id)))?;
        user.external_id = Some(external_id.to_string());
        if let Some(name) = name {
            user.name = Some(name.to_string());
        }
        Ok(user.clone())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.write()?;

        let duplicate = tables.users.values().any(|u| {
            u.email == user.email || u.external_id.as_deref() == Some(user.external_id.as_str())
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "User {} already exists",
                user.email
            )));
        }

        let row = User {
            id: tables.next_id(),
            external_id: Some(user.external_id),
            email: user.email,
            name: user.name,
            created_at: Some(Utc::now()),
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn team_for_user(&self, user_id: i64) -> StoreResult<Option<Team>> {
        let tables = self.read()?;
        Ok(tables
            .memberships
            .values()
            .find(|m| m.user_id == user_id)
            .and_then(|m| tables.teams.get(&m.team_id))
            .cloned())
    }

    async fn create_owned_team(&self, owner_id: i64, name: &str) -> StoreResult<Team> {
        let mut tables = self.write()?;

        let team = Team {
            id: tables.next_id(),
            name: name.to_string(),
            owner_id: Some(owner_id),
            logo_url: None,
        };
        let membership = Membership {
            id: tables.next_id(),
            user_id: owner_id,
            team_id: team.id,
            role: OWNER_ROLE.to_string(),
        };
        tables.teams.insert(team.id, team.clone());
        tables.memberships.insert(membership.id, membership);
        Ok(team)
    }
}
