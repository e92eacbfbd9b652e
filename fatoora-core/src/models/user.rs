use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User model representing a row of the `users` table.
///
/// Users are never created directly by the API; they are provisioned the
/// first time a verified identity makes a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,

    /// Subject of the identity provider token (unique)
    pub external_id: Option<String>,

    /// User's email address (unique)
    pub email: String,

    /// Display name from the identity provider
    pub name: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name used when labelling things on the user's behalf: the display
    /// name when it is set, otherwise the email address.
    pub fn display_label(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }
}

/// Values for a user row created during provisioning.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
}
