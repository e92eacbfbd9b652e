use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role given to the user who owns a team.
pub const OWNER_ROLE: &str = "owner";

/// Team model: the tenant boundary owning clients and invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub owner_id: Option<i64>,

    /// Public URL of the uploaded logo, e.g. `/api/teams/logo/team_1_logo.png`
    pub logo_url: Option<String>,
}

impl Team {
    /// File name of the uploaded logo: the last path segment of `logo_url`.
    pub fn logo_file_name(&self) -> Option<&str> {
        self.logo_url
            .as_deref()
            .and_then(|url| url.rsplit('/').next())
            .filter(|name| !name.is_empty())
    }
}

/// Join row linking a user to a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: i64,
    pub user_id: i64,
    pub team_id: i64,
    pub role: String,
}
