use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Client billed by a team's invoices.
///
/// Clients are managed elsewhere; the invoice subsystem only reads them to
/// check team ownership and to fill the client block of a rendered invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub team_id: i64,
    pub name: String,
    pub phone: Option<String>,

    /// Moroccan common company identifier (ICE)
    pub ice: Option<String>,

    /// Moroccan tax identifier (IF)
    pub if_number: Option<String>,
}
