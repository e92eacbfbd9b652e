//! Deterministic single-page PDF rendering of an invoice.
//!
//! Rendering is a pure function of the invoice, its client and team, the
//! optional logo file and the footer timestamp. Nothing is fetched over the
//! network; the logo is read from a local path resolved by the caller.

use chrono::{Local, NaiveDateTime};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::models::{Client, Invoice, Team};

pub mod format;
pub mod layout;
pub mod logo;
pub mod metrics;
pub mod pdf;

pub use layout::{build_invoice_page, Page};
pub use logo::LogoImage;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{0}")]
    Pdf(String),
}

/// Renders `invoice` to PDF bytes.
///
/// A logo that cannot be decoded is logged and replaced by the
/// placeholder tile rather than failing the export.
///
/// # Arguments
///
/// * `logo` - Local path of the team logo, already checked to exist
/// * `generated_at` - Local time printed in the footer
pub fn render(
    invoice: &Invoice,
    client: &Client,
    team: &Team,
    logo: Option<&Path>,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, RenderError> {
    let logo = logo.and_then(|path| match LogoImage::load(path) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!(team_id = team.id, path = %path.display(), "Ignoring unreadable logo: {}", e);
            None
        }
    });

    let page = build_invoice_page(invoice, client, team, logo.as_ref(), generated_at);
    pdf::write_page(&page, &format!("Invoice #{}", invoice.number))
}

/// [`render`] stamped with the current local time.
pub fn render_now(
    invoice: &Invoice,
    client: &Client,
    team: &Team,
    logo: Option<&Path>,
) -> Result<Vec<u8>, RenderError> {
    render(invoice, client, team, logo, Local::now().naive_local())
}
