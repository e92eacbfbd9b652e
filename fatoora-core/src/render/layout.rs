//! Typed layout of the invoice page.
//!
//! [`build_invoice_page`] decides what appears where; the PDF writer only
//! draws the resulting elements. Coordinates are in points with the origin
//! at the top-left corner of the page and `y` growing downwards. For text
//! `y` is the baseline.

use chrono::NaiveDateTime;

use super::format::{format_date, format_timestamp, format_total, title_case};
use super::logo::LogoImage;
use super::metrics::text_width;
use crate::models::{Client, Invoice, InvoiceStatus, Team};

/// A4 portrait.
pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 36.0;

pub const TAGLINE: &str = "Professional Invoice Management";
pub const THANK_YOU: &str = "Thank you for your business!";

const HEADER_HEIGHT: f32 = 140.0;
const LOGO_BOX: f32 = 64.0;
const RIGHT_EDGE: f32 = PAGE_WIDTH - MARGIN;
const RIGHT_COLUMN: f32 = 320.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

const WHITE: Color = Color(255, 255, 255);
const PRIMARY: Color = Color(37, 99, 235);
const PRIMARY_DARK: Color = Color(30, 64, 175);
const PRIMARY_LIGHT: Color = Color(219, 234, 254);
const SURFACE: Color = Color(239, 246, 255);
const INK: Color = Color(17, 24, 39);
const BODY: Color = Color(55, 65, 81);
const MUTED: Color = Color(107, 114, 128);
const RULE: Color = Color(229, 231, 235);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Color,
    },
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: Font,
        color: Color,
        text: String,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: LogoImage,
    },
}

/// Visual variant of the payment status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeVariant {
    Paid,
    Unpaid,
    Overdue,
    /// Any status outside the known three.
    Neutral,
}

impl BadgeVariant {
    pub fn for_status(status: &str) -> Self {
        match status.parse::<InvoiceStatus>() {
            Ok(InvoiceStatus::Paid) => BadgeVariant::Paid,
            Ok(InvoiceStatus::Unpaid) => BadgeVariant::Unpaid,
            Ok(InvoiceStatus::Overdue) => BadgeVariant::Overdue,
            Err(_) => BadgeVariant::Neutral,
        }
    }

    /// Background and text colors.
    fn colors(self) -> (Color, Color) {
        match self {
            BadgeVariant::Paid => (Color(220, 252, 231), Color(22, 101, 52)),
            BadgeVariant::Unpaid => (Color(254, 243, 199), Color(146, 64, 14)),
            BadgeVariant::Overdue => (Color(254, 226, 226), Color(153, 27, 27)),
            BadgeVariant::Neutral => (Color(243, 244, 246), BODY),
        }
    }
}

/// A single laid-out page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub width: f32,
    pub height: f32,
    pub elements: Vec<Element>,
}

impl Page {
    fn new() -> Self {
        Self {
            width: PAGE_WIDTH,
            height: PAGE_HEIGHT,
            elements: Vec::new(),
        }
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Color) {
        self.elements.push(Element::Rect {
            x,
            y,
            width,
            height,
            fill,
        });
    }

    fn text(&mut self, x: f32, y: f32, size: f32, font: Font, color: Color, text: impl Into<String>) {
        self.elements.push(Element::Text {
            x,
            y,
            size,
            font,
            color,
            text: text.into(),
        });
    }

    fn text_right(&mut self, right: f32, y: f32, size: f32, font: Font, color: Color, text: &str) {
        let x = right - text_width(text, font, size);
        self.text(x, y, size, font, color, text);
    }

    fn text_centered(&mut self, y: f32, size: f32, font: Font, color: Color, text: &str) {
        let x = (PAGE_WIDTH - text_width(text, font, size)) / 2.0;
        self.text(x, y, size, font, color, text);
    }
}

#[cfg(test)]
impl Page {
    /// Text runs in drawing order.
    fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|el| match el {
            Element::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    fn has_text(&self, needle: &str) -> bool {
        self.texts().any(|text| text == needle)
    }

    fn has_image(&self) -> bool {
        self.elements
            .iter()
            .any(|el| matches!(el, Element::Image { .. }))
    }
}

/// Lays out the invoice page.
///
/// # Arguments
///
/// * `logo` - Decoded team logo; a placeholder tile with the team's
///   initial is drawn when absent
/// * `generated_at` - Timestamp printed in the footer
pub fn build_invoice_page(
    invoice: &Invoice,
    client: &Client,
    team: &Team,
    logo: Option<&LogoImage>,
    generated_at: NaiveDateTime,
) -> Page {
    let mut page = Page::new();

    header(&mut page, invoice, team, logo);
    client_block(&mut page, client);
    details(&mut page, invoice);
    total(&mut page, invoice);
    footer(&mut page, team, generated_at);

    page
}

fn header(page: &mut Page, invoice: &Invoice, team: &Team, logo: Option<&LogoImage>) {
    page.rect(0.0, 0.0, PAGE_WIDTH, HEADER_HEIGHT, PRIMARY);

    let logo_y = 38.0;
    match logo {
        Some(image) => {
            let (width, height) = image.fit(LOGO_BOX);
            page.elements.push(Element::Image {
                x: MARGIN + (LOGO_BOX - width) / 2.0,
                y: logo_y + (LOGO_BOX - height) / 2.0,
                width,
                height,
                image: image.clone(),
            });
        }
        None => {
            page.rect(MARGIN, logo_y, LOGO_BOX, LOGO_BOX, WHITE);
            let initial = team_initial(&team.name);
            let width = text_width(&initial, Font::Bold, 32.0);
            page.text(
                MARGIN + (LOGO_BOX - width) / 2.0,
                logo_y + 44.0,
                32.0,
                Font::Bold,
                PRIMARY,
                initial,
            );
        }
    }

    let name_x = MARGIN + LOGO_BOX + 14.0;
    page.text(name_x, 66.0, 20.0, Font::Bold, WHITE, team.name.as_str());
    page.text(name_x, 86.0, 11.0, Font::Regular, PRIMARY_LIGHT, TAGLINE);

    page.text_right(RIGHT_EDGE, 66.0, 28.0, Font::Bold, WHITE, "INVOICE");
    page.text_right(
        RIGHT_EDGE,
        90.0,
        14.0,
        Font::Regular,
        PRIMARY_LIGHT,
        &format!("#{}", invoice.number),
    );
}

fn client_block(page: &mut Page, client: &Client) {
    page.text(MARGIN, 176.0, 10.0, Font::Bold, MUTED, "BILL TO");
    page.text(MARGIN, 196.0, 14.0, Font::Bold, INK, client.name.as_str());

    let optional = [
        ("Phone", &client.phone),
        ("ICE Number", &client.ice),
        ("IF Number", &client.if_number),
    ];
    let mut y = 196.0;
    for (label, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            y += 16.0;
            page.text(MARGIN, y, 11.0, Font::Regular, BODY, format!("{}: {}", label, value));
        }
    }

    page.rect(MARGIN, 266.0, PAGE_WIDTH - 2.0 * MARGIN, 1.0, RULE);
}

fn details(page: &mut Page, invoice: &Invoice) {
    let value_x = MARGIN + 104.0;

    page.text(MARGIN, 294.0, 10.0, Font::Bold, MUTED, "INVOICE DETAILS");
    let issue_date = invoice
        .created_at
        .map(|at| format_date(at.date_naive()))
        .unwrap_or_else(|| "N/A".to_string());
    let mut rows = vec![
        ("Invoice Number", format!("#{}", invoice.number)),
        ("Issue Date", issue_date),
    ];
    if let Some(due) = invoice.due_date {
        rows.push(("Due Date", format_date(due)));
    }
    let mut y = 316.0;
    for (label, value) in rows {
        page.text(MARGIN, y, 10.0, Font::Regular, MUTED, label);
        page.text(value_x, y, 11.0, Font::Bold, INK, value);
        y += 18.0;
    }

    page.text(RIGHT_COLUMN, 294.0, 10.0, Font::Bold, MUTED, "PAYMENT STATUS");
    let label = title_case(&invoice.status);
    let (background, foreground) = BadgeVariant::for_status(&invoice.status).colors();
    let badge_width = text_width(&label, Font::Bold, 10.0) + 24.0;
    page.rect(RIGHT_COLUMN, 304.0, badge_width, 20.0, background);
    page.text(RIGHT_COLUMN + 12.0, 318.0, 10.0, Font::Bold, foreground, label);

    page.text(RIGHT_COLUMN, 352.0, 10.0, Font::Regular, MUTED, "Currency");
    page.text(
        RIGHT_COLUMN + 100.0,
        352.0,
        11.0,
        Font::Bold,
        INK,
        invoice.currency.as_str(),
    );
}

fn total(page: &mut Page, invoice: &Invoice) {
    let top = 386.0;
    page.rect(MARGIN, top, PAGE_WIDTH - 2.0 * MARGIN, 84.0, SURFACE);
    page.rect(MARGIN, top, 4.0, 84.0, PRIMARY);
    page.text(MARGIN + 20.0, top + 30.0, 12.0, Font::Regular, MUTED, "Total Amount");
    page.text(
        MARGIN + 20.0,
        top + 64.0,
        24.0,
        Font::Bold,
        PRIMARY_DARK,
        format_total(invoice.amount, &invoice.currency),
    );
}

fn footer(page: &mut Page, team: &Team, generated_at: NaiveDateTime) {
    page.rect(MARGIN, 740.0, PAGE_WIDTH - 2.0 * MARGIN, 1.0, RULE);
    page.text_centered(764.0, 12.0, Font::Bold, INK, THANK_YOU);
    page.text_centered(
        782.0,
        9.0,
        Font::Regular,
        MUTED,
        &format!("This invoice was generated by {} using Fatoora.", team.name),
    );
    page.text_centered(
        796.0,
        9.0,
        Font::Regular,
        MUTED,
        &format!("Generated on {}", format_timestamp(generated_at)),
    );
}

fn team_initial(name: &str) -> String {
    name.trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn invoice(status: &str, due_date: Option<NaiveDate>) -> Invoice {
        Invoice {
            id: 7,
            team_id: 1,
            client_id: 2,
            number: "42".to_string(),
            status: status.to_string(),
            amount: Decimal::new(123450, 2),
            currency: "USD".to_string(),
            due_date,
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap()),
        }
    }

    fn client(phone: Option<&str>, ice: Option<&str>) -> Client {
        Client {
            id: 2,
            team_id: 1,
            name: "Riad Consulting".to_string(),
            phone: phone.map(str::to_string),
            ice: ice.map(str::to_string),
            if_number: None,
        }
    }

    fn team() -> Team {
        Team {
            id: 1,
            name: "atlas Studio".to_string(),
            owner_id: Some(1),
            logo_url: None,
        }
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 6)
            .unwrap()
            .and_hms_opt(16, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_page_contains_fixed_sections() {
        let page = build_invoice_page(&invoice("unpaid", None), &client(None, None), &team(), None, generated_at());

        for text in [
            "atlas Studio",
            TAGLINE,
            "INVOICE",
            "#42",
            "Riad Consulting",
            "Issue Date",
            "March 05, 2024",
            "Unpaid",
            "USD",
            "Total Amount",
            "1,234.50 USD",
            THANK_YOU,
            "This invoice was generated by atlas Studio using Fatoora.",
            "Generated on March 06, 2024 at 04:05 PM",
        ] {
            assert!(page.has_text(text), "missing {:?}", text);
        }
    }

    #[test]
    fn test_optional_client_fields_only_when_present() {
        let page = build_invoice_page(
            &invoice("paid", None),
            &client(Some("+212 600 000 000"), Some("  ")),
            &team(),
            None,
            generated_at(),
        );

        assert!(page.has_text("Phone: +212 600 000 000"));
        assert!(!page.texts().any(|t| t.starts_with("ICE Number")));
        assert!(!page.texts().any(|t| t.starts_with("IF Number")));
    }

    #[test]
    fn test_due_date_row_only_when_present() {
        let without = build_invoice_page(&invoice("unpaid", None), &client(None, None), &team(), None, generated_at());
        assert!(!without.has_text("Due Date"));

        let due = NaiveDate::from_ymd_opt(2024, 4, 1);
        let with = build_invoice_page(&invoice("unpaid", due), &client(None, None), &team(), None, generated_at());
        assert!(with.has_text("Due Date"));
        assert!(with.has_text("April 01, 2024"));
    }

    #[test]
    fn test_missing_issue_date_renders_na() {
        let mut inv = invoice("unpaid", None);
        inv.created_at = None;
        let page = build_invoice_page(&inv, &client(None, None), &team(), None, generated_at());
        assert!(page.has_text("N/A"));
    }

    #[test]
    fn test_badge_variants() {
        assert_eq!(BadgeVariant::for_status("paid"), BadgeVariant::Paid);
        assert_eq!(BadgeVariant::for_status("unpaid"), BadgeVariant::Unpaid);
        assert_eq!(BadgeVariant::for_status("overdue"), BadgeVariant::Overdue);
        assert_eq!(BadgeVariant::for_status("in review"), BadgeVariant::Neutral);

        let page = build_invoice_page(&invoice("in review", None), &client(None, None), &team(), None, generated_at());
        assert!(page.has_text("In Review"));
    }

    #[test]
    fn test_logo_replaces_placeholder() {
        let placeholder = build_invoice_page(&invoice("paid", None), &client(None, None), &team(), None, generated_at());
        assert!(!placeholder.has_image());
        assert!(placeholder.has_text("A"));

        let logo = LogoImage {
            width: 2,
            height: 1,
            rgb: vec![0; 6],
        };
        let branded = build_invoice_page(&invoice("paid", None), &client(None, None), &team(), Some(&logo), generated_at());
        assert!(branded.has_image());
        assert!(!branded.has_text("A"));
    }
}
