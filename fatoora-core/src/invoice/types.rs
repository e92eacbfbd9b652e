use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::models::InvoiceChanges;

/// Query string of the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Exact status to keep, applied after the overdue check
    pub status: Option<String>,
}

/// Invoice creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoice {
    #[serde(alias = "clientId")]
    pub client_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, alias = "dueDate", deserialize_with = "optional_date")]
    pub due_date: Option<NaiveDate>,
}

/// Invoice update request. Omitted fields are left unchanged; an explicit
/// `null` (or empty string) for `due_date` clears it. An invoice always has
/// a client, so an explicit `null` for `client_id` is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInvoice {
    #[serde(default, alias = "clientId", deserialize_with = "present")]
    pub client_id: Option<Option<i64>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, alias = "dueDate", deserialize_with = "present_date")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl TryFrom<UpdateInvoice> for InvoiceChanges {
    type Error = AppError;

    fn try_from(req: UpdateInvoice) -> Result<Self, Self::Error> {
        let client_id = match req.client_id {
            Some(None) => {
                return Err(AppError::InvalidReference(
                    "client_id must reference a client of this team".to_string(),
                ))
            }
            Some(Some(id)) => Some(id),
            None => None,
        };

        Ok(InvoiceChanges {
            client_id,
            status: req.status,
            amount: req.amount,
            currency: req.currency,
            due_date: req.due_date,
        })
    }
}

/// Status change request.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

/// Response of a successful create.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedInvoice {
    pub id: i64,
    pub number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChangeResponse {
    pub success: bool,
    pub status: String,
}

/// Parses an ISO-8601 date or datetime, keeping only the date.
///
/// Accepts `2024-05-01`, `2024-05-01T10:30:00` (optionally with fractional
/// seconds) and RFC 3339 timestamps with an offset.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

fn parse_nullable_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_iso_date(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 date: {}", s))),
    }
}

fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_nullable_date(deserializer)
}

/// Only invoked when the field is present, so `Some(None)` is an explicit
/// `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Only invoked when the field is present, so `Some(None)` means "clear".
fn present_date<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_nullable_date(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_create_defaults_and_aliases() {
        let req: CreateInvoice = serde_json::from_value(json!({
            "clientId": 4,
            "amount": 1234.5,
            "dueDate": "2024-06-30"
        }))
        .unwrap();

        assert_eq!(req.client_id, 4);
        assert_eq!(req.amount, Decimal::from_str("1234.5").unwrap());
        assert_eq!(req.currency, None);
        assert_eq!(req.status, None);
        assert_eq!(req.due_date, NaiveDate::from_ymd_opt(2024, 6, 30));
    }

    #[test]
    fn test_create_requires_amount() {
        let result = serde_json::from_value::<CreateInvoice>(json!({ "client_id": 4 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_accepts_datetime_due_date() {
        let req: CreateInvoice = serde_json::from_value(json!({
            "client_id": 4,
            "amount": 10,
            "due_date": "2024-06-30T18:45:00"
        }))
        .unwrap();
        assert_eq!(req.due_date, NaiveDate::from_ymd_opt(2024, 6, 30));
    }

    #[test]
    fn test_update_distinguishes_absent_and_null_due_date() {
        let absent: UpdateInvoice = serde_json::from_value(json!({ "amount": 5 })).unwrap();
        assert_eq!(absent.due_date, None);

        let cleared: UpdateInvoice = serde_json::from_value(json!({ "due_date": null })).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let emptied: UpdateInvoice = serde_json::from_value(json!({ "due_date": "" })).unwrap();
        assert_eq!(emptied.due_date, Some(None));

        let set: UpdateInvoice =
            serde_json::from_value(json!({ "due_date": "2025-01-31" })).unwrap();
        assert_eq!(set.due_date, Some(NaiveDate::from_ymd_opt(2025, 1, 31)));
    }

    #[test]
    fn test_update_rejects_null_client() {
        let absent: UpdateInvoice = serde_json::from_value(json!({ "amount": 5 })).unwrap();
        let changes = InvoiceChanges::try_from(absent).unwrap();
        assert_eq!(changes.client_id, None);

        let moved: UpdateInvoice = serde_json::from_value(json!({ "clientId": 9 })).unwrap();
        assert_eq!(InvoiceChanges::try_from(moved).unwrap().client_id, Some(9));

        let nulled: UpdateInvoice = serde_json::from_value(json!({ "client_id": null })).unwrap();
        assert_eq!(nulled.client_id, Some(None));
        assert!(matches!(
            InvoiceChanges::try_from(nulled),
            Err(AppError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_date() {
        let result = serde_json::from_value::<UpdateInvoice>(json!({ "due_date": "31/01/2025" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_iso_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29);
        assert_eq!(parse_iso_date("2024-02-29"), expected);
        assert_eq!(parse_iso_date("2024-02-29T23:59:59.123"), expected);
        assert_eq!(parse_iso_date("2024-02-29 08:00:00"), expected);
        assert_eq!(parse_iso_date("2024-02-29T08:00:00+01:00"), expected);
        assert_eq!(parse_iso_date("yesterday"), None);
    }
}
