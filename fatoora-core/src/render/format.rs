//! Text formatting used on rendered invoices. Output is locale independent.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};

/// Formats an amount with `,` thousands separators and exactly two
/// decimals, rounding half away from zero: `1234.5` -> `"1,234.50"`.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);

    let text = rounded.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits = int_part.as_bytes();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit as char);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Amount followed by the currency code as plain text.
pub fn format_total(amount: Decimal, currency: &str) -> String {
    format!("{} {}", format_amount(amount), currency)
}

/// Capitalizes the first letter of every word and lowercases the rest.
/// A word starts after any character that is not a letter, so
/// `"past-due"` becomes `"Past-Due"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// `March 05, 2024`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// `March 05, 2024 at 02:30 PM`
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%B %d, %Y at %I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_amount_grouping() {
        assert_eq!(format_amount(dec("1234.5")), "1,234.50");
        assert_eq!(format_amount(dec("0")), "0.00");
        assert_eq!(format_amount(dec("999")), "999.00");
        assert_eq!(format_amount(dec("1000")), "1,000.00");
        assert_eq!(format_amount(dec("1234567.891")), "1,234,567.89");
    }

    #[test]
    fn test_format_amount_rounds_half_away_from_zero() {
        assert_eq!(format_amount(dec("2.345")), "2.35");
        assert_eq!(format_amount(dec("2.344")), "2.34");
        assert_eq!(format_amount(dec("999.995")), "1,000.00");
    }

    #[test]
    fn test_format_total_appends_currency() {
        assert_eq!(format_total(dec("1234.5"), "USD"), "1,234.50 USD");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("unpaid"), "Unpaid");
        assert_eq!(title_case("PAID"), "Paid");
        assert_eq!(title_case("partially paid"), "Partially Paid");
        assert_eq!(title_case("past-due"), "Past-Due");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_date_formats() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(format_date(date), "March 05, 2024");

        let at = date.and_hms_opt(14, 30, 0).unwrap();
        assert_eq!(format_timestamp(at), "March 05, 2024 at 02:30 PM");
    }
}
