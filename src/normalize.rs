//! Locale-tolerant parsing of monetary values and dates.
//!
//! Bank exports mix Brazilian (`1.234,56`) and international (`1,234.56`)
//! number formats and several date layouts. Parsing here never fails the
//! batch: a malformed field degrades to a safe default and the degradation is
//! reported through [`Lenient`] so callers can log or audit it.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

/// A parse that degraded to a default instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub raw: String,
    pub message: String,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (input: {:?})", self.message, self.raw)
    }
}

/// Outcome of a lenient parse: always a value, plus the warning when the
/// value is a substituted default rather than a real parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Lenient<T> {
    pub value: T,
    pub warning: Option<ParseWarning>,
}

impl<T> Lenient<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn defaulted(value: T, raw: &str, message: impl Into<String>) -> Self {
        Self {
            value,
            warning: Some(ParseWarning {
                raw: raw.to_string(),
                message: message.into(),
            }),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warning.is_none()
    }
}

const CURRENCY_SYMBOLS: &[char] = &['R', '$', '€', '£', '¥', '₹', '₪', '₽', '¢'];

/// Parses a monetary string into a [`Decimal`].
///
/// Mixed separators are resolved by position: whichever of `,`/`.` appears
/// later in the string is the decimal point. A lone `.` is a decimal point
/// only when followed by one or two digits and no other dot occurs; otherwise
/// dots are thousands grouping. Parenthesized values are negative. Malformed
/// input yields `0` with a warning, never an error.
pub fn parse_amount(raw: &str) -> Lenient<Decimal> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    if cleaned.is_empty() {
        return Lenient::clean(Decimal::ZERO);
    }

    let mut negative = false;
    if cleaned.starts_with('(') && cleaned.ends_with(')') {
        negative = true;
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');

    let normalized = match (last_comma, last_dot) {
        (Some(comma), dot) if dot.map_or(true, |d| comma > d) => {
            // Decimal comma: drop grouping separators, promote the final
            // comma to a decimal point.
            let without_dots: String = cleaned.chars().filter(|c| *c != '.').collect();
            let final_comma = without_dots.rfind(',').expect("comma present");
            without_dots
                .char_indices()
                .filter_map(|(i, c)| match c {
                    ',' if i == final_comma => Some('.'),
                    ',' => None,
                    other => Some(other),
                })
                .collect()
        }
        (Some(_), _) => cleaned.chars().filter(|c| *c != ',').collect(),
        (None, Some(dot)) => {
            let trailing = cleaned.len() - dot - 1;
            let dot_count = cleaned.matches('.').count();
            if dot_count == 1 && (1..=2).contains(&trailing) {
                cleaned.clone()
            } else {
                cleaned.chars().filter(|c| *c != '.').collect()
            }
        }
        (None, None) => cleaned.clone(),
    };

    match Decimal::from_str(&normalized) {
        Ok(value) => Lenient::clean(if negative { -value } else { value }),
        Err(_) => Lenient::defaulted(Decimal::ZERO, raw, "unparseable amount"),
    }
}

/// Parses a date string, trying `DD/MM/YYYY`, `YYYY-MM-DD`, `DD-MM-YYYY` and
/// `DD.MM.YYYY` in order, then a generic fallback set (two-digit years,
/// `YYYY/MM/DD`, ISO datetimes). Total failure yields `today` with a warning
/// so an import never aborts on a single bad row; callers record the
/// substitution on the transaction for the audit pass.
pub fn parse_date(raw: &str, today: NaiveDate) -> Lenient<NaiveDate> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Lenient::defaulted(today, raw, "empty date");
    }
    match try_parse_date(cleaned) {
        Some(date) => Lenient::clean(date),
        None => Lenient::defaulted(today, raw, "unrecognized date format"),
    }
}

fn try_parse_date(s: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];
    for fmt in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if plausible_year(date) {
                return Some(date);
            }
        }
    }

    if let Some(date) = parse_two_digit_year(s) {
        return Some(date);
    }

    // ISO datetimes: keep the calendar part.
    if s.len() > 10 && s.as_bytes()[10] == b'T' {
        if let Ok(date) = NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d") {
            if plausible_year(date) {
                return Some(date);
            }
        }
    }

    None
}

fn plausible_year(date: NaiveDate) -> bool {
    (1900..=2100).contains(&date.year())
}

/// `DD/MM/YY` with `/`, `-` or `.` separators; years below 50 land in the
/// 2000s, the rest in the 1900s.
fn parse_two_digit_year(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split(['/', '-', '.']).collect();
    if parts.len() != 3 {
        return None;
    }
    let day: u32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let year: i32 = parts[2].parse().ok()?;
    if parts[2].len() > 2 || year < 0 {
        return None;
    }
    let year = if year < 50 { 2000 + year } else { 1900 + year };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `YYYY-MM` aggregation key for a date.
pub fn month_bucket(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Formats a value the way Brazilian statements print it: `R$ 1.234,56`.
/// Round-trips through [`parse_amount`] for any two-decimal value.
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let negative = rounded.is_sign_negative();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let int_grouped: String = grouped.chars().rev().collect();

    let sign = if negative { "-" } else { "" };
    format!("{}R$ {},{}", sign, int_grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount(raw: &str) -> Decimal {
        parse_amount(raw).value
    }

    #[test]
    fn test_brazilian_format() {
        assert_eq!(amount("R$ 1.234,56"), dec!(1234.56));
        assert_eq!(amount("1.234.567,89"), dec!(1234567.89));
        assert_eq!(amount("89,90"), dec!(89.90));
    }

    #[test]
    fn test_international_format() {
        assert_eq!(amount("1,234,567.89"), dec!(1234567.89));
        assert_eq!(amount("1234.56"), dec!(1234.56));
    }

    #[test]
    fn test_dot_as_thousands_grouping() {
        assert_eq!(amount("1.234"), dec!(1234));
        assert_eq!(amount("1.234.567"), dec!(1234567));
        assert_eq!(amount("1.2345"), dec!(12345));
    }

    #[test]
    fn test_plain_and_empty() {
        assert_eq!(amount("1500"), dec!(1500));
        assert_eq!(amount(""), Decimal::ZERO);
        assert_eq!(amount("   "), Decimal::ZERO);
    }

    #[test]
    fn test_negative_markers() {
        assert_eq!(amount("-1.234,56"), dec!(-1234.56));
        assert_eq!(amount("(500,00)"), dec!(-500.00));
        assert!(amount("1.234,56") >= Decimal::ZERO);
    }

    #[test]
    fn test_malformed_defaults_to_zero_with_warning() {
        let parsed = parse_amount("abc");
        assert_eq!(parsed.value, Decimal::ZERO);
        assert!(!parsed.is_clean());

        let clean = parse_amount("42");
        assert!(clean.is_clean());
    }

    #[test]
    fn test_date_formats_agree() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(parse_date("31/12/2024", today).value, expected);
        assert_eq!(parse_date("2024-12-31", today).value, expected);
        assert_eq!(parse_date("31-12-2024", today).value, expected);
        assert_eq!(parse_date("31.12.2024", today).value, expected);
    }

    #[test]
    fn test_two_digit_year() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(
            parse_date("05/03/24", today).value,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(
            parse_date("05/03/99", today).value,
            NaiveDate::from_ymd_opt(1999, 3, 5).unwrap()
        );
    }

    #[test]
    fn test_iso_datetime_keeps_calendar_part() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(
            parse_date("2025-01-04T00:00:00.000Z", today).value,
            NaiveDate::from_ymd_opt(2025, 1, 4).unwrap()
        );
    }

    #[test]
    fn test_unparseable_date_falls_back_to_today() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let parsed = parse_date("not a date", today);
        assert_eq!(parsed.value, today);
        assert!(!parsed.is_clean());
    }

    #[test]
    fn test_month_bucket() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
        assert_eq!(month_bucket(date), "2025-01");
    }

    #[test]
    fn test_format_brl_round_trip() {
        for value in [dec!(0), dec!(0.5), dec!(1234.56), dec!(1234567.89)] {
            assert_eq!(amount(&format_brl(value)), value);
        }
        assert_eq!(format_brl(dec!(1234.56)), "R$ 1.234,56");
        assert_eq!(format_brl(dec!(-500)), "-R$ 500,00");
    }
}
