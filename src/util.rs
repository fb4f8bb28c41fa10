// Parsing and arithmetic helpers.
//
// All the "dirty" cell handling lives here so the normalizer can work with
// typed values only.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

use crate::config::DateFormat;
use crate::types::RawValue;

/// Parse numeric text while rejecting anything with letters in it
/// (`"14 dias"`, `"NaN"`, `"inf"`).
///
/// Thousands separators are not stripped: day counts never carry them, and
/// a comma in this data is more likely a decimal mark than a separator.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Coerce a cell into a non-negative whole number of days.
///
/// Negative, fractional, non-finite and non-numeric values all come back as
/// `None`.
pub fn parse_day_count(value: &RawValue) -> Option<u32> {
    let n = match value {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => parse_f64_safe(Some(s.as_str()))?,
        RawValue::Null | RawValue::Bool(_) => return None,
    };
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
        return None;
    }
    Some(n as u32)
}

/// Parse a timestamp cell with the configured explicit format.
///
/// Numbers are never interpreted as dates.
pub fn parse_timestamp(value: &RawValue, format: &DateFormat) -> Option<NaiveDateTime> {
    match value {
        RawValue::Text(s) => parse_timestamp_str(s, format),
        _ => None,
    }
}

pub fn parse_timestamp_str(s: &str, format: &DateFormat) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if format.has_time() {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format.as_str()) {
            return Some(ts);
        }
        // Same convention, time part left off by the exporter.
        return NaiveDate::parse_from_str(s, format.date_part())
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }
    let date = NaiveDate::parse_from_str(s, format.as_str()).ok().or_else(|| {
        // Date-only format, value with a trailing time.
        let head = s.split_whitespace().next()?;
        NaiveDate::parse_from_str(head, format.as_str()).ok()
    })?;
    date.and_hms_opt(0, 0, 0)
}

/// Elapsed time from `start` to `end` in fractional days.
pub fn days_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_seconds() as f64 / 86_400.0
}

/// Arithmetic mean; `None` for an empty slice so callers can tell "no data"
/// apart from a genuine zero.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Fixed-decimal rendering with locale thousands separators, e.g.
/// `1,234,567.89`.
pub fn format_number(n: f64, decimals: usize) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if n.is_sign_negative() && res.chars().any(|c| c != '0' && c != '.' && c != ',') {
        res.insert(0, '-');
    }
    res
}

/// Counts in console output and report tables (`9,855`).
pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(p: &str) -> DateFormat {
        DateFormat::new(p).unwrap()
    }

    #[test]
    fn day_counts_accept_whole_non_negative_numbers() {
        assert_eq!(parse_day_count(&RawValue::from("14")), Some(14));
        assert_eq!(parse_day_count(&RawValue::from(" 30.0 ")), Some(30));
        assert_eq!(parse_day_count(&RawValue::Number(7.0)), Some(7));
        assert_eq!(parse_day_count(&RawValue::from("0")), Some(0));
    }

    #[test]
    fn day_counts_reject_everything_else() {
        assert_eq!(parse_day_count(&RawValue::from("abc")), None);
        assert_eq!(parse_day_count(&RawValue::from("14 dias")), None);
        assert_eq!(parse_day_count(&RawValue::from("-3")), None);
        assert_eq!(parse_day_count(&RawValue::from("2.5")), None);
        assert_eq!(parse_day_count(&RawValue::from("")), None);
        assert_eq!(parse_day_count(&RawValue::Number(f64::NAN)), None);
        assert_eq!(parse_day_count(&RawValue::Null), None);
        assert_eq!(parse_day_count(&RawValue::Bool(true)), None);
    }

    #[test]
    fn timestamps_follow_day_first_format() {
        let f = fmt("%d/%m/%Y %H:%M");
        let ts = parse_timestamp(&RawValue::from("03/04/2024 15:20"), &f).unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 4, 3).unwrap());
        assert_eq!(ts.format("%H:%M").to_string(), "15:20");
    }

    #[test]
    fn timestamp_format_with_time_accepts_bare_dates() {
        let f = fmt("%d/%m/%Y %H:%M");
        let ts = parse_timestamp(&RawValue::from("03/04/2024"), &f).unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M").to_string(), "2024-04-03 00:00");
    }

    #[test]
    fn iso_format_with_time_accepts_bare_dates() {
        let f = fmt("%Y-%m-%dT%H:%M:%S");
        let full = parse_timestamp_str("2024-03-10T08:15:00", &f).unwrap();
        assert_eq!(full.format("%Y-%m-%d %H:%M").to_string(), "2024-03-10 08:15");
        let bare = parse_timestamp_str("2024-03-10", &f).unwrap();
        assert_eq!(bare.format("%Y-%m-%d %H:%M").to_string(), "2024-03-10 00:00");
    }

    #[test]
    fn date_only_format_ignores_trailing_time() {
        let f = fmt("%Y-%m-%d");
        let ts = parse_timestamp(&RawValue::from("2024-04-03 10:00:00"), &f).unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 4, 3).unwrap());
    }

    #[test]
    fn unparseable_and_numeric_dates_are_none() {
        let f = fmt("%d/%m/%Y %H:%M");
        assert!(parse_timestamp(&RawValue::from("31/02/2024 10:00"), &f).is_none());
        assert!(parse_timestamp(&RawValue::from("2024-04-03"), &f).is_none());
        assert!(parse_timestamp(&RawValue::Number(45000.0), &f).is_none());
        assert!(parse_timestamp(&RawValue::Null, &f).is_none());
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn days_between_is_fractional() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap().and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(days_between(a, b), 1.5);
        assert_eq!(days_between(b, a), -1.5);
    }

    #[test]
    fn numbers_get_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 1), "-42.0");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_number(12.0, 0), "12");
        assert_eq!(format_int(9855usize), "9,855");
    }
}
