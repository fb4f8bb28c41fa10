//! Calendar bucket keys derived from a record's completion date.
//!
//! `week_of_month` is a calendar-local "Nth week of the month" and
//! `iso_week` is the ISO week-of-year. They answer different questions and
//! are kept as separate fields.
use chrono::{Datelike, NaiveDate};

use crate::types::{BucketKeys, Record};

/// `((day_of_month - 1) div 7) + 1`: days 1-7 are week 1, 29-31 week 5.
pub fn week_of_month(day_of_month: u32) -> u32 {
    day_of_month.saturating_sub(1) / 7 + 1
}

/// Zero-padded `YYYY-MM`, sortable as a string.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// ISO week-of-year as `YYYY-Www`, using the ISO week-numbering year.
pub fn iso_week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

pub fn bucket(record: &Record) -> BucketKeys {
    let day = record.completion_date.date();
    BucketKeys {
        year: day.year(),
        month_key: month_key(day),
        week_of_month: week_of_month(day.day()),
        iso_week: iso_week_key(day),
        day,
    }
}
