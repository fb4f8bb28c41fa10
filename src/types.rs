use std::borrow::Cow;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One cell of a fetched row set, as delivered by the CSV reader or the
/// JSON export of the query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Text view of the cell; `None` for nulls and blank strings.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RawValue::Null => None,
            RawValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            RawValue::Number(n) => Some(Cow::Owned(n.to_string())),
            RawValue::Text(s) if s.trim().is_empty() => None,
            RawValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

/// Row-oriented table handed over by a data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Position of `name`, comparing case-sensitively after trimming both
    /// sides.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.columns.iter().position(|c| c.trim() == wanted)
    }

    /// Short rows read as null in the missing positions.
    pub fn cell(&self, row: usize, column: usize) -> &RawValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&RawValue::Null)
    }
}

/// A normalized row. Only rows with a parseable completion date make it
/// this far.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub brand: String,
    pub model: String,
    pub completion_date: NaiveDateTime,
    pub contract_date: Option<NaiveDateTime>,
    pub allowed_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKeys {
    pub year: i32,
    /// Zero-padded `YYYY-MM`.
    pub month_key: String,
    /// Calendar-local week, 1 through 5.
    pub week_of_month: u32,
    /// ISO week-of-year as `YYYY-Www`.
    pub iso_week: String,
    pub day: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    OnTime,
    Late,
    Early,
    Indeterminate,
}

impl ComplianceStatus {
    pub fn label(self) -> &'static str {
        match self {
            ComplianceStatus::OnTime => "On time",
            ComplianceStatus::Late => "Late",
            ComplianceStatus::Early => "Early",
            ComplianceStatus::Indeterminate => "Indeterminate",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Field selectors accepted by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    Brand,
    Model,
    MonthKey,
    WeekOfMonth,
    IsoWeek,
    Day,
    Year,
    Compliance,
}

impl GroupField {
    /// Column header used when a table is rendered or exported.
    pub fn label(self) -> &'static str {
        match self {
            GroupField::Brand => "Brand",
            GroupField::Model => "Model",
            GroupField::MonthKey => "Month",
            GroupField::WeekOfMonth => "WeekOfMonth",
            GroupField::IsoWeek => "IsoWeek",
            GroupField::Day => "Day",
            GroupField::Year => "Year",
            GroupField::Compliance => "Compliance",
        }
    }
}

/// A single group key value. Values at the same position of a key tuple
/// always share a variant, so the derived ordering sorts them naturally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum GroupValue {
    Text(String),
    Int(i32),
    Week(u32),
    Day(NaiveDate),
    Status(ComplianceStatus),
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Text(s) => f.write_str(s),
            GroupValue::Int(n) => write!(f, "{}", n),
            GroupValue::Week(w) => write!(f, "{}", w),
            GroupValue::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            GroupValue::Status(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Measure {
    Count(usize),
    Mean(f64),
}

impl Measure {
    pub fn as_f64(self) -> f64 {
        match self {
            Measure::Count(n) => n as f64,
            Measure::Mean(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub keys: Vec<GroupValue>,
    pub measure: Measure,
}

impl AggregateRow {
    /// Count carried by the row, `None` for mean rows.
    pub fn count(&self) -> Option<usize> {
        match self.measure {
            Measure::Count(n) => Some(n),
            Measure::Mean(_) => None,
        }
    }
}

/// Outcome counters of a normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub missing_completion_date: usize,
    pub unparseable_completion_date: usize,
}

impl NormalizeReport {
    pub fn dropped(&self) -> usize {
        self.missing_completion_date + self.unparseable_completion_date
    }
}

/// Card-style totals for the current filter selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceSummary {
    pub total: usize,
    pub on_time: usize,
    pub late: usize,
    pub early: usize,
    pub indeterminate: usize,
    /// Percent of rows with a determinate deadline that finished on time.
    pub on_time_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SummaryCard {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}
