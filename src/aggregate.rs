use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};

use crate::bucket::{bucket, month_key};
use crate::config::{DefaultPeriod, SortOrder};
use crate::error::ReportError;
use crate::types::{
    AggregateRow, BucketKeys, ComplianceStatus, ComplianceSummary, GroupField, GroupValue,
    Measure, Record,
};
use crate::util::{days_between, mean};

/// The user's current selection, passed into every query.
///
/// Every `None` / empty field means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterContext {
    pub brand: Option<String>,
    /// Empty selects every model of the chosen brand.
    pub models: Vec<String>,
    pub month: Option<String>,
    pub week_of_month: Option<u32>,
    pub iso_week: Option<String>,
    pub day: Option<NaiveDate>,
}

impl FilterContext {
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_month(mut self, month: impl Into<String>) -> Self {
        self.month = Some(month.into());
        self
    }

    pub fn with_week_of_month(mut self, week: u32) -> Self {
        self.week_of_month = Some(week);
        self
    }

    pub fn with_iso_week(mut self, week: impl Into<String>) -> Self {
        self.iso_week = Some(week.into());
        self
    }

    pub fn with_day(mut self, day: NaiveDate) -> Self {
        self.day = Some(day);
        self
    }

    pub fn matches(&self, record: &Record, keys: &BucketKeys) -> bool {
        self.brand.as_ref().map_or(true, |b| *b == record.brand)
            && (self.models.is_empty() || self.models.iter().any(|m| *m == record.model))
            && self.month.as_ref().map_or(true, |m| *m == keys.month_key)
            && self.week_of_month.map_or(true, |w| w == keys.week_of_month)
            && self.iso_week.as_ref().map_or(true, |w| *w == keys.iso_week)
            && self.day.map_or(true, |d| d == keys.day)
    }
}

/// What a duration is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationReference {
    /// The row's own contract date; rows without one are skipped.
    ContractDate,
    /// A caller-chosen instant shared by every row.
    Fixed(NaiveDateTime),
}

impl DurationReference {
    fn days_for(self, record: &Record) -> Option<f64> {
        let start = match self {
            DurationReference::ContractDate => record.contract_date?,
            DurationReference::Fixed(at) => at,
        };
        Some(days_between(start, record.completion_date))
    }
}

fn group_value(field: GroupField, record: &Record, keys: &BucketKeys) -> GroupValue {
    match field {
        GroupField::Brand => GroupValue::Text(record.brand.clone()),
        GroupField::Model => GroupValue::Text(record.model.clone()),
        GroupField::MonthKey => GroupValue::Text(keys.month_key.clone()),
        GroupField::WeekOfMonth => GroupValue::Week(keys.week_of_month),
        GroupField::IsoWeek => GroupValue::Text(keys.iso_week.clone()),
        GroupField::Day => GroupValue::Day(keys.day),
        GroupField::Year => GroupValue::Int(keys.year),
        GroupField::Compliance => GroupValue::Status(record.compliance()),
    }
}

/// Filtered records with their bucket keys, in input order.
fn selected<'a>(
    records: &'a [Record],
    filter: &'a FilterContext,
) -> impl Iterator<Item = (&'a Record, BucketKeys)> + 'a {
    records.iter().filter_map(move |r| {
        let keys = bucket(r);
        filter.matches(r, &keys).then_some((r, keys))
    })
}

/// Accumulates values per key tuple, remembering first-seen order.
struct Groups<T> {
    index: HashMap<Vec<GroupValue>, usize>,
    entries: Vec<(Vec<GroupValue>, T)>,
}

impl<T: Default> Groups<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, key: Vec<GroupValue>) -> &mut T {
        let pos = match self.index.get(&key) {
            Some(&pos) => pos,
            None => {
                let pos = self.entries.len();
                self.index.insert(key.clone(), pos);
                self.entries.push((key, T::default()));
                pos
            }
        };
        &mut self.entries[pos].1
    }
}

fn sort_rows(rows: &mut [AggregateRow], sort: SortOrder) {
    match sort {
        SortOrder::None => {}
        SortOrder::ByKey => rows.sort_by(|a, b| a.keys.cmp(&b.keys)),
        // `sort_by` is stable, so equal measures stay in first-seen order.
        SortOrder::ByCount => rows.sort_by(|a, b| {
            b.measure
                .as_f64()
                .partial_cmp(&a.measure.as_f64())
                .unwrap_or(Ordering::Equal)
        }),
    }
}

/// Count records per combination of `group_by` values.
///
/// Rows come out in first-seen order unless `sort` asks otherwise. An empty
/// `group_by` yields a single total row (or nothing if no record passes the
/// filter).
pub fn aggregate(
    records: &[Record],
    group_by: &[GroupField],
    filter: &FilterContext,
    sort: SortOrder,
) -> Vec<AggregateRow> {
    let mut groups: Groups<usize> = Groups::new();
    for (record, keys) in selected(records, filter) {
        let key = group_by
            .iter()
            .map(|f| group_value(*f, record, &keys))
            .collect();
        *groups.entry(key) += 1;
    }
    let mut rows: Vec<AggregateRow> = groups
        .entries
        .into_iter()
        .map(|(keys, n)| AggregateRow {
            keys,
            measure: Measure::Count(n),
        })
        .collect();
    sort_rows(&mut rows, sort);
    rows
}

/// Mean elapsed days from `reference` to completion, per group.
///
/// Only rows that have the reference take part, so no group is empty. When
/// no row qualifies at all the result is `NoData`, never a zero.
pub fn mean_duration(
    records: &[Record],
    group_by: &[GroupField],
    filter: &FilterContext,
    reference: DurationReference,
    sort: SortOrder,
) -> Result<Vec<AggregateRow>, ReportError> {
    let mut groups: Groups<Vec<f64>> = Groups::new();
    for (record, keys) in selected(records, filter) {
        let Some(days) = reference.days_for(record) else {
            continue;
        };
        let key = group_by
            .iter()
            .map(|f| group_value(*f, record, &keys))
            .collect();
        groups.entry(key).push(days);
    }
    if groups.entries.is_empty() {
        return Err(no_duration_data(reference));
    }
    let mut rows: Vec<AggregateRow> = groups
        .entries
        .into_iter()
        .filter_map(|(keys, values)| {
            mean(&values).map(|m| AggregateRow {
                keys,
                measure: Measure::Mean(m),
            })
        })
        .collect();
    sort_rows(&mut rows, sort);
    Ok(rows)
}

/// Ungrouped variant of [`mean_duration`].
pub fn mean_duration_days(
    records: &[Record],
    filter: &FilterContext,
    reference: DurationReference,
) -> Result<f64, ReportError> {
    let values: Vec<f64> = selected(records, filter)
        .filter_map(|(r, _)| reference.days_for(r))
        .collect();
    mean(&values).ok_or_else(|| no_duration_data(reference))
}

fn no_duration_data(reference: DurationReference) -> ReportError {
    let what = match reference {
        DurationReference::ContractDate => "mean days from contract to completion".to_string(),
        DurationReference::Fixed(at) => format!("mean days from {} to completion", at),
    };
    ReportError::NoData { what }
}

/// Distinct values of one field among the filtered records, in first-seen
/// order. Feeds the selection widgets (e.g. the models of one brand).
pub fn distinct_values(
    records: &[Record],
    field: GroupField,
    filter: &FilterContext,
) -> Vec<GroupValue> {
    let mut seen = HashSet::new();
    selected(records, filter)
        .map(|(r, keys)| group_value(field, r, &keys))
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// First and last completion day, for bounding a day picker.
pub fn date_range(records: &[Record]) -> Option<(NaiveDate, NaiveDate)> {
    records.iter().map(|r| r.completion_date.date()).fold(None, |acc, d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })
}

/// Month a month-scoped view opens on when nothing was picked.
/// `MostRecent` looks only at the rows `filter` selects.
pub fn default_month(
    records: &[Record],
    filter: &FilterContext,
    policy: DefaultPeriod,
    today: NaiveDate,
) -> Option<String> {
    match policy {
        DefaultPeriod::None => None,
        DefaultPeriod::CurrentMonth => Some(month_key(today)),
        DefaultPeriod::MostRecent => selected(records, filter)
            .map(|(r, _)| r.completion_date)
            .max()
            .map(|ts| month_key(ts.date())),
    }
}

pub fn compliance_summary(records: &[Record], filter: &FilterContext) -> ComplianceSummary {
    let mut summary = ComplianceSummary::default();
    for (record, _) in selected(records, filter) {
        summary.total += 1;
        match record.compliance() {
            ComplianceStatus::OnTime => summary.on_time += 1,
            ComplianceStatus::Late => summary.late += 1,
            ComplianceStatus::Early => summary.early += 1,
            ComplianceStatus::Indeterminate => summary.indeterminate += 1,
        }
    }
    let determinate = summary.on_time + summary.late;
    if determinate > 0 {
        summary.on_time_rate = Some(summary.on_time as f64 / determinate as f64 * 100.0);
    }
    summary
}
