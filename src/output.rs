use std::fs;
use std::path::Path;

use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table};

use crate::error::ReportError;
use crate::types::{AggregateRow, ComplianceSummary, GroupField, Measure, SummaryCard};
use crate::util::{format_int, format_number};

/// Header row for an aggregate table: one column per grouping field, then
/// the measure.
pub fn headers(group_by: &[GroupField], measure: &str) -> Vec<String> {
    group_by
        .iter()
        .map(|f| f.label().to_string())
        .chain(std::iter::once(measure.to_string()))
        .collect()
}

fn render_measure(measure: Measure) -> String {
    match measure {
        Measure::Count(n) => format_int(n),
        Measure::Mean(v) => format_number(v, 2),
    }
}

fn cells(row: &AggregateRow) -> Vec<String> {
    row.keys
        .iter()
        .map(ToString::to_string)
        .chain(std::iter::once(render_measure(row.measure)))
        .collect()
}

pub fn write_csv(
    path: &Path,
    headers: &[String],
    rows: &[AggregateRow],
) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(headers)?;
    for r in rows {
        // Raw numbers in exports; separators are for the console only.
        let mut record: Vec<String> = r.keys.iter().map(ToString::to_string).collect();
        record.push(match r.measure {
            Measure::Count(n) => n.to_string(),
            Measure::Mean(v) => format!("{:.2}", v),
        });
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReportError> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

/// Markdown table of the first `max_rows` rows.
pub fn preview_rows(headers: &[String], rows: &[AggregateRow], max_rows: usize) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(headers.iter().cloned());
    for row in rows.iter().take(max_rows) {
        builder.push_record(cells(row));
    }
    let mut table = builder.build();
    table.with(Style::markdown());
    let mut out = table.to_string();
    if rows.len() > max_rows {
        out.push_str(&format!("\n({} more rows)", format_int(rows.len() - max_rows)));
    }
    out
}

impl ComplianceSummary {
    /// Dashboard cards for the summary block.
    pub fn cards(&self) -> Vec<SummaryCard> {
        let card = |metric: &str, value: String| SummaryCard {
            metric: metric.to_string(),
            value,
        };
        vec![
            card("Finalized", format_int(self.total)),
            card("On time", format_int(self.on_time)),
            card("Late", format_int(self.late)),
            card("Early", format_int(self.early)),
            card("Indeterminate", format_int(self.indeterminate)),
            card(
                "On-time rate",
                self.on_time_rate
                    .map(|r| format!("{}%", format_number(r, 1)))
                    .unwrap_or_else(|| "n/a".to_string()),
            ),
        ]
    }
}

pub fn preview_cards(cards: &[SummaryCard]) -> String {
    Table::new(cards).with(Style::markdown()).to_string()
}
