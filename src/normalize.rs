use tracing::{debug, warn};

use crate::config::NormalizerConfig;
use crate::error::ReportError;
use crate::types::{NormalizeReport, RawTable, RawValue, Record};
use crate::util::{parse_day_count, parse_timestamp};

fn required_column(table: &RawTable, name: &str) -> Result<usize, ReportError> {
    table
        .column_index(name)
        .ok_or_else(|| ReportError::MissingColumn {
            column: name.trim().to_string(),
        })
}

fn optional_column(table: &RawTable, name: &str) -> Option<usize> {
    let idx = table.column_index(name);
    if idx.is_none() {
        warn!(column = name.trim(), "optional column absent, values treated as missing");
    }
    idx
}

fn text_or_empty(value: &RawValue) -> String {
    value
        .as_text()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Turn a fetched row set into typed records.
///
/// Rows whose completion date is missing or does not parse with the
/// configured format are left out and counted in the report; they are not
/// errors. A missing brand, model or completion-date column fails the whole
/// table.
pub fn normalize(
    table: &RawTable,
    config: &NormalizerConfig,
) -> Result<(Vec<Record>, NormalizeReport), ReportError> {
    let columns = &config.columns;
    let completion_idx = required_column(table, &columns.completion_date)?;
    let brand_idx = required_column(table, &columns.brand)?;
    let model_idx = required_column(table, &columns.model)?;
    let contract_idx = optional_column(table, &columns.contract_date);
    let allowed_idx = optional_column(table, &columns.allowed_days);

    let mut report = NormalizeReport {
        total_rows: table.rows.len(),
        ..NormalizeReport::default()
    };
    let mut records = Vec::with_capacity(table.rows.len());

    for row in 0..table.rows.len() {
        let raw_completion = table.cell(row, completion_idx);
        if raw_completion.as_text().is_none() {
            report.missing_completion_date += 1;
            continue;
        }
        let Some(completion_date) = parse_timestamp(raw_completion, &config.date_format) else {
            report.unparseable_completion_date += 1;
            continue;
        };

        let contract_date =
            contract_idx.and_then(|i| parse_timestamp(table.cell(row, i), &config.date_format));
        let allowed_days = allowed_idx.and_then(|i| parse_day_count(table.cell(row, i)));

        records.push(Record {
            brand: text_or_empty(table.cell(row, brand_idx)),
            model: text_or_empty(table.cell(row, model_idx)),
            completion_date,
            contract_date,
            allowed_days,
        });
    }

    report.kept_rows = records.len();
    if report.dropped() > 0 {
        warn!(
            missing = report.missing_completion_date,
            unparseable = report.unparseable_completion_date,
            date_format = config.date_format.as_str(),
            "rows dropped for completion date"
        );
    }
    debug!(
        total = report.total_rows,
        kept = report.kept_rows,
        "normalized row set"
    );
    Ok((records, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnMap, DateFormat, DAY_FIRST_WITH_TIME};
    use chrono::NaiveDate;

    fn config() -> NormalizerConfig {
        NormalizerConfig::new(DateFormat::new(DAY_FIRST_WITH_TIME).unwrap())
    }

    fn table(columns: &[&str], rows: Vec<Vec<RawValue>>) -> RawTable {
        RawTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    fn text(s: &str) -> RawValue {
        RawValue::from(s)
    }

    #[test]
    fn parses_typed_records() {
        let t = table(
            &[" Marca ", "Modelo", "Datafinalizacao ", "Datacontrato", "Prazo"],
            vec![vec![
                text(" Toyota "),
                text("Hilux"),
                text("10/03/2024 14:30"),
                text("01/03/2024 08:00"),
                RawValue::Number(14.0),
            ]],
        );
        let (records, report) = normalize(&t, &config()).unwrap();
        assert_eq!(report.total_rows, 1);
        assert_eq!(report.kept_rows, 1);
        let r = &records[0];
        assert_eq!(r.brand, "Toyota");
        assert_eq!(r.model, "Hilux");
        assert_eq!(r.completion_date.date(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(
            r.contract_date.map(|d| d.date()),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(r.allowed_days, Some(14));
    }

    #[test]
    fn missing_completion_column_is_fatal() {
        let t = table(&["Marca", "Modelo"], vec![]);
        let err = normalize(&t, &config()).unwrap_err();
        match err {
            ReportError::MissingColumn { column } => assert_eq!(column, "Datafinalizacao"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn column_match_is_case_sensitive() {
        let t = table(&["Marca", "Modelo", "datafinalizacao"], vec![]);
        assert!(matches!(
            normalize(&t, &config()),
            Err(ReportError::MissingColumn { .. })
        ));
    }

    #[test]
    fn bad_and_blank_dates_are_dropped_and_counted() {
        let t = table(
            &["Marca", "Modelo", "Datafinalizacao"],
            vec![
                vec![text("Ford"), text("Ranger"), text("05/01/2024 10:00")],
                vec![text("Ford"), text("Ranger"), text("2024-01-05")],
                vec![text("Ford"), text("Ranger"), text("   ")],
                vec![text("Ford"), text("Ranger"), RawValue::Null],
                vec![text("Ford"), text("Ranger")],
                vec![text("Ford"), text("Ranger"), RawValue::Number(45000.0)],
            ],
        );
        let (records, report) = normalize(&t, &config()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(report.total_rows, 6);
        assert_eq!(report.kept_rows, 1);
        assert_eq!(report.missing_completion_date, 3);
        assert_eq!(report.unparseable_completion_date, 2);
        assert_eq!(report.dropped(), 5);
    }

    #[test]
    fn optional_columns_default_to_absent() {
        let t = table(
            &["Marca", "Modelo", "Datafinalizacao", "Prazo"],
            vec![
                vec![text("VW"), text("Amarok"), text("05/01/2024 10:00"), text("quinze")],
                vec![text("VW"), RawValue::Null, text("06/01/2024 10:00"), text("-2")],
            ],
        );
        let (records, _) = normalize(&t, &config()).unwrap();
        assert!(records.iter().all(|r| r.contract_date.is_none()));
        assert!(records.iter().all(|r| r.allowed_days.is_none()));
        assert_eq!(records[1].model, "");
    }

    #[test]
    fn unparseable_contract_date_becomes_absent() {
        let t = table(
            &["Marca", "Modelo", "Datafinalizacao", "Datacontrato"],
            vec![vec![text("VW"), text("Amarok"), text("05/01/2024 10:00"), text("ontem")]],
        );
        let (records, report) = normalize(&t, &config()).unwrap();
        assert_eq!(report.kept_rows, 1);
        assert_eq!(records[0].contract_date, None);
    }

    #[test]
    fn custom_column_names_are_honoured() {
        let columns = ColumnMap {
            brand: "brand".to_string(),
            model: "model".to_string(),
            completion_date: "finished_at".to_string(),
            contract_date: "contract_at".to_string(),
            allowed_days: "sla_days".to_string(),
        };
        let cfg = NormalizerConfig::new(DateFormat::new("%Y-%m-%d").unwrap()).with_columns(columns);
        let t = table(
            &["brand", "model", "finished_at", "contract_at", "sla_days"],
            vec![vec![text("BMW"), text("X5"), text("2024-05-02"), text("2024-04-01"), text("30")]],
        );
        let (records, _) = normalize(&t, &cfg).unwrap();
        assert_eq!(records[0].allowed_days, Some(30));
        assert_eq!(records[0].completion_date.date(), NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    }
}
