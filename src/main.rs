// Host application for the finalized-vehicle reports.
//
// Stands where the dashboard used to: authenticate, load the row set once,
// then print and export the tables that feed each chart.
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use vehicle_report::output::{self, headers, preview_rows};
use vehicle_report::util::{format_int, format_number};
use vehicle_report::{
    aggregate, compliance_summary, date_range, default_month, mean_duration, normalize,
    AggregateRow, AllowListAuthenticator, Authenticator, Credentials, DurationReference,
    FilterContext, GroupField, Record, ReportConfig, ReportError, SortOrder, SourceConfig,
};

const PREVIEW_ROWS: usize = 12;

#[derive(Debug, Parser)]
#[command(name = "vehicle_report", about = "Finalized-vehicle volume and deadline reports")]
struct Cli {
    /// TOML report configuration.
    #[arg(long, default_value = "report.toml")]
    config: PathBuf,
    /// Row set to load instead of the configured source.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    brand: Option<String>,
    /// Repeat to select several models of the brand.
    #[arg(long = "model")]
    models: Vec<String>,
    /// Month (`YYYY-MM`) for the per-day breakdown.
    #[arg(long)]
    month: Option<String>,
    /// Week of month (1-5) for the per-brand weekly breakdown.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=5))]
    week: Option<u32>,
    /// Single day (`YYYY-MM-DD`) for the per-brand daily breakdown.
    #[arg(long)]
    day: Option<NaiveDate>,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

struct Emitter<'a> {
    out_dir: &'a Path,
}

impl Emitter<'_> {
    fn emit(
        &self,
        title: &str,
        note: &str,
        group_by: &[GroupField],
        measure: &str,
        rows: &[AggregateRow],
        file: &str,
    ) -> Result<(), ReportError> {
        let h = headers(group_by, measure);
        let path = self.out_dir.join(file);
        output::write_csv(&path, &h, rows)?;
        println!("{}", title);
        println!("({})\n", note);
        println!("{}\n", preview_rows(&h, rows, PREVIEW_ROWS));
        println!("(Full table exported to {})\n", path.display());
        Ok(())
    }

    fn counts(
        &self,
        title: &str,
        note: &str,
        group_by: &[GroupField],
        rows: &[AggregateRow],
        file: &str,
    ) -> Result<(), ReportError> {
        self.emit(title, note, group_by, "Count", rows, file)
    }
}

fn load_records(cli: &Cli, config: &ReportConfig) -> Result<Vec<Record>, Box<dyn Error>> {
    let source_cfg = match (&cli.input, &config.source) {
        (Some(path), Some(configured)) => configured.with_path(path),
        (Some(path), None) => SourceConfig::infer(path),
        (None, Some(configured)) => configured.clone(),
        (None, None) => {
            return Err(ReportError::InvalidConfig(
                "no data source configured; pass --input or add a [source] table".to_string(),
            )
            .into())
        }
    };

    let credentials = Credentials::from_os_login()?;
    let user = AllowListAuthenticator::new(config.allowed_users.iter().cloned())
        .authenticate(&credentials)?;

    let table = source_cfg.open()?.fetch(&user)?;
    let (records, load_report) = normalize(&table, &config.normalizer)?;
    println!(
        "Processing dataset... ({} rows loaded, {} kept)",
        format_int(load_report.total_rows),
        format_int(load_report.kept_rows)
    );
    if load_report.dropped() > 0 {
        println!(
            "Note: {} rows skipped ({} without completion date, {} not matching '{}').",
            format_int(load_report.dropped()),
            format_int(load_report.missing_completion_date),
            format_int(load_report.unparseable_completion_date),
            config.normalizer.date_format.as_str()
        );
    }
    if let Some((first, last)) = date_range(&records) {
        println!("Completion dates from {} to {}.", first, last);
    }
    println!();
    Ok(records)
}

fn generate_reports(
    cli: &Cli,
    config: &ReportConfig,
    data: &[Record],
) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&cli.out_dir)?;
    let out = Emitter { out_dir: &cli.out_dir };

    let mut base = FilterContext::default().with_models(cli.models.iter().cloned());
    base.brand = cli.brand.clone();

    let primary = aggregate(data, &config.group_by, &base, config.sort);
    out.counts(
        "Finalized vehicles",
        "Configured grouping",
        &config.group_by,
        &primary,
        "report_primary.csv",
    )?;

    let month_field = [GroupField::MonthKey];
    let by_month = aggregate(data, &month_field, &base, SortOrder::ByKey);
    out.counts(
        "Finalized per month",
        "Sorted by month",
        &month_field,
        &by_month,
        "report_by_month.csv",
    )?;

    let week_field = [GroupField::IsoWeek];
    let by_week = aggregate(data, &week_field, &base, SortOrder::ByKey);
    out.counts(
        "Finalized per ISO week",
        "Sorted by week",
        &week_field,
        &by_week,
        "report_by_iso_week.csv",
    )?;

    let brand_field = [GroupField::Brand];
    let today = Local::now().date_naive();
    let focus_month = cli
        .month
        .clone()
        .or_else(|| default_month(data, &base, config.default_period, today));
    match &focus_month {
        Some(month) => {
            let in_month = base.clone().with_month(month.clone());
            let by_day = aggregate(data, &[GroupField::Day], &in_month, SortOrder::ByKey);
            out.counts(
                &format!("Finalized per day in {}", month),
                "Sorted by day",
                &[GroupField::Day],
                &by_day,
                "report_by_day.csv",
            )?;
            if let Some(week) = cli.week {
                let in_week = in_month.with_week_of_month(week);
                let rows = aggregate(data, &brand_field, &in_week, SortOrder::ByCount);
                out.counts(
                    &format!("Finalized per brand in week {} of {}", week, month),
                    "Most finalized first",
                    &brand_field,
                    &rows,
                    "report_week_by_brand.csv",
                )?;
            }
        }
        None => {
            if let Some(week) = cli.week {
                warn!(
                    week,
                    "--week ignored: no month selected (pass --month or set default_period)"
                );
            }
            println!("(No month selected; per-day breakdown skipped.)\n");
        }
    }

    if let Some(day) = cli.day {
        let on_day = FilterContext { day: Some(day), ..base.clone() };
        let rows = aggregate(data, &brand_field, &on_day, SortOrder::ByCount);
        out.counts(
            &format!("Finalized per brand on {}", day.format("%d/%m/%Y")),
            "Most finalized first",
            &brand_field,
            &rows,
            "report_day_by_brand.csv",
        )?;
    }

    let by_brand = aggregate(data, &brand_field, &base, SortOrder::ByCount);
    out.counts(
        "Finalized per brand",
        "Most finalized first",
        &brand_field,
        &by_brand,
        "report_by_brand.csv",
    )?;

    let model_fields = [GroupField::Brand, GroupField::Model];
    let by_model = aggregate(data, &model_fields, &base, SortOrder::ByCount);
    out.counts(
        "Finalized per model",
        "Most finalized first",
        &model_fields,
        &by_model,
        "report_by_model.csv",
    )?;

    let compliance_fields = [GroupField::MonthKey, GroupField::Compliance];
    let compliance = aggregate(data, &compliance_fields, &base, SortOrder::ByKey);
    out.counts(
        "Deadline compliance per month",
        "Completion vs. contract date plus allowed days",
        &compliance_fields,
        &compliance,
        "report_compliance.csv",
    )?;

    let reference = DurationReference::ContractDate;
    match mean_duration(data, &brand_field, &base, reference, SortOrder::ByCount) {
        Ok(rows) => out.emit(
            "Mean days from contract to completion",
            "Per brand, longest first",
            &brand_field,
            "MeanDays",
            &rows,
            "report_mean_days.csv",
        )?,
        Err(ReportError::NoData { what }) => println!("(No data for {}.)\n", what),
        Err(e) => return Err(e.into()),
    }

    let summary = compliance_summary(data, &base);
    let summary_path = cli.out_dir.join("summary.json");
    output::write_json(&summary_path, &summary)?;
    println!("Summary ({}):", summary_path.display());
    println!("{}\n", output::preview_cards(&summary.cards()));
    if let Some(rate) = summary.on_time_rate {
        println!("On-time rate: {}%\n", format_number(rate, 1));
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ReportConfig::load(&cli.config).inspect_err(|e| {
        warn!(path = %cli.config.display(), error = %e, "could not load configuration");
    })?;

    let data = load_records(&cli, &config)?;
    if data.is_empty() {
        return Err(ReportError::NoData {
            what: "usable rows in the dataset".to_string(),
        }
        .into());
    }

    println!("Generating reports...\n");
    generate_reports(&cli, &config, &data)
}
