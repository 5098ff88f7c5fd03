use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

use attendance_ledger::aggregate::{
    absentee_count, bucket_by_month, enumerate_date_range, filter_by_status, filter_records,
    month_label, session_records_for_date, summarize_range,
};
use attendance_ledger::catalog::Catalog;
use attendance_ledger::config::Config;
use attendance_ledger::db::{self, PgSource};
use attendance_ledger::filter::{DateMode, RecordFilter};
use attendance_ledger::models::{AttendanceRecord, Session, StatusFilter};
use attendance_ledger::report;
use attendance_ledger::source::{CsvSource, RecordSource};

#[derive(Parser)]
#[command(name = "attendance-ledger")]
#[command(about = "FN/AN attendance history and range summaries", long_about = None)]
struct Cli {
    /// Read attendance from a CSV file instead of Postgres
    #[arg(long, global = true)]
    records: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    course: Option<String>,
    #[arg(long)]
    batch: Option<String>,
    #[arg(long)]
    semester: Option<String>,
}

impl FilterArgs {
    fn into_filter(self, mode: DateMode) -> RecordFilter {
        RecordFilter {
            department: self.department,
            course: self.course,
            batch: self.batch,
            semester: self.semester,
            mode,
            ..RecordFilter::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo attendance for the last few days
    Seed {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Import attendance marks from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List attendance sheets for one day or a date range
    List {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, conflicts_with_all = ["from", "to"])]
        date: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },
    /// Per-student session counts over a date range
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Enumerate a date range grouped by month
    Days {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Generate a markdown range report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let catalog = Catalog::load(config.catalog_path.as_deref())?;
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { days } => {
            let pool = connect(&config).await?;
            let inserted = db::seed(&pool, &catalog, today, days).await?;
            println!("Seed data inserted ({inserted} records).");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let inserted = db::import_csv(&pool, &catalog, &csv, today).await?;
            println!("Inserted {inserted} records from {}.", csv.display());
        }
        Commands::List {
            filters,
            date,
            from,
            to,
            status,
        } => {
            let mode = if from.is_some() || to.is_some() {
                DateMode::Range
            } else {
                DateMode::Single
            };
            let filter = RecordFilter {
                single_date: date.unwrap_or_default(),
                from_date: from.unwrap_or_default(),
                to_date: to.unwrap_or_default(),
                ..filters.into_filter(mode)
            };
            let filter = catalog.resolve_filter(filter)?;
            let records = load_records(cli.records.as_deref(), &config, today).await?;
            print_listing(&records, &filter, status);
        }
        Commands::Summary { filters, from, to } => {
            let filter = catalog.resolve_filter(RecordFilter {
                from_date: from,
                to_date: to,
                ..filters.into_filter(DateMode::Range)
            })?;
            let records = load_records(cli.records.as_deref(), &config, today).await?;
            let summaries = summarize_range(&records, &filter);

            if summaries.is_empty() {
                println!("No attendance found for this range.");
                return Ok(());
            }

            println!(
                "Range summary for {} across {} day(s):",
                filter.scope_label(),
                summaries[0].total_days
            );
            for summary in &summaries {
                println!(
                    "- {} ({}) FN {}/{} AN {}/{} attendance {}%",
                    summary.name,
                    summary.roll_number,
                    summary.fn_present,
                    summary.fn_total,
                    summary.an_present,
                    summary.an_total,
                    summary.attendance_percent
                );
            }
        }
        Commands::Days { from, to } => {
            let days = enumerate_date_range(&from, &to);
            if days.is_empty() {
                println!("The date range is empty or invalid.");
                return Ok(());
            }
            for bucket in bucket_by_month(&days) {
                let label = month_label(&bucket.month).unwrap_or_else(|| bucket.month.clone());
                let dates: Vec<String> = bucket.dates.iter().map(NaiveDate::to_string).collect();
                println!("{label} ({}): {}", bucket.month, dates.join(", "));
            }
        }
        Commands::Report {
            filters,
            from,
            to,
            out,
        } => {
            let filter = catalog.resolve_filter(RecordFilter {
                from_date: from,
                to_date: to,
                ..filters.into_filter(DateMode::Range)
            })?;
            let records = load_records(cli.records.as_deref(), &config, today).await?;
            let report = report::build_report(&filter, &records);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config.database_url()?;
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_records(
    csv: Option<&Path>,
    config: &Config,
    today: NaiveDate,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let source: Box<dyn RecordSource> = match csv {
        Some(path) => Box::new(CsvSource::new(path, today)),
        None => Box::new(PgSource::new(connect(config).await?)),
    };
    source.load_records().await
}

fn print_listing(records: &[AttendanceRecord], filter: &RecordFilter, status: StatusFilter) {
    if filter.mode == DateMode::Single && !filter.single_date.trim().is_empty() {
        let sheets = session_records_for_date(records, filter);
        for (session, sheet) in [
            (Session::Forenoon, sheets.forenoon),
            (Session::Afternoon, sheets.afternoon),
        ] {
            match sheet {
                Some(record) => print_sheet(record, status),
                None => println!("No {session} attendance recorded for {}.", filter.single_date),
            }
        }
        return;
    }

    let matching = filter_records(records, filter);
    if matching.is_empty() {
        println!("No attendance records match these filters.");
        return;
    }
    for record in matching {
        print_sheet(record, status);
    }
}

fn print_sheet(record: &AttendanceRecord, status: StatusFilter) {
    println!(
        "{} {} {} / {} / batch {} / semester {}: {} of {} absent",
        record.date,
        record.session,
        record.department,
        record.course,
        record.batch,
        record.semester,
        absentee_count(&record.students),
        record.students.len()
    );
    for student in filter_by_status(&record.students, status) {
        let mark = if student.is_present { "present" } else { "absent" };
        println!("  - {} {} {}", student.roll_number, student.name, mark);
    }
}
