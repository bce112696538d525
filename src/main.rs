use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use compaction_report::run;
use compaction_report::CancelToken;
use compaction_report::CommandRecalculator;
use compaction_report::EngineConfig;
use compaction_report::NoProgress;
use compaction_report::RunRequest;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(about = "Generate a compaction inspection report from a measurement workbook and a Word template.")]
struct Args {
    /// Measurement workbook (.xlsx or .xlsm).
    #[arg(long)]
    excel: PathBuf,

    /// Report template (.docx) containing the `附表1` schedule.
    #[arg(long)]
    template: PathBuf,

    /// Report to write; an existing file is replaced.
    #[arg(long)]
    output: PathBuf,

    /// Maximum number of schedules to build (0 = one per section group).
    #[arg(long, default_value_t = 0)]
    copies: usize,

    /// Worksheet name glob to include (repeatable; default: all worksheets).
    #[arg(long = "sheet")]
    sheets: Vec<String>,

    /// Count passed points against the threshold instead of reporting all as passed.
    #[arg(long)]
    strict_pass: bool,

    /// Date printed under the conclusions, as YYYY-MM-DD (default: today).
    #[arg(long, value_parser = parse_date)]
    report_date: Option<NaiveDate>,

    /// Office program used to recalculate workbooks saved without formula results
    /// (e.g. `soffice`).
    #[arg(long)]
    recalc_with: Option<String>,
}

fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
}

/// Progress goes through the engine's log mirror; `RUST_LOG` overrides the level
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    if let Err(error) = execute(Args::parse()) {
        eprintln!("error: {:#}", error);
        std::process::exit(1);
    }
}

fn execute(args: Args) -> Result<()> {
    let config = EngineConfig {
        assume_all_points_pass: !args.strict_pass,
        report_date: args.report_date,
        sheet_name_patterns: args.sheets,
        recalculator: args
            .recalc_with
            .as_deref()
            .map(|program| Arc::new(CommandRecalculator::new(program)) as _),
        ..EngineConfig::default()
    };
    let request = RunRequest {
        excel: args.excel,
        template: args.template,
        output: args.output,
        copy_count: args.copies,
    };

    let summary = run(&request, &config, &mut NoProgress, &CancelToken::new())
        .with_context(|| format!("Failed to build report '{}'", request.output.display()))?;
    log::info!(
        "{} schedule(s) from {} section(s) on {} sheet(s), {} warning(s): {}",
        summary.tables,
        summary.sections,
        summary.sheets_processed,
        summary.warnings,
        summary.output.display()
    );
    Ok(())
}
