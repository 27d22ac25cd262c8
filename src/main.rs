//! SurveyStat - survey response analytics
//!
//! A CLI tool that loads a survey's questions and responses, computes
//! per-question summaries and writes a results report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (unreadable input, bad config, write failure, etc.)
//!   2 - Validation issues found with --strict

mod analysis;
mod cli;
mod config;
mod live;
mod models;
mod report;
mod source;
mod validation;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use live::LiveResults;
use models::{AnalyticsData, Report, ReportMetadata};
use source::{Snapshot, SurveySource};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let Some(source) = args.source() else {
        eprintln!("Error: No survey input given; use --snapshot or --questions");
        std::process::exit(1);
    };

    // The config file can turn on verbose logging, so it is read first
    let (mut config, config_path) = match load_config(&args, &source) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose))?;

    info!("SurveyStat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    match run(args, source, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .surveystat.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the output, report layout and CSV export.");
    Ok(())
}

/// Initialize logging at the given level; `RUST_LOG` wins when set.
fn init_logging(level: tracing::Level) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load, summarize, report. Returns exit code (0 or 2).
async fn run(args: Args, source: SurveySource, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let output = config.output_path();
    let to_stdout = output == Path::new("-");
    let progress = !args.quiet && !to_stdout;

    if progress {
        println!("📥 Loading survey data...");
    }
    let snapshot = source.load()?;

    let issue_count = check_survey(&snapshot);

    let results = LiveResults::new(source, survey_id(&args, &snapshot), snapshot);

    let report = build_report(results.snapshot(), results.analytics().clone());
    write_report(&report, &config, &output)?;

    if progress {
        print_summary(&report, &output, start_time.elapsed().as_secs_f64());
    }

    let results = if args.follow {
        if results.survey_id().is_empty() {
            anyhow::bail!("Cannot follow without a survey id; pass --survey-id");
        }
        if progress {
            println!(
                "\n📡 Following survey {} (reading events from stdin)...",
                results.survey_id()
            );
        }

        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        live::follow(stdin, results, |latest| {
            let report = build_report(latest.snapshot(), latest.analytics().clone());
            write_report(&report, &config, &output)?;
            info!(
                "Report updated: {} responses",
                report.metadata.total_responses
            );
            Ok(())
        })
        .await?
    } else {
        results
    };

    if config.general.strict && issue_count > 0 {
        eprintln!(
            "\n⛔ {} validation issue(s) in survey {}. Failing (exit code 2).",
            issue_count,
            results.survey_id()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Log definition and response issues; returns how many were found.
fn check_survey(snapshot: &Snapshot) -> usize {
    let definition =
        validation::validate_definition(snapshot.survey.as_ref(), &snapshot.questions);
    for issue in &definition {
        warn!("{}", issue);
    }

    let mut response_issues = 0;
    for response in &snapshot.responses {
        for issue in validation::validate_response(&snapshot.questions, response) {
            debug!("{}", issue);
            response_issues += 1;
        }
    }
    if response_issues > 0 {
        warn!(
            "{} required answers missing across {} responses",
            response_issues,
            validation::incomplete_responses(&snapshot.questions, &snapshot.responses)
        );
    }

    definition.len() + response_issues
}

/// Survey id from the command line, else from the data.
fn survey_id(args: &Args, snapshot: &Snapshot) -> String {
    args.survey_id
        .clone()
        .or_else(|| snapshot.survey_id().map(String::from))
        .unwrap_or_default()
}

fn build_report(snapshot: &Snapshot, analytics: AnalyticsData) -> Report {
    let survey = snapshot.survey.clone().unwrap_or_default();

    let metadata = ReportMetadata {
        survey_id: snapshot.survey_id().unwrap_or_default().to_string(),
        survey_title: survey.title,
        is_active: survey.is_active,
        created_at: survey.created_at,
        generated_at: Utc::now(),
        total_responses: analytics.total_responses,
        question_count: snapshot.questions.len(),
        incomplete_responses: validation::incomplete_responses(
            &snapshot.questions,
            &snapshot.responses,
        ),
    };

    Report {
        metadata,
        analytics,
        questions: snapshot.questions.clone(),
        responses: snapshot.responses.clone(),
    }
}

fn render(report: &Report, config: &Config) -> Result<String> {
    let rendered = match config.report.format {
        OutputFormat::Markdown => {
            report::generate_markdown_report(report, &report::ReportOptions::from(&config.report))
        }
        OutputFormat::Json => report::generate_json_report(report)?,
        OutputFormat::Csv => report::generate_responses_csv(
            &report.questions,
            &report.responses,
            &report::ExportOptions::from(&config.export),
        ),
        OutputFormat::CsvSummary => report::generate_summary_csv(&report.analytics),
    };
    Ok(rendered)
}

fn write_report(report: &Report, config: &Config, output: &Path) -> Result<()> {
    let rendered = render(report, config)?;

    if output == Path::new("-") {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(rendered.as_bytes())
            .and_then(|_| stdout.flush())
            .context("Failed to write report to stdout")?;
        return Ok(());
    }

    std::fs::write(output, &rendered)
        .with_context(|| format!("Failed to write report to {}", output.display()))
}

fn print_summary(report: &Report, output: &Path, duration: f64) {
    let title = if report.metadata.survey_title.is_empty() {
        "(untitled)"
    } else {
        report.metadata.survey_title.as_str()
    };

    println!("\n📊 Survey Summary: {}", title);
    println!("   Questions: {}", report.metadata.question_count);
    println!("   Responses: {}", report.metadata.total_responses);
    if report.metadata.incomplete_responses > 0 {
        println!(
            "   ⚠️  Incomplete responses: {}",
            report.metadata.incomplete_responses
        );
    }
    println!("   Duration: {:.2}s", duration);
    println!("\n✅ Report saved to: {}", output.display());
}

/// Load configuration from file or use defaults, returning where it came from.
///
/// An explicit --config wins, then a file next to the survey data, then one
/// in the working directory. Runs before logging is set up.
fn load_config(args: &Args, source: &SurveySource) -> Result<(Config, Option<PathBuf>)> {
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, Some(config_path.clone())));
    }

    if let Some(dir) = source.base_dir().filter(|d| !d.as_os_str().is_empty()) {
        if let Some(config) = Config::load_from_dir(dir)? {
            return Ok((config, Some(dir.join(CONFIG_FILE))));
        }
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, Some(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => {
            eprintln!("⚠️  Failed to load config: {:#}", e);
            Ok((Config::default(), None))
        }
    }
}
