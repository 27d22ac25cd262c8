//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::source::{ResponsesSource, SurveySource};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SurveyStat - survey response analytics
///
/// Summarize every question of a survey (answer counts, scale averages,
/// sample answers) and write a Markdown, JSON or CSV report.
///
/// Examples:
///   surveystat --snapshot survey.json
///   surveystat --snapshot survey.json --format json -o results.json
///   surveystat --questions questions.json --responses-dir responses/
///   tail -f events.ndjson | surveystat --snapshot survey.json --follow
///   surveystat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Snapshot file holding the survey, its questions and its responses
    #[arg(
        short,
        long,
        value_name = "FILE",
        conflicts_with = "questions",
        required_unless_present_any = ["questions", "init_config"]
    )]
    pub snapshot: Option<PathBuf>,

    /// Questions file (bare array or `{ "data": [...] }`)
    #[arg(long, value_name = "FILE")]
    pub questions: Option<PathBuf>,

    /// Responses file, used with --questions
    #[arg(long, value_name = "FILE", conflicts_with = "responses_dir")]
    pub responses: Option<PathBuf>,

    /// Directory of response files (*.json, searched recursively), used with --questions
    #[arg(long, value_name = "DIR")]
    pub responses_dir: Option<PathBuf>,

    /// Survey id to follow
    ///
    /// Defaults to the id found in the snapshot or the questions.
    #[arg(long, value_name = "ID")]
    pub survey_id: Option<String>,

    /// Output file path for the report, `-` for stdout
    ///
    /// Defaults to survey_results.<ext> or the config file setting.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_name = "FORMAT", env = "SURVEYSTAT_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .surveystat.toml next to the input, then
    /// in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when the survey definition or responses have issues
    #[arg(long)]
    pub strict: bool,

    /// Leave the table of individual responses out of the Markdown report
    #[arg(long)]
    pub no_responses_table: bool,

    /// Keep running and update the report for each push event read from stdin
    ///
    /// Events are newline-delimited JSON: {"channel", "event", "data"}.
    #[arg(long)]
    pub follow: bool,

    /// Generate a default .surveystat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Markdown report (default)
    #[default]
    Markdown,
    /// Full analytics as JSON
    Json,
    /// One row per response
    Csv,
    /// One row per question and value
    CsvSummary,
}

impl OutputFormat {
    /// File extension for reports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Csv | OutputFormat::CsvSummary => "csv",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.questions.is_some() && self.responses.is_none() && self.responses_dir.is_none() {
            return Err("--questions needs --responses or --responses-dir".to_string());
        }
        if self.snapshot.is_some() && (self.responses.is_some() || self.responses_dir.is_some()) {
            return Err("--responses and --responses-dir are used with --questions".to_string());
        }

        if let Some(ref dir) = self.responses_dir {
            if !dir.is_dir() {
                return Err(format!(
                    "Responses directory does not exist: {}",
                    dir.display()
                ));
            }
        }

        if let Some(ref id) = self.survey_id {
            if id.trim().is_empty() {
                return Err("Survey id must not be blank".to_string());
            }
        }

        Ok(())
    }

    /// Where to read the survey from, if the arguments name one.
    pub fn source(&self) -> Option<SurveySource> {
        if let Some(ref snapshot) = self.snapshot {
            return Some(SurveySource::Snapshot(snapshot.clone()));
        }

        let questions = self.questions.clone()?;
        let responses = match (&self.responses, &self.responses_dir) {
            (Some(file), _) => ResponsesSource::File(file.clone()),
            (None, Some(dir)) => ResponsesSource::Directory(dir.clone()),
            (None, None) => return None,
        };
        Some(SurveySource::Files {
            questions,
            responses,
        })
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the config file's `verbose` setting; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
