//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.surveystat.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up next to the input and in the
/// working directory.
pub const CONFIG_FILE: &str = ".surveystat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// CSV export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Exit with code 2 when validation finds issues.
    #[serde(default)]
    pub strict: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            strict: false,
        }
    }
}

fn default_output() -> String {
    "survey_results.md".to_string()
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format used when none is given on the command line.
    #[serde(default)]
    pub format: OutputFormat,

    /// Append a table with every individual response.
    #[serde(default = "default_true")]
    pub include_responses_table: bool,

    /// Width at which question headers are cut in the responses table.
    #[serde(default = "default_header_width")]
    pub question_header_width: usize,

    /// strftime pattern for dates in the report.
    #[serde(default = "default_report_date_format")]
    pub date_format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_responses_table: true,
            question_header_width: default_header_width(),
            date_format: default_report_date_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_header_width() -> usize {
    30
}

fn default_report_date_format() -> String {
    "%d/%m/%Y %H:%M".to_string()
}

/// CSV export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Header of the submission time column.
    #[serde(default = "default_timestamp_header")]
    pub timestamp_header: String,

    /// strftime pattern for the submission time.
    #[serde(default = "default_export_date_format")]
    pub date_format: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            timestamp_header: default_timestamp_header(),
            date_format: default_export_date_format(),
        }
    }
}

fn default_timestamp_header() -> String {
    "Submitted At".to_string()
}

fn default_export_date_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the working directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from the directory holding the survey data.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }

        // Flags can only switch settings on
        if args.verbose {
            self.general.verbose = true;
        }
        if args.strict {
            self.general.strict = true;
        }
        if args.no_responses_table {
            self.report.include_responses_table = false;
        }
    }

    /// Where the report goes. `-` means stdout.
    ///
    /// The default file name follows the chosen format.
    pub fn output_path(&self) -> PathBuf {
        let output = PathBuf::from(&self.general.output);
        if self.general.output == default_output() {
            output.with_extension(self.report.format.extension())
        } else {
            output
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "survey_results.md");
        assert_eq!(config.report.format, OutputFormat::Markdown);
        assert!(config.report.include_responses_table);
        assert_eq!(config.report.question_header_width, 30);
        assert_eq!(config.export.timestamp_header, "Submitted At");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "offsite.json"
strict = true

[report]
format = "json"
question_header_width = 20
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "offsite.json");
        assert!(config.general.strict);
        assert!(!config.general.verbose);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.question_header_width, 20);
        // untouched keys keep their defaults
        assert!(config.report.include_responses_table);
        assert_eq!(config.report.date_format, "%d/%m/%Y %H:%M");
        assert_eq!(config.export.date_format, "%Y-%m-%d %H:%M:%S");
    }

    #[test]
    fn test_output_path_follows_format() {
        let mut config = Config::default();
        assert_eq!(config.output_path(), PathBuf::from("survey_results.md"));

        config.report.format = OutputFormat::CsvSummary;
        assert_eq!(config.output_path(), PathBuf::from("survey_results.csv"));

        config.general.output = "-".to_string();
        assert_eq!(config.output_path(), PathBuf::from("-"));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[export]\ntimestamp_header = \"When\"\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.export.timestamp_header, "When");

        std::fs::write(dir.path().join(CONFIG_FILE), "[report\n").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("[export]"));
        assert!(toml_str.contains("format = \"markdown\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.report.question_header_width, 30);
    }
}
