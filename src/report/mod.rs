//! Report rendering.
//!
//! Markdown and JSON results reports live in `generator`, CSV exports in
//! `csv`.

pub mod csv;
pub mod generator;

pub use csv::{generate_responses_csv, generate_summary_csv, ExportOptions};
pub use generator::{generate_json_report, generate_markdown_report, ReportOptions};
