//! Markdown and JSON report generation.
//!
//! This module renders the computed analytics into a results report:
//! one section per question plus an optional table of every response.

use crate::analysis::number::{format_number, percentage};
use crate::analysis::{least_answered, response_rate};
use crate::models::{
    AnalyticsData, FrequencyTable, Question, QuestionAnalytics, Report, ReportMetadata, Response,
    SampleSummary, ScaleSummary, Summary,
};
use anyhow::Result;

/// Rendering options for the Markdown report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Append a table with every individual response.
    pub include_responses_table: bool,
    /// Question headers in the responses table are cut to this many characters.
    pub question_header_width: usize,
    /// strftime pattern for dates.
    pub date_format: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_responses_table: true,
            question_header_width: 30,
            date_format: "%d/%m/%Y %H:%M".to_string(),
        }
    }
}

impl From<&crate::config::ReportConfig> for ReportOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            include_responses_table: config.include_responses_table,
            question_header_width: config.question_header_width,
            date_format: config.date_format.clone(),
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportOptions) -> String {
    let mut output = String::new();

    let title = if report.metadata.survey_title.is_empty() {
        "Survey Results".to_string()
    } else {
        format!("{} - Results", escape_inline(&report.metadata.survey_title))
    };
    output.push_str(&format!("# {}\n\n", title));

    output.push_str(&generate_metadata_section(&report.metadata, options));
    output.push_str(&generate_table_of_contents(report, options));

    if report.analytics.total_responses == 0 {
        output.push_str("## Questions\n\n");
        output.push_str("No responses yet. Share the survey link to start collecting answers.\n\n");
    } else {
        output.push_str(&generate_questions_section(
            &report.analytics,
            &report.questions,
        ));
        output.push_str(&generate_attention_section(&report.analytics));
        if options.include_responses_table {
            output.push_str(&generate_responses_table(
                &report.questions,
                &report.responses,
                options,
            ));
        }
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    if !metadata.survey_id.is_empty() {
        section.push_str(&format!("- **Survey:** `{}`\n", metadata.survey_id));
    }
    section.push_str(&format!(
        "- **Status:** {}\n",
        if metadata.is_active { "Active" } else { "Inactive" }
    ));
    if let Some(created) = metadata.created_at {
        section.push_str(&format!(
            "- **Created:** {}\n",
            created.format(&options.date_format)
        ));
    }
    section.push_str(&format!(
        "- **Total Responses:** {}\n",
        metadata.total_responses
    ));
    section.push_str(&format!("- **Questions:** {}\n", metadata.question_count));
    if metadata.incomplete_responses > 0 {
        section.push_str(&format!(
            "- **Incomplete Responses:** {}\n",
            metadata.incomplete_responses
        ));
    }
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report, options: &ReportOptions) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Overview](#overview)\n");
    toc.push_str("- [Questions](#questions)\n");

    if report.analytics.total_responses > 0 {
        for (i, question) in report.analytics.questions.values().enumerate() {
            toc.push_str(&format!(
                "  - [{}. {}](#{})\n",
                i + 1,
                escape_inline(&question.question_text),
                question_anchor(question)
            ));
        }
        toc.push_str("- [Needs Attention](#needs-attention)\n");
        if options.include_responses_table {
            toc.push_str("- [All Responses](#all-responses)\n");
        }
    }

    toc.push('\n');

    toc
}

fn question_anchor(question: &QuestionAnalytics) -> String {
    format!(
        "question-{}",
        question
            .question_id
            .replace(['/', '.', ' ', '_'], "-")
            .to_lowercase()
    )
}

/// Generate one section per question.
fn generate_questions_section(analytics: &AnalyticsData, questions: &[Question]) -> String {
    let mut section = String::new();

    section.push_str("## Questions\n\n");

    for (i, question) in analytics.questions.values().enumerate() {
        let options = questions
            .iter()
            .find(|q| q.id == question.question_id)
            .map(Question::option_list)
            .unwrap_or(&[]);
        section.push_str(&generate_question_block(
            i + 1,
            question,
            options,
            analytics.total_responses,
        ));
    }

    section
}

/// Generate the block for a single question.
fn generate_question_block(
    position: usize,
    question: &QuestionAnalytics,
    options: &[String],
    total_responses: usize,
) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "### {}. {} {{#{}}}\n\n",
        position,
        escape_inline(&question.question_text),
        question_anchor(question)
    ));
    block.push_str(&format!(
        "*Type: {} | Answered: {} of {} ({:.1}%)*\n\n",
        question.question_type,
        question.responses.len(),
        total_responses,
        response_rate(question, total_responses)
    ));

    match &question.summary {
        Summary::Frequencies(table) => {
            block.push_str(&generate_frequency_table(table));
            block.push_str(&generate_unchosen_options(table, options));
        }
        Summary::Scale(scale) => block.push_str(&generate_scale_table(scale)),
        Summary::Samples(samples) => block.push_str(&generate_samples_list(samples)),
    }

    block.push_str("---\n\n");

    block
}

/// Counts with their share of all selections.
fn generate_frequency_table(table: &FrequencyTable) -> String {
    if table.is_empty() {
        return "_No answers yet._\n\n".to_string();
    }

    let mut section = String::new();

    section.push_str("| Answer | Count | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for (value, count) in table.iter() {
        section.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            escape_cell(value),
            count,
            table.share(count)
        ));
    }
    section.push('\n');

    if let Some((value, count)) = table.top() {
        section.push_str(&format!(
            "**Most chosen:** {} ({} of {})\n\n",
            escape_inline(value),
            count,
            table.total()
        ));
    }

    section
}

/// List declared options nobody picked.
fn generate_unchosen_options(table: &FrequencyTable, options: &[String]) -> String {
    if table.is_empty() {
        return String::new();
    }

    let unchosen: Vec<String> = options
        .iter()
        .filter(|option| table.get(option) == 0)
        .map(|option| escape_inline(option))
        .collect();

    if unchosen.is_empty() {
        String::new()
    } else {
        format!("**Not chosen:** {}\n\n", unchosen.join(", "))
    }
}

fn generate_scale_table(scale: &ScaleSummary) -> String {
    let bound = |value: Option<f64>| value.map(format_number).unwrap_or_else(|| "-".to_string());

    let mut section = String::new();
    section.push_str("| Average | Min | Max | Count |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        scale.average,
        bound(scale.min),
        bound(scale.max),
        scale.count
    ));
    section
}

fn generate_samples_list(samples: &SampleSummary) -> String {
    if samples.samples.is_empty() {
        return "_No answers yet._\n\n".to_string();
    }

    let mut section = String::new();
    section.push_str(&format!("Sample answers ({} total):\n\n", samples.count));
    for sample in &samples.samples {
        section.push_str(&format!("- {}\n", escape_inline(&sample.display())));
    }
    section.push('\n');
    section
}

/// Point out the questions with the lowest answer rates.
fn generate_attention_section(analytics: &AnalyticsData) -> String {
    let mut section = String::new();

    section.push_str("## Needs Attention\n\n");

    let skipped: Vec<_> = least_answered(analytics, 3)
        .into_iter()
        .filter(|q| q.responses.len() < analytics.total_responses)
        .collect();

    if skipped.is_empty() {
        section.push_str("Every question was answered in every response.\n\n");
        return section;
    }

    section.push_str("| Question | Answered | Rate |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for question in skipped {
        section.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            escape_cell(&question.question_text),
            question.responses.len(),
            percentage(question.responses.len(), analytics.total_responses)
        ));
    }
    section.push('\n');

    section
}

/// Generate a table with one row per response.
fn generate_responses_table(
    questions: &[Question],
    responses: &[Response],
    options: &ReportOptions,
) -> String {
    let mut section = String::new();

    section.push_str("## All Responses\n\n");

    section.push_str("| # | Submitted |");
    for question in questions {
        section.push_str(&format!(
            " {} |",
            escape_cell(&truncate(&question.text, options.question_header_width))
        ));
    }
    section.push('\n');

    section.push_str("|---:|:---|");
    for _ in questions {
        section.push_str(":---|");
    }
    section.push('\n');

    for (i, response) in responses.iter().enumerate() {
        let submitted = response
            .timestamp()
            .map(|t| t.format(&options.date_format).to_string())
            .unwrap_or_else(|| "-".to_string());
        section.push_str(&format!("| {} | {} |", i + 1, submitted));

        for question in questions {
            let cell = response
                .answer(&question.id)
                .map(|a| a.display())
                .unwrap_or_else(|| "-".to_string());
            section.push_str(&format!(" {} |", escape_cell(&cell)));
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

/// Cut text to `width` characters, marking the cut with "...".
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn escape_inline(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn escape_cell(text: &str) -> String {
    escape_inline(text).replace('|', "\\|")
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by surveystat v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compute_analytics;
    use crate::source::Snapshot;
    use chrono::{TimeZone, Utc};

    const SAMPLE: &str = include_str!("../../fixtures/sample_survey.json");

    fn create_test_report() -> Report {
        let mut snapshot: Snapshot = serde_json::from_str(SAMPLE).unwrap();
        snapshot.sort_questions();
        let analytics = compute_analytics(&snapshot.questions, &snapshot.responses);
        let survey = snapshot.survey.clone().unwrap_or_default();

        Report {
            metadata: ReportMetadata {
                survey_id: survey.id,
                survey_title: survey.title,
                is_active: survey.is_active,
                created_at: survey.created_at,
                generated_at: Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap(),
                total_responses: analytics.total_responses,
                question_count: snapshot.questions.len(),
                incomplete_responses: 1,
            },
            analytics,
            questions: snapshot.questions,
            responses: snapshot.responses,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportOptions::default());

        assert!(markdown.contains("# Team Offsite Feedback - Results"));
        assert!(markdown.contains("## Overview"));
        assert!(markdown.contains("- **Total Responses:** 4"));
        assert!(markdown.contains("- **Incomplete Responses:** 1"));
        assert!(markdown.contains("### 1. Your name"));
        assert!(markdown.contains("| Engineering | 2 | 66.7% |"));
        assert!(markdown.contains("**Most chosen:** Engineering (2 of 3)"));
        assert!(markdown.contains("**Not chosen:** Product"));
        assert!(markdown.contains("| 4.00 | 3 | 5 | 3 |"));
        assert!(markdown.contains("## All Responses"));
    }

    #[test]
    fn test_selection_share_uses_selection_total() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportOptions::default());

        // 4 selections across the topics question: Hackathon chosen twice
        assert!(markdown.contains("| Hackathon | 2 | 50.0% |"));
        assert!(markdown.contains("| Roadmap | 1 | 25.0% |"));
    }

    #[test]
    fn test_responses_table_can_be_disabled() {
        let report = create_test_report();
        let options = ReportOptions {
            include_responses_table: false,
            ..ReportOptions::default()
        };
        let markdown = generate_markdown_report(&report, &options);

        assert!(!markdown.contains("## All Responses"));
        assert!(!markdown.contains("(#all-responses)"));
    }

    #[test]
    fn test_responses_table_cells() {
        let report = create_test_report();
        let table = generate_responses_table(
            &report.questions,
            &report.responses,
            &ReportOptions::default(),
        );

        assert!(table.contains("| How would you rate the venue? |"));
        assert!(table.contains("| Which topics should we repeat? |"));
        assert!(table.contains("| 2 | 02/03/2024 14:30 |"));
        assert!(table.contains("Roadmap, Hackathon"));
        // r4 has no timestamp and an empty name
        assert!(table.contains("| 4 | - | - |"));
    }

    #[test]
    fn test_empty_survey_report() {
        let mut report = create_test_report();
        report.responses.clear();
        report.analytics = compute_analytics(&report.questions, &[]);
        report.metadata.total_responses = 0;

        let markdown = generate_markdown_report(&report, &ReportOptions::default());
        assert!(markdown.contains("No responses yet."));
        assert!(!markdown.contains("## Needs Attention"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 30), "short");
        assert_eq!(
            truncate("How likely are you to recommend us to a friend?", 30),
            "How likely are you to recommen..."
        );
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b c");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["totalResponses"], 4);
        assert_eq!(value["metadata"]["surveyTitle"], "Team Offsite Feedback");
        assert_eq!(value["questions"]["q-track"]["summary"]["Engineering"], 2);
        assert_eq!(value["questions"]["q-rating"]["summary"]["average"], "4.00");
    }
}
