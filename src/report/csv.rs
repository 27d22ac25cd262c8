//! CSV exports.
//!
//! Two exports are produced: the raw responses (one row per response, one
//! column per question) and a per-question summary of the analytics.

use crate::analysis::number::format_number;
use crate::models::{AnalyticsData, Question, Response, Summary};

/// Options for the CSV exports.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Header of the first column.
    pub timestamp_header: String,
    /// strftime pattern for the submission time.
    pub date_format: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            timestamp_header: "Submitted At".to_string(),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl From<&crate::config::ExportConfig> for ExportOptions {
    fn from(config: &crate::config::ExportConfig) -> Self {
        Self {
            timestamp_header: config.timestamp_header.clone(),
            date_format: config.date_format.clone(),
        }
    }
}

/// Quote a cell, doubling any embedded quotes.
fn cell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn row<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    cells
        .into_iter()
        .map(|c| cell(c.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Export every response as a row, questions as columns in report order.
///
/// Missing answers are empty cells; selections are joined with ", ".
pub fn generate_responses_csv(
    questions: &[Question],
    responses: &[Response],
    options: &ExportOptions,
) -> String {
    let mut lines = Vec::with_capacity(responses.len() + 1);

    lines.push(row(std::iter::once(options.timestamp_header.as_str())
        .chain(questions.iter().map(|q| q.text.as_str()))));

    for response in responses {
        let submitted = response
            .timestamp()
            .map(|t| t.format(&options.date_format).to_string())
            .unwrap_or_default();

        let answers = questions.iter().map(|q| {
            response
                .answer(&q.id)
                .map(|a| a.display())
                .unwrap_or_default()
        });

        lines.push(row(std::iter::once(submitted).chain(answers)));
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

/// Export the analytics, one row per question and value.
///
/// Frequency rows carry their share of the table total, which for
/// multiple-selection questions is the number of selections rather than
/// the number of responses.
pub fn generate_summary_csv(analytics: &AnalyticsData) -> String {
    let mut lines = vec![row([
        "question_id",
        "question",
        "type",
        "metric",
        "value",
        "count",
        "percentage",
    ])];

    for question in analytics.questions.values() {
        let prefix = [
            question.question_id.clone(),
            question.question_text.clone(),
            question.question_type.to_string(),
        ];
        let mut push = |metric: &str, value: String, count: String, share: String| {
            lines.push(row(prefix
                .iter()
                .cloned()
                .chain([metric.to_string(), value, count, share])));
        };

        match &question.summary {
            Summary::Frequencies(table) => {
                for (value, count) in table.iter() {
                    push(
                        "option",
                        value.to_string(),
                        count.to_string(),
                        format!("{:.1}", table.share(count)),
                    );
                }
            }
            Summary::Scale(scale) => {
                let count = scale.count.to_string();
                push("average", scale.average.clone(), count.clone(), String::new());
                let bound = |v: Option<f64>| v.map(format_number).unwrap_or_default();
                push("min", bound(scale.min), count.clone(), String::new());
                push("max", bound(scale.max), count, String::new());
            }
            Summary::Samples(samples) => {
                push(
                    "answered",
                    String::new(),
                    samples.count.to_string(),
                    String::new(),
                );
            }
        }
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}
