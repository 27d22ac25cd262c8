//! Data models for survey analytics.
//!
//! This module contains the survey, question and response records as the
//! backend delivers them, plus the derived analytics structures built from
//! them.

use crate::analysis::answer::Answer;
use crate::analysis::number::{percentage, serialize_optional_number};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// Kind of question, which decides how its answers are summarized.
///
/// Both the upper-case names and the backend's lower-case spelling are
/// accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    /// Free-form text answer
    #[default]
    #[serde(alias = "text")]
    Text,
    /// Exactly one option out of a list
    #[serde(alias = "multiple_choice")]
    MultipleChoice,
    /// Any number of options out of a list
    #[serde(alias = "multiple_selection")]
    MultipleSelection,
    /// Yes or no
    #[serde(alias = "yes_no")]
    YesNo,
    /// Integer rating between a minimum and a maximum
    #[serde(alias = "scale")]
    Scale,
    /// Calendar date
    #[serde(alias = "date")]
    Date,
    /// Anything the backend sends that we do not recognise
    #[serde(other)]
    Unknown,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Text => write!(f, "Text"),
            QuestionType::MultipleChoice => write!(f, "Multiple choice"),
            QuestionType::MultipleSelection => write!(f, "Multiple selection"),
            QuestionType::YesNo => write!(f, "Yes/No"),
            QuestionType::Scale => write!(f, "Scale"),
            QuestionType::Date => write!(f, "Date"),
            QuestionType::Unknown => write!(f, "Unknown"),
        }
    }
}

impl QuestionType {
    /// Whether questions of this type must declare options.
    pub fn needs_options(&self) -> bool {
        matches!(
            self,
            QuestionType::MultipleChoice | QuestionType::MultipleSelection
        )
    }
}

/// Legacy location of scale bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// A single question of a survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique identifier within the survey.
    pub id: String,
    /// Owning survey, when the backend includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_id: Option<String>,
    /// Prompt shown to the respondent.
    #[serde(default)]
    pub text: String,
    /// Kind of question.
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    /// Display and report position (ascending).
    #[serde(default)]
    pub order: i64,
    /// Options for choice and selection questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Lower bound of a scale question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Upper bound of a scale question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Whether a respondent must answer.
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<QuestionValidation>,
}

impl Question {
    /// Effective scale bounds; top-level `min`/`max` win over `validation`.
    pub fn scale_bounds(&self) -> (Option<i64>, Option<i64>) {
        let legacy = self.validation.as_ref();
        let min = self.min.or_else(|| legacy.and_then(|v| v.min));
        let max = self.max.or_else(|| legacy.and_then(|v| v.max));
        (min, max)
    }

    /// Declared options, empty when there are none.
    pub fn option_list(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }
}

/// One respondent's submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_id: Option<String>,
    /// Raw answers keyed by question id.
    #[serde(default, deserialize_with = "deserialize_answers")]
    pub answers: HashMap<String, Value>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Response {
    /// The answer to a question, `None` when absent, null or empty.
    pub fn answer(&self, question_id: &str) -> Option<Answer> {
        self.answers.get(question_id).and_then(Answer::from_value)
    }

    /// Submission time, falling back to the creation time.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.submitted_at.or(self.created_at)
    }
}

/// Survey header information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub response_count: u64,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

fn deserialize_answers<'de, D>(deserializer: D) -> Result<HashMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(parse_timestamp(&raw))
}

/// Read a timestamp in any of the shapes the backend emits.
///
/// Accepts RFC 3339 strings, naive date-times and dates (taken as UTC),
/// epoch milliseconds, and `{ "_seconds", "_nanoseconds" }` objects.
pub fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(naive.and_utc());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::Object(map) => {
            let seconds = map
                .get("_seconds")
                .or_else(|| map.get("seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("_nanoseconds")
                .or_else(|| map.get("nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, nanos as u32).single()
        }
        _ => None,
    }
}

/// Occurrence counts keyed by answer value, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    counts: IndexMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `key`.
    pub fn increment(&mut self, key: String) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Count for a key, zero when never seen.
    pub fn get(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(key, count)| (key.as_str(), *count))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts; the denominator for percentages.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Share of a single count in the table total, in percent.
    pub fn share(&self, count: usize) -> f64 {
        percentage(count, self.total())
    }

    /// The most frequent entry; ties go to the one seen first.
    pub fn top(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (key, count) in self.iter() {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((key, count));
            }
        }
        best
    }
}

/// Statistics for a scale question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleSummary {
    /// Arithmetic mean with exactly two decimals; "0.00" with no values.
    pub average: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub min: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub max: Option<f64>,
    /// Number of answers that read as numbers.
    pub count: usize,
}

/// Count and leading samples for free-form questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSummary {
    pub count: usize,
    pub samples: Vec<Answer>,
}

/// Type-dependent summary of one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Summary {
    Frequencies(FrequencyTable),
    Scale(ScaleSummary),
    Samples(SampleSummary),
}

/// Analytics for a single question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalytics {
    pub question_id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    /// Every non-empty answer, in response order.
    pub responses: Vec<Answer>,
    pub summary: Summary,
}

/// Analytics for a whole survey.
///
/// `questions` is keyed by question id and keeps the order the questions
/// were supplied in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    /// Number of response records, answered or not.
    pub total_responses: usize,
    pub questions: IndexMap<String, QuestionAnalytics>,
}

impl AnalyticsData {
    /// Insert analytics, replacing an earlier entry for the same id in place.
    pub fn insert(&mut self, analytics: QuestionAnalytics) {
        self.questions
            .insert(analytics.question_id.clone(), analytics);
    }
}

/// Metadata about a results report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub survey_id: String,
    pub survey_title: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
    pub total_responses: usize,
    pub question_count: usize,
    /// Responses missing at least one required answer.
    pub incomplete_responses: usize,
}

/// A complete results report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub analytics: AnalyticsData,
    #[serde(skip)]
    pub questions: Vec<Question>,
    #[serde(skip)]
    pub responses: Vec<Response>,
}
