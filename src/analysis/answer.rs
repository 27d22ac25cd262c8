//! Typed answer values.
//!
//! The backend stores each answer as whatever JSON the respondent's form
//! produced. `Answer` gives that JSON a closed set of shapes and the
//! coercions each question type needs.

use super::number::{coerce_str, format_number, json_number};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::Value;

/// A single non-empty answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Selected options of a multiple-selection question.
    List(Vec<Answer>),
    /// Nested objects and nulls inside lists.
    Other(Value),
}

impl Answer {
    /// Build an answer from raw JSON.
    ///
    /// Returns `None` for `null` and the empty string; those are treated as
    /// "not answered" everywhere.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            _ => Some(Self::from_present(value)),
        }
    }

    fn from_present(value: &Value) -> Self {
        match value {
            Value::String(s) => Answer::Text(s.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) => Answer::Number(f),
                None => Answer::Other(value.clone()),
            },
            Value::Bool(b) => Answer::Bool(*b),
            Value::Array(items) => Answer::List(items.iter().map(Self::from_present).collect()),
            Value::Null | Value::Object(_) => Answer::Other(value.clone()),
        }
    }

    /// Key used in frequency tables.
    pub fn frequency_key(&self) -> String {
        match self {
            Answer::Text(s) => s.clone(),
            Answer::Number(n) => format_number(*n),
            Answer::Bool(b) => b.to_string(),
            Answer::List(items) => items
                .iter()
                .map(Answer::frequency_key)
                .collect::<Vec<_>>()
                .join(","),
            Answer::Other(Value::Null) => String::new(),
            Answer::Other(v) => v.to_string(),
        }
    }

    /// Numeric reading for scale questions, `None` when not a finite number.
    ///
    /// Lists read through their comma-joined text, so an empty list is zero,
    /// a one-element list is its element and anything longer is invalid.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Answer::Text(s) => coerce_str(s),
            Answer::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Answer::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Answer::List(_) => coerce_str(&self.frequency_key()),
            Answer::Other(_) => None,
        }
    }

    /// Individual selections of a multiple-selection answer.
    ///
    /// Lists contribute one selection per element. Text is split on commas
    /// and trimmed. Empty selections are dropped.
    pub fn selections(&self) -> Vec<String> {
        let selections: Vec<String> = match self {
            Answer::List(items) => items.iter().map(Answer::frequency_key).collect(),
            Answer::Text(s) => s.split(',').map(|part| part.trim().to_string()).collect(),
            other => vec![other.frequency_key()],
        };

        selections.into_iter().filter(|s| !s.is_empty()).collect()
    }

    /// Human-readable rendering for tables and exports.
    pub fn display(&self) -> String {
        match self {
            Answer::List(items) => items
                .iter()
                .map(Answer::display)
                .collect::<Vec<_>>()
                .join(", "),
            other => other.frequency_key(),
        }
    }
}

impl Serialize for Answer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Answer::Text(s) => serializer.serialize_str(s),
            Answer::Number(n) => json_number(*n).serialize(serializer),
            Answer::Bool(b) => serializer.serialize_bool(*b),
            Answer::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Answer::Other(v) => v.serialize(serializer),
        }
    }
}
