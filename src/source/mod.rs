//! Survey snapshot loading.
//!
//! This module reads the survey, question and response JSON exported from
//! the backend. Files may hold bare arrays or the backend's
//! `{ "data": [...] }` envelope, and responses may also be spread over a
//! directory with one file per response.

use crate::models::{Question, Response, Survey};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Everything needed to compute analytics for one survey.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub survey: Option<Survey>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub responses: Vec<Response>,
}

impl Snapshot {
    /// Survey id from the survey header, falling back to the questions.
    pub fn survey_id(&self) -> Option<&str> {
        self.survey
            .as_ref()
            .map(|s| s.id.as_str())
            .filter(|id| !id.is_empty())
            .or_else(|| {
                self.questions
                    .iter()
                    .find_map(|q| q.survey_id.as_deref())
            })
    }

    /// Sort questions by their `order` field, keeping ties stable.
    pub fn sort_questions(&mut self) {
        self.questions.sort_by_key(|q| q.order);
    }
}

/// A list either bare or wrapped in a `data` field.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Envelope<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Envelope::Bare(items) => items,
            Envelope::Wrapped { data } => data,
        }
    }
}

/// Where responses come from.
#[derive(Debug, Clone)]
pub enum ResponsesSource {
    File(PathBuf),
    Directory(PathBuf),
}

/// Where a snapshot comes from; kept around so it can be reloaded.
#[derive(Debug, Clone)]
pub enum SurveySource {
    Snapshot(PathBuf),
    Files {
        questions: PathBuf,
        responses: ResponsesSource,
    },
}

impl SurveySource {
    /// Load the snapshot, with questions sorted by `order`.
    pub fn load(&self) -> Result<Snapshot> {
        let mut snapshot = match self {
            SurveySource::Snapshot(path) => load_snapshot(path)?,
            SurveySource::Files {
                questions,
                responses,
            } => Snapshot {
                survey: None,
                questions: load_questions(questions)?,
                responses: match responses {
                    ResponsesSource::File(path) => load_responses(path)?,
                    ResponsesSource::Directory(dir) => load_responses_dir(dir)?,
                },
            },
        };

        snapshot.sort_questions();
        info!(
            "Loaded {} questions and {} responses",
            snapshot.questions.len(),
            snapshot.responses.len()
        );
        Ok(snapshot)
    }

    /// Directory the input lives in, used to look for a config file.
    pub fn base_dir(&self) -> Option<&Path> {
        match self {
            SurveySource::Snapshot(path) => path.parent(),
            SurveySource::Files { questions, .. } => questions.parent(),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load a combined snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    debug!("Reading snapshot from {}", path.display());
    read_json(path)
}

/// Load a question list.
pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    debug!("Reading questions from {}", path.display());
    Ok(read_json::<Envelope<Question>>(path)?.into_vec())
}

/// Load a response list.
pub fn load_responses(path: &Path) -> Result<Vec<Response>> {
    debug!("Reading responses from {}", path.display());
    Ok(read_json::<Envelope<Response>>(path)?.into_vec())
}

/// Load every `*.json` file under a directory as responses.
///
/// Files are read in path order. A file that cannot be parsed is skipped
/// with a warning so one bad export does not hide the rest.
pub fn load_responses_dir(dir: &Path) -> Result<Vec<Response>> {
    if !dir.is_dir() {
        return Err(anyhow::anyhow!("Not a directory: {}", dir.display()));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Cannot read entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut responses = Vec::new();
    for path in &paths {
        match read_json::<Value>(path).and_then(|value| responses_in_file(path, value)) {
            Ok(found) => responses.extend(found),
            Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
        }
    }

    debug!(
        "Read {} responses from {} files in {}",
        responses.len(),
        paths.len(),
        dir.display()
    );
    Ok(responses)
}

/// Responses held by one file of a responses directory.
///
/// A single object must carry `answers` to count as a response. In a list,
/// each element is read on its own and a malformed one is skipped.
fn responses_in_file(path: &Path, value: Value) -> Result<Vec<Response>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if map.contains_key("answers") {
                vec![Value::Object(map)]
            } else if let Some(Value::Array(items)) = map.remove("data") {
                items
            } else {
                anyhow::bail!("no response found");
            }
        }
        _ => anyhow::bail!("expected a response or a list of responses"),
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<Response>(item) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("Skipping response {} in {}: {}", i + 1, path.display(), e);
                None
            }
        })
        .collect())
}
