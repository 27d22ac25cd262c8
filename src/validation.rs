//! Survey definition and response checks.
//!
//! These mirror the rules of the survey builder and the public response
//! form. They only report problems; aggregation runs on whatever data is
//! there.

use crate::analysis::answer::Answer;
use crate::models::{Question, QuestionType, Response, Survey};
use std::collections::HashSet;
use thiserror::Error;

/// Longest survey title the builder accepts.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Problem with how a survey or its questions are defined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionIssue {
    #[error("Survey title is required")]
    MissingTitle,

    #[error("Survey title is {actual} characters long (max {max})")]
    TitleTooLong { actual: usize, max: usize },

    #[error("Survey has no questions")]
    NoQuestions,

    #[error("Question '{question_id}' has no text")]
    MissingText { question_id: String },

    #[error("Question '{question_id}' needs at least one option")]
    MissingOptions { question_id: String },

    #[error("Question '{question_id}' has a blank option at position {position}")]
    BlankOption { question_id: String, position: usize },

    #[error("Scale question '{question_id}' needs both a minimum and a maximum")]
    MissingScaleBounds { question_id: String },

    #[error("Scale question '{question_id}' has min {min} not below max {max}")]
    InvalidScaleRange {
        question_id: String,
        min: i64,
        max: i64,
    },

    #[error("Question id '{question_id}' is used more than once")]
    DuplicateId { question_id: String },
}

/// Problem with a single submitted response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseIssue {
    #[error("Response '{response_id}' has no answer to required question '{question_id}'")]
    MissingRequired {
        response_id: String,
        question_id: String,
    },
}

/// Check a survey definition.
pub fn validate_definition(survey: Option<&Survey>, questions: &[Question]) -> Vec<DefinitionIssue> {
    let mut issues = Vec::new();

    if let Some(survey) = survey {
        let title = survey.title.trim();
        if title.is_empty() {
            issues.push(DefinitionIssue::MissingTitle);
        } else if title.chars().count() > MAX_TITLE_LENGTH {
            issues.push(DefinitionIssue::TitleTooLong {
                actual: title.chars().count(),
                max: MAX_TITLE_LENGTH,
            });
        }
    }

    if questions.is_empty() {
        issues.push(DefinitionIssue::NoQuestions);
    }

    let mut seen = HashSet::new();
    for question in questions {
        if !seen.insert(question.id.as_str()) {
            issues.push(DefinitionIssue::DuplicateId {
                question_id: question.id.clone(),
            });
        }
        issues.extend(validate_question(question));
    }

    issues
}

/// Check a single question.
pub fn validate_question(question: &Question) -> Vec<DefinitionIssue> {
    let mut issues = Vec::new();
    let question_id = || question.id.clone();

    if question.text.trim().is_empty() {
        issues.push(DefinitionIssue::MissingText {
            question_id: question_id(),
        });
    }

    if question.question_type.needs_options() {
        let options = question.option_list();
        if options.is_empty() {
            issues.push(DefinitionIssue::MissingOptions {
                question_id: question_id(),
            });
        }
        for (i, option) in options.iter().enumerate() {
            if option.trim().is_empty() {
                issues.push(DefinitionIssue::BlankOption {
                    question_id: question_id(),
                    position: i + 1,
                });
            }
        }
    }

    if question.question_type == QuestionType::Scale {
        match question.scale_bounds() {
            (Some(min), Some(max)) if min >= max => {
                issues.push(DefinitionIssue::InvalidScaleRange {
                    question_id: question_id(),
                    min,
                    max,
                });
            }
            (Some(_), Some(_)) => {}
            _ => issues.push(DefinitionIssue::MissingScaleBounds {
                question_id: question_id(),
            }),
        }
    }

    issues
}

/// Check that every required question has an answer.
///
/// An empty selection list counts as unanswered.
pub fn validate_response(questions: &[Question], response: &Response) -> Vec<ResponseIssue> {
    questions
        .iter()
        .filter(|q| q.required)
        .filter(|q| match response.answer(&q.id) {
            None => true,
            Some(Answer::List(items)) => items.is_empty(),
            Some(_) => false,
        })
        .map(|q| ResponseIssue::MissingRequired {
            response_id: response.id.clone(),
            question_id: q.id.clone(),
        })
        .collect()
}

/// Number of responses missing at least one required answer.
pub fn incomplete_responses(questions: &[Question], responses: &[Response]) -> usize {
    responses
        .iter()
        .filter(|r| !validate_response(questions, r).is_empty())
        .count()
}
