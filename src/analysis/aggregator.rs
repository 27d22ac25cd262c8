//! Response aggregation and statistics.
//!
//! This module turns a survey's questions and responses into per-question
//! summaries. It never fails: answers that are missing or cannot be read
//! for the question's type are left out of the counts.

use crate::analysis::answer::Answer;
use crate::analysis::number::{percentage, to_fixed_2};
use crate::models::{
    AnalyticsData, FrequencyTable, Question, QuestionAnalytics, QuestionType, Response,
    SampleSummary, ScaleSummary, Summary,
};
use indexmap::IndexMap;
use tracing::debug;

/// Number of answers kept as samples for free-form questions.
pub const SAMPLE_LIMIT: usize = 5;

/// Compute analytics for every question, in the order given.
///
/// Callers are expected to have sorted `questions` by their `order` field.
/// A repeated question id replaces the earlier entry in its original slot.
pub fn compute_analytics(questions: &[Question], responses: &[Response]) -> AnalyticsData {
    let mut analytics = AnalyticsData {
        total_responses: responses.len(),
        questions: IndexMap::with_capacity(questions.len()),
    };

    for question in questions {
        analytics.insert(analyze_question(question, responses));
    }

    debug!(
        "Aggregated {} questions over {} responses",
        analytics.questions.len(),
        analytics.total_responses
    );

    analytics
}

/// Compute analytics for a single question.
pub fn analyze_question(question: &Question, responses: &[Response]) -> QuestionAnalytics {
    let answers = collect_answers(&question.id, responses);
    let summary = summarize(question.question_type, &answers);

    QuestionAnalytics {
        question_id: question.id.clone(),
        question_text: question.text.clone(),
        question_type: question.question_type,
        responses: answers,
        summary,
    }
}

/// Non-empty answers to a question, in response order.
pub fn collect_answers(question_id: &str, responses: &[Response]) -> Vec<Answer> {
    responses
        .iter()
        .filter_map(|response| response.answer(question_id))
        .collect()
}

/// Summarize answers according to the question type.
pub fn summarize(question_type: QuestionType, answers: &[Answer]) -> Summary {
    match question_type {
        QuestionType::MultipleChoice | QuestionType::YesNo => {
            Summary::Frequencies(count_choices(answers))
        }
        QuestionType::MultipleSelection => Summary::Frequencies(count_selections(answers)),
        QuestionType::Scale => Summary::Scale(scale_summary(answers)),
        QuestionType::Text | QuestionType::Date | QuestionType::Unknown => {
            Summary::Samples(sample_summary(answers))
        }
    }
}

/// One count per answer. Values outside the declared options still count.
pub fn count_choices(answers: &[Answer]) -> FrequencyTable {
    let mut table = FrequencyTable::new();
    for answer in answers {
        table.increment(answer.frequency_key());
    }
    table
}

/// One count per selected option, so a response can count several times.
pub fn count_selections(answers: &[Answer]) -> FrequencyTable {
    let mut table = FrequencyTable::new();
    for selection in answers.iter().flat_map(Answer::selections) {
        table.increment(selection);
    }
    table
}

/// Mean, bounds and count over the answers that read as numbers.
pub fn scale_summary(answers: &[Answer]) -> ScaleSummary {
    let values: Vec<f64> = answers.iter().filter_map(Answer::to_number).collect();

    if values.is_empty() {
        return ScaleSummary {
            average: to_fixed_2(0.0),
            min: None,
            max: None,
            count: 0,
        };
    }

    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    ScaleSummary {
        average: to_fixed_2(sum / values.len() as f64),
        min: Some(min),
        max: Some(max),
        count: values.len(),
    }
}

/// Count plus the first few answers.
pub fn sample_summary(answers: &[Answer]) -> SampleSummary {
    SampleSummary {
        count: answers.len(),
        samples: answers.iter().take(SAMPLE_LIMIT).cloned().collect(),
    }
}

/// Share of all responses that answered this question, in percent.
pub fn response_rate(question: &QuestionAnalytics, total_responses: usize) -> f64 {
    percentage(question.responses.len(), total_responses)
}

/// Questions with the fewest answers first; ties keep report order.
pub fn least_answered(analytics: &AnalyticsData, n: usize) -> Vec<&QuestionAnalytics> {
    let mut questions: Vec<&QuestionAnalytics> = analytics.questions.values().collect();
    questions.sort_by_key(|q| q.responses.len());
    questions.truncate(n);
    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn question(id: &str, question_type: QuestionType) -> Question {
        Question {
            id: id.to_string(),
            survey_id: None,
            text: format!("Question {}", id),
            question_type,
            order: 0,
            options: None,
            min: None,
            max: None,
            required: false,
            validation: None,
        }
    }

    fn entry<'a>(analytics: &'a AnalyticsData, id: &str) -> &'a QuestionAnalytics {
        analytics.questions.get(id).unwrap()
    }

    fn responses(answers: Vec<Value>) -> Vec<Response> {
        answers
            .into_iter()
            .enumerate()
            .map(|(i, answers)| {
                serde_json::from_value(json!({ "id": format!("r{}", i), "answers": answers }))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_scale_scenario() {
        let mut q1 = question("q1", QuestionType::Scale);
        q1.min = Some(1);
        q1.max = Some(5);
        let responses = responses(vec![
            json!({ "q1": 3 }),
            json!({ "q1": 5 }),
            json!({ "q1": "x" }),
        ]);

        let analytics = compute_analytics(&[q1], &responses);
        let q1 = entry(&analytics, "q1");

        assert_eq!(
            q1.summary,
            Summary::Scale(ScaleSummary {
                average: "4.00".to_string(),
                min: Some(3.0),
                max: Some(5.0),
                count: 2,
            })
        );
        assert_eq!(q1.responses.len(), 3);
        assert_eq!(
            serde_json::to_value(&q1.summary).unwrap(),
            json!({ "average": "4.00", "min": 3, "max": 5, "count": 2 })
        );
    }

    #[test]
    fn test_multiple_selection_scenario() {
        let mut q1 = question("q1", QuestionType::MultipleSelection);
        q1.options = Some(vec!["A".to_string(), "B".to_string()]);
        let responses = responses(vec![json!({ "q1": ["A", "B"] }), json!({ "q1": "A" })]);

        let analytics = compute_analytics(&[q1], &responses);
        let summary = &entry(&analytics, "q1").summary;

        assert_eq!(serde_json::to_value(summary).unwrap(), json!({ "A": 2, "B": 1 }));
        if let Summary::Frequencies(table) = summary {
            // sum of counts exceeds the number of answers
            assert_eq!(table.total(), 3);
            assert_eq!(table.share(2), 2.0 / 3.0 * 100.0);
        } else {
            panic!("expected a frequency table");
        }
    }

    #[test]
    fn test_empty_responses_scenario() {
        let analytics = compute_analytics(&[question("q1", QuestionType::Text)], &[]);

        assert_eq!(
            serde_json::to_value(&analytics).unwrap(),
            json!({
                "totalResponses": 0,
                "questions": {
                    "q1": {
                        "questionId": "q1",
                        "questionText": "Question q1",
                        "questionType": "TEXT",
                        "responses": [],
                        "summary": { "count": 0, "samples": [] }
                    }
                }
            })
        );
    }

    #[test]
    fn test_total_responses_ignores_completeness() {
        let responses = responses(vec![json!({}), json!({ "q1": "" }), json!({ "q1": null })]);
        let analytics = compute_analytics(&[question("q1", QuestionType::Text)], &responses);

        assert_eq!(analytics.total_responses, 3);
        assert!(entry(&analytics, "q1").responses.is_empty());
    }

    #[test]
    fn test_choice_counts_match_answers() {
        let responses = responses(vec![
            json!({ "q1": "Yes" }),
            json!({ "q1": "No" }),
            json!({ "q1": "Yes" }),
            json!({}),
            json!({ "q1": "Perhaps" }),
        ]);
        let analytics = compute_analytics(&[question("q1", QuestionType::YesNo)], &responses);
        let q1 = entry(&analytics, "q1");

        match &q1.summary {
            Summary::Frequencies(table) => {
                assert_eq!(table.total(), q1.responses.len());
                let keys: Vec<_> = table.iter().map(|(key, _)| key).collect();
                assert_eq!(keys, vec!["Yes", "No", "Perhaps"]);
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn test_scale_without_numbers() {
        let responses = responses(vec![json!({ "q1": "x" }), json!({ "q1": "y" })]);
        let analytics = compute_analytics(&[question("q1", QuestionType::Scale)], &responses);

        assert_eq!(
            serde_json::to_value(&entry(&analytics, "q1").summary).unwrap(),
            json!({ "average": "0.00", "count": 0 })
        );
    }

    #[test]
    fn test_scale_average_rounding() {
        let answers: Vec<Answer> = [4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 5.0]
            .iter()
            .map(|v| Answer::Number(*v))
            .collect();
        // 33 / 8 = 4.125 is an exact tie
        assert_eq!(scale_summary(&answers).average, "4.13");
    }

    #[test]
    fn test_text_samples_capped() {
        let answers: Vec<Value> = (0..8).map(|i| json!({ "q1": format!("answer {}", i) })).collect();
        let analytics =
            compute_analytics(&[question("q1", QuestionType::Date)], &responses(answers));

        match &entry(&analytics, "q1").summary {
            Summary::Samples(samples) => {
                assert_eq!(samples.count, 8);
                assert_eq!(samples.samples.len(), SAMPLE_LIMIT);
                assert_eq!(samples.samples[0], Answer::Text("answer 0".to_string()));
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_uses_samples() {
        let responses = responses(vec![json!({ "q1": "first" })]);
        let analytics = compute_analytics(&[question("q1", QuestionType::Unknown)], &responses);

        assert!(matches!(
            entry(&analytics, "q1").summary,
            Summary::Samples(_)
        ));
    }

    #[test]
    fn test_question_order_is_preserved() {
        let questions = vec![
            question("b", QuestionType::Text),
            question("a", QuestionType::Text),
            question("c", QuestionType::Text),
        ];
        let analytics = compute_analytics(&questions, &[]);

        let ids: Vec<_> = analytics.questions.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        let json = serde_json::to_string(&analytics).unwrap();
        assert!(json.find("\"b\"").unwrap() < json.find("\"a\"").unwrap());
    }

    #[test]
    fn test_duplicate_question_id_replaces_in_place() {
        let questions = vec![
            question("a", QuestionType::Text),
            question("b", QuestionType::Text),
            question("a", QuestionType::Scale),
        ];
        let analytics = compute_analytics(&questions, &[]);

        assert_eq!(analytics.questions.len(), 2);
        let (first_id, first) = analytics.questions.get_index(0).unwrap();
        assert_eq!(first_id, "a");
        assert_eq!(first.question_type, QuestionType::Scale);
    }

    #[test]
    fn test_response_rate_and_least_answered() {
        let responses = responses(vec![
            json!({ "q1": "a", "q2": "b" }),
            json!({ "q1": "c" }),
        ]);
        let questions = vec![question("q1", QuestionType::Text), question("q2", QuestionType::Text)];
        let analytics = compute_analytics(&questions, &responses);

        assert_eq!(response_rate(entry(&analytics, "q2"), 2), 50.0);
        let least = least_answered(&analytics, 1);
        assert_eq!(least[0].question_id, "q2");
    }
}
