use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Result;
use crate::models::quiz::{Quiz, QuizKind};

/// Full evaluation record for one submission. Serialized as the `answer`
/// JSONB column of `submission_history`; the ledger is append-only and the
/// latest row per quiz is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub quiz_id: String,
    pub quiz_type: QuizKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_index: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correct_index: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filled_text: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correct_text: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submitted_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correct_keys: Vec<String>,
    #[serde(default)]
    pub correctness: Vec<bool>,
    pub is_accepted: bool,
    pub is_all_correct: bool,
    pub point: i32,
    pub submitted_at: DateTime<Utc>,
}

/// Raw ledger row.
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionRow {
    pub submission_id: i64,
    pub shuffled_quiz_set_id: Uuid,
    pub quiz_id: String,
    pub answer: JsonValue,
    pub is_accepted: bool,
    pub point: i32,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRow {
    pub fn into_answer(self) -> Result<QuizAnswer> {
        Ok(serde_json::from_value(self.answer)?)
    }
}

/// One entry of a reconstructed submission history page. Unattempted quizzes
/// appear with `submitted_at = None` and only the correct-answer material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerLog {
    pub quiz_id: String,
    pub quiz_type: QuizKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_index: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correct_index: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filled_text: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correct_text: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submitted_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correct_keys: Vec<String>,
    #[serde(default)]
    pub correctness: Vec<bool>,
    pub is_accepted: bool,
    pub is_all_correct: bool,
    pub point: i32,
    pub quiz_point: i32,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl AnswerLog {
    pub fn attempted(answer: QuizAnswer, quiz_point: i32) -> Self {
        Self {
            quiz_id: answer.quiz_id,
            quiz_type: answer.quiz_type,
            selected_index: answer.selected_index,
            correct_index: answer.correct_index,
            filled_text: answer.filled_text,
            correct_text: answer.correct_text,
            submitted_keys: answer.submitted_keys,
            correct_keys: answer.correct_keys,
            correctness: answer.correctness,
            is_accepted: answer.is_accepted,
            is_all_correct: answer.is_all_correct,
            point: answer.point,
            quiz_point,
            submitted_at: Some(answer.submitted_at),
        }
    }

    pub fn unattempted(quiz: &Quiz) -> Self {
        Self {
            quiz_id: quiz.external_id.clone(),
            quiz_type: quiz.kind,
            selected_index: vec![],
            correct_index: vec![],
            filled_text: vec![],
            correct_text: vec![],
            submitted_keys: vec![],
            correct_keys: vec![],
            correctness: vec![],
            is_accepted: false,
            is_all_correct: false,
            point: 0,
            quiz_point: quiz.point,
            submitted_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionTotals {
    pub total_question: u32,
    pub total_correct: u32,
    pub total_point: i32,
    pub total_graded_point: i32,
}

/// Reduces a chronological slice of the ledger to its authoritative state:
/// the latest answer per quiz. Ties on `submitted_at` fall to the later row.
pub fn latest_by_quiz(answers: Vec<QuizAnswer>) -> HashMap<String, QuizAnswer> {
    let mut latest: HashMap<String, QuizAnswer> = HashMap::new();
    for answer in answers {
        match latest.get(&answer.quiz_id) {
            Some(current) if current.submitted_at > answer.submitted_at => {}
            _ => {
                latest.insert(answer.quiz_id.clone(), answer);
            }
        }
    }
    latest
}

/// Quiz ids of the set with no submission yet, in canonical order.
pub fn incomplete_quiz_ids(
    canonical_ids: &[String],
    latest: &HashMap<String, QuizAnswer>,
) -> Vec<String> {
    canonical_ids
        .iter()
        .filter(|id| !latest.contains_key(*id))
        .cloned()
        .collect()
}

/// Quizzes whose latest submission is accepted. Drives both the correctness
/// counter and retry derivation.
pub fn accepted_quiz_ids(latest: &HashMap<String, QuizAnswer>) -> HashSet<String> {
    latest
        .values()
        .filter(|answer| answer.is_accepted)
        .map(|answer| answer.quiz_id.clone())
        .collect()
}

/// Whether an answer counts as a correct one for scoring. Essays are
/// accepted on submission but carry no correctness, so they never qualify.
pub fn counts_as_correct(answer: &QuizAnswer) -> bool {
    answer.is_accepted && !answer.correctness.is_empty()
}

/// The `total_correct` figure over a latest-per-quiz ledger state. Also the
/// value of the set's denormalized `total_correctness` column, so the two
/// surfaces always agree.
pub fn correct_answer_count(latest: &HashMap<String, QuizAnswer>) -> u32 {
    latest.values().filter(|answer| counts_as_correct(answer)).count() as u32
}

/// Score rollup over the whole set.
pub fn compute_totals(quizzes: &[Quiz], latest: &HashMap<String, QuizAnswer>) -> SubmissionTotals {
    let mut totals = SubmissionTotals {
        total_question: quizzes.len() as u32,
        ..Default::default()
    };
    for quiz in quizzes {
        totals.total_point += quiz.point;
        if let Some(answer) = latest.get(&quiz.external_id) {
            totals.total_graded_point += answer.point;
            if counts_as_correct(answer) {
                totals.total_correct += 1;
            }
        }
    }
    totals
}
