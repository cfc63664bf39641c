use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::quiz_set_dto::Paging;
use crate::models::quiz::{Answer, QuizKind};
use crate::models::submission::{AnswerLog, QuizAnswer, SubmissionTotals};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckAnswerRequest {
    #[validate(length(min = 1))]
    pub quiz_id: String,
    #[validate(length(min = 1))]
    pub answer: Vec<Answer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckAnswerResponse {
    pub quiz_id: String,
    pub quiz_type: QuizKind,
    pub correctness: Vec<bool>,
    pub is_correct_all: bool,
    pub is_accepted: bool,
    pub point: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub submitted_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub correct_keys: Vec<String>,
}

impl From<QuizAnswer> for CheckAnswerResponse {
    fn from(answer: QuizAnswer) -> Self {
        Self {
            quiz_id: answer.quiz_id,
            quiz_type: answer.quiz_type,
            correctness: answer.correctness,
            is_correct_all: answer.is_all_correct,
            is_accepted: answer.is_accepted,
            point: answer.point,
            submitted_keys: answer.submitted_keys,
            correct_keys: answer.correct_keys,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionHistoryResponse {
    pub answer_logs: Vec<AnswerLog>,
    /// Quiz ids of the whole set with no submission yet, canonical order.
    pub incomplete_quiz_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<Paging>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalsResponse {
    #[serde(flatten)]
    pub totals: SubmissionTotals,
    pub is_finished: bool,
}
