use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::quiz::{Quiz, QuizKind, QuizOption, RichText};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct Paging {
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
    /// 1-based position of the first quiz on the page.
    #[validate(range(min = 1))]
    pub offset: i64,
}

impl Paging {
    pub fn next(&self) -> Paging {
        Paging {
            limit: self.limit,
            offset: self.offset + self.limit as i64,
        }
    }
}

/// Query-string variant of the cursor; missing fields fall back to defaults.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PagingQuery {
    pub limit: Option<u32>,
    pub offset: Option<i64>,
}

impl PagingQuery {
    pub fn or_default(self, default_limit: u32) -> Paging {
        Paging {
            limit: self.limit.unwrap_or(default_limit),
            offset: self.offset.unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuizSetRequest {
    #[validate(length(min = 1))]
    pub student_id: String,
    #[validate(length(min = 1))]
    pub lo_id: String,
    pub study_plan_item_id: Option<String>,
    /// Explicit subset to assess; empty means every quiz of the objective.
    #[serde(default)]
    pub quiz_external_ids: Vec<String>,
    #[serde(default)]
    pub keep_order: bool,
    #[validate(nested)]
    pub paging: Paging,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRetryQuizSetRequest {
    #[validate(nested)]
    pub paging: Paging,
}

/// Option as the student sees it. Correctness and configs never leave the
/// server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayOption {
    pub label: String,
    pub key: String,
    pub content: RichText,
}

impl From<&QuizOption> for DisplayOption {
    fn from(opt: &QuizOption) -> Self {
        Self {
            label: opt.label.clone(),
            key: opt.key.clone(),
            content: opt.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizItem {
    pub external_id: String,
    pub kind: QuizKind,
    pub question: RichText,
    pub options: Vec<DisplayOption>,
    pub point: i32,
}

impl QuizItem {
    pub fn new(quiz: &Quiz, display_options: Vec<DisplayOption>) -> Self {
        Self {
            external_id: quiz.external_id.clone(),
            kind: quiz.kind,
            question: quiz.question.clone(),
            options: display_options,
            point: quiz.point,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSetResponse {
    pub shuffled_quiz_set_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_shuffled_quiz_set_id: Option<Uuid>,
    pub total_quizzes: u32,
    pub items: Vec<QuizItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<Paging>,
}
