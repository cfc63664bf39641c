use std::collections::HashMap;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::quiz_set_dto::Paging;
use crate::dto::submission_dto::{
    CheckAnswerRequest, CheckAnswerResponse, SubmissionHistoryResponse, TotalsResponse,
};
use crate::error::{Error, Result};
use crate::models::quiz::{Quiz, QuizKind, QuizRow};
use crate::models::quiz_set::{page_bounds, ShuffledQuizSet};
use crate::models::submission::{
    compute_totals, correct_answer_count, incomplete_quiz_ids, AnswerLog, QuizAnswer,
    SubmissionRow,
};
use crate::services::evaluation_service::{self, EvaluationContext};
use crate::services::quiz_set_service::QuizSetService;
use crate::services::shuffle_service::shuffle_options;

#[derive(Clone)]
pub struct SubmissionService {
    pub pool: PgPool,
    quiz_sets: QuizSetService,
}

impl SubmissionService {
    pub fn new(pool: PgPool) -> Self {
        let quiz_sets = QuizSetService::new(pool.clone());
        Self { pool, quiz_sets }
    }

    /// Evaluates a submission and appends it to the ledger. The append and
    /// the correctness counter update share one transaction.
    pub async fn check_answer(
        &self,
        set_id: Uuid,
        req: CheckAnswerRequest,
    ) -> Result<CheckAnswerResponse> {
        req.validate()?;
        let set = self.quiz_sets.get_set(set_id).await?;
        let shuffle_index = set.shuffle_index_of(&req.quiz_id).ok_or_else(|| {
            Error::NotFound(format!(
                "quiz {} does not belong to the quiz set",
                req.quiz_id
            ))
        })?;
        let quiz = self.get_quiz(&req.quiz_id).await?;

        let ctx = EvaluationContext {
            seed: set.random_seed,
            shuffle_index,
        };
        let answer = evaluation_service::evaluate(&quiz, &ctx, &req.answer)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO submission_history
               (shuffled_quiz_set_id, quiz_id, answer, is_accepted, point, submitted_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(set_id)
        .bind(&answer.quiz_id)
        .bind(serde_json::to_value(&answer)?)
        .bind(answer.is_accepted)
        .bind(answer.point)
        .bind(answer.submitted_at)
        .execute(&mut *tx)
        .await?;
        // The counter is recomputed with the same rule as Totals, so the two
        // never disagree (accepted essays are done, not correct).
        let rows: Vec<SubmissionRow> = sqlx::query_as(
            r#"SELECT DISTINCT ON (quiz_id)
                      submission_id, shuffled_quiz_set_id, quiz_id, answer,
                      is_accepted, point, submitted_at
               FROM submission_history
               WHERE shuffled_quiz_set_id = $1
               ORDER BY quiz_id, submitted_at DESC, submission_id DESC"#,
        )
        .bind(set_id)
        .fetch_all(&mut *tx)
        .await?;
        let mut latest = HashMap::new();
        for row in rows {
            let entry = row.into_answer()?;
            latest.insert(entry.quiz_id.clone(), entry);
        }
        sqlx::query(
            r#"UPDATE shuffled_quiz_sets
               SET total_correctness = $2, updated_at = now()
               WHERE shuffled_quiz_set_id = $1"#,
        )
        .bind(set_id)
        .bind(correct_answer_count(&latest) as i32)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            set_id = %set_id,
            quiz_id = %answer.quiz_id,
            accepted = answer.is_accepted,
            "recorded submission"
        );
        Ok(answer.into())
    }

    /// One page of the reconstructed ledger, plus the set-wide list of quiz
    /// ids never attempted.
    pub async fn submission_history(
        &self,
        set_id: Uuid,
        paging: Paging,
    ) -> Result<SubmissionHistoryResponse> {
        paging.validate()?;
        let set = self.quiz_sets.get_set(set_id).await?;
        let latest = self.latest_answers(set_id, &set.quiz_external_ids).await?;
        let incomplete = incomplete_quiz_ids(&set.quiz_external_ids, &latest);

        let total = set.quiz_external_ids.len();
        let (answer_logs, next_page) = match page_bounds(total, paging.limit, paging.offset) {
            None => (vec![], None),
            Some((from, to)) => {
                let page_ids = set.quiz_external_ids[from..to].to_vec();
                let quizzes = self.quiz_sets.quizzes_ordered(&page_ids).await?;
                let next = if to < total { Some(paging.next()) } else { None };
                (build_answer_logs(&set, &quizzes, from, &latest), next)
            }
        };
        Ok(SubmissionHistoryResponse {
            answer_logs,
            incomplete_quiz_ids: incomplete,
            next_page,
        })
    }

    pub async fn totals(&self, set_id: Uuid) -> Result<TotalsResponse> {
        let set = self.quiz_sets.get_set(set_id).await?;
        let quizzes = self
            .quiz_sets
            .quizzes_ordered(&set.quiz_external_ids)
            .await?;
        let latest = self.latest_answers(set_id, &set.quiz_external_ids).await?;
        let totals = compute_totals(&quizzes, &latest);
        let is_finished = incomplete_quiz_ids(&set.quiz_external_ids, &latest).is_empty();
        Ok(TotalsResponse { totals, is_finished })
    }

    /// Authoritative ledger state: the latest submission per quiz.
    pub(crate) async fn latest_answers(
        &self,
        set_id: Uuid,
        quiz_ids: &[String],
    ) -> Result<HashMap<String, QuizAnswer>> {
        if quiz_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<SubmissionRow> = sqlx::query_as(
            r#"SELECT DISTINCT ON (quiz_id)
                      submission_id, shuffled_quiz_set_id, quiz_id, answer,
                      is_accepted, point, submitted_at
               FROM submission_history
               WHERE shuffled_quiz_set_id = $1 AND quiz_id = ANY($2)
               ORDER BY quiz_id, submitted_at DESC, submission_id DESC"#,
        )
        .bind(set_id)
        .bind(quiz_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut latest = HashMap::new();
        for row in rows {
            let answer = row.into_answer()?;
            latest.insert(answer.quiz_id.clone(), answer);
        }
        Ok(latest)
    }

    async fn get_quiz(&self, external_id: &str) -> Result<Quiz> {
        let row: QuizRow = sqlx::query_as(
            r#"SELECT external_id, lo_id, kind, question, options, point, question_group_id
               FROM quizzes WHERE external_id = $1"#,
        )
        .bind(external_id)
        .fetch_one(&self.pool)
        .await?;
        row.into_quiz()
    }
}

/// Builds the page of answer logs. Attempted quizzes replay their stored
/// answer; unattempted ones get the correct-answer material for their kind,
/// computed over the same display order the student saw.
pub(crate) fn build_answer_logs(
    set: &ShuffledQuizSet,
    quizzes: &[Quiz],
    from: usize,
    latest: &HashMap<String, QuizAnswer>,
) -> Vec<AnswerLog> {
    quizzes
        .iter()
        .enumerate()
        .map(|(i, quiz)| match latest.get(&quiz.external_id) {
            Some(answer) => AnswerLog::attempted(answer.clone(), quiz.point),
            None => {
                let mut log = AnswerLog::unattempted(quiz);
                let shuffle_index = set
                    .quiz_shuffle_indices
                    .get(from + i)
                    .copied()
                    .unwrap_or((from + i + 1) as i64);
                match quiz.kind {
                    QuizKind::Mcq | QuizKind::Maq | QuizKind::Miq => {
                        let display = if quiz.kind.is_shuffled() {
                            shuffle_options(&quiz.options, set.random_seed, shuffle_index)
                        } else {
                            quiz.options.clone()
                        };
                        log.correct_index = display
                            .iter()
                            .enumerate()
                            .filter(|(_, opt)| opt.correctness)
                            .map(|(pos, _)| (pos + 1) as u32)
                            .collect();
                    }
                    QuizKind::Fib | QuizKind::Tad | QuizKind::Pow => {
                        log.correct_text = quiz
                            .option_groups()
                            .iter()
                            .map(|group| group.primary_text())
                            .collect();
                    }
                    QuizKind::Ord => log.correct_keys = quiz.option_keys(),
                    QuizKind::Esq => {}
                }
                log
            }
        })
        .collect()
}
