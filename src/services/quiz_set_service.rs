use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::quiz_set_dto::{
    CreateQuizSetRequest, DisplayOption, Paging, QuizItem, QuizSetResponse,
};
use crate::error::{Error, Result};
use crate::models::quiz::{Quiz, QuizKind, QuizRow};
use crate::models::quiz_set::{build_hierarchy, page_bounds, ShuffledQuizSet};
use crate::services::shuffle_service::{generate_seed, shuffle_options, shuffle_quiz_ids};

#[derive(Clone)]
pub struct QuizSetService {
    pub pool: PgPool,
}

impl QuizSetService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Freezes a new assessment session: resolves the quiz list, orders it,
    /// picks a seed and persists the set, then serves the first page.
    pub async fn create_quiz_set(&self, req: CreateQuizSetRequest) -> Result<QuizSetResponse> {
        req.validate()?;

        let candidate_ids = if req.quiz_external_ids.is_empty() {
            self.quiz_ids_of_lo(&req.lo_id).await?
        } else {
            dedupe_ids(&req.quiz_external_ids)
        };
        let quizzes = self.quizzes_ordered(&candidate_ids).await?;
        if quizzes.len() != candidate_ids.len() {
            return Err(Error::NotFound(
                "some requested quizzes do not exist".to_string(),
            ));
        }

        let mut ids = candidate_ids;
        if !req.keep_order {
            let shuffle_seed = Utc::now().timestamp_nanos_opt().unwrap_or_default();
            shuffle_quiz_ids(&mut ids, shuffle_seed);
        }
        let ordered = reorder_quizzes(quizzes, &ids);
        let seed = generate_seed(&ordered);
        let hierarchy = build_hierarchy(&ordered);

        let now = Utc::now();
        let set = ShuffledQuizSet {
            shuffled_quiz_set_id: Uuid::new_v4(),
            student_id: req.student_id,
            lo_id: req.lo_id,
            study_plan_item_id: req.study_plan_item_id,
            quiz_shuffle_indices: (1..=ids.len() as i64).collect(),
            quiz_external_ids: ids,
            random_seed: seed,
            question_hierarchy: serde_json::to_value(&hierarchy)?,
            original_shuffled_quiz_set_id: None,
            total_correctness: 0,
            created_at: now,
            updated_at: now,
        };
        self.insert_set(&set).await?;
        info!(
            set_id = %set.shuffled_quiz_set_id,
            lo_id = %set.lo_id,
            total = set.quiz_external_ids.len(),
            "created shuffled quiz set"
        );

        self.page_response(&set, req.paging).await
    }

    pub async fn next_quiz_page(&self, set_id: Uuid, paging: Paging) -> Result<QuizSetResponse> {
        paging.validate()?;
        let set = self.get_set(set_id).await?;
        self.page_response(&set, paging).await
    }

    pub(crate) async fn page_response(
        &self,
        set: &ShuffledQuizSet,
        paging: Paging,
    ) -> Result<QuizSetResponse> {
        let total = set.quiz_external_ids.len();
        let (items, next_page) = match page_bounds(total, paging.limit, paging.offset) {
            None => (vec![], None),
            Some((from, to)) => {
                let page_ids = set.quiz_external_ids[from..to].to_vec();
                let quizzes = self.quizzes_ordered(&page_ids).await?;
                let next = if to < total { Some(paging.next()) } else { None };
                (build_page_items(set, &quizzes, from), next)
            }
        };
        Ok(QuizSetResponse {
            shuffled_quiz_set_id: set.shuffled_quiz_set_id,
            original_shuffled_quiz_set_id: set.original_shuffled_quiz_set_id,
            total_quizzes: total as u32,
            items,
            next_page,
        })
    }

    pub(crate) async fn get_set(&self, set_id: Uuid) -> Result<ShuffledQuizSet> {
        let set = sqlx::query_as::<_, ShuffledQuizSet>(
            "SELECT * FROM shuffled_quiz_sets WHERE shuffled_quiz_set_id = $1",
        )
        .bind(set_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(set)
    }

    pub(crate) async fn insert_set(&self, set: &ShuffledQuizSet) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO shuffled_quiz_sets
               (shuffled_quiz_set_id, student_id, lo_id, study_plan_item_id,
                quiz_external_ids, quiz_shuffle_indices, random_seed,
                question_hierarchy, original_shuffled_quiz_set_id,
                total_correctness, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(set.shuffled_quiz_set_id)
        .bind(&set.student_id)
        .bind(&set.lo_id)
        .bind(&set.study_plan_item_id)
        .bind(set.quiz_external_ids.clone())
        .bind(set.quiz_shuffle_indices.clone())
        .bind(set.random_seed)
        .bind(set.question_hierarchy.clone())
        .bind(set.original_shuffled_quiz_set_id)
        .bind(set.total_correctness)
        .bind(set.created_at)
        .bind(set.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn quiz_ids_of_lo(&self, lo_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT external_id FROM quizzes WHERE lo_id = $1 ORDER BY created_at, external_id",
        )
        .bind(lo_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    /// Fetches quizzes in the exact order of `ids`. Unknown ids are simply
    /// absent from the result.
    pub(crate) async fn quizzes_ordered(&self, ids: &[String]) -> Result<Vec<Quiz>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows: Vec<QuizRow> = sqlx::query_as(
            r#"SELECT q.external_id, q.lo_id, q.kind, q.question, q.options,
                      q.point, q.question_group_id
               FROM quizzes q
               JOIN UNNEST($1::text[]) WITH ORDINALITY AS ord(external_id, idx)
                 ON q.external_id = ord.external_id
               ORDER BY ord.idx"#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(QuizRow::into_quiz).collect()
    }
}

/// Caller-provided id lists may repeat an id; only the first occurrence
/// counts, so a duplicate is not mistaken for a missing quiz.
fn dedupe_ids(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect()
}

fn reorder_quizzes(quizzes: Vec<Quiz>, ids: &[String]) -> Vec<Quiz> {
    let mut by_id: std::collections::HashMap<String, Quiz> = quizzes
        .into_iter()
        .map(|quiz| (quiz.external_id.clone(), quiz))
        .collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

/// Renders one page of quizzes. `from` is the 0-based offset of the first
/// quiz within the set's canonical list. Choice and ordering kinds show their
/// options (shuffled where the kind calls for it); fill and essay kinds keep
/// theirs server-side since the options are the answers.
pub(crate) fn build_page_items(
    set: &ShuffledQuizSet,
    quizzes: &[Quiz],
    from: usize,
) -> Vec<QuizItem> {
    quizzes
        .iter()
        .enumerate()
        .map(|(i, quiz)| {
            let shuffle_index = set
                .quiz_shuffle_indices
                .get(from + i)
                .copied()
                .unwrap_or((from + i + 1) as i64);
            let options: Vec<DisplayOption> = if quiz.kind.is_shuffled() {
                shuffle_options(&quiz.options, set.random_seed, shuffle_index)
                    .iter()
                    .map(DisplayOption::from)
                    .collect()
            } else if quiz.kind == QuizKind::Miq {
                quiz.options.iter().map(DisplayOption::from).collect()
            } else {
                vec![]
            };
            QuizItem::new(quiz, options)
        })
        .collect()
}
