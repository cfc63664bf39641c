use std::collections::HashSet;

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::quiz_set_dto::{CreateRetryQuizSetRequest, QuizSetResponse};
use crate::error::Result;
use crate::models::quiz_set::{exclude_question_ids, ShuffledQuizSet};
use crate::models::submission::accepted_quiz_ids;
use crate::services::quiz_set_service::QuizSetService;
use crate::services::submission_service::SubmissionService;

#[derive(Clone)]
pub struct RetryService {
    quiz_sets: QuizSetService,
    submissions: SubmissionService,
}

impl RetryService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            quiz_sets: QuizSetService::new(pool.clone()),
            submissions: SubmissionService::new(pool),
        }
    }

    /// Derives a retry set from a parent: the quizzes whose latest submission
    /// is not accepted, in parent order, under the parent's seed. Retained
    /// quizzes keep their parent shuffle index so their options land exactly
    /// as on the first attempt.
    pub async fn create_retry_quiz_set(
        &self,
        parent_set_id: Uuid,
        req: CreateRetryQuizSetRequest,
    ) -> Result<QuizSetResponse> {
        req.validate()?;
        let parent = self.quiz_sets.get_set(parent_set_id).await?;
        let latest = self
            .submissions
            .latest_answers(parent_set_id, &parent.quiz_external_ids)
            .await?;
        let accepted = accepted_quiz_ids(&latest);

        let (retained_ids, retained_indices) = retain_unanswered(&parent, &accepted);
        let hierarchy = exclude_question_ids(&parent.hierarchy()?, &accepted);

        let now = Utc::now();
        let set = ShuffledQuizSet {
            shuffled_quiz_set_id: Uuid::new_v4(),
            student_id: parent.student_id.clone(),
            lo_id: parent.lo_id.clone(),
            study_plan_item_id: parent.study_plan_item_id.clone(),
            quiz_external_ids: retained_ids,
            quiz_shuffle_indices: retained_indices,
            random_seed: parent.random_seed,
            question_hierarchy: serde_json::to_value(&hierarchy)?,
            original_shuffled_quiz_set_id: Some(parent.shuffled_quiz_set_id),
            total_correctness: 0,
            created_at: now,
            updated_at: now,
        };
        self.quiz_sets.insert_set(&set).await?;
        info!(
            set_id = %set.shuffled_quiz_set_id,
            parent_set_id = %parent.shuffled_quiz_set_id,
            retained = set.quiz_external_ids.len(),
            "created retry quiz set"
        );

        self.quiz_sets.page_response(&set, req.paging).await
    }
}

/// Quiz ids of the parent not yet answered correctly, each paired with its
/// parent shuffle index. Parent order is preserved.
fn retain_unanswered(
    parent: &ShuffledQuizSet,
    accepted: &HashSet<String>,
) -> (Vec<String>, Vec<i64>) {
    let mut ids = Vec::new();
    let mut indices = Vec::new();
    for (pos, id) in parent.quiz_external_ids.iter().enumerate() {
        if accepted.contains(id) {
            continue;
        }
        ids.push(id.clone());
        indices.push(
            parent
                .quiz_shuffle_indices
                .get(pos)
                .copied()
                .unwrap_or((pos + 1) as i64),
        );
    }
    (ids, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parent(ids: &[&str]) -> ShuffledQuizSet {
        ShuffledQuizSet {
            shuffled_quiz_set_id: Uuid::new_v4(),
            student_id: "student-1".into(),
            lo_id: "lo-1".into(),
            study_plan_item_id: None,
            quiz_external_ids: ids.iter().map(|s| s.to_string()).collect(),
            quiz_shuffle_indices: (1..=ids.len() as i64).collect(),
            random_seed: 987,
            question_hierarchy: json!([]),
            original_shuffled_quiz_set_id: None,
            total_correctness: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn retained_quizzes_keep_parent_order_and_indices() {
        let parent = parent(&["q1", "q2", "q3", "q4", "q5"]);
        let accepted: HashSet<String> = ["q2", "q4"].iter().map(|s| s.to_string()).collect();

        let (ids, indices) = retain_unanswered(&parent, &accepted);
        assert_eq!(ids, vec!["q1", "q3", "q5"]);
        assert_eq!(indices, vec![1, 3, 5]);
    }

    #[test]
    fn everything_correct_leaves_a_valid_empty_retry() {
        let parent = parent(&["q1", "q2"]);
        let accepted: HashSet<String> = ["q1", "q2"].iter().map(|s| s.to_string()).collect();
        let (ids, indices) = retain_unanswered(&parent, &accepted);
        assert!(ids.is_empty());
        assert!(indices.is_empty());
    }

    #[test]
    fn nothing_accepted_retains_the_whole_parent() {
        let parent = parent(&["q1", "q2", "q3"]);
        let (ids, indices) = retain_unanswered(&parent, &HashSet::new());
        assert_eq!(ids, parent.quiz_external_ids);
        assert_eq!(indices, parent.quiz_shuffle_indices);
    }
}
