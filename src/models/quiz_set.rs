use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Result;
use crate::models::quiz::Quiz;

/// One assessment session: a frozen ordering of quiz ids plus the seed that
/// drives option shuffling for every page served from it.
#[derive(Debug, Clone, FromRow)]
pub struct ShuffledQuizSet {
    pub shuffled_quiz_set_id: Uuid,
    pub student_id: String,
    pub lo_id: String,
    pub study_plan_item_id: Option<String>,
    pub quiz_external_ids: Vec<String>,
    /// Shuffle index per quiz, parallel to `quiz_external_ids`. Freshly
    /// created sets use 1..=n; retry sets copy each retained quiz's index from
    /// the parent so its options land in the same order as the first attempt.
    pub quiz_shuffle_indices: Vec<i64>,
    pub random_seed: i64,
    pub question_hierarchy: JsonValue,
    pub original_shuffled_quiz_set_id: Option<Uuid>,
    pub total_correctness: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShuffledQuizSet {
    /// 1-based canonical position of a quiz and its shuffle index.
    pub fn shuffle_index_of(&self, quiz_id: &str) -> Option<i64> {
        let pos = self
            .quiz_external_ids
            .iter()
            .position(|id| id == quiz_id)?;
        self.quiz_shuffle_indices.get(pos).copied()
    }

    pub fn hierarchy(&self) -> Result<Vec<QuestionHierarchyNode>> {
        Ok(serde_json::from_value(self.question_hierarchy.clone())?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupChild {
    pub question_id: String,
    pub point: i32,
}

/// Ordered presentation structure of a set: standalone questions interleaved
/// with question groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionHierarchyNode {
    Question {
        question_id: String,
    },
    QuestionGroup {
        question_group_id: String,
        children: Vec<GroupChild>,
        total_children: i32,
        total_points: i32,
    },
}

/// Builds the hierarchy from quizzes in canonical order. Quizzes sharing a
/// group id collapse into one group node at the group's first appearance.
pub fn build_hierarchy(quizzes: &[Quiz]) -> Vec<QuestionHierarchyNode> {
    let mut nodes: Vec<QuestionHierarchyNode> = Vec::new();
    for quiz in quizzes {
        match &quiz.question_group_id {
            None => nodes.push(QuestionHierarchyNode::Question {
                question_id: quiz.external_id.clone(),
            }),
            Some(group_id) => {
                let existing = nodes.iter().position(|node| {
                    matches!(node, QuestionHierarchyNode::QuestionGroup { question_group_id, .. }
                        if question_group_id == group_id)
                });
                let child = GroupChild {
                    question_id: quiz.external_id.clone(),
                    point: quiz.point,
                };
                match existing {
                    Some(pos) => {
                        if let QuestionHierarchyNode::QuestionGroup {
                            children,
                            total_children,
                            total_points,
                            ..
                        } = &mut nodes[pos]
                        {
                            *total_children += 1;
                            *total_points += child.point;
                            children.push(child);
                        }
                    }
                    None => nodes.push(QuestionHierarchyNode::QuestionGroup {
                        question_group_id: group_id.clone(),
                        total_children: 1,
                        total_points: child.point,
                        children: vec![child],
                    }),
                }
            }
        }
    }
    nodes
}

/// Drops the given question ids from the hierarchy, renumbering group totals.
/// Groups left with no children disappear.
pub fn exclude_question_ids(
    nodes: &[QuestionHierarchyNode],
    excluded: &HashSet<String>,
) -> Vec<QuestionHierarchyNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            QuestionHierarchyNode::Question { question_id } => {
                if !excluded.contains(question_id) {
                    result.push(node.clone());
                }
            }
            QuestionHierarchyNode::QuestionGroup {
                question_group_id,
                children,
                ..
            } => {
                let kept: Vec<GroupChild> = children
                    .iter()
                    .filter(|child| !excluded.contains(&child.question_id))
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    continue;
                }
                let total_points = kept.iter().map(|child| child.point).sum();
                result.push(QuestionHierarchyNode::QuestionGroup {
                    question_group_id: question_group_id.clone(),
                    total_children: kept.len() as i32,
                    total_points,
                    children: kept,
                });
            }
        }
    }
    result
}

/// Half-open slice bounds for a 1-based page cursor. `None` means the offset
/// is past the end of the list: the page is empty and paging is exhausted.
pub fn page_bounds(total: usize, limit: u32, offset: i64) -> Option<(usize, usize)> {
    if offset < 1 || offset as usize > total {
        return None;
    }
    let from = (offset - 1) as usize;
    let to = (from + limit as usize).min(total);
    Some((from, to))
}
