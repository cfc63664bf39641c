use std::collections::HashSet;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::quiz::{Answer, OptionConfig, Quiz, QuizKind, QuizOption};
use crate::models::submission::QuizAnswer;
use crate::services::shuffle_service::shuffle_options;

/// Everything an evaluator needs from the surrounding set: the set's seed and
/// the quiz's stored shuffle index.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext {
    pub seed: i64,
    pub shuffle_index: i64,
}

pub trait AnswerEvaluator {
    fn evaluate(&self, quiz: &Quiz, ctx: &EvaluationContext, answers: &[Answer])
        -> Result<QuizAnswer>;
}

/// Evaluates a submission against a quiz. The answer list must be non-empty
/// and shaped for the quiz kind.
pub fn evaluate(quiz: &Quiz, ctx: &EvaluationContext, answers: &[Answer]) -> Result<QuizAnswer> {
    if answers.is_empty() {
        return Err(Error::BadRequest("answer cannot be empty".to_string()));
    }
    evaluator_for(quiz.kind).evaluate(quiz, ctx, answers)
}

pub fn evaluator_for(kind: QuizKind) -> &'static dyn AnswerEvaluator {
    match kind {
        QuizKind::Mcq => &MultipleChoiceEvaluator,
        QuizKind::Maq => &MultipleAnswerEvaluator,
        QuizKind::Miq => &ManualInputEvaluator,
        QuizKind::Fib => &FillInBlankEvaluator,
        QuizKind::Tad => &TermAndDefinitionEvaluator,
        QuizKind::Pow => &PairOfWordEvaluator,
        QuizKind::Ord => &OrderingEvaluator,
        QuizKind::Esq => &EssayEvaluator,
    }
}

pub struct MultipleChoiceEvaluator;
pub struct MultipleAnswerEvaluator;
pub struct ManualInputEvaluator;
pub struct FillInBlankEvaluator;
pub struct TermAndDefinitionEvaluator;
pub struct PairOfWordEvaluator;
pub struct OrderingEvaluator;
pub struct EssayEvaluator;

impl AnswerEvaluator for MultipleChoiceEvaluator {
    fn evaluate(
        &self,
        quiz: &Quiz,
        ctx: &EvaluationContext,
        answers: &[Answer],
    ) -> Result<QuizAnswer> {
        let display = shuffle_options(&quiz.options, ctx.seed, ctx.shuffle_index);
        check_choice(quiz, &display, answers)
    }
}

impl AnswerEvaluator for MultipleAnswerEvaluator {
    fn evaluate(
        &self,
        quiz: &Quiz,
        ctx: &EvaluationContext,
        answers: &[Answer],
    ) -> Result<QuizAnswer> {
        let display = shuffle_options(&quiz.options, ctx.seed, ctx.shuffle_index);
        check_choice(quiz, &display, answers)
    }
}

impl AnswerEvaluator for ManualInputEvaluator {
    fn evaluate(
        &self,
        quiz: &Quiz,
        _ctx: &EvaluationContext,
        answers: &[Answer],
    ) -> Result<QuizAnswer> {
        // Manual-input options are authored in a fixed incorrect/correct pair
        // and never shuffled.
        check_choice(quiz, &quiz.options, answers)
    }
}

impl AnswerEvaluator for FillInBlankEvaluator {
    fn evaluate(
        &self,
        quiz: &Quiz,
        _ctx: &EvaluationContext,
        answers: &[Answer],
    ) -> Result<QuizAnswer> {
        check_filled_text(quiz, answers)
    }
}

impl AnswerEvaluator for TermAndDefinitionEvaluator {
    fn evaluate(
        &self,
        quiz: &Quiz,
        _ctx: &EvaluationContext,
        answers: &[Answer],
    ) -> Result<QuizAnswer> {
        check_filled_text(quiz, answers)
    }
}

impl AnswerEvaluator for PairOfWordEvaluator {
    fn evaluate(
        &self,
        quiz: &Quiz,
        _ctx: &EvaluationContext,
        answers: &[Answer],
    ) -> Result<QuizAnswer> {
        check_filled_text(quiz, answers)
    }
}

impl AnswerEvaluator for OrderingEvaluator {
    fn evaluate(
        &self,
        quiz: &Quiz,
        _ctx: &EvaluationContext,
        answers: &[Answer],
    ) -> Result<QuizAnswer> {
        let submitted = submitted_keys(answers)?;
        let correct_keys = quiz.option_keys();
        let correctness: Vec<bool> = submitted
            .iter()
            .enumerate()
            .map(|(i, key)| correct_keys.get(i) == Some(key))
            .collect();
        let is_accepted = !correct_keys.is_empty() && submitted == correct_keys;
        Ok(QuizAnswer {
            submitted_keys: submitted,
            correct_keys,
            correctness,
            is_accepted,
            is_all_correct: is_accepted,
            point: if is_accepted { quiz.point } else { 0 },
            ..blank_answer(quiz)
        })
    }
}

impl AnswerEvaluator for EssayEvaluator {
    fn evaluate(
        &self,
        quiz: &Quiz,
        _ctx: &EvaluationContext,
        answers: &[Answer],
    ) -> Result<QuizAnswer> {
        // Essays are recorded verbatim and count as done, not as correct.
        // Grading happens elsewhere, if at all.
        let filled_text = filled_texts(answers)?;
        Ok(QuizAnswer {
            filled_text,
            is_accepted: true,
            is_all_correct: false,
            point: 0,
            ..blank_answer(quiz)
        })
    }
}

fn blank_answer(quiz: &Quiz) -> QuizAnswer {
    QuizAnswer {
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
        submitted_at: Utc::now(),
    }
}

/// Grades selections against the given display order. Indices are 1-based;
/// 0 and past-the-end indices come from stale clients and are skipped rather
/// than failed.
fn check_choice(quiz: &Quiz, display: &[QuizOption], answers: &[Answer]) -> Result<QuizAnswer> {
    let submitted = selected_indices(answers)?;
    let selected_index: Vec<u32> = submitted
        .into_iter()
        .filter(|&idx| idx >= 1 && (idx as usize) <= display.len())
        .collect();

    let correct_index: Vec<u32> = display
        .iter()
        .enumerate()
        .filter(|(_, opt)| opt.correctness)
        .map(|(i, _)| (i + 1) as u32)
        .collect();

    let correct_set: HashSet<u32> = correct_index.iter().copied().collect();
    let selected_set: HashSet<u32> = selected_index.iter().copied().collect();
    let correctness: Vec<bool> = selected_index
        .iter()
        .map(|idx| correct_set.contains(idx))
        .collect();

    let is_accepted = if quiz.has_config(OptionConfig::PartialCredit) {
        !selected_set.is_empty() && selected_set.is_subset(&correct_set)
    } else {
        !correct_set.is_empty() && selected_set == correct_set
    };

    Ok(QuizAnswer {
        selected_index,
        correct_index,
        correctness,
        is_accepted,
        is_all_correct: is_accepted,
        point: if is_accepted { quiz.point } else { 0 },
        ..blank_answer(quiz)
    })
}

/// Grades filled blanks positionally against the quiz's alternative groups.
/// Blanks past the group count are skipped.
fn check_filled_text(quiz: &Quiz, answers: &[Answer]) -> Result<QuizAnswer> {
    let texts = filled_texts(answers)?;
    let groups = quiz.option_groups();

    let mut filled_text = Vec::new();
    let mut correctness = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        if i >= groups.len() {
            break;
        }
        filled_text.push(text.trim().to_string());
        correctness.push(groups[i].is_correct(text));
    }
    let correct_text: Vec<String> = groups.iter().map(|group| group.primary_text()).collect();

    // Unanswered trailing blanks do not block acceptance; a submission is
    // good as long as it scored something and nothing it scored is wrong.
    let all_submitted_correct = !correctness.is_empty() && correctness.iter().all(|&c| c);
    let is_accepted = if quiz.has_config(OptionConfig::PartialCredit) {
        correctness.iter().any(|&c| c)
    } else {
        all_submitted_correct
    };

    Ok(QuizAnswer {
        filled_text,
        correct_text,
        correctness,
        is_accepted,
        is_all_correct: is_accepted,
        point: if is_accepted { quiz.point } else { 0 },
        ..blank_answer(quiz)
    })
}

fn selected_indices(answers: &[Answer]) -> Result<Vec<u32>> {
    answers
        .iter()
        .map(|answer| match answer {
            Answer::SelectedIndex(idx) => Ok(*idx),
            other => Err(Error::BadRequest(format!(
                "expected a selected index, got {:?}",
                other
            ))),
        })
        .collect()
}

fn filled_texts(answers: &[Answer]) -> Result<Vec<String>> {
    answers
        .iter()
        .map(|answer| match answer {
            Answer::FilledText(text) => Ok(text.clone()),
            other => Err(Error::BadRequest(format!(
                "expected filled text, got {:?}",
                other
            ))),
        })
        .collect()
}

fn submitted_keys(answers: &[Answer]) -> Result<Vec<String>> {
    answers
        .iter()
        .map(|answer| match answer {
            Answer::SubmittedKey(key) => Ok(key.clone()),
            other => Err(Error::BadRequest(format!(
                "expected a submitted key, got {:?}",
                other
            ))),
        })
        .collect()
}
