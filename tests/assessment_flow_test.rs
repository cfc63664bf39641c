use std::collections::HashSet;

use assessment_backend::models::quiz::{Answer, Quiz, QuizKind, QuizOption, RichText};
use assessment_backend::models::quiz_set::page_bounds;
use assessment_backend::models::submission::{
    accepted_quiz_ids, compute_totals, incomplete_quiz_ids, latest_by_quiz,
};
use assessment_backend::services::evaluation_service::{evaluate, EvaluationContext};
use assessment_backend::services::shuffle_service::{generate_seed, shuffle_options};
use tokio_test::assert_ok;

fn option(text: &str, key: &str, correct: bool) -> QuizOption {
    QuizOption {
        content: RichText::plain(text),
        correctness: correct,
        label: String::new(),
        key: key.to_string(),
        configs: vec![],
    }
}

fn mcq(id: &str) -> Quiz {
    Quiz {
        external_id: id.to_string(),
        lo_id: "lo-flow".into(),
        kind: QuizKind::Mcq,
        question: RichText::plain(format!("question {}", id)),
        options: vec![
            option("right", &format!("{}-a", id), true),
            option("wrong-1", &format!("{}-b", id), false),
            option("wrong-2", &format!("{}-c", id), false),
            option("wrong-3", &format!("{}-d", id), false),
        ],
        point: 2,
        question_group_id: None,
    }
}

fn fixture() -> Vec<Quiz> {
    let mut quizzes = vec![mcq("q1"), mcq("q2")];
    quizzes.push(Quiz {
        external_id: "q3".into(),
        lo_id: "lo-flow".into(),
        kind: QuizKind::Fib,
        question: RichText::plain("capital of vietnam?"),
        options: vec![option("hanoi", "key-1", true), option("ha noi", "key-1", true)],
        point: 1,
        question_group_id: None,
    });
    quizzes.push(Quiz {
        external_id: "q4".into(),
        lo_id: "lo-flow".into(),
        kind: QuizKind::Ord,
        question: RichText::plain("arrange"),
        options: vec![
            option("first", "key-1", false),
            option("second", "key-2", false),
            option("third", "key-3", false),
        ],
        point: 1,
        question_group_id: None,
    });
    quizzes.push(Quiz {
        external_id: "q5".into(),
        lo_id: "lo-flow".into(),
        kind: QuizKind::Esq,
        question: RichText::plain("write an essay"),
        options: vec![],
        point: 0,
        question_group_id: None,
    });
    quizzes
}

/// 1-based position of the correct option as the student sees it.
fn displayed_correct_position(quiz: &Quiz, seed: i64, shuffle_index: i64) -> u32 {
    shuffle_options(&quiz.options, seed, shuffle_index)
        .iter()
        .position(|opt| opt.correctness)
        .map(|pos| (pos + 1) as u32)
        .expect("fixture has a correct option")
}

#[tokio::test]
async fn full_session_create_page_answer_retry() {
    let quizzes = fixture();
    let ids: Vec<String> = quizzes.iter().map(|q| q.external_id.clone()).collect();
    let seed = generate_seed(&quizzes);

    // Paging with limit 2 over 5 quizzes visits 2 + 2 + 1 ids, each once.
    let mut offset = 1i64;
    let mut visited: Vec<String> = Vec::new();
    let mut page_sizes = Vec::new();
    while let Some((from, to)) = page_bounds(ids.len(), 2, offset) {
        page_sizes.push(to - from);
        visited.extend_from_slice(&ids[from..to]);
        offset += 2;
    }
    assert_eq!(page_sizes, vec![2, 2, 1]);
    assert_eq!(visited, ids);

    // First round of answers: q1 right, q2 wrong, q3 right, q4 wrong, q5 essay.
    let ctx = |i: i64| EvaluationContext {
        seed,
        shuffle_index: i,
    };
    let mut history = Vec::new();
    let pos = displayed_correct_position(&quizzes[0], seed, 1);
    history.push(assert_ok!(evaluate(
        &quizzes[0],
        &ctx(1),
        &[Answer::SelectedIndex(pos)]
    )));
    let wrong = (1..=4)
        .find(|p| *p != displayed_correct_position(&quizzes[1], seed, 2))
        .expect("more than one option");
    history.push(assert_ok!(evaluate(
        &quizzes[1],
        &ctx(2),
        &[Answer::SelectedIndex(wrong)]
    )));
    history.push(assert_ok!(evaluate(
        &quizzes[2],
        &ctx(3),
        &[Answer::FilledText("HA NOI".into())]
    )));
    history.push(assert_ok!(evaluate(
        &quizzes[3],
        &ctx(4),
        &[
            Answer::SubmittedKey("key-2".into()),
            Answer::SubmittedKey("key-1".into()),
            Answer::SubmittedKey("key-3".into()),
        ]
    )));
    history.push(assert_ok!(evaluate(
        &quizzes[4],
        &ctx(5),
        &[Answer::FilledText("an essay".into())]
    )));

    let latest = latest_by_quiz(history);
    assert!(incomplete_quiz_ids(&ids, &latest).is_empty());

    let totals = compute_totals(&quizzes, &latest);
    assert_eq!(totals.total_question, 5);
    assert_eq!(totals.total_correct, 2); // q1 and q3; the essay never counts
    assert_eq!(totals.total_point, 6);
    assert_eq!(totals.total_graded_point, 3);

    // Retry keeps exactly the quizzes not yet answered correctly, in order.
    // The essay was submitted, so it is done and drops out too.
    let accepted = accepted_quiz_ids(&latest);
    let retained: Vec<(String, i64)> = ids
        .iter()
        .enumerate()
        .filter(|(_, id)| !accepted.contains(*id))
        .map(|(i, id)| (id.clone(), (i + 1) as i64))
        .collect();
    let retained_ids: Vec<&str> = retained.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(retained_ids, vec!["q2", "q4"]);

    let retained_set: HashSet<&str> = retained_ids.iter().copied().collect();
    let all_ids: HashSet<&str> = ids.iter().map(|s| s.as_str()).collect();
    assert!(retained_set.is_subset(&all_ids));

    // Hard invariant: under the parent's seed and the retained quiz's parent
    // index, the retry displays the options in the same order as round one.
    let round_one_display = shuffle_options(&quizzes[1].options, seed, 2);
    let (_, q2_parent_index) = retained[0].clone();
    assert_eq!(q2_parent_index, 2);
    assert_eq!(
        shuffle_options(&quizzes[1].options, seed, q2_parent_index),
        round_one_display
    );

    // Round two on the retry set: q2 answered right at its parent index, so
    // the displayed position maps to the same underlying option.
    let q2 = &quizzes[1];
    let pos = displayed_correct_position(q2, seed, 2);
    let second = assert_ok!(evaluate(q2, &ctx(2), &[Answer::SelectedIndex(pos)]));
    assert!(second.is_accepted);
    assert_eq!(second.point, 2);

    let q4 = &quizzes[3];
    let exact = vec![
        Answer::SubmittedKey("key-1".into()),
        Answer::SubmittedKey("key-2".into()),
        Answer::SubmittedKey("key-3".into()),
    ];
    let second = assert_ok!(evaluate(q4, &ctx(4), &exact));
    assert!(second.is_accepted);
    assert_eq!(second.correctness, vec![true, true, true]);
}

#[tokio::test]
async fn ledger_is_latest_wins_across_resubmissions() {
    let quizzes = vec![mcq("q1")];
    let seed = generate_seed(&quizzes);
    let ctx = EvaluationContext {
        seed,
        shuffle_index: 1,
    };

    let pos = displayed_correct_position(&quizzes[0], seed, 1);
    let wrong = (1..=4).find(|p| *p != pos).expect("more than one option");

    let first = assert_ok!(evaluate(&quizzes[0], &ctx, &[Answer::SelectedIndex(pos)]));
    // A later wrong answer overrides the earlier correct one.
    let mut second = assert_ok!(evaluate(&quizzes[0], &ctx, &[Answer::SelectedIndex(wrong)]));
    second.submitted_at = first.submitted_at + chrono::Duration::seconds(1);

    let latest = latest_by_quiz(vec![first, second]);
    assert!(!latest["q1"].is_accepted);
    let totals = compute_totals(&quizzes, &latest);
    assert_eq!(totals.total_correct, 0);
    assert_eq!(totals.total_graded_point, 0);
}
