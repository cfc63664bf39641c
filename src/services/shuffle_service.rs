use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::models::quiz::{Quiz, QuizKind, QuizOption};

/// How many fresh seeds to try before giving up on scrambling every ordering
/// quiz away from its canonical order.
const SEED_ATTEMPTS: usize = 20;

/// Deterministic display order for one quiz's options. The RNG is seeded with
/// `seed + shuffle_index`, so the same pair always yields the same order and
/// different quizzes in one set get different orders.
pub fn shuffle_options(options: &[QuizOption], seed: i64, shuffle_index: i64) -> Vec<QuizOption> {
    let mut shuffled = options.to_vec();
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(shuffle_index) as u64);
    shuffled.shuffle(&mut rng);
    shuffled
}

/// Shuffles the quiz id list once at set creation. The result becomes the
/// canonical order of the set.
pub fn shuffle_quiz_ids(ids: &mut Vec<String>, seed: i64) {
    let mut rng = StdRng::seed_from_u64(seed as u64);
    ids.shuffle(&mut rng);
}

/// Picks a seed for a new set, re-rolling until no ordering quiz would be
/// displayed in its canonical (give-away) order. Quizzes are indexed by their
/// 1-based position in `quizzes`.
pub fn generate_seed(quizzes: &[Quiz]) -> i64 {
    let mut candidate = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| rand::thread_rng().gen());
    for _ in 0..SEED_ATTEMPTS {
        if scrambles_ordering_quizzes(quizzes, candidate) {
            return candidate;
        }
        candidate = rand::thread_rng().gen();
    }
    warn!("seed generation left an ordering quiz in canonical order");
    candidate
}

fn scrambles_ordering_quizzes(quizzes: &[Quiz], seed: i64) -> bool {
    quizzes.iter().enumerate().all(|(idx, quiz)| {
        quiz.kind != QuizKind::Ord
            || quiz.options.len() < 2
            || shuffle_options(&quiz.options, seed, (idx + 1) as i64) != quiz.options
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::RichText;

    fn options(n: usize) -> Vec<QuizOption> {
        (0..n)
            .map(|i| QuizOption {
                content: RichText::plain(format!("option-{}", i)),
                correctness: i == 0,
                label: format!("{}", i),
                key: format!("key-{}", i),
                configs: vec![],
            })
            .collect()
    }

    #[test]
    fn shuffle_is_deterministic_for_a_seed_and_index() {
        let opts = options(6);
        let a = shuffle_options(&opts, 1_234_567, 3);
        let b = shuffle_options(&opts, 1_234_567, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_preserves_the_option_multiset() {
        let opts = options(6);
        let shuffled = shuffle_options(&opts, 99, 1);
        assert_eq!(shuffled.len(), opts.len());
        for opt in &opts {
            assert!(shuffled.contains(opt));
        }
    }

    #[test]
    fn shuffle_does_not_touch_the_input() {
        let opts = options(4);
        let before = opts.clone();
        let _ = shuffle_options(&opts, 7, 1);
        assert_eq!(opts, before);
    }

    #[test]
    fn zero_and_one_option_are_identity() {
        assert!(shuffle_options(&[], 42, 1).is_empty());
        let one = options(1);
        assert_eq!(shuffle_options(&one, 42, 1), one);
    }

    #[test]
    fn quiz_id_shuffle_is_deterministic() {
        let ids: Vec<String> = (0..8).map(|i| format!("quiz-{}", i)).collect();
        let mut a = ids.clone();
        let mut b = ids.clone();
        shuffle_quiz_ids(&mut a, 555);
        shuffle_quiz_ids(&mut b, 555);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort();
        let mut expected = ids;
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn generated_seed_scrambles_every_ordering_quiz() {
        let quizzes: Vec<Quiz> = (0..3)
            .map(|i| Quiz {
                external_id: format!("ord-{}", i),
                lo_id: "lo-1".into(),
                kind: QuizKind::Ord,
                question: RichText::plain("arrange"),
                options: options(4),
                point: 1,
                question_group_id: None,
            })
            .collect();
        let seed = generate_seed(&quizzes);
        for (idx, quiz) in quizzes.iter().enumerate() {
            assert_ne!(
                shuffle_options(&quiz.options, seed, (idx + 1) as i64),
                quiz.options
            );
        }
    }
}
