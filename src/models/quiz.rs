use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuizKind {
    Mcq,
    Maq,
    Fib,
    Tad,
    Pow,
    Miq,
    Ord,
    Esq,
}

impl QuizKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizKind::Mcq => "MCQ",
            QuizKind::Maq => "MAQ",
            QuizKind::Fib => "FIB",
            QuizKind::Tad => "TAD",
            QuizKind::Pow => "POW",
            QuizKind::Miq => "MIQ",
            QuizKind::Ord => "ORD",
            QuizKind::Esq => "ESQ",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "MCQ" => Ok(QuizKind::Mcq),
            "MAQ" => Ok(QuizKind::Maq),
            "FIB" => Ok(QuizKind::Fib),
            "TAD" => Ok(QuizKind::Tad),
            "POW" => Ok(QuizKind::Pow),
            "MIQ" => Ok(QuizKind::Miq),
            "ORD" => Ok(QuizKind::Ord),
            "ESQ" => Ok(QuizKind::Esq),
            other => Err(Error::Internal(format!("unknown quiz kind: {}", other))),
        }
    }

    /// Kinds whose options are re-shuffled for display and grading.
    pub fn is_shuffled(&self) -> bool {
        matches!(self, QuizKind::Mcq | QuizKind::Maq | QuizKind::Ord)
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, QuizKind::Mcq | QuizKind::Maq | QuizKind::Miq)
    }

    pub fn is_fill(&self) -> bool {
        matches!(self, QuizKind::Fib | QuizKind::Tad | QuizKind::Pow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionConfig {
    CaseSensitive,
    PartialCredit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_url: Option<String>,
}

impl RichText {
    pub fn plain(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            rendered_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizOption {
    pub content: RichText,
    #[serde(default)]
    pub correctness: bool,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub configs: Vec<OptionConfig>,
}

impl QuizOption {
    pub fn has_config(&self, config: OptionConfig) -> bool {
        self.configs.contains(&config)
    }

    /// Whether `text` matches this option's content. Both sides are trimmed;
    /// comparison is case-insensitive unless the option carries CASE_SENSITIVE.
    pub fn matches_text(&self, text: &str) -> bool {
        let expected = self.content.raw.trim();
        let submitted = text.trim();
        if self.has_config(OptionConfig::CaseSensitive) {
            expected == submitted
        } else {
            expected.to_lowercase() == submitted.to_lowercase()
        }
    }
}

/// Options of a fill-style quiz that share a key. Every alternative in the
/// group is an acceptable answer for the same blank.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionGroup {
    pub key: String,
    pub alternatives: Vec<QuizOption>,
}

impl OptionGroup {
    pub fn is_correct(&self, text: &str) -> bool {
        self.alternatives.iter().any(|alt| alt.matches_text(text))
    }

    /// The answer shown to the student as "the" correct one: the first
    /// alternative's text, trimmed.
    pub fn primary_text(&self) -> String {
        self.alternatives
            .first()
            .map(|alt| alt.content.raw.trim().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub external_id: String,
    pub lo_id: String,
    pub kind: QuizKind,
    pub question: RichText,
    pub options: Vec<QuizOption>,
    pub point: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_group_id: Option<String>,
}

impl Quiz {
    /// True when any option carries the given config. Authoring tools set
    /// quiz-level behavior (partial credit) on the option rows.
    pub fn has_config(&self, config: OptionConfig) -> bool {
        self.options.iter().any(|opt| opt.has_config(config))
    }

    /// Groups options into alternative groups by key, in first-appearance
    /// order. Options with an empty key never merge with each other.
    pub fn option_groups(&self) -> Vec<OptionGroup> {
        let mut groups: Vec<OptionGroup> = Vec::new();
        for opt in &self.options {
            let existing = if opt.key.is_empty() {
                None
            } else {
                groups.iter().position(|g| g.key == opt.key)
            };
            match existing {
                Some(pos) => groups[pos].alternatives.push(opt.clone()),
                None => groups.push(OptionGroup {
                    key: opt.key.clone(),
                    alternatives: vec![opt.clone()],
                }),
            }
        }
        groups
    }

    /// Canonical key sequence, used as the expected order for ORD quizzes.
    pub fn option_keys(&self) -> Vec<String> {
        self.options.iter().map(|opt| opt.key.clone()).collect()
    }
}

/// One element of a submitted answer. A submission is a list of these, all of
/// the shape the quiz kind expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// 1-based index into the displayed option order.
    SelectedIndex(u32),
    FilledText(String),
    SubmittedKey(String),
}

/// Raw row of the `quizzes` catalog table. Options live in a JSONB column.
#[derive(Debug, Clone, FromRow)]
pub struct QuizRow {
    pub external_id: String,
    pub lo_id: String,
    pub kind: String,
    pub question: JsonValue,
    pub options: JsonValue,
    pub point: i32,
    pub question_group_id: Option<String>,
}

impl QuizRow {
    pub fn into_quiz(self) -> Result<Quiz> {
        Ok(Quiz {
            kind: QuizKind::parse(&self.kind)?,
            question: serde_json::from_value(self.question)?,
            options: serde_json::from_value(self.options)?,
            external_id: self.external_id,
            lo_id: self.lo_id,
            point: self.point,
            question_group_id: self.question_group_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(text: &str, key: &str, correct: bool) -> QuizOption {
        QuizOption {
            content: RichText::plain(text),
            correctness: correct,
            label: String::new(),
            key: key.to_string(),
            configs: vec![],
        }
    }

    #[test]
    fn option_groups_merge_by_key_in_first_appearance_order() {
        let quiz = Quiz {
            external_id: "quiz-1".into(),
            lo_id: "lo-1".into(),
            kind: QuizKind::Fib,
            question: RichText::plain("fill the blanks"),
            options: vec![
                opt("hanoi", "key-1", true),
                opt("paris", "key-2", true),
                opt("ha noi", "key-1", true),
                opt("singleton", "", true),
                opt("paree", "key-2", true),
            ],
            point: 1,
            question_group_id: None,
        };

        let groups = quiz.option_groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].key, "key-1");
        assert_eq!(groups[0].alternatives.len(), 2);
        assert_eq!(groups[1].key, "key-2");
        assert_eq!(groups[1].alternatives.len(), 2);
        assert_eq!(groups[2].key, "");
        assert_eq!(groups[2].alternatives.len(), 1);

        assert_eq!(groups[0].primary_text(), "hanoi");
        assert!(groups[0].is_correct("  HA NOI "));
        assert!(!groups[0].is_correct("saigon"));
    }

    #[test]
    fn empty_keys_stay_singleton_groups() {
        let quiz = Quiz {
            external_id: "quiz-2".into(),
            lo_id: "lo-1".into(),
            kind: QuizKind::Fib,
            question: RichText::plain("q"),
            options: vec![opt("a", "", true), opt("b", "", true)],
            point: 1,
            question_group_id: None,
        };
        assert_eq!(quiz.option_groups().len(), 2);
    }

    #[test]
    fn case_sensitive_config_forces_exact_match() {
        let mut option = opt("Hanoi", "key-1", true);
        assert!(option.matches_text("hANOI"));
        option.configs.push(OptionConfig::CaseSensitive);
        assert!(!option.matches_text("hANOI"));
        assert!(option.matches_text(" Hanoi "));
    }

    #[test]
    fn kind_round_trips_through_text() {
        for kind in [
            QuizKind::Mcq,
            QuizKind::Maq,
            QuizKind::Fib,
            QuizKind::Tad,
            QuizKind::Pow,
            QuizKind::Miq,
            QuizKind::Ord,
            QuizKind::Esq,
        ] {
            assert_eq!(QuizKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(QuizKind::parse("SPK").is_err());
    }
}
