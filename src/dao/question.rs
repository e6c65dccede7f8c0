use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One selectable option of a four-option question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    /// Display text of the option.
    pub answer: String,
    /// Whether selecting this option scores the round.
    pub is_correct: bool,
}

/// A quiz question, read-only during gameplay.
///
/// The two shapes share the answer-index contract of the round orchestrator:
/// four-option questions use indices 0-3, true/false questions use 0 for
/// "True" and 1 for "False".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    /// Four fixed options, any subset of which may be correct.
    #[serde(rename_all = "camelCase")]
    FourOptions {
        /// Prompt shown to players.
        question: String,
        /// The four options, in display order.
        answers: [AnswerOption; 4],
    },
    /// Binary true/false question.
    #[serde(rename_all = "camelCase")]
    TrueFalse {
        /// Prompt shown to players.
        question: String,
        /// The expected truth value.
        correct_answer: bool,
    },
}

impl Question {
    /// Prompt text, independent of shape.
    pub fn prompt(&self) -> &str {
        match self {
            Question::FourOptions { question, .. } | Question::TrueFalse { question, .. } => {
                question
            }
        }
    }

    /// Whether the given option index scores this question.
    ///
    /// Out-of-range indices are simply wrong, never an error; the submission
    /// path has already rejected anything above 3.
    pub fn is_correct(&self, answer_index: u8) -> bool {
        match self {
            Question::FourOptions { answers, .. } => answers
                .get(usize::from(answer_index))
                .is_some_and(|option| option.is_correct),
            Question::TrueFalse { correct_answer, .. } => match answer_index {
                0 => *correct_answer,
                1 => !*correct_answer,
                _ => false,
            },
        }
    }

    /// Number of selectable options for this shape.
    pub fn option_count(&self) -> u8 {
        match self {
            Question::FourOptions { .. } => 4,
            Question::TrueFalse { .. } => 2,
        }
    }

    /// Option texts in display order.
    pub fn option_texts(&self) -> Vec<String> {
        match self {
            Question::FourOptions { answers, .. } => {
                answers.iter().map(|option| option.answer.clone()).collect()
            }
            Question::TrueFalse { .. } => vec!["True".into(), "False".into()],
        }
    }

    /// Option indices revealed as correct at the end of a round.
    pub fn correct_indices(&self) -> Vec<u8> {
        match self {
            Question::FourOptions { answers, .. } => answers
                .iter()
                .enumerate()
                .filter(|(_, option)| option.is_correct)
                .map(|(index, _)| index as u8)
                .collect(),
            Question::TrueFalse { correct_answer, .. } => {
                vec![if *correct_answer { 0 } else { 1 }]
            }
        }
    }
}
