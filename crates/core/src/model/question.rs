use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question must be worth at least one point")]
    ZeroPoints,

    #[error("choice question has no choices")]
    NoChoices,

    #[error("correct choice is not one of the listed choices")]
    CorrectChoiceMissing,

    #[error("multiple-choice question has no correct choices")]
    EmptyCorrectSet,

    #[error("fill-in-blank answer cannot be empty")]
    EmptyAnswer,
}

//
// ─── QUESTION KINDS ────────────────────────────────────────────────────────────
//

/// Type-tagged question variant with its correctness definition.
///
/// Correctness is defined over choice *texts*, not indices; attempts store
/// the selected texts verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    /// Exactly one choice is correct; full points or nothing.
    SingleChoice { choices: Vec<String>, correct: String },
    /// A set of correct choices; partial credit applies (see `scoring`).
    MultipleChoice {
        choices: Vec<String>,
        correct: Vec<String>,
    },
    /// Case-insensitive, trimmed exact match; all-or-nothing.
    FillInBlank { answer: String },
    /// Never auto-graded. Still counts toward the total point pool.
    Essay,
}

impl QuestionKind {
    /// Validates the correctness definition against the listed choices.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the definition is internally inconsistent.
    pub fn validate(&self) -> Result<(), QuestionError> {
        match self {
            QuestionKind::SingleChoice { choices, correct } => {
                if choices.is_empty() {
                    return Err(QuestionError::NoChoices);
                }
                if !choices.contains(correct) {
                    return Err(QuestionError::CorrectChoiceMissing);
                }
                Ok(())
            }
            QuestionKind::MultipleChoice { choices, correct } => {
                if choices.is_empty() {
                    return Err(QuestionError::NoChoices);
                }
                if correct.is_empty() {
                    return Err(QuestionError::EmptyCorrectSet);
                }
                if correct.iter().any(|c| !choices.contains(c)) {
                    return Err(QuestionError::CorrectChoiceMissing);
                }
                Ok(())
            }
            QuestionKind::FillInBlank { answer } => {
                if answer.trim().is_empty() {
                    return Err(QuestionError::EmptyAnswer);
                }
                Ok(())
            }
            QuestionKind::Essay => Ok(()),
        }
    }
}

//
// ─── DRAFT / VALIDATED / PERSISTED ─────────────────────────────────────────────
//

fn default_points() -> u32 {
    1
}

/// Author-supplied question before validation (admin authoring and imports).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl QuestionDraft {
    /// Validates the draft into a storable question body.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the point value or correctness definition
    /// is invalid.
    pub fn validate(self) -> Result<ValidatedQuestion, QuestionError> {
        if self.points == 0 {
            return Err(QuestionError::ZeroPoints);
        }
        self.kind.validate()?;
        Ok(ValidatedQuestion {
            points: self.points,
            kind: self.kind,
        })
    }
}

/// A validated question body, not yet assigned a storage ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub points: u32,
    pub kind: QuestionKind,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            points: self.points,
            kind: self.kind,
        }
    }
}

/// A stored question with its point value and correctness definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub points: u32,
    pub kind: QuestionKind,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
