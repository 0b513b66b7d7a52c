//! Quiz grading.
//!
//! Grades a submitted answer map against the stored questions of one quiz
//! lesson and produces an integer score in [0, 100]. Pure; persistence of
//! the resulting attempt is the quiz service's concern.

use std::collections::HashSet;

use crate::model::{Answer, AnswerMap, Question, QuestionId, QuestionKind};

/// Per-question grading detail, in question order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub earned: f64,
    pub max: u32,
    /// True only when the question earned its full points. Essay questions
    /// are never auto-graded and always report false.
    pub correct: bool,
}

/// Outcome of grading one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizOutcome {
    pub score: u8,
    pub passed: bool,
    pub earned_points: f64,
    pub total_points: u32,
    pub questions: Vec<QuestionResult>,
}

/// Grades `answers` against `questions`.
///
/// - single choice: full points iff the selected text equals the correct
///   choice.
/// - multiple choice: full points iff the selected set equals the correct
///   set; otherwise credit is `|selected ∩ correct| / |correct|` of the
///   points. Extra wrong selections earn no penalty beyond losing the
///   equality gate.
/// - fill-in-blank: case-insensitive, trimmed exact match, all-or-nothing.
/// - essay: earns nothing, still weighs into the total.
/// - missing or type-mismatched answers earn nothing.
///
/// The score is `round(100 × earned / total)`; a quiz whose questions carry
/// zero total points scores 0 rather than dividing by zero.
#[must_use]
pub fn grade(questions: &[Question], answers: &AnswerMap, passing_score: u8) -> QuizOutcome {
    let mut earned = 0.0_f64;
    let mut total = 0_u32;
    let mut results = Vec::with_capacity(questions.len());

    for question in questions {
        let fraction = answer_fraction(&question.kind, answers.get(&question.id));
        let points = f64::from(question.points) * fraction;
        earned += points;
        total += question.points;
        results.push(QuestionResult {
            question_id: question.id,
            earned: points,
            max: question.points,
            correct: !matches!(question.kind, QuestionKind::Essay) && (fraction - 1.0).abs() < f64::EPSILON,
        });
    }

    let score = if total == 0 {
        0
    } else {
        // Rounds half away from zero.
        (100.0 * earned / f64::from(total)).round() as u8
    };

    QuizOutcome {
        score,
        passed: score >= passing_score,
        earned_points: earned,
        total_points: total,
        questions: results,
    }
}

fn answer_fraction(kind: &QuestionKind, answer: Option<&Answer>) -> f64 {
    match (kind, answer) {
        (QuestionKind::Essay, _) | (_, None) => 0.0,
        (QuestionKind::SingleChoice { correct, .. }, Some(Answer::Choice(selected))) => {
            if selected == correct { 1.0 } else { 0.0 }
        }
        (QuestionKind::MultipleChoice { correct, .. }, Some(Answer::Choices(selected))) => {
            multiple_choice_fraction(correct, selected)
        }
        (QuestionKind::FillInBlank { answer: expected }, Some(Answer::Text(given))) => {
            if given.trim().to_lowercase() == expected.trim().to_lowercase() {
                1.0
            } else {
                0.0
            }
        }
        // Payload shape does not match the question type; no credit.
        _ => 0.0,
    }
}

fn multiple_choice_fraction(correct: &[String], selected: &[String]) -> f64 {
    let correct_set: HashSet<&str> = correct.iter().map(String::as_str).collect();
    let selected_set: HashSet<&str> = selected.iter().map(String::as_str).collect();

    if selected_set == correct_set {
        return 1.0;
    }
    if correct_set.is_empty() {
        return 0.0;
    }
    let matched = selected_set.intersection(&correct_set).count();
    matched as f64 / correct_set.len() as f64
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
