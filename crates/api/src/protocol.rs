//! JSON request/response bodies for the HTTP API.
//!
//! Out-types are projections of the domain model; quiz payloads in
//! particular never include answer keys, since grading happens server-side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use havamath_core::model::{
    AnswerMap, ChatMessage, Course, CourseDraft, Enrollment, Lesson, LessonKind, Payment,
    QuizAttempt, RedemptionCode, Sender,
};
use havamath_core::progress::{CourseProgress, LessonStatus};
use havamath_core::scoring::QuizOutcome;
use storage::repository::ConversationSummary;

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub struct CourseSummaryOut {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub author: String,
    pub price_vnd: u64,
    pub lesson_count: usize,
}

impl CourseSummaryOut {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            id: course.id.value(),
            title: course.title.clone(),
            description: course.description.clone(),
            category: course.category.clone(),
            author: course.author.clone(),
            price_vnd: course.price_vnd,
            lesson_count: course.lesson_count(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: u64,
    pub points: u32,
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Choice texts for choice questions; answer keys are never exposed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct AttachmentOut {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct LessonOut {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passing_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<QuestionOut>,
}

impl LessonOut {
    #[must_use]
    pub fn from_lesson(lesson: &Lesson) -> Self {
        match &lesson.kind {
            LessonKind::Video(video) => Self {
                id: lesson.id.value(),
                title: lesson.title.clone(),
                kind: "video",
                video_url: Some(video.url.to_string()),
                notes: video.notes.clone(),
                attachments: video
                    .attachments
                    .iter()
                    .map(|a| AttachmentOut {
                        name: a.name.clone(),
                        url: a.url.to_string(),
                    })
                    .collect(),
                passing_score: None,
                time_limit_secs: None,
                questions: Vec::new(),
            },
            LessonKind::Quiz(quiz) => Self {
                id: lesson.id.value(),
                title: lesson.title.clone(),
                kind: "quiz",
                video_url: None,
                notes: None,
                attachments: Vec::new(),
                passing_score: Some(quiz.passing_score),
                time_limit_secs: quiz.time_limit_secs,
                questions: quiz
                    .questions
                    .iter()
                    .map(|q| {
                        use havamath_core::model::QuestionKind;
                        let (kind, choices) = match &q.kind {
                            QuestionKind::SingleChoice { choices, .. } => {
                                ("single_choice", Some(choices.clone()))
                            }
                            QuestionKind::MultipleChoice { choices, .. } => {
                                ("multiple_choice", Some(choices.clone()))
                            }
                            QuestionKind::FillInBlank { .. } => ("fill_in_blank", None),
                            QuestionKind::Essay => ("essay", None),
                        };
                        QuestionOut {
                            id: q.id.value(),
                            points: q.points,
                            kind,
                            choices,
                        }
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModuleOut {
    pub id: u64,
    pub title: String,
    pub lessons: Vec<LessonOut>,
}

#[derive(Debug, Serialize)]
pub struct CourseDetailOut {
    #[serde(flatten)]
    pub summary: CourseSummaryOut,
    pub modules: Vec<ModuleOut>,
}

impl CourseDetailOut {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            summary: CourseSummaryOut::from_course(course),
            modules: course
                .modules
                .iter()
                .map(|m| ModuleOut {
                    id: m.id.value(),
                    title: m.title.clone(),
                    lessons: m.lessons.iter().map(LessonOut::from_lesson).collect(),
                })
                .collect(),
        }
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub struct LessonStatusOut {
    pub lesson_id: u64,
    pub title: String,
    pub is_quiz: bool,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_score: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct ProgressOut {
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub percent: u8,
    pub lessons: Vec<LessonStatusOut>,
}

impl ProgressOut {
    #[must_use]
    pub fn from_progress(progress: CourseProgress) -> Self {
        Self {
            total_lessons: progress.total_lessons,
            completed_lessons: progress.completed_lessons,
            percent: progress.percent,
            lessons: progress
                .lessons
                .into_iter()
                .map(|status: LessonStatus| LessonStatusOut {
                    lesson_id: status.lesson_id.value(),
                    title: status.title,
                    is_quiz: status.is_quiz,
                    completed: status.completed,
                    latest_score: status.latest_score,
                })
                .collect(),
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub struct SubmitAttemptIn {
    pub course_id: u64,
    pub answers: AnswerMap,
}

#[derive(Debug, Serialize)]
pub struct QuestionResultOut {
    pub question_id: u64,
    pub earned: f64,
    pub max: u32,
    pub correct: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitAttemptOut {
    pub score: u8,
    pub passed: bool,
    pub earned_points: f64,
    pub total_points: u32,
    pub questions: Vec<QuestionResultOut>,
    /// False for anonymous submissions: the result was computed but no
    /// attempt was recorded.
    pub recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<u64>,
}

impl SubmitAttemptOut {
    #[must_use]
    pub fn from_outcome(outcome: QuizOutcome, attempt_id: Option<u64>) -> Self {
        Self {
            score: outcome.score,
            passed: outcome.passed,
            earned_points: outcome.earned_points,
            total_points: outcome.total_points,
            questions: outcome
                .questions
                .into_iter()
                .map(|q| QuestionResultOut {
                    question_id: q.question_id.value(),
                    earned: q.earned,
                    max: q.max,
                    correct: q.correct,
                })
                .collect(),
            recorded: attempt_id.is_some(),
            attempt_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptOut {
    pub id: u64,
    pub lesson_id: u64,
    pub score: u8,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
}

impl AttemptOut {
    #[must_use]
    pub fn from_attempt(attempt: &QuizAttempt) -> Self {
        Self {
            id: attempt.id().value(),
            lesson_id: attempt.lesson_id().value(),
            score: attempt.score(),
            passed: attempt.passed(),
            submitted_at: attempt.submitted_at(),
        }
    }
}

//
// ─── BILLING ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub struct OrderIn {
    pub amount_vnd: u64,
    pub method: havamath_core::model::PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct PaymentOut {
    pub id: u64,
    pub amount_vnd: u64,
    pub method: havamath_core::model::PaymentMethod,
    pub status: havamath_core::model::PaymentStatus,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl PaymentOut {
    #[must_use]
    pub fn from_payment(payment: &Payment) -> Self {
        Self {
            id: payment.id().value(),
            amount_vnd: payment.amount_vnd(),
            method: payment.method(),
            status: payment.status(),
            reference: payment.reference().to_string(),
            created_at: payment.created_at(),
            settled_at: payment.settled_at(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RedeemIn {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct RedeemOut {
    pub code: String,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub grant: PaymentOut,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentOut {
    pub course_id: u64,
    pub enrolled_at: DateTime<Utc>,
}

impl EnrollmentOut {
    #[must_use]
    pub fn from_enrollment(enrollment: &Enrollment) -> Self {
        Self {
            course_id: enrollment.course_id.value(),
            enrolled_at: enrollment.enrolled_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VisitOut {
    pub enrolled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment: Option<EnrollmentOut>,
}

//
// ─── CHAT ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub struct ChatSendIn {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    #[serde(default)]
    pub after: Option<u64>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageOut {
    pub id: u64,
    pub sender: Sender,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessageOut {
    #[must_use]
    pub fn from_message(message: &ChatMessage) -> Self {
        Self {
            id: message.id.value(),
            sender: message.sender,
            body: message.body.clone(),
            sent_at: message.sent_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationOut {
    pub user_id: String,
    pub last_body: String,
    pub last_message_at: DateTime<Utc>,
}

impl ConversationOut {
    #[must_use]
    pub fn from_summary(summary: &ConversationSummary) -> Self {
        Self {
            user_id: summary.user_id.to_string(),
            last_body: summary.last_body.clone(),
            last_message_at: summary.last_message_at,
        }
    }
}

//
// ─── ADMIN ─────────────────────────────────────────────────────────────────────
//

/// Course authoring accepts the domain draft shape directly.
pub type CourseIn = CourseDraft;

#[derive(Debug, Serialize)]
pub struct CreatedOut {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct IssueCodesIn {
    pub count: u32,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CodeOut {
    pub id: u64,
    pub code: String,
    pub active: bool,
    pub redeemed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CodeOut {
    #[must_use]
    pub fn from_code(code: &RedemptionCode) -> Self {
        Self {
            id: code.id().value(),
            code: code.code().to_string(),
            active: code.is_active(),
            redeemed: code.is_redeemed(),
            redeemed_by: code.redeemed_by().map(ToString::to_string),
            redeemed_at: code.redeemed_at(),
            created_at: code.created_at(),
            expires_at: code.expires_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportOut {
    pub created: Vec<u64>,
    pub updated: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub status: Option<havamath_core::model::PaymentStatus>,
}
