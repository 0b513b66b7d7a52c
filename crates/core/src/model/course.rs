use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::{CourseId, LessonId, ModuleId};
use crate::model::question::{Question, QuestionDraft, QuestionError, ValidatedQuestion};

/// Minimum percentage a quiz attempt must reach to count as completed when
/// the author does not set one.
pub const DEFAULT_PASSING_SCORE: u8 = 70;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("course category cannot be empty")]
    EmptyCategory,

    #[error("course author cannot be empty")]
    EmptyAuthor,

    #[error("module title cannot be empty")]
    EmptyModuleTitle,

    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,

    #[error("quiz lesson must contain at least one question")]
    EmptyQuiz,

    #[error("passing score must be between 1 and 100")]
    InvalidPassingScore,

    #[error("invalid video url: {0}")]
    InvalidVideoUrl(#[source] url::ParseError),

    #[error("invalid attachment url: {0}")]
    InvalidAttachmentUrl(#[source] url::ParseError),

    #[error(transparent)]
    Question(#[from] QuestionError),
}

//
// ─── LESSON CONTENT ────────────────────────────────────────────────────────────
//

/// Downloadable extra attached to a video lesson (worksheets, slides).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub url: Url,
}

/// Video lesson content. Watching a video leaves no completion record;
/// only quiz lessons advance course progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLesson {
    pub url: Url,
    pub notes: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Quiz lesson content: ordered questions plus the pass threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizLesson {
    pub questions: Vec<Question>,
    pub passing_score: u8,
    pub time_limit_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonKind {
    Video(VideoLesson),
    Quiz(QuizLesson),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub kind: LessonKind,
}

impl Lesson {
    /// Returns the quiz content if this is a quiz lesson.
    #[must_use]
    pub fn quiz(&self) -> Option<&QuizLesson> {
        match &self.kind {
            LessonKind::Quiz(quiz) => Some(quiz),
            LessonKind::Video(_) => None,
        }
    }

    #[must_use]
    pub fn is_quiz(&self) -> bool {
        matches!(self.kind, LessonKind::Quiz(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A stored course with its full module/lesson tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub author: String,
    pub price_vnd: u64,
    pub modules: Vec<Module>,
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// Iterates lessons across all modules in course order.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|m| m.lessons.iter())
    }

    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    #[must_use]
    pub fn find_lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons().find(|l| l.id == id)
    }
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

/// Author-supplied attachment before URL validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDraft {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDraft {
    pub url: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentDraft>,
}

fn default_passing_score() -> u8 {
    DEFAULT_PASSING_SCORE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub questions: Vec<QuestionDraft>,
    #[serde(default = "default_passing_score")]
    pub passing_score: u8,
    #[serde(default)]
    pub time_limit_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LessonDraftKind {
    Video(VideoDraft),
    Quiz(QuizDraft),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDraft {
    pub title: String,
    #[serde(flatten)]
    pub kind: LessonDraftKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDraft {
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<LessonDraft>,
}

/// Author-supplied course before validation, as accepted from the admin
/// authoring endpoints and the import bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub author: String,
    pub price_vnd: u64,
    #[serde(default)]
    pub modules: Vec<ModuleDraft>,
}

impl CourseDraft {
    /// Validates the draft into a storable course tree.
    ///
    /// Storage assigns IDs on insert; the validated tree carries none.
    ///
    /// # Errors
    ///
    /// Returns the first `CourseError` found walking the tree in course
    /// order.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedCourse, CourseError> {
        if self.title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        if self.category.trim().is_empty() {
            return Err(CourseError::EmptyCategory);
        }
        if self.author.trim().is_empty() {
            return Err(CourseError::EmptyAuthor);
        }

        let mut modules = Vec::with_capacity(self.modules.len());
        for module in self.modules {
            modules.push(validate_module(module)?);
        }

        Ok(ValidatedCourse {
            title: self.title,
            description: self.description,
            category: self.category,
            author: self.author,
            price_vnd: self.price_vnd,
            modules,
            created_at: now,
        })
    }
}

fn validate_module(draft: ModuleDraft) -> Result<ValidatedModule, CourseError> {
    if draft.title.trim().is_empty() {
        return Err(CourseError::EmptyModuleTitle);
    }
    let mut lessons = Vec::with_capacity(draft.lessons.len());
    for lesson in draft.lessons {
        lessons.push(validate_lesson(lesson)?);
    }
    Ok(ValidatedModule {
        title: draft.title,
        lessons,
    })
}

fn validate_lesson(draft: LessonDraft) -> Result<ValidatedLesson, CourseError> {
    if draft.title.trim().is_empty() {
        return Err(CourseError::EmptyLessonTitle);
    }
    let kind = match draft.kind {
        LessonDraftKind::Video(video) => {
            let url = Url::parse(&video.url).map_err(CourseError::InvalidVideoUrl)?;
            let mut attachments = Vec::with_capacity(video.attachments.len());
            for attachment in video.attachments {
                attachments.push(Attachment {
                    name: attachment.name,
                    url: Url::parse(&attachment.url)
                        .map_err(CourseError::InvalidAttachmentUrl)?,
                });
            }
            ValidatedLessonKind::Video(VideoLesson {
                url,
                notes: video.notes,
                attachments,
            })
        }
        LessonDraftKind::Quiz(quiz) => {
            if quiz.questions.is_empty() {
                return Err(CourseError::EmptyQuiz);
            }
            if quiz.passing_score == 0 || quiz.passing_score > 100 {
                return Err(CourseError::InvalidPassingScore);
            }
            let mut questions = Vec::with_capacity(quiz.questions.len());
            for question in quiz.questions {
                questions.push(question.validate()?);
            }
            ValidatedLessonKind::Quiz(ValidatedQuiz {
                questions,
                passing_score: quiz.passing_score,
                time_limit_secs: quiz.time_limit_secs,
            })
        }
    };
    Ok(ValidatedLesson {
        title: draft.title,
        kind,
    })
}

//
// ─── VALIDATED TREE ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuiz {
    pub questions: Vec<ValidatedQuestion>,
    pub passing_score: u8,
    pub time_limit_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedLessonKind {
    Video(VideoLesson),
    Quiz(ValidatedQuiz),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLesson {
    pub title: String,
    pub kind: ValidatedLessonKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedModule {
    pub title: String,
    pub lessons: Vec<ValidatedLesson>,
}

/// A validated course tree waiting for storage to assign its IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCourse {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub author: String,
    pub price_vnd: u64,
    pub modules: Vec<ValidatedModule>,
    pub created_at: DateTime<Utc>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
