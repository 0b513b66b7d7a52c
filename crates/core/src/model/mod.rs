mod attempt;
mod chat;
mod course;
mod enrollment;
mod ids;
mod payment;
mod question;
mod redemption;

pub use ids::{
    AttemptId, CodeId, CourseId, LessonId, MessageId, ModuleId, ParseIdError, PaymentId,
    QuestionId, UserId,
};

pub use attempt::{Answer, AnswerMap, QuizAttempt};
pub use chat::{ChatError, ChatMessage, Sender};
pub use course::{
    Attachment, AttachmentDraft, Course, CourseDraft, CourseError, Lesson, LessonDraft,
    LessonDraftKind, LessonKind, Module, ModuleDraft, QuizDraft, QuizLesson, ValidatedCourse,
    ValidatedLesson, ValidatedLessonKind, ValidatedModule, ValidatedQuiz, VideoDraft, VideoLesson,
    DEFAULT_PASSING_SCORE,
};
pub use enrollment::Enrollment;
pub use payment::{Payment, PaymentError, PaymentMethod, PaymentStatus};
pub use question::{Question, QuestionDraft, QuestionError, QuestionKind, ValidatedQuestion};
pub use redemption::{
    is_well_formed, normalize_code, RedeemError, RedemptionCode, CODE_ALPHABET, CODE_LENGTH,
};
