use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use havamath_core::model::{
    AnswerMap, AttemptId, ChatMessage, CodeId, Course, CourseId, Enrollment, Lesson, LessonId,
    LessonKind, MessageId, Module, ModuleId, Payment, PaymentId, PaymentMethod, PaymentStatus,
    Question, QuestionId, QuizAttempt, QuizLesson, RedeemError, RedemptionCode, Sender, UserId,
    ValidatedCourse, ValidatedLessonKind,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORD TYPES ──────────────────────────────────────────────────────────────
//

/// Persisted shape of a freshly graded attempt; the repository assigns the ID.
#[derive(Debug, Clone)]
pub struct NewAttemptRecord {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub lesson_id: LessonId,
    pub answers: AnswerMap,
    pub score: u8,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Persisted shape of one freshly generated redemption code.
#[derive(Debug, Clone)]
pub struct NewCodeRecord {
    pub code: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Persisted shape of a new payment; the repository assigns the ID.
#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub user_id: UserId,
    pub amount_vnd: u64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference: Uuid,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// Persisted shape of a new chat message; the repository assigns the ID.
#[derive(Debug, Clone)]
pub struct NewMessageRecord {
    pub user_id: UserId,
    pub sender: Sender,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// Back-office view of one support conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub user_id: UserId,
    pub last_message_at: DateTime<Utc>,
    pub last_body: String,
}

/// Result of an atomic redemption claim.
///
/// A successful claim records the zero-amount completed payment in the same
/// transaction, so a consumed code always has its access grant.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    Claimed {
        code: RedemptionCode,
        grant: Payment,
    },
    Rejected(RedeemError),
}

/// Result of a conditional admin deactivation.
#[derive(Debug, Clone)]
pub enum DeactivateOutcome {
    Deactivated(RedemptionCode),
    Rejected(RedeemError),
}

/// Result of a conditional payment settlement.
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    Settled(Payment),
    /// The payment exists but was settled before this call.
    AlreadySettled(Payment),
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist a validated course tree, assigning IDs to every node.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the tree cannot be stored.
    async fn insert_course(&self, course: &ValidatedCourse) -> Result<CourseId, StorageError>;

    /// Replace the stored tree of an existing course. The original creation
    /// timestamp is preserved; module/lesson/question IDs are reassigned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn replace_course(
        &self,
        id: CourseId,
        course: &ValidatedCourse,
    ) -> Result<(), StorageError>;

    /// Fetch a course with its full tree. `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// List courses ordered by ID, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError>;

    /// Delete a course and its tree.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append one immutable attempt; there is no update path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn insert_attempt(&self, attempt: NewAttemptRecord) -> Result<AttemptId, StorageError>;

    /// All of a user's attempts across a course, most recent first.
    ///
    /// One query per course; the caller groups by lesson and keeps the
    /// first row per key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn attempts_for_course(
        &self,
        user: &UserId,
        course: CourseId,
    ) -> Result<Vec<QuizAttempt>, StorageError>;

    /// A user's attempt history for one lesson, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn attempts_for_lesson(
        &self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<Vec<QuizAttempt>, StorageError>;
}

#[async_trait]
pub trait RedemptionCodeRepository: Send + Sync {
    /// Insert a freshly generated batch.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when any code collides with an
    /// existing one (unique code column).
    async fn insert_codes(&self, codes: &[NewCodeRecord]) -> Result<Vec<CodeId>, StorageError>;

    /// Whether a code token already exists (collision probe for generation).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn code_exists(&self, code: &str) -> Result<bool, StorageError>;

    /// Lookup by exact (normalized) token. `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_code(&self, code: &str) -> Result<Option<RedemptionCode>, StorageError>;

    /// Atomically redeem a code: a single conditional update transitions
    /// `unredeemed → redeemed` and the access-granting zero-amount payment
    /// is written in the same transaction. Losing racers observe
    /// `Rejected(AlreadyRedeemed)`, never a double grant.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only for infrastructure failures; business
    /// rejections come back as `ClaimOutcome::Rejected`.
    async fn claim(
        &self,
        code: &str,
        redeemer: &UserId,
        reference: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StorageError>;

    /// Conditionally deactivate an unredeemed code.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only for infrastructure failures.
    async fn deactivate(&self, code: &str) -> Result<DeactivateOutcome, StorageError>;

    /// Newest-first listing for the back office.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn list_codes(&self, limit: u32) -> Result<Vec<RedemptionCode>, StorageError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a payment; the repository assigns the ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the payment cannot be stored.
    async fn insert_payment(&self, payment: NewPaymentRecord) -> Result<PaymentId, StorageError>;

    /// Fetch one payment. `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, StorageError>;

    /// Conditionally settle a pending payment (approve or reject). The
    /// update only matches `status = pending`, so concurrent settlements
    /// cannot both win.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the payment does not exist.
    async fn settle_payment(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<SettleOutcome, StorageError>;

    /// Payments in a given status, oldest first (approval queue order).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn list_payments_by_status(
        &self,
        status: PaymentStatus,
        limit: u32,
    ) -> Result<Vec<Payment>, StorageError>;

    /// A user's payment history, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn payments_for_user(&self, user: &UserId) -> Result<Vec<Payment>, StorageError>;

    /// Whether any completed payment exists for the user ("has access").
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn has_completed_payment(&self, user: &UserId) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Idempotently create the user×course enrollment, returning the stored
    /// row either way.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn ensure_enrollment(
        &self,
        user: &UserId,
        course: CourseId,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, StorageError>;

    /// Whether the user is enrolled in the course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn is_enrolled(&self, user: &UserId, course: CourseId) -> Result<bool, StorageError>;

    /// A user's enrollments, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn enrollments_for_user(&self, user: &UserId) -> Result<Vec<Enrollment>, StorageError>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Append one message to the user's conversation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the message cannot be stored.
    async fn insert_message(&self, message: NewMessageRecord) -> Result<MessageId, StorageError>;

    /// Messages in a conversation strictly after the cursor, ascending by
    /// ID. `None` starts from the beginning. This is the polling endpoint's
    /// query.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn messages_after(
        &self,
        user: &UserId,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, StorageError>;

    /// Conversation summaries for the back office, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn conversations(&self, limit: u32) -> Result<Vec<ConversationSummary>, StorageError>;
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub codes: Arc<dyn RedemptionCodeRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub chat: Arc<dyn ChatRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            courses: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            codes: Arc::new(repo.clone()),
            payments: Arc::new(repo.clone()),
            enrollments: Arc::new(repo.clone()),
            chat: Arc::new(repo),
        }
    }
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// Simple in-memory repository for tests and prototyping.
///
/// One mutex guards all collections, which also makes the cross-collection
/// claim (code + grant payment) naturally atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<InMemoryState>>,
}

#[derive(Default)]
struct InMemoryState {
    courses: BTreeMap<u64, Course>,
    next_course_id: u64,
    next_tree_id: u64,
    attempts: Vec<QuizAttempt>,
    next_attempt_id: u64,
    codes: BTreeMap<u64, RedemptionCode>,
    next_code_id: u64,
    payments: BTreeMap<u64, Payment>,
    next_payment_id: u64,
    enrollments: Vec<Enrollment>,
    chat: Vec<ChatMessage>,
    next_message_id: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn materialize_course(
    state: &mut InMemoryState,
    id: CourseId,
    course: &ValidatedCourse,
    created_at: DateTime<Utc>,
) -> Course {
    let mut modules = Vec::with_capacity(course.modules.len());
    for module in &course.modules {
        let mut lessons = Vec::with_capacity(module.lessons.len());
        for lesson in &module.lessons {
            let kind = match &lesson.kind {
                ValidatedLessonKind::Video(video) => LessonKind::Video(video.clone()),
                ValidatedLessonKind::Quiz(quiz) => {
                    let mut questions = Vec::with_capacity(quiz.questions.len());
                    for question in &quiz.questions {
                        questions.push(Question {
                            id: QuestionId::new(next(&mut state.next_tree_id)),
                            points: question.points,
                            kind: question.kind.clone(),
                        });
                    }
                    LessonKind::Quiz(QuizLesson {
                        questions,
                        passing_score: quiz.passing_score,
                        time_limit_secs: quiz.time_limit_secs,
                    })
                }
            };
            lessons.push(Lesson {
                id: LessonId::new(next(&mut state.next_tree_id)),
                title: lesson.title.clone(),
                kind,
            });
        }
        modules.push(Module {
            id: ModuleId::new(next(&mut state.next_tree_id)),
            title: module.title.clone(),
            lessons,
        });
    }

    Course {
        id,
        title: course.title.clone(),
        description: course.description.clone(),
        category: course.category.clone(),
        author: course.author.clone(),
        price_vnd: course.price_vnd,
        modules,
        created_at,
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn insert_course(&self, course: &ValidatedCourse) -> Result<CourseId, StorageError> {
        let mut state = self.lock()?;
        let id = CourseId::new(next(&mut state.next_course_id));
        let stored = materialize_course(&mut state, id, course, course.created_at);
        state.courses.insert(id.value(), stored);
        Ok(id)
    }

    async fn replace_course(
        &self,
        id: CourseId,
        course: &ValidatedCourse,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let created_at = state
            .courses
            .get(&id.value())
            .ok_or(StorageError::NotFound)?
            .created_at;
        let stored = materialize_course(&mut state, id, course, created_at);
        state.courses.insert(id.value(), stored);
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let state = self.lock()?;
        Ok(state.courses.get(&id.value()).cloned())
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .courses
            .values()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state
            .courses
            .remove(&id.value())
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn insert_attempt(&self, attempt: NewAttemptRecord) -> Result<AttemptId, StorageError> {
        let mut state = self.lock()?;
        let id = AttemptId::new(next(&mut state.next_attempt_id));
        state.attempts.push(QuizAttempt::from_persisted(
            id,
            attempt.user_id,
            attempt.course_id,
            attempt.lesson_id,
            attempt.answers,
            attempt.score,
            attempt.passed,
            attempt.submitted_at,
        ));
        Ok(id)
    }

    async fn attempts_for_course(
        &self,
        user: &UserId,
        course: CourseId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let state = self.lock()?;
        let mut found: Vec<QuizAttempt> = state
            .attempts
            .iter()
            .filter(|a| a.user_id() == user && a.course_id() == course)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.submitted_at()
                .cmp(&a.submitted_at())
                .then(b.id().cmp(&a.id()))
        });
        Ok(found)
    }

    async fn attempts_for_lesson(
        &self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let state = self.lock()?;
        let mut found: Vec<QuizAttempt> = state
            .attempts
            .iter()
            .filter(|a| a.user_id() == user && a.lesson_id() == lesson)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.submitted_at()
                .cmp(&a.submitted_at())
                .then(b.id().cmp(&a.id()))
        });
        Ok(found)
    }
}

#[async_trait]
impl RedemptionCodeRepository for InMemoryRepository {
    async fn insert_codes(&self, codes: &[NewCodeRecord]) -> Result<Vec<CodeId>, StorageError> {
        let mut state = self.lock()?;
        if codes.iter().any(|c| {
            state.codes.values().any(|existing| existing.code() == c.code)
        }) {
            return Err(StorageError::Conflict);
        }
        let mut ids = Vec::with_capacity(codes.len());
        for record in codes {
            let id = CodeId::new(next(&mut state.next_code_id));
            state.codes.insert(
                id.value(),
                RedemptionCode::issued(
                    id,
                    record.code.clone(),
                    record.created_by.clone(),
                    record.expires_at,
                    record.created_at,
                ),
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StorageError> {
        let state = self.lock()?;
        Ok(state.codes.values().any(|c| c.code() == code))
    }

    async fn get_code(&self, code: &str) -> Result<Option<RedemptionCode>, StorageError> {
        let state = self.lock()?;
        Ok(state.codes.values().find(|c| c.code() == code).cloned())
    }

    async fn claim(
        &self,
        code: &str,
        redeemer: &UserId,
        reference: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StorageError> {
        let mut state = self.lock()?;
        let Some(key) = state
            .codes
            .values()
            .find(|c| c.code() == code)
            .map(|c| c.id().value())
        else {
            return Ok(ClaimOutcome::Rejected(RedeemError::NotFound));
        };

        // Entry is re-fetched mutably under the same lock; the transition and
        // the grant insert below cannot interleave with another claim.
        let stored = state.codes.get_mut(&key).ok_or(StorageError::NotFound)?;
        if let Err(reason) = stored.redeem(redeemer.clone(), now) {
            return Ok(ClaimOutcome::Rejected(reason));
        }
        let claimed = stored.clone();

        let payment_id = PaymentId::new(next(&mut state.next_payment_id));
        let grant = Payment::redemption_grant(payment_id, redeemer.clone(), reference, now);
        state.payments.insert(payment_id.value(), grant.clone());

        Ok(ClaimOutcome::Claimed {
            code: claimed,
            grant,
        })
    }

    async fn deactivate(&self, code: &str) -> Result<DeactivateOutcome, StorageError> {
        let mut state = self.lock()?;
        let Some(key) = state
            .codes
            .values()
            .find(|c| c.code() == code)
            .map(|c| c.id().value())
        else {
            return Ok(DeactivateOutcome::Rejected(RedeemError::NotFound));
        };
        let stored = state.codes.get_mut(&key).ok_or(StorageError::NotFound)?;
        match stored.deactivate() {
            Ok(()) => Ok(DeactivateOutcome::Deactivated(stored.clone())),
            Err(reason) => Ok(DeactivateOutcome::Rejected(reason)),
        }
    }

    async fn list_codes(&self, limit: u32) -> Result<Vec<RedemptionCode>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .codes
            .values()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryRepository {
    async fn insert_payment(&self, payment: NewPaymentRecord) -> Result<PaymentId, StorageError> {
        let mut state = self.lock()?;
        let id = PaymentId::new(next(&mut state.next_payment_id));
        state.payments.insert(
            id.value(),
            Payment::from_persisted(
                id,
                payment.user_id,
                payment.amount_vnd,
                payment.method,
                payment.status,
                payment.reference,
                payment.created_at,
                payment.settled_at,
            ),
        );
        Ok(id)
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, StorageError> {
        let state = self.lock()?;
        Ok(state.payments.get(&id.value()).cloned())
    }

    async fn settle_payment(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<SettleOutcome, StorageError> {
        let mut state = self.lock()?;
        let payment = state
            .payments
            .get_mut(&id.value())
            .ok_or(StorageError::NotFound)?;
        let result = match status {
            PaymentStatus::Completed => payment.approve(now),
            PaymentStatus::Failed => payment.reject(now),
            PaymentStatus::Pending => return Err(StorageError::Serialization(
                "cannot settle a payment back to pending".into(),
            )),
        };
        match result {
            Ok(()) => Ok(SettleOutcome::Settled(payment.clone())),
            Err(_) => Ok(SettleOutcome::AlreadySettled(payment.clone())),
        }
    }

    async fn list_payments_by_status(
        &self,
        status: PaymentStatus,
        limit: u32,
    ) -> Result<Vec<Payment>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .payments
            .values()
            .filter(|p| p.status() == status)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn payments_for_user(&self, user: &UserId) -> Result<Vec<Payment>, StorageError> {
        let state = self.lock()?;
        let mut found: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.user_id() == user)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        Ok(found)
    }

    async fn has_completed_payment(&self, user: &UserId) -> Result<bool, StorageError> {
        let state = self.lock()?;
        Ok(state
            .payments
            .values()
            .any(|p| p.user_id() == user && p.is_completed()))
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn ensure_enrollment(
        &self,
        user: &UserId,
        course: CourseId,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, StorageError> {
        let mut state = self.lock()?;
        if let Some(existing) = state
            .enrollments
            .iter()
            .find(|e| &e.user_id == user && e.course_id == course)
        {
            return Ok(existing.clone());
        }
        let enrollment = Enrollment {
            user_id: user.clone(),
            course_id: course,
            enrolled_at: now,
        };
        state.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn is_enrolled(&self, user: &UserId, course: CourseId) -> Result<bool, StorageError> {
        let state = self.lock()?;
        Ok(state
            .enrollments
            .iter()
            .any(|e| &e.user_id == user && e.course_id == course))
    }

    async fn enrollments_for_user(&self, user: &UserId) -> Result<Vec<Enrollment>, StorageError> {
        let state = self.lock()?;
        let mut found: Vec<Enrollment> = state
            .enrollments
            .iter()
            .filter(|e| &e.user_id == user)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(found)
    }
}

#[async_trait]
impl ChatRepository for InMemoryRepository {
    async fn insert_message(&self, message: NewMessageRecord) -> Result<MessageId, StorageError> {
        let mut state = self.lock()?;
        let id = MessageId::new(next(&mut state.next_message_id));
        let stored = ChatMessage::new(id, message.user_id, message.sender, message.body, message.sent_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.chat.push(stored);
        Ok(id)
    }

    async fn messages_after(
        &self,
        user: &UserId,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let state = self.lock()?;
        let cursor = after.map_or(0, |id| id.value());
        Ok(state
            .chat
            .iter()
            .filter(|m| &m.user_id == user && m.id.value() > cursor)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn conversations(&self, limit: u32) -> Result<Vec<ConversationSummary>, StorageError> {
        let state = self.lock()?;
        let mut latest: BTreeMap<&UserId, &ChatMessage> = BTreeMap::new();
        for message in &state.chat {
            latest
                .entry(&message.user_id)
                .and_modify(|m| {
                    if message.id > m.id {
                        *m = message;
                    }
                })
                .or_insert(message);
        }
        let mut summaries: Vec<ConversationSummary> = latest
            .values()
            .map(|m| ConversationSummary {
                user_id: m.user_id.clone(),
                last_message_at: m.sent_at,
                last_body: m.body.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        summaries.truncate(limit as usize);
        Ok(summaries)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use havamath_core::model::{CourseDraft, LessonDraft, LessonDraftKind, ModuleDraft, QuizDraft};
    use havamath_core::model::{QuestionDraft, QuestionKind};
    use havamath_core::time::fixed_now;

    fn validated_course() -> ValidatedCourse {
        CourseDraft {
            title: "Toán 12".into(),
            description: None,
            category: "Toán".into(),
            author: "Thầy Hà".into(),
            price_vnd: 599_000,
            modules: vec![ModuleDraft {
                title: "Chương 1".into(),
                lessons: vec![LessonDraft {
                    title: "Kiểm tra".into(),
                    kind: LessonDraftKind::Quiz(QuizDraft {
                        questions: vec![QuestionDraft {
                            points: 1,
                            kind: QuestionKind::FillInBlank { answer: "96".into() },
                        }],
                        passing_score: 70,
                        time_limit_secs: None,
                    }),
                }],
            }],
        }
        .validate(fixed_now())
        .unwrap()
    }

    #[tokio::test]
    async fn course_tree_round_trips_with_assigned_ids() {
        let repo = InMemoryRepository::new();
        let id = repo.insert_course(&validated_course()).await.unwrap();
        let course = repo.get_course(id).await.unwrap().expect("stored");
        assert_eq!(course.lesson_count(), 1);
        let lesson = course.lessons().next().unwrap();
        assert!(lesson.is_quiz());
        assert!(lesson.quiz().unwrap().questions[0].id.value() > 0);
    }

    #[tokio::test]
    async fn claim_is_first_writer_wins_and_inserts_grant() {
        let repo = InMemoryRepository::new();
        repo.insert_codes(&[NewCodeRecord {
            code: "ABC123XY9Z".into(),
            created_by: UserId::new("admin_1"),
            created_at: fixed_now(),
            expires_at: None,
        }])
        .await
        .unwrap();

        let won = repo
            .claim(
                "ABC123XY9Z",
                &UserId::new("user_1"),
                Uuid::nil(),
                fixed_now(),
            )
            .await
            .unwrap();
        let ClaimOutcome::Claimed { code, grant } = won else {
            panic!("expected first claim to win");
        };
        assert_eq!(code.redeemed_by(), Some(&UserId::new("user_1")));
        assert!(grant.is_completed());

        let lost = repo
            .claim(
                "ABC123XY9Z",
                &UserId::new("user_2"),
                Uuid::nil(),
                fixed_now(),
            )
            .await
            .unwrap();
        assert!(matches!(
            lost,
            ClaimOutcome::Rejected(RedeemError::AlreadyRedeemed)
        ));
        // Exactly one grant was recorded.
        assert!(repo
            .has_completed_payment(&UserId::new("user_1"))
            .await
            .unwrap());
        assert!(!repo
            .has_completed_payment(&UserId::new("user_2"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn duplicate_codes_conflict() {
        let repo = InMemoryRepository::new();
        let record = NewCodeRecord {
            code: "ABC123XY9Z".into(),
            created_by: UserId::new("admin_1"),
            created_at: fixed_now(),
            expires_at: None,
        };
        repo.insert_codes(std::slice::from_ref(&record)).await.unwrap();
        let err = repo.insert_codes(&[record]).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn enrollment_is_idempotent() {
        let repo = InMemoryRepository::new();
        let user = UserId::new("user_1");
        let a = repo
            .ensure_enrollment(&user, CourseId::new(1), fixed_now())
            .await
            .unwrap();
        let b = repo
            .ensure_enrollment(&user, CourseId::new(1), fixed_now())
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(repo.enrollments_for_user(&user).await.unwrap().len(), 1);
    }
}
