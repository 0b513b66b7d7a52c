use havamath_core::model::{
    AnswerMap, AttemptId, ChatMessage, CodeId, CourseId, Enrollment, LessonId, MessageId,
    ModuleId, Payment, PaymentId, PaymentMethod, PaymentStatus, QuestionId, QuestionKind,
    QuizAttempt, RedemptionCode, Sender, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(i64_to_u64("module_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

pub(crate) fn payment_id_from_i64(v: i64) -> Result<PaymentId, StorageError> {
    Ok(PaymentId::new(i64_to_u64("payment_id", v)?))
}

pub(crate) fn code_id_from_i64(v: i64) -> Result<CodeId, StorageError> {
    Ok(CodeId::new(i64_to_u64("code_id", v)?))
}

pub(crate) fn message_id_from_i64(v: i64) -> Result<MessageId, StorageError> {
    Ok(MessageId::new(i64_to_u64("message_id", v)?))
}

//
// ─── COLUMN CODECS ─────────────────────────────────────────────────────────────
//

pub(crate) fn question_body_to_json(kind: &QuestionKind) -> Result<String, StorageError> {
    serde_json::to_string(kind).map_err(ser)
}

pub(crate) fn question_body_from_json(raw: &str) -> Result<QuestionKind, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn answers_to_json(answers: &AnswerMap) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn answers_from_json(raw: &str) -> Result<AnswerMap, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn parse_payment_method(s: &str) -> Result<PaymentMethod, StorageError> {
    match s {
        "bank_transfer" => Ok(PaymentMethod::BankTransfer),
        "mobile_wallet" => Ok(PaymentMethod::MobileWallet),
        "redemption_code" => Ok(PaymentMethod::RedemptionCode),
        _ => Err(StorageError::Serialization(format!("invalid method: {s}"))),
    }
}

pub(crate) fn parse_payment_status(s: &str) -> Result<PaymentStatus, StorageError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "completed" => Ok(PaymentStatus::Completed),
        "failed" => Ok(PaymentStatus::Failed),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn parse_sender(s: &str) -> Result<Sender, StorageError> {
    match s {
        "student" => Ok(Sender::Student),
        "support" => Ok(Sender::Support),
        _ => Err(StorageError::Serialization(format!("invalid sender: {s}"))),
    }
}

//
// ─── ROW MAPPERS ───────────────────────────────────────────────────────────────
//

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    let answers = answers_from_json(&row.try_get::<String, _>("answers").map_err(ser)?)?;
    let score_i64: i64 = row.try_get("score").map_err(ser)?;
    let score = u8::try_from(score_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid score: {score_i64}")))?;

    Ok(QuizAttempt::from_persisted(
        attempt_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        answers,
        score,
        row.try_get::<i64, _>("passed").map_err(ser)? != 0,
        row.try_get("submitted_at").map_err(ser)?,
    ))
}

pub(crate) fn map_code_row(row: &SqliteRow) -> Result<RedemptionCode, StorageError> {
    Ok(RedemptionCode::from_persisted(
        code_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("code").map_err(ser)?,
        row.try_get::<i64, _>("is_active").map_err(ser)? != 0,
        row.try_get::<Option<String>, _>("redeemed_by")
            .map_err(ser)?
            .map(UserId::new),
        row.try_get("redeemed_at").map_err(ser)?,
        UserId::new(row.try_get::<String, _>("created_by").map_err(ser)?),
        row.try_get("created_at").map_err(ser)?,
        row.try_get("expires_at").map_err(ser)?,
    ))
}

pub(crate) fn map_payment_row(row: &SqliteRow) -> Result<Payment, StorageError> {
    let amount_i64: i64 = row.try_get("amount_vnd").map_err(ser)?;
    let reference_raw: String = row.try_get("reference").map_err(ser)?;
    let reference = Uuid::parse_str(&reference_raw).map_err(ser)?;

    Ok(Payment::from_persisted(
        payment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        i64_to_u64("amount_vnd", amount_i64)?,
        parse_payment_method(&row.try_get::<String, _>("method").map_err(ser)?)?,
        parse_payment_status(&row.try_get::<String, _>("status").map_err(ser)?)?,
        reference,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("settled_at").map_err(ser)?,
    ))
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    Ok(Enrollment {
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        course_id: course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        enrolled_at: row.try_get("enrolled_at").map_err(ser)?,
    })
}

pub(crate) fn map_message_row(row: &SqliteRow) -> Result<ChatMessage, StorageError> {
    ChatMessage::new(
        message_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        parse_sender(&row.try_get::<String, _>("sender").map_err(ser)?)?,
        row.try_get::<String, _>("body").map_err(ser)?,
        row.try_get("sent_at").map_err(ser)?,
    )
    .map_err(ser)
}
