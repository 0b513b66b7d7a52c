//! Service error → HTTP response mapping.
//!
//! Every failure leaves the API exactly once, as the
//! `{ "success": false, "error": "…" }` shape the web client turns into a
//! toast. Student-facing reasons are worded in Vietnamese; admin validation
//! failures pass the technical message through.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use havamath_core::model::{ChatError, RedeemError};
use services::{
    CatalogServiceError, ChatServiceError, EnrollmentServiceError, ImportServiceError,
    PaymentServiceError, ProgressServiceError, QuizServiceError, RedemptionServiceError,
};
use storage::repository::StorageError;

/// Application-level error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Bạn cần đăng nhập để tiếp tục".to_string(),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Bạn không có quyền thực hiện thao tác này".to_string(),
            ),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Đã có lỗi xảy ra, vui lòng thử lại sau".to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "error": message,
        });
        (status, Json(body)).into_response()
    }
}

fn storage(e: StorageError) -> ApiError {
    match e {
        StorageError::NotFound => ApiError::NotFound("Không tìm thấy dữ liệu".into()),
        StorageError::Conflict => ApiError::Conflict("Dữ liệu đã tồn tại".into()),
        other => ApiError::Internal(other.to_string()),
    }
}

fn redeem_reason(reason: RedeemError) -> &'static str {
    match reason {
        RedeemError::NotFound => "Mã kích hoạt không tồn tại",
        RedeemError::Inactive => "Mã kích hoạt đã bị vô hiệu hoá",
        RedeemError::AlreadyRedeemed => "Mã kích hoạt đã được sử dụng",
        RedeemError::Expired => "Mã kích hoạt đã hết hạn",
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        storage(e)
    }
}

impl From<CatalogServiceError> for ApiError {
    fn from(e: CatalogServiceError) -> Self {
        match e {
            // Admin authoring: the technical validation message is the
            // useful part.
            CatalogServiceError::Course(course) => ApiError::BadRequest(course.to_string()),
            CatalogServiceError::Storage(StorageError::NotFound) => {
                ApiError::NotFound("Không tìm thấy khoá học".into())
            }
            CatalogServiceError::Storage(other) => storage(other),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<QuizServiceError> for ApiError {
    fn from(e: QuizServiceError) -> Self {
        match e {
            QuizServiceError::CourseNotFound => {
                ApiError::NotFound("Không tìm thấy khoá học".into())
            }
            QuizServiceError::LessonNotFound => {
                ApiError::NotFound("Không tìm thấy bài học".into())
            }
            QuizServiceError::NotAQuiz => {
                ApiError::BadRequest("Bài học này không có bài kiểm tra".into())
            }
            QuizServiceError::Storage(other) => storage(other),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ProgressServiceError> for ApiError {
    fn from(e: ProgressServiceError) -> Self {
        match e {
            ProgressServiceError::CourseNotFound => {
                ApiError::NotFound("Không tìm thấy khoá học".into())
            }
            ProgressServiceError::Storage(other) => storage(other),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<RedemptionServiceError> for ApiError {
    fn from(e: RedemptionServiceError) -> Self {
        match e {
            RedemptionServiceError::Redeem(reason) => match reason {
                RedeemError::NotFound => ApiError::NotFound(redeem_reason(reason).into()),
                _ => ApiError::Conflict(redeem_reason(reason).into()),
            },
            RedemptionServiceError::InvalidBatchSize => {
                ApiError::BadRequest(e.to_string())
            }
            RedemptionServiceError::KeyspaceExhausted => ApiError::Internal(e.to_string()),
            RedemptionServiceError::Storage(other) => storage(other),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PaymentServiceError> for ApiError {
    fn from(e: PaymentServiceError) -> Self {
        match e {
            PaymentServiceError::NotFound => {
                ApiError::NotFound("Không tìm thấy đơn thanh toán".into())
            }
            PaymentServiceError::AlreadySettled => {
                ApiError::Conflict("Đơn thanh toán đã được xử lý".into())
            }
            PaymentServiceError::ZeroAmount => {
                ApiError::BadRequest("Số tiền thanh toán không hợp lệ".into())
            }
            PaymentServiceError::UnsupportedMethod => ApiError::BadRequest(
                "Phương thức thanh toán không được hỗ trợ".into(),
            ),
            PaymentServiceError::Storage(other) => storage(other),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<EnrollmentServiceError> for ApiError {
    fn from(e: EnrollmentServiceError) -> Self {
        match e {
            EnrollmentServiceError::CourseNotFound => {
                ApiError::NotFound("Không tìm thấy khoá học".into())
            }
            EnrollmentServiceError::Storage(other) => storage(other),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ChatServiceError> for ApiError {
    fn from(e: ChatServiceError) -> Self {
        match e {
            ChatServiceError::Chat(ChatError::EmptyBody) => {
                ApiError::BadRequest("Tin nhắn không được để trống".into())
            }
            ChatServiceError::Storage(other) => storage(other),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ImportServiceError> for ApiError {
    fn from(e: ImportServiceError) -> Self {
        match e {
            ImportServiceError::Disabled => {
                ApiError::BadRequest("CMS import is not configured".into())
            }
            ImportServiceError::Course(course) => ApiError::BadRequest(course.to_string()),
            ImportServiceError::UnknownCourse(_) => ApiError::BadRequest(e.to_string()),
            ImportServiceError::Storage(other) => storage(other),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redeem_rejections_map_to_distinct_toasts() {
        let not_found: ApiError = RedemptionServiceError::Redeem(RedeemError::NotFound).into();
        assert!(matches!(not_found, ApiError::NotFound(_)));

        let taken: ApiError = RedemptionServiceError::Redeem(RedeemError::AlreadyRedeemed).into();
        let ApiError::Conflict(message) = taken else {
            panic!("expected conflict");
        };
        assert_eq!(message, "Mã kích hoạt đã được sử dụng");
    }

    #[test]
    fn storage_not_found_is_a_404() {
        let err: ApiError = StorageError::NotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
