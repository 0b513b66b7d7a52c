use chrono::{DateTime, Utc};
use havamath_core::model::{Payment, PaymentId, PaymentStatus, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_payment_row, payment_id_from_i64, to_i64};
use crate::repository::{NewPaymentRecord, PaymentRepository, SettleOutcome, StorageError};

const PAYMENT_COLUMNS: &str =
    "id, user_id, amount_vnd, method, status, reference, created_at, settled_at";

#[async_trait::async_trait]
impl PaymentRepository for SqliteRepository {
    async fn insert_payment(&self, payment: NewPaymentRecord) -> Result<PaymentId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO payments
                (user_id, amount_vnd, method, status, reference, created_at, settled_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(payment.user_id.as_str())
        .bind(to_i64("amount_vnd", payment.amount_vnd)?)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(payment.reference.to_string())
        .bind(payment.created_at)
        .bind(payment.settled_at)
        .execute(self.pool())
        .await
        .map_err(conn)?;

        payment_id_from_i64(res.last_insert_rowid())
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"
        ))
        .bind(to_i64("payment_id", id.value())?)
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_payment_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn settle_payment(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<SettleOutcome, StorageError> {
        if status == PaymentStatus::Pending {
            return Err(StorageError::Serialization(
                "cannot settle a payment back to pending".into(),
            ));
        }

        // Conditional on the pending state so two approvals cannot both win.
        let updated = sqlx::query(
            r"
            UPDATE payments
            SET status = ?2, settled_at = ?3
            WHERE id = ?1 AND status = 'pending'
            ",
        )
        .bind(to_i64("payment_id", id.value())?)
        .bind(status.as_str())
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(conn)?;

        let stored = self
            .get_payment(id)
            .await?
            .ok_or(StorageError::NotFound)?;

        if updated.rows_affected() == 0 {
            Ok(SettleOutcome::AlreadySettled(stored))
        } else {
            Ok(SettleOutcome::Settled(stored))
        }
    }

    async fn list_payments_by_status(
        &self,
        status: PaymentStatus,
        limit: u32,
    ) -> Result<Vec<Payment>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE status = ?1
             ORDER BY created_at ASC, id ASC
             LIMIT ?2"
        ))
        .bind(status.as_str())
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        rows.iter().map(map_payment_row).collect()
    }

    async fn payments_for_user(&self, user: &UserId) -> Result<Vec<Payment>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        rows.iter().map(map_payment_row).collect()
    }

    async fn has_completed_payment(&self, user: &UserId) -> Result<bool, StorageError> {
        let row = sqlx::query(
            "SELECT 1 FROM payments WHERE user_id = ?1 AND status = 'completed' LIMIT 1",
        )
        .bind(user.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;
        Ok(row.is_some())
    }
}
