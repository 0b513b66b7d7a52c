use chrono::{DateTime, Utc};
use havamath_core::model::{CodeId, Payment, RedeemError, RedemptionCode, UserId};
use uuid::Uuid;

use super::SqliteRepository;
use super::mapping::{code_id_from_i64, conn, map_code_row, payment_id_from_i64};
use crate::repository::{
    ClaimOutcome, DeactivateOutcome, NewCodeRecord, RedemptionCodeRepository, StorageError,
};

fn insert_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl RedemptionCodeRepository for SqliteRepository {
    async fn insert_codes(&self, codes: &[NewCodeRecord]) -> Result<Vec<CodeId>, StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn)?;
        let mut ids = Vec::with_capacity(codes.len());

        for record in codes {
            let res = sqlx::query(
                r"
                INSERT INTO redemption_codes (code, created_by, created_at, expires_at)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(&record.code)
            .bind(record.created_by.as_str())
            .bind(record.created_at)
            .bind(record.expires_at)
            .execute(&mut *tx)
            .await
            .map_err(insert_err)?;

            ids.push(code_id_from_i64(res.last_insert_rowid())?);
        }

        tx.commit().await.map_err(conn)?;
        Ok(ids)
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM redemption_codes WHERE code = ?1")
            .bind(code)
            .fetch_optional(self.pool())
            .await
            .map_err(conn)?;
        Ok(row.is_some())
    }

    async fn get_code(&self, code: &str) -> Result<Option<RedemptionCode>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, code, is_active, redeemed_by, redeemed_at, created_by, created_at, expires_at
            FROM redemption_codes WHERE code = ?1
            ",
        )
        .bind(code)
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_code_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn claim(
        &self,
        code: &str,
        redeemer: &UserId,
        reference: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn)?;

        // One conditional update is the whole claim: concurrent redeemers
        // race on this statement and at most one matches.
        let updated = sqlx::query(
            r"
            UPDATE redemption_codes
            SET redeemed_by = ?2, redeemed_at = ?3
            WHERE code = ?1
              AND is_active = 1
              AND redeemed_by IS NULL
              AND (expires_at IS NULL OR expires_at > ?3)
            ",
        )
        .bind(code)
        .bind(redeemer.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if updated.rows_affected() == 0 {
            drop(tx);
            // Classify the rejection for the distinct user-facing reasons.
            let Some(existing) = self.get_code(code).await? else {
                return Ok(ClaimOutcome::Rejected(RedeemError::NotFound));
            };
            let reason = match existing.claimable(now) {
                Err(reason) => reason,
                // The code became claimable between the update and this read
                // only if a racing claim just won; report it as taken.
                Ok(()) => RedeemError::AlreadyRedeemed,
            };
            return Ok(ClaimOutcome::Rejected(reason));
        }

        // The access grant shares the claim transaction: a consumed code
        // always has its zero-amount completed payment.
        let payment_res = sqlx::query(
            r"
            INSERT INTO payments
                (user_id, amount_vnd, method, status, reference, created_at, settled_at)
            VALUES (?1, 0, 'redemption_code', 'completed', ?2, ?3, ?3)
            ",
        )
        .bind(redeemer.as_str())
        .bind(reference.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let row = sqlx::query(
            r"
            SELECT id, code, is_active, redeemed_by, redeemed_at, created_by, created_at, expires_at
            FROM redemption_codes WHERE code = ?1
            ",
        )
        .bind(code)
        .fetch_one(&mut *tx)
        .await
        .map_err(conn)?;
        let claimed = map_code_row(&row)?;

        tx.commit().await.map_err(conn)?;

        let grant = Payment::redemption_grant(
            payment_id_from_i64(payment_res.last_insert_rowid())?,
            redeemer.clone(),
            reference,
            now,
        );
        Ok(ClaimOutcome::Claimed {
            code: claimed,
            grant,
        })
    }

    async fn deactivate(&self, code: &str) -> Result<DeactivateOutcome, StorageError> {
        let updated = sqlx::query(
            r"
            UPDATE redemption_codes
            SET is_active = 0
            WHERE code = ?1 AND redeemed_by IS NULL
            ",
        )
        .bind(code)
        .execute(self.pool())
        .await
        .map_err(conn)?;

        if updated.rows_affected() == 0 {
            return match self.get_code(code).await? {
                None => Ok(DeactivateOutcome::Rejected(RedeemError::NotFound)),
                // The update only skips existing rows that are redeemed.
                Some(_) => Ok(DeactivateOutcome::Rejected(RedeemError::AlreadyRedeemed)),
            };
        }

        let stored = self
            .get_code(code)
            .await?
            .ok_or(StorageError::NotFound)?;
        Ok(DeactivateOutcome::Deactivated(stored))
    }

    async fn list_codes(&self, limit: u32) -> Result<Vec<RedemptionCode>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, code, is_active, redeemed_by, redeemed_at, created_by, created_at, expires_at
            FROM redemption_codes
            ORDER BY id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        rows.iter().map(map_code_row).collect()
    }
}
