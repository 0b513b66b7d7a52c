use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::ids::{PaymentId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PaymentError {
    #[error("payment has already been settled")]
    AlreadySettled,
}

//
// ─── METHOD / STATUS ───────────────────────────────────────────────────────────
//

/// How the buyer paid. Physical redemption codes show up here so that
/// "access granted" is represented uniformly as a completed payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    MobileWallet,
    RedemptionCode,
}

impl PaymentMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::MobileWallet => "mobile_wallet",
            PaymentMethod::RedemptionCode => "redemption_code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

//
// ─── PAYMENT ───────────────────────────────────────────────────────────────────
//

/// One order in the one-time-payment model. A completed payment of any
/// method grants full catalog access; enrollments are derived lazily from
/// it on course visits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    id: PaymentId,
    user_id: UserId,
    amount_vnd: u64,
    method: PaymentMethod,
    status: PaymentStatus,
    reference: Uuid,
    created_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Builds a pending order awaiting manual approval (bank transfer or
    /// mobile wallet). The reference is printed into the transfer
    /// description so the back office can match it.
    #[must_use]
    pub fn pending_order(
        id: PaymentId,
        user_id: UserId,
        amount_vnd: u64,
        method: PaymentMethod,
        reference: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            amount_vnd,
            method,
            status: PaymentStatus::Pending,
            reference,
            created_at: now,
            settled_at: None,
        }
    }

    /// Builds the zero-amount, pre-completed payment a code redemption
    /// produces as its access-granting side effect.
    #[must_use]
    pub fn redemption_grant(id: PaymentId, user_id: UserId, reference: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            amount_vnd: 0,
            method: PaymentMethod::RedemptionCode,
            status: PaymentStatus::Completed,
            reference,
            created_at: now,
            settled_at: Some(now),
        }
    }

    /// Reconstructs a payment from storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: PaymentId,
        user_id: UserId,
        amount_vnd: u64,
        method: PaymentMethod,
        status: PaymentStatus,
        reference: Uuid,
        created_at: DateTime<Utc>,
        settled_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            user_id,
            amount_vnd,
            method,
            status,
            reference,
            created_at,
            settled_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> PaymentId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn amount_vnd(&self) -> u64 {
        self.amount_vnd
    }

    #[must_use]
    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    #[must_use]
    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    #[must_use]
    pub fn reference(&self) -> Uuid {
        self.reference
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    /// Marks a pending payment completed.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::AlreadySettled` unless the payment is pending.
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), PaymentError> {
        self.settle(PaymentStatus::Completed, now)
    }

    /// Marks a pending payment failed.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::AlreadySettled` unless the payment is pending.
    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<(), PaymentError> {
        self.settle(PaymentStatus::Failed, now)
    }

    fn settle(&mut self, status: PaymentStatus, now: DateTime<Utc>) -> Result<(), PaymentError> {
        if self.status != PaymentStatus::Pending {
            return Err(PaymentError::AlreadySettled);
        }
        self.status = status;
        self.settled_at = Some(now);
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn pending() -> Payment {
        Payment::pending_order(
            PaymentId::new(1),
            UserId::new("user_1"),
            599_000,
            PaymentMethod::BankTransfer,
            Uuid::nil(),
            fixed_now(),
        )
    }

    #[test]
    fn approve_settles_exactly_once() {
        let mut payment = pending();
        payment.approve(fixed_now()).unwrap();
        assert!(payment.is_completed());
        assert_eq!(payment.settled_at(), Some(fixed_now()));

        assert_eq!(
            payment.approve(fixed_now()),
            Err(PaymentError::AlreadySettled)
        );
        assert_eq!(payment.reject(fixed_now()), Err(PaymentError::AlreadySettled));
    }

    #[test]
    fn reject_marks_failed() {
        let mut payment = pending();
        payment.reject(fixed_now()).unwrap();
        assert_eq!(payment.status(), PaymentStatus::Failed);
        assert!(!payment.is_completed());
    }

    #[test]
    fn redemption_grant_is_zero_amount_and_completed() {
        let grant = Payment::redemption_grant(
            PaymentId::new(2),
            UserId::new("user_1"),
            Uuid::nil(),
            fixed_now(),
        );
        assert_eq!(grant.amount_vnd(), 0);
        assert_eq!(grant.method(), PaymentMethod::RedemptionCode);
        assert!(grant.is_completed());
    }
}
