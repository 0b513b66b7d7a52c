use std::sync::Arc;

use uuid::Uuid;

use havamath_core::model::{Payment, PaymentId, PaymentMethod, PaymentStatus, UserId};
use storage::repository::{NewPaymentRecord, PaymentRepository, SettleOutcome, StorageError};

use crate::Clock;
use crate::error::PaymentServiceError;

/// Handles checkout orders and the back-office approval queue.
///
/// Payments are the access ledger of the one-time-payment model: any
/// completed payment unlocks the catalog.
#[derive(Clone)]
pub struct PaymentService {
    clock: Clock,
    payments: Arc<dyn PaymentRepository>,
}

impl PaymentService {
    #[must_use]
    pub fn new(clock: Clock, payments: Arc<dyn PaymentRepository>) -> Self {
        Self { clock, payments }
    }

    /// Create a pending order awaiting manual approval.
    ///
    /// The generated reference goes into the transfer description so the
    /// back office can match the incoming bank statement line.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount` for empty orders, `UnsupportedMethod` for
    /// anything but bank transfer or mobile wallet (code redemptions have
    /// their own flow), or `Storage` if persistence fails.
    pub async fn submit_order(
        &self,
        user: &UserId,
        amount_vnd: u64,
        method: PaymentMethod,
    ) -> Result<Payment, PaymentServiceError> {
        if amount_vnd == 0 {
            return Err(PaymentServiceError::ZeroAmount);
        }
        if method == PaymentMethod::RedemptionCode {
            return Err(PaymentServiceError::UnsupportedMethod);
        }

        let now = self.clock.now();
        let reference = Uuid::new_v4();
        let id = self
            .payments
            .insert_payment(NewPaymentRecord {
                user_id: user.clone(),
                amount_vnd,
                method,
                status: PaymentStatus::Pending,
                reference,
                created_at: now,
                settled_at: None,
            })
            .await?;

        tracing::info!(user = %user, payment = %id, amount_vnd, "order submitted");
        Ok(Payment::pending_order(
            id,
            user.clone(),
            amount_vnd,
            method,
            reference,
            now,
        ))
    }

    /// Approve a pending payment, granting catalog access.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown payments, `AlreadySettled` when the
    /// payment was settled before this call, or `Storage` for infrastructure
    /// failures. Fails closed.
    pub async fn approve(&self, id: PaymentId) -> Result<Payment, PaymentServiceError> {
        self.settle(id, PaymentStatus::Completed).await
    }

    /// Reject a pending payment.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`PaymentService::approve`].
    pub async fn reject(&self, id: PaymentId) -> Result<Payment, PaymentServiceError> {
        self.settle(id, PaymentStatus::Failed).await
    }

    async fn settle(
        &self,
        id: PaymentId,
        status: PaymentStatus,
    ) -> Result<Payment, PaymentServiceError> {
        let outcome = self
            .payments
            .settle_payment(id, status, self.clock.now())
            .await
            .map_err(|e| match e {
                StorageError::NotFound => PaymentServiceError::NotFound,
                other => PaymentServiceError::Storage(other),
            })?;

        match outcome {
            SettleOutcome::Settled(payment) => {
                tracing::info!(payment = %id, status = %status.as_str(), "payment settled");
                Ok(payment)
            }
            SettleOutcome::AlreadySettled(_) => Err(PaymentServiceError::AlreadySettled),
        }
    }

    /// Whether the user holds any completed payment ("has access").
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn has_access(&self, user: &UserId) -> Result<bool, PaymentServiceError> {
        let access = self.payments.has_completed_payment(user).await?;
        Ok(access)
    }

    /// The approval queue, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn pending(&self, limit: u32) -> Result<Vec<Payment>, PaymentServiceError> {
        self.list_by_status(PaymentStatus::Pending, limit).await
    }

    /// Payments in any one status, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn list_by_status(
        &self,
        status: PaymentStatus,
        limit: u32,
    ) -> Result<Vec<Payment>, PaymentServiceError> {
        let payments = self.payments.list_payments_by_status(status, limit).await?;
        Ok(payments)
    }

    /// A user's order history, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn history(&self, user: &UserId) -> Result<Vec<Payment>, PaymentServiceError> {
        let payments = self.payments.payments_for_user(user).await?;
        Ok(payments)
    }
}
