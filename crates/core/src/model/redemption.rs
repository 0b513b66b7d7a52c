use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CodeId, UserId};

/// Length of a redemption code token.
pub const CODE_LENGTH: usize = 10;

/// Alphabet a code token is drawn from (uppercase alphanumerics, 36 symbols).
pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Normalizes user-entered code text: surrounding whitespace is dropped and
/// letters are uppercased.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Whether a (normalized) token has the shape of an issued code.
#[must_use]
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Distinct user-facing reasons a code cannot be redeemed.
///
/// `NotFound` is produced by lookup, not by the state machine of an existing
/// code; it lives here so every rejection reason shares one type.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RedeemError {
    #[error("code does not exist")]
    NotFound,

    #[error("code has been deactivated")]
    Inactive,

    #[error("code has already been redeemed")]
    AlreadyRedeemed,

    #[error("code has expired")]
    Expired,
}

//
// ─── REDEMPTION CODE ───────────────────────────────────────────────────────────
//

/// One-time access token sold through the offline/physical channel.
///
/// State machine: `active,unredeemed → active,redeemed` (terminal) or
/// `active,unredeemed → inactive,unredeemed` (terminal). A redeemed code can
/// never be deactivated and an inactive code can never be redeemed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionCode {
    id: CodeId,
    code: String,
    active: bool,
    redeemed_by: Option<UserId>,
    redeemed_at: Option<DateTime<Utc>>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl RedemptionCode {
    /// Builds a freshly issued, unredeemed code.
    #[must_use]
    pub fn issued(
        id: CodeId,
        code: String,
        created_by: UserId,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            active: true,
            redeemed_by: None,
            redeemed_at: None,
            created_by,
            created_at: now,
            expires_at,
        }
    }

    /// Reconstructs a code from storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: CodeId,
        code: String,
        active: bool,
        redeemed_by: Option<UserId>,
        redeemed_at: Option<DateTime<Utc>>,
        created_by: UserId,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            code,
            active,
            redeemed_by,
            redeemed_at,
            created_by,
            created_at,
            expires_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> CodeId {
        self.id
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn is_redeemed(&self) -> bool {
        self.redeemed_by.is_some()
    }

    #[must_use]
    pub fn redeemed_by(&self) -> Option<&UserId> {
        self.redeemed_by.as_ref()
    }

    #[must_use]
    pub fn redeemed_at(&self) -> Option<DateTime<Utc>> {
        self.redeemed_at
    }

    #[must_use]
    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Checks whether the code could be redeemed right now.
    ///
    /// # Errors
    ///
    /// Returns the distinct rejection reason, checked in the order the UI
    /// reports them: deactivated, already redeemed, expired.
    pub fn claimable(&self, now: DateTime<Utc>) -> Result<(), RedeemError> {
        if !self.active {
            return Err(RedeemError::Inactive);
        }
        if self.is_redeemed() {
            return Err(RedeemError::AlreadyRedeemed);
        }
        if self.is_expired(now) {
            return Err(RedeemError::Expired);
        }
        Ok(())
    }

    /// Transitions the code to redeemed, stamping redeemer and timestamp.
    ///
    /// # Errors
    ///
    /// Returns `RedeemError` if the code is not claimable.
    pub fn redeem(&mut self, redeemer: UserId, now: DateTime<Utc>) -> Result<(), RedeemError> {
        self.claimable(now)?;
        self.redeemed_by = Some(redeemer);
        self.redeemed_at = Some(now);
        Ok(())
    }

    /// Deactivates an unredeemed code. Idempotent for already-inactive codes.
    ///
    /// # Errors
    ///
    /// Returns `RedeemError::AlreadyRedeemed` if redemption happened first;
    /// that transition is irreversible.
    pub fn deactivate(&mut self) -> Result<(), RedeemError> {
        if self.is_redeemed() {
            return Err(RedeemError::AlreadyRedeemed);
        }
        self.active = false;
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
    use chrono::Duration;

    fn fresh() -> RedemptionCode {
        RedemptionCode::issued(
            CodeId::new(1),
            "ABC123XY9Z".into(),
            UserId::new("admin_1"),
            None,
            fixed_now(),
        )
    }

    #[test]
    fn normalization_uppercases_and_trims() {
        assert_eq!(normalize_code("  abc123xy9z \n"), "ABC123XY9Z");
    }

    #[test]
    fn well_formedness_checks_length_and_alphabet() {
        assert!(is_well_formed("ABC123XY9Z"));
        assert!(!is_well_formed("ABC123XY9"));
        assert!(!is_well_formed("abc123xy9z"));
        assert!(!is_well_formed("ABC-23XY9Z"));
    }

    #[test]
    fn redeem_transitions_once() {
        let mut code = fresh();
        code.redeem(UserId::new("user_1"), fixed_now()).unwrap();
        assert!(code.is_redeemed());
        assert_eq!(code.redeemed_by(), Some(&UserId::new("user_1")));
        assert_eq!(code.redeemed_at(), Some(fixed_now()));

        let err = code.redeem(UserId::new("user_2"), fixed_now()).unwrap_err();
        assert_eq!(err, RedeemError::AlreadyRedeemed);
        assert_eq!(code.redeemed_by(), Some(&UserId::new("user_1")));
    }

    #[test]
    fn inactive_code_cannot_be_redeemed() {
        let mut code = fresh();
        code.deactivate().unwrap();
        let err = code.redeem(UserId::new("user_1"), fixed_now()).unwrap_err();
        assert_eq!(err, RedeemError::Inactive);
    }

    #[test]
    fn expired_code_cannot_be_redeemed() {
        let mut code = RedemptionCode::issued(
            CodeId::new(2),
            "ZZZZZZZZZZ".into(),
            UserId::new("admin_1"),
            Some(fixed_now()),
            fixed_now() - Duration::days(30),
        );
        let err = code.redeem(UserId::new("user_1"), fixed_now()).unwrap_err();
        assert_eq!(err, RedeemError::Expired);
    }

    #[test]
    fn redeemed_code_cannot_be_deactivated() {
        let mut code = fresh();
        code.redeem(UserId::new("user_1"), fixed_now()).unwrap();
        assert_eq!(code.deactivate(), Err(RedeemError::AlreadyRedeemed));
        assert!(code.is_active());
    }

    #[test]
    fn deactivate_is_idempotent_before_redemption() {
        let mut code = fresh();
        code.deactivate().unwrap();
        code.deactivate().unwrap();
        assert!(!code.is_active());
    }
}
