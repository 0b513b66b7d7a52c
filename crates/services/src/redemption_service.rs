use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use havamath_core::model::{
    CODE_ALPHABET, CODE_LENGTH, Payment, RedeemError, RedemptionCode, UserId, is_well_formed,
    normalize_code,
};
use storage::repository::{
    ClaimOutcome, DeactivateOutcome, NewCodeRecord, RedemptionCodeRepository,
};

use crate::Clock;
use crate::error::RedemptionServiceError;

/// Upper bound for one issuance batch.
pub const MAX_BATCH_SIZE: u32 = 1_000;

/// Re-roll budget per code before generation gives up. A single retry is
/// already rare in a 36^10 keyspace.
const MAX_COLLISION_RETRIES: u32 = 100;

/// Successful redemption: the consumed code plus the payment that grants
/// access.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub code: RedemptionCode,
    pub grant: Payment,
}

/// Issues, redeems, and manages one-time access codes.
#[derive(Clone)]
pub struct RedemptionService {
    clock: Clock,
    codes: Arc<dyn RedemptionCodeRepository>,
}

fn random_code(rng: &mut impl Rng) -> String {
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

impl RedemptionService {
    #[must_use]
    pub fn new(clock: Clock, codes: Arc<dyn RedemptionCodeRepository>) -> Self {
        Self { clock, codes }
    }

    /// Generate and persist `count` fresh codes for the issuing admin.
    ///
    /// Tokens are drawn from an OS-entropy-seeded CSPRNG, one byte of
    /// randomness per character, and re-rolled while they collide with the
    /// batch or with stored codes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBatchSize` for an empty or oversized batch,
    /// `KeyspaceExhausted` when the per-code retry budget runs out, or
    /// `Storage` if persistence fails.
    pub async fn generate_batch(
        &self,
        issuer: &UserId,
        count: u32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<RedemptionCode>, RedemptionServiceError> {
        if count == 0 || count > MAX_BATCH_SIZE {
            return Err(RedemptionServiceError::InvalidBatchSize);
        }

        let now = self.clock.now();
        let mut rng = StdRng::from_os_rng();
        let mut taken: HashSet<String> = HashSet::with_capacity(count as usize);
        let mut batch = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let mut retries = 0;
            let code = loop {
                let candidate = random_code(&mut rng);
                if !taken.contains(&candidate) && !self.codes.code_exists(&candidate).await? {
                    break candidate;
                }
                retries += 1;
                if retries >= MAX_COLLISION_RETRIES {
                    return Err(RedemptionServiceError::KeyspaceExhausted);
                }
            };
            taken.insert(code.clone());
            batch.push(NewCodeRecord {
                code,
                created_by: issuer.clone(),
                created_at: now,
                expires_at,
            });
        }

        let ids = self.codes.insert_codes(&batch).await?;
        tracing::info!(count = ids.len(), issuer = %issuer, "issued redemption codes");

        Ok(ids
            .into_iter()
            .zip(batch)
            .map(|(id, record)| {
                RedemptionCode::issued(
                    id,
                    record.code,
                    record.created_by,
                    record.expires_at,
                    record.created_at,
                )
            })
            .collect())
    }

    /// Redeem a user-entered code and grant catalog access.
    ///
    /// Input is normalized (trimmed, uppercased) before the atomic claim.
    ///
    /// # Errors
    ///
    /// Returns `Redeem` with the distinct rejection reason (not found,
    /// deactivated, already redeemed, expired), or `Storage` for
    /// infrastructure failures. Fails closed: no grant is written unless the
    /// claim won.
    pub async fn redeem(
        &self,
        user: &UserId,
        raw_code: &str,
    ) -> Result<Redemption, RedemptionServiceError> {
        let code = normalize_code(raw_code);
        if !is_well_formed(&code) {
            // Malformed input can never match an issued token; skip the
            // lookup and report it the same way.
            return Err(RedeemError::NotFound.into());
        }

        match self
            .codes
            .claim(&code, user, Uuid::new_v4(), self.clock.now())
            .await?
        {
            ClaimOutcome::Claimed { code, grant } => {
                tracing::info!(user = %user, code = %code.code(), "redemption code consumed");
                Ok(Redemption { code, grant })
            }
            ClaimOutcome::Rejected(reason) => Err(reason.into()),
        }
    }

    /// Deactivate an unredeemed code (admin back office).
    ///
    /// # Errors
    ///
    /// Returns `Redeem(AlreadyRedeemed)` when redemption happened first and
    /// `Redeem(NotFound)` for unknown codes.
    pub async fn deactivate(
        &self,
        raw_code: &str,
    ) -> Result<RedemptionCode, RedemptionServiceError> {
        let code = normalize_code(raw_code);
        match self.codes.deactivate(&code).await? {
            DeactivateOutcome::Deactivated(code) => Ok(code),
            DeactivateOutcome::Rejected(reason) => Err(reason.into()),
        }
    }

    /// Newest-first listing for the back office.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn list(&self, limit: u32) -> Result<Vec<RedemptionCode>, RedemptionServiceError> {
        let codes = self.codes.list_codes(limit).await?;
        Ok(codes)
    }
}
