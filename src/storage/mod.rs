//! Storage layer for the peerpulse evaluation service
//!
//! Provides repository traits for evaluations, members, and responses,
//! plus the libSQL-backed implementation. Repositories own the translation
//! between domain entities and their at-rest representation: hashed lookup
//! fields, encrypted PII columns, RFC 3339 text timestamps.

pub mod libsql;

use crate::error::Result;
use crate::types::{Evaluation, EvaluationId, EvaluationStatus, Member, MemberId, Response};
use async_trait::async_trait;

/// Evaluation repository
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Persist a freshly created evaluation
    ///
    /// The creator email is stored only as a hash; title and manager token
    /// are encrypted under the token-derived key.
    async fn save_evaluation(&self, evaluation: &Evaluation) -> Result<()>;

    /// Fetch an evaluation without key material
    ///
    /// Encrypted fields come back as empty-string placeholders; id, status
    /// and created_at are meaningful.
    async fn find_evaluation(&self, id: EvaluationId) -> Result<Option<Evaluation>>;

    /// Fetch an evaluation and decrypt it with the presented manager token
    ///
    /// Fails with the generic decryption error when the token is wrong;
    /// success doubles as proof of ownership.
    async fn unseal_evaluation(
        &self,
        id: EvaluationId,
        manager_token: &str,
    ) -> Result<Option<Evaluation>>;

    /// Persist a status change
    async fn update_evaluation_status(
        &self,
        id: EvaluationId,
        status: EvaluationStatus,
    ) -> Result<()>;
}

/// Member repository
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Persist an enrollment batch in a single transaction (all or nothing)
    async fn save_members(&self, members: &[Member]) -> Result<()>;

    /// Fetch a member by ID; None on miss
    async fn find_member(&self, id: MemberId) -> Result<Option<Member>>;

    /// All members of an evaluation, in enrollment order
    async fn find_members_by_evaluation(
        &self,
        evaluation_id: EvaluationId,
    ) -> Result<Vec<Member>>;

    /// Look a member up by email within an evaluation (hash equality)
    async fn find_member_by_email(
        &self,
        evaluation_id: EvaluationId,
        email: &str,
    ) -> Result<Option<Member>>;

    /// Look a member up by plaintext access code (hash equality)
    ///
    /// Codes are looked up with no other scoping, which is why generation
    /// checks collisions globally.
    async fn find_member_by_access_code(&self, access_code: &str) -> Result<Option<Member>>;

    /// Whether any stored member already uses this access code
    async fn access_code_in_use(&self, access_code: &str) -> Result<bool>;

    /// Update the member's last-access timestamp to now
    async fn touch_last_access(&self, id: MemberId) -> Result<()>;
}

/// Response repository
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Conditionally insert a response and bump the evaluator's completed
    /// counter, atomically
    ///
    /// A duplicate (evaluation, evaluator, evaluated) triple is rejected
    /// with a conflict error; the unique index makes this hold under
    /// concurrent submission, and the counter increment rides the same
    /// transaction so a lost race cannot over-increment it.
    async fn insert_response(&self, response: &Response) -> Result<()>;

    /// All responses naming the given member as the evaluated party
    async fn find_responses_for_evaluated(
        &self,
        evaluation_id: EvaluationId,
        evaluated_id: MemberId,
    ) -> Result<Vec<Response>>;
}
