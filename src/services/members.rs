//! Member enrollment and access-code login use cases
//!
//! Enrollment is single-shot and atomic: the whole batch lands in one
//! transaction, every member gets `total_evaluations = batch size - 1`,
//! and access codes come from the OS CSPRNG with collision checking
//! against every stored code (login looks codes up with no other scoping,
//! so a cross-evaluation collision would cross-login).

use crate::crypto::hash_email;
use crate::error::{PeerpulseError, Result};
use crate::storage::{EvaluationStore, MemberStore};
use crate::types::{EvaluationId, Member, MemberId};
use rand::rngs::OsRng;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Enrollment request for one member
#[derive(Debug, Clone)]
pub struct NewMember {
    pub name: String,
    pub email: String,
}

/// Result of an access-code login
#[derive(Debug, Clone)]
pub struct LoginSession {
    /// Evaluation the code belongs to
    pub evaluation_id: EvaluationId,

    /// The member who logged in
    pub current_member_id: MemberId,

    /// Everyone enrolled in the evaluation, the logged-in member included
    pub members: Vec<Member>,
}

/// How many draws to attempt before concluding the 6-digit space is too
/// crowded to allocate from
const ACCESS_CODE_ATTEMPTS: usize = 32;

/// Member enrollment and login service
#[derive(Clone)]
pub struct MemberService {
    members: Arc<dyn MemberStore>,
    evaluations: Arc<dyn EvaluationStore>,
}

impl MemberService {
    pub fn new(members: Arc<dyn MemberStore>, evaluations: Arc<dyn EvaluationStore>) -> Self {
        Self {
            members,
            evaluations,
        }
    }

    /// Enroll the member batch for an evaluation
    ///
    /// Requires at least two members (everyone needs a peer to evaluate).
    /// Returns the members with their plaintext access codes, the only
    /// time the codes are ever visible.
    pub async fn add_members(
        &self,
        evaluation_id: EvaluationId,
        entries: Vec<NewMember>,
    ) -> Result<Vec<Member>> {
        if entries.len() < 2 {
            return Err(PeerpulseError::Validation(
                "at least 2 members are required".to_string(),
            ));
        }

        self.evaluations
            .find_evaluation(evaluation_id)
            .await?
            .ok_or_else(|| PeerpulseError::NotFound(format!("evaluation {}", evaluation_id)))?;

        // Totals are fixed at enrollment (= batch size - 1); a second batch
        // would silently invalidate them, so enrollment is single-shot.
        let existing = self
            .members
            .find_members_by_evaluation(evaluation_id)
            .await?;
        if !existing.is_empty() {
            return Err(PeerpulseError::Validation(
                "members are already enrolled for this evaluation".to_string(),
            ));
        }

        let mut seen_emails = HashSet::new();
        for entry in &entries {
            if !seen_emails.insert(hash_email(&entry.email)) {
                return Err(PeerpulseError::Validation(format!(
                    "duplicate member email: {}",
                    entry.email
                )));
            }
        }

        let total_evaluations = (entries.len() - 1) as u32;
        let mut reserved_codes = HashSet::new();
        let mut batch = Vec::with_capacity(entries.len());
        for entry in entries {
            let access_code = self.generate_access_code(&mut reserved_codes).await?;
            batch.push(Member::new(
                evaluation_id,
                entry.name,
                entry.email,
                access_code,
                total_evaluations,
            )?);
        }

        self.members.save_members(&batch).await?;
        info!(
            "Enrolled {} members for evaluation {}",
            batch.len(),
            evaluation_id
        );
        Ok(batch)
    }

    /// Draw a fresh 6-digit access code from the OS CSPRNG
    ///
    /// Rejects codes already reserved in this batch or stored for any
    /// member of any evaluation.
    async fn generate_access_code(&self, reserved: &mut HashSet<String>) -> Result<String> {
        for _ in 0..ACCESS_CODE_ATTEMPTS {
            let code = format!("{}", OsRng.gen_range(100_000..=999_999));
            if reserved.contains(&code) {
                continue;
            }
            if self.members.access_code_in_use(&code).await? {
                continue;
            }
            reserved.insert(code.clone());
            return Ok(code);
        }

        // 900k possible codes; running dry here means the deployment has
        // outgrown 6-digit credentials.
        Err(PeerpulseError::Other(
            "unable to allocate a unique access code".to_string(),
        ))
    }

    /// Log a member in by access code
    ///
    /// An unknown code is a not-found error, the only failure signal this
    /// path emits. Logging in stamps the member's last-access date.
    pub async fn login(&self, access_code: &str) -> Result<LoginSession> {
        let member = self
            .members
            .find_member_by_access_code(access_code)
            .await?
            .ok_or_else(|| PeerpulseError::NotFound("unknown access code".to_string()))?;

        self.members.touch_last_access(member.id).await?;

        let members = self
            .members
            .find_members_by_evaluation(member.evaluation_id)
            .await?;

        Ok(LoginSession {
            evaluation_id: member.evaluation_id,
            current_member_id: member.id,
            members,
        })
    }

    /// Manager view of the enrolled members (token-verified)
    pub async fn list_members(
        &self,
        evaluation_id: EvaluationId,
        manager_token: &str,
    ) -> Result<Vec<Member>> {
        self.evaluations
            .unseal_evaluation(evaluation_id, manager_token)
            .await?
            .ok_or_else(|| PeerpulseError::NotFound(format!("evaluation {}", evaluation_id)))?;

        self.members.find_members_by_evaluation(evaluation_id).await
    }

    /// Stamp a member's last-access date
    pub async fn update_last_access(&self, member_id: MemberId) -> Result<()> {
        self.members.touch_last_access(member_id).await
    }
}
