//! Response submission use case
//!
//! Validates the response against the member set, then hands the write to
//! the storage layer's conditional insert. Duplicate detection is not a
//! read-then-write here: the unique index under `insert_response` makes
//! the conflict hold even when two identical submissions race.

use crate::error::{PeerpulseError, Result};
use crate::storage::{MemberStore, ResponseStore};
use crate::types::{Comments, EvaluationId, Member, MemberId, Ratings, Response};
use std::sync::Arc;
use tracing::debug;

/// Response submission service
#[derive(Clone)]
pub struct ResponseService {
    responses: Arc<dyn ResponseStore>,
    members: Arc<dyn MemberStore>,
}

impl ResponseService {
    pub fn new(responses: Arc<dyn ResponseStore>, members: Arc<dyn MemberStore>) -> Self {
        Self { responses, members }
    }

    /// Submit one member's rating of another
    ///
    /// Both parties must be enrolled in the evaluation; a repeated
    /// (evaluator, evaluated) pair is a conflict. On success the
    /// evaluator's completed counter has been advanced atomically with
    /// the insert.
    pub async fn submit(
        &self,
        evaluation_id: EvaluationId,
        evaluator_id: MemberId,
        evaluated_id: MemberId,
        ratings: Ratings,
        comments: Comments,
    ) -> Result<()> {
        let response = Response::new(evaluation_id, evaluator_id, evaluated_id, ratings, comments)?;

        self.require_enrolled(evaluation_id, evaluator_id, "evaluator")
            .await?;
        self.require_enrolled(evaluation_id, evaluated_id, "evaluated member")
            .await?;

        self.responses.insert_response(&response).await?;
        debug!(
            "Member {} evaluated member {} in evaluation {}",
            evaluator_id, evaluated_id, evaluation_id
        );
        Ok(())
    }

    async fn require_enrolled(
        &self,
        evaluation_id: EvaluationId,
        member_id: MemberId,
        role: &str,
    ) -> Result<Member> {
        let member = self
            .members
            .find_member(member_id)
            .await?
            .ok_or_else(|| PeerpulseError::NotFound(format!("member {}", member_id)))?;

        if member.evaluation_id != evaluation_id {
            return Err(PeerpulseError::Validation(format!(
                "{} {} does not belong to evaluation {}",
                role, member_id, evaluation_id
            )));
        }
        Ok(member)
    }
}
