//! Consolidated results use case
//!
//! For every enrolled member, averages the responses that name them as the
//! evaluated party. The aggregation never divides by zero: a member with
//! no responses reports all-zero averages. Free-text comments ride along
//! already decrypted by the storage layer, with its per-field tolerance
//! for undecryptable values.

use crate::error::{PeerpulseError, Result};
use crate::storage::{EvaluationStore, MemberStore, ResponseStore};
use crate::types::{Evaluation, EvaluationId, MemberResults, RatingAverages, Response};
use std::sync::Arc;
use tracing::debug;

/// Consolidated report for a whole evaluation
#[derive(Debug, Clone)]
pub struct ResultsReport {
    /// The unsealed evaluation (title decrypted)
    pub evaluation: Evaluation,

    /// One entry per enrolled member, in enrollment order
    pub results: Vec<MemberResults>,
}

/// Results aggregation service
#[derive(Clone)]
pub struct ResultsService {
    evaluations: Arc<dyn EvaluationStore>,
    members: Arc<dyn MemberStore>,
    responses: Arc<dyn ResponseStore>,
}

impl ResultsService {
    pub fn new(
        evaluations: Arc<dyn EvaluationStore>,
        members: Arc<dyn MemberStore>,
        responses: Arc<dyn ResponseStore>,
    ) -> Self {
        Self {
            evaluations,
            members,
            responses,
        }
    }

    /// Build the manager's consolidated report (token-verified)
    pub async fn consolidated(
        &self,
        evaluation_id: EvaluationId,
        manager_token: &str,
    ) -> Result<ResultsReport> {
        let evaluation = self
            .evaluations
            .unseal_evaluation(evaluation_id, manager_token)
            .await?
            .ok_or_else(|| PeerpulseError::NotFound(format!("evaluation {}", evaluation_id)))?;

        let members = self
            .members
            .find_members_by_evaluation(evaluation_id)
            .await?;

        let mut results = Vec::with_capacity(members.len());
        for member in members {
            let responses = self
                .responses
                .find_responses_for_evaluated(evaluation_id, member.id)
                .await?;

            results.push(MemberResults {
                averages: average_ratings(&responses),
                comments: responses.iter().map(|r| r.comments.clone()).collect(),
                response_count: responses.len(),
                member,
            });
        }

        debug!(
            "Consolidated {} member results for evaluation {}",
            results.len(),
            evaluation_id
        );
        Ok(ResultsReport {
            evaluation,
            results,
        })
    }
}

/// Average each rating dimension plus an overall mean
fn average_ratings(responses: &[Response]) -> RatingAverages {
    if responses.is_empty() {
        return RatingAverages::default();
    }

    let count = responses.len() as f64;
    let mut sums = [0.0f64; 4];
    for response in responses {
        for (sum, value) in sums.iter_mut().zip(response.ratings.as_array()) {
            *sum += value as f64;
        }
    }

    let [question_1, question_2, question_3, question_4] = sums.map(|sum| sum / count);
    RatingAverages {
        question_1,
        question_2,
        question_3,
        question_4,
        overall: (question_1 + question_2 + question_3 + question_4) / 4.0,
    }
}
