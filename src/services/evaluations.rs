//! Evaluation lifecycle use cases
//!
//! Creation mints the manager token, a UUIDv4 capability credential that
//! is returned exactly once and never persisted in recoverable plaintext.
//! Every later manager operation proves ownership by presenting the token,
//! which unseals the evaluation's encrypted fields as a side effect.

use crate::error::{PeerpulseError, Result};
use crate::storage::EvaluationStore;
use crate::types::{Evaluation, EvaluationId, EvaluationStatus};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Outcome of a successful creation: the persisted evaluation plus the
/// one-time manager token.
#[derive(Debug, Clone)]
pub struct CreatedEvaluation {
    pub evaluation: Evaluation,
    pub manager_token: String,
}

/// Evaluation lifecycle service
#[derive(Clone)]
pub struct EvaluationService {
    store: Arc<dyn EvaluationStore>,
}

impl EvaluationService {
    pub fn new(store: Arc<dyn EvaluationStore>) -> Self {
        Self { store }
    }

    /// Create a draft evaluation and mint its manager token
    pub async fn create(&self, creator_email: &str, title: &str) -> Result<CreatedEvaluation> {
        let manager_token = Uuid::new_v4().to_string();
        let evaluation = Evaluation::new(creator_email, title, manager_token.clone())?;

        self.store.save_evaluation(&evaluation).await?;
        info!("Created evaluation {} (draft)", evaluation.id);

        Ok(CreatedEvaluation {
            evaluation,
            manager_token,
        })
    }

    /// Fetch and decrypt an evaluation with its manager token
    ///
    /// Doubles as ownership verification: a wrong token surfaces as the
    /// generic decryption failure.
    pub async fn unlock(&self, id: EvaluationId, manager_token: &str) -> Result<Evaluation> {
        self.store
            .unseal_evaluation(id, manager_token)
            .await?
            .ok_or_else(|| PeerpulseError::NotFound(format!("evaluation {}", id)))
    }

    /// Transition draft -> active
    pub async fn activate(
        &self,
        id: EvaluationId,
        manager_token: &str,
    ) -> Result<EvaluationStatus> {
        let mut evaluation = self.unlock(id, manager_token).await?;
        evaluation.activate()?;
        self.store
            .update_evaluation_status(id, evaluation.status)
            .await?;
        info!("Evaluation {} activated", id);
        Ok(evaluation.status)
    }

    /// Transition active -> completed
    pub async fn complete(
        &self,
        id: EvaluationId,
        manager_token: &str,
    ) -> Result<EvaluationStatus> {
        let mut evaluation = self.unlock(id, manager_token).await?;
        evaluation.complete()?;
        self.store
            .update_evaluation_status(id, evaluation.status)
            .await?;
        info!("Evaluation {} completed", id);
        Ok(evaluation.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::FieldKey;
    use crate::storage::libsql::{ConnectionMode, LibsqlStorage};

    async fn service() -> EvaluationService {
        let storage =
            LibsqlStorage::connect(ConnectionMode::InMemory, FieldKey::derive("test key"))
                .await
                .unwrap();
        EvaluationService::new(Arc::new(storage))
    }

    #[tokio::test]
    async fn test_create_mints_uuidv4_token_and_draft_status() {
        let service = service().await;
        let created = service.create("a@b.com", "Q1 Review").await.unwrap();

        assert_eq!(created.evaluation.status, EvaluationStatus::Draft);

        let token = Uuid::parse_str(&created.manager_token).unwrap();
        assert_eq!(token.get_version_num(), 4);
    }

    #[tokio::test]
    async fn test_create_validates_inputs() {
        let service = service().await;
        assert!(service.create("not-an-email", "Q1").await.is_err());
        assert!(service.create("a@b.com", "  ").await.is_err());
    }

    #[tokio::test]
    async fn test_unlock_requires_correct_token() {
        let service = service().await;
        let created = service.create("a@b.com", "Q1 Review").await.unwrap();

        let unlocked = service
            .unlock(created.evaluation.id, &created.manager_token)
            .await
            .unwrap();
        assert_eq!(unlocked.title, "Q1 Review");

        let err = service
            .unlock(created.evaluation.id, "not-the-token")
            .await
            .unwrap_err();
        assert!(matches!(err, PeerpulseError::DecryptionFailed));

        let err = service
            .unlock(EvaluationId::new(), &created.manager_token)
            .await
            .unwrap_err();
        assert!(matches!(err, PeerpulseError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let service = service().await;
        let created = service.create("a@b.com", "Q1 Review").await.unwrap();
        let id = created.evaluation.id;
        let token = &created.manager_token;

        // Forward only: completing a draft is rejected.
        assert!(service.complete(id, token).await.is_err());

        assert_eq!(
            service.activate(id, token).await.unwrap(),
            EvaluationStatus::Active
        );
        assert!(service.activate(id, token).await.is_err());

        assert_eq!(
            service.complete(id, token).await.unwrap(),
            EvaluationStatus::Completed
        );
        assert!(service.complete(id, token).await.is_err());
    }
}
