//! LibSQL storage backend implementation
//!
//! Persists evaluations, members, and responses in a local libSQL
//! database. Column shapes follow the at-rest contract: lookup fields are
//! SHA-256 hashes, PII columns are AES-GCM envelopes, timestamps are
//! RFC 3339 text. The duplicate-response guard is a unique index plus a
//! conditional insert, not a check-then-act read.

use crate::crypto::{decrypt_field, encrypt_field, hash_access_code, hash_email, FieldKey};
use crate::error::{PeerpulseError, Result};
use crate::storage::{EvaluationStore, MemberStore, ResponseStore};
use crate::types::{
    Comments, Evaluation, EvaluationId, EvaluationStatus, Member, MemberId, Ratings, Response,
    ResponseId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Builder, Connection, Database};
use tracing::{debug, info, warn};

/// Embedded schema, applied idempotently at startup
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS evaluations (
    id            TEXT PRIMARY KEY,
    creator_email TEXT NOT NULL,
    creator_token TEXT NOT NULL,
    title         TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'draft',
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS team_members (
    id                    TEXT PRIMARY KEY,
    evaluation_id         TEXT NOT NULL REFERENCES evaluations(id),
    name                  TEXT NOT NULL,
    email                 TEXT NOT NULL,
    email_hash            TEXT NOT NULL,
    access_code           TEXT NOT NULL,
    completed_evaluations INTEGER NOT NULL DEFAULT 0,
    total_evaluations     INTEGER NOT NULL,
    created_at            TEXT NOT NULL,
    last_access_date      TEXT,
    CHECK (completed_evaluations <= total_evaluations)
);

CREATE INDEX IF NOT EXISTS idx_members_evaluation
    ON team_members(evaluation_id);
CREATE INDEX IF NOT EXISTS idx_members_email_hash
    ON team_members(evaluation_id, email_hash);
CREATE INDEX IF NOT EXISTS idx_members_access_code
    ON team_members(access_code);

CREATE TABLE IF NOT EXISTS responses (
    id                   TEXT PRIMARY KEY,
    evaluation_id        TEXT NOT NULL REFERENCES evaluations(id),
    evaluator_id         TEXT NOT NULL REFERENCES team_members(id),
    evaluated_id         TEXT NOT NULL REFERENCES team_members(id),
    question_1           INTEGER NOT NULL,
    question_2           INTEGER NOT NULL,
    question_3           INTEGER NOT NULL,
    question_4           INTEGER NOT NULL,
    positive_comments    TEXT,
    improvement_comments TEXT,
    created_at           TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_responses_unique_pair
    ON responses(evaluation_id, evaluator_id, evaluated_id);
CREATE INDEX IF NOT EXISTS idx_responses_evaluated
    ON responses(evaluation_id, evaluated_id);
"#;

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// In-memory database (for testing)
    InMemory,
}

/// LibSQL storage backend
///
/// Holds the service master key: member PII and response comments are
/// encrypted/decrypted here so entities cross the repository boundary in
/// plaintext. Evaluation title and manager token use per-evaluation
/// token-derived keys instead, which only [`unseal_evaluation`] can apply.
///
/// [`unseal_evaluation`]: EvaluationStore::unseal_evaluation
pub struct LibsqlStorage {
    db: Database,
    master_key: FieldKey,
    // A shared-cache in-memory database lives only as long as at least one
    // connection to it stays open; this idle connection keeps the backend's
    // schema alive between `get_conn` calls. Harmless for file-backed modes.
    _keepalive: Connection,
}

impl LibsqlStorage {
    /// Open (or create) the database and apply the schema
    pub async fn connect(mode: ConnectionMode, master_key: FieldKey) -> Result<Self> {
        info!("Connecting to libSQL database: {:?}", mode);

        let db = match &mode {
            ConnectionMode::Local(path) => Builder::new_local(path).build().await?,
            // A bare ":memory:" gives every connection its own private
            // database, so schema applied on one connection is invisible to
            // the next. A uniquely-named shared-cache in-memory URI lets all
            // connections from this backend share one database while keeping
            // separate backends isolated from each other.
            ConnectionMode::InMemory => {
                let name = format!("file:mem_{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
                Builder::new_local(name).build().await?
            }
        };

        let keepalive = db.connect()?;
        let storage = Self {
            db,
            master_key,
            _keepalive: keepalive,
        };
        storage.apply_schema().await?;
        Ok(storage)
    }

    fn get_conn(&self) -> Result<Connection> {
        let conn = self.db.connect()?;
        // Racing writers wait for the lock instead of failing; the loser
        // of a duplicate-response race then sees the committed row and
        // reports a conflict rather than a busy database.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(conn)
    }

    async fn apply_schema(&self) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(SCHEMA).await?;
        debug!("Schema applied");
        Ok(())
    }

    /// Decrypt a PII column with the master key, tolerating failure
    ///
    /// A column that fails to decrypt is surfaced as its raw ciphertext so
    /// one corrupt field degrades that field, not the whole read.
    fn decrypt_tolerant(&self, column: &str, stored: &str) -> String {
        match decrypt_field(stored, &self.master_key) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                warn!("Failed to decrypt {} column, returning ciphertext", column);
                stored.to_string()
            }
        }
    }

    fn row_to_member(&self, row: &libsql::Row) -> Result<Member> {
        let id_str: String = row.get(0)?;
        let evaluation_str: String = row.get(1)?;
        let name_cipher: String = row.get(2)?;
        let email_cipher: String = row.get(3)?;
        let completed: i64 = row.get(4)?;
        let total: i64 = row.get(5)?;
        let created_at: String = row.get(6)?;
        let last_access: Option<String> = row.get(7)?;

        Ok(Member {
            id: MemberId::from_string(&id_str)?,
            evaluation_id: EvaluationId::from_string(&evaluation_str)?,
            name: self.decrypt_tolerant("name", &name_cipher),
            email: self.decrypt_tolerant("email", &email_cipher),
            // The plaintext code exists only at enrollment time.
            access_code: String::new(),
            completed_evaluations: completed as u32,
            total_evaluations: total as u32,
            last_access_date: last_access.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_response(&self, row: &libsql::Row) -> Result<Response> {
        let id_str: String = row.get(0)?;
        let evaluation_str: String = row.get(1)?;
        let evaluator_str: String = row.get(2)?;
        let evaluated_str: String = row.get(3)?;
        let question_1: i64 = row.get(4)?;
        let question_2: i64 = row.get(5)?;
        let question_3: i64 = row.get(6)?;
        let question_4: i64 = row.get(7)?;
        let positive_cipher: Option<String> = row.get(8)?;
        let improvement_cipher: Option<String> = row.get(9)?;
        let created_at: String = row.get(10)?;

        Ok(Response {
            id: ResponseId::from_string(&id_str)?,
            evaluation_id: EvaluationId::from_string(&evaluation_str)?,
            evaluator_id: MemberId::from_string(&evaluator_str)?,
            evaluated_id: MemberId::from_string(&evaluated_str)?,
            // Validated on write; reads reconstruct the struct directly.
            ratings: Ratings {
                question_1: question_1 as u8,
                question_2: question_2 as u8,
                question_3: question_3 as u8,
                question_4: question_4 as u8,
            },
            comments: Comments {
                positive: positive_cipher
                    .map(|c| self.decrypt_tolerant("positive_comments", &c))
                    .unwrap_or_default(),
                improvement: improvement_cipher
                    .map(|c| self.decrypt_tolerant("improvement_comments", &c))
                    .unwrap_or_default(),
            },
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

const MEMBER_COLUMNS: &str = "id, evaluation_id, name, email, completed_evaluations, \
     total_evaluations, created_at, last_access_date";

const RESPONSE_COLUMNS: &str = "id, evaluation_id, evaluator_id, evaluated_id, question_1, \
     question_2, question_3, question_4, positive_comments, improvement_comments, created_at";

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PeerpulseError::Other(format!("Invalid timestamp: {}", e)))
}

#[async_trait]
impl EvaluationStore for LibsqlStorage {
    async fn save_evaluation(&self, evaluation: &Evaluation) -> Result<()> {
        let conn = self.get_conn()?;

        // Title and token are wrapped under the token-derived key: holding
        // the plaintext token is the only way to ever read them back.
        let token_key = FieldKey::derive(&evaluation.manager_token);
        let title_cipher = encrypt_field(&evaluation.title, &token_key)?;
        let token_cipher = encrypt_field(&evaluation.manager_token, &token_key)?;

        conn.execute(
            "INSERT INTO evaluations (id, creator_email, creator_token, title, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                evaluation.id.to_string(),
                hash_email(&evaluation.creator_email),
                token_cipher,
                title_cipher,
                evaluation.status.as_str(),
                evaluation.created_at.to_rfc3339(),
            ],
        )
        .await?;

        debug!("Saved evaluation {}", evaluation.id);
        Ok(())
    }

    async fn find_evaluation(&self, id: EvaluationId) -> Result<Option<Evaluation>> {
        let conn = self.get_conn()?;

        let row = conn
            .query(
                "SELECT id, status, created_at FROM evaluations WHERE id = ?",
                params![id.to_string()],
            )
            .await?
            .next()
            .await?;

        match row {
            Some(row) => {
                let id_str: String = row.get(0)?;
                let status_str: String = row.get(1)?;
                let created_at: String = row.get(2)?;

                Ok(Some(Evaluation {
                    id: EvaluationId::from_string(&id_str)?,
                    // Hash and ciphertexts are unreadable without the
                    // manager token; placeholders by contract.
                    creator_email: String::new(),
                    title: String::new(),
                    manager_token: String::new(),
                    status: EvaluationStatus::parse(&status_str)?,
                    created_at: parse_timestamp(&created_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn unseal_evaluation(
        &self,
        id: EvaluationId,
        manager_token: &str,
    ) -> Result<Option<Evaluation>> {
        let conn = self.get_conn()?;

        let row = conn
            .query(
                "SELECT id, creator_token, title, status, created_at \
                 FROM evaluations WHERE id = ?",
                params![id.to_string()],
            )
            .await?
            .next()
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id_str: String = row.get(0)?;
        let token_cipher: String = row.get(1)?;
        let title_cipher: String = row.get(2)?;
        let status_str: String = row.get(3)?;
        let created_at: String = row.get(4)?;

        let token_key = FieldKey::derive(manager_token);
        let stored_token = decrypt_field(&token_cipher, &token_key)?;
        if stored_token != manager_token {
            return Err(PeerpulseError::DecryptionFailed);
        }
        let title = decrypt_field(&title_cipher, &token_key)?;

        Ok(Some(Evaluation {
            id: EvaluationId::from_string(&id_str)?,
            // The hash is one-way; the plaintext address is gone.
            creator_email: String::new(),
            title,
            manager_token: stored_token,
            status: EvaluationStatus::parse(&status_str)?,
            created_at: parse_timestamp(&created_at)?,
        }))
    }

    async fn update_evaluation_status(
        &self,
        id: EvaluationId,
        status: EvaluationStatus,
    ) -> Result<()> {
        let conn = self.get_conn()?;

        let updated = conn
            .execute(
                "UPDATE evaluations SET status = ? WHERE id = ?",
                params![status.as_str(), id.to_string()],
            )
            .await?;

        if updated == 0 {
            return Err(PeerpulseError::NotFound(format!("evaluation {}", id)));
        }

        debug!("Evaluation {} moved to status {}", id, status);
        Ok(())
    }
}

#[async_trait]
impl MemberStore for LibsqlStorage {
    async fn save_members(&self, members: &[Member]) -> Result<()> {
        let conn = self.get_conn()?;
        let tx = conn.transaction().await?;

        for member in members {
            let name_cipher = encrypt_field(&member.name, &self.master_key)?;
            let email_cipher = encrypt_field(&member.email, &self.master_key)?;

            tx.execute(
                "INSERT INTO team_members \
                 (id, evaluation_id, name, email, email_hash, access_code, \
                  completed_evaluations, total_evaluations, created_at, last_access_date) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    member.id.to_string(),
                    member.evaluation_id.to_string(),
                    name_cipher,
                    email_cipher,
                    hash_email(&member.email),
                    hash_access_code(&member.access_code),
                    member.completed_evaluations as i64,
                    member.total_evaluations as i64,
                    member.created_at.to_rfc3339(),
                    member.last_access_date.map(|dt| dt.to_rfc3339()),
                ],
            )
            .await?;
        }

        tx.commit().await?;
        debug!("Saved {} members in one transaction", members.len());
        Ok(())
    }

    async fn find_member(&self, id: MemberId) -> Result<Option<Member>> {
        let conn = self.get_conn()?;

        let row = conn
            .query(
                &format!("SELECT {} FROM team_members WHERE id = ?", MEMBER_COLUMNS),
                params![id.to_string()],
            )
            .await?
            .next()
            .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_member(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_members_by_evaluation(
        &self,
        evaluation_id: EvaluationId,
    ) -> Result<Vec<Member>> {
        let conn = self.get_conn()?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM team_members WHERE evaluation_id = ? ORDER BY created_at, id",
                    MEMBER_COLUMNS
                ),
                params![evaluation_id.to_string()],
            )
            .await?;

        let mut members = Vec::new();
        while let Some(row) = rows.next().await? {
            members.push(self.row_to_member(&row)?);
        }
        Ok(members)
    }

    async fn find_member_by_email(
        &self,
        evaluation_id: EvaluationId,
        email: &str,
    ) -> Result<Option<Member>> {
        let conn = self.get_conn()?;

        let row = conn
            .query(
                &format!(
                    "SELECT {} FROM team_members WHERE evaluation_id = ? AND email_hash = ?",
                    MEMBER_COLUMNS
                ),
                params![evaluation_id.to_string(), hash_email(email)],
            )
            .await?
            .next()
            .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_member(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_member_by_access_code(&self, access_code: &str) -> Result<Option<Member>> {
        let conn = self.get_conn()?;

        let row = conn
            .query(
                &format!(
                    "SELECT {} FROM team_members WHERE access_code = ?",
                    MEMBER_COLUMNS
                ),
                params![hash_access_code(access_code)],
            )
            .await?
            .next()
            .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_member(&row)?)),
            None => Ok(None),
        }
    }

    async fn access_code_in_use(&self, access_code: &str) -> Result<bool> {
        let conn = self.get_conn()?;

        let row = conn
            .query(
                "SELECT 1 FROM team_members WHERE access_code = ? LIMIT 1",
                params![hash_access_code(access_code)],
            )
            .await?
            .next()
            .await?;

        Ok(row.is_some())
    }

    async fn touch_last_access(&self, id: MemberId) -> Result<()> {
        let conn = self.get_conn()?;

        let updated = conn
            .execute(
                "UPDATE team_members SET last_access_date = ? WHERE id = ?",
                params![Utc::now().to_rfc3339(), id.to_string()],
            )
            .await?;

        if updated == 0 {
            return Err(PeerpulseError::NotFound(format!("member {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseStore for LibsqlStorage {
    async fn insert_response(&self, response: &Response) -> Result<()> {
        let conn = self.get_conn()?;

        // Absent comments are stored as NULL: the cipher refuses empty
        // plaintext, and NULL round-trips back to an empty string.
        let positive_cipher = match response.comments.positive.as_str() {
            "" => None,
            text => Some(encrypt_field(text, &self.master_key)?),
        };
        let improvement_cipher = match response.comments.improvement.as_str() {
            "" => None,
            text => Some(encrypt_field(text, &self.master_key)?),
        };

        let tx = conn.transaction().await?;

        // The unique index is the real duplicate guard: two racing
        // submissions both reach this insert, exactly one changes a row.
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO responses \
                 (id, evaluation_id, evaluator_id, evaluated_id, \
                  question_1, question_2, question_3, question_4, \
                  positive_comments, improvement_comments, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    response.id.to_string(),
                    response.evaluation_id.to_string(),
                    response.evaluator_id.to_string(),
                    response.evaluated_id.to_string(),
                    response.ratings.question_1 as i64,
                    response.ratings.question_2 as i64,
                    response.ratings.question_3 as i64,
                    response.ratings.question_4 as i64,
                    positive_cipher,
                    improvement_cipher,
                    response.created_at.to_rfc3339(),
                ],
            )
            .await?;

        if inserted == 0 {
            tx.rollback().await?;
            return Err(PeerpulseError::Conflict(format!(
                "member {} has already evaluated member {}",
                response.evaluator_id, response.evaluated_id
            )));
        }

        // Same transaction as the insert, so the counter can never run
        // ahead of the rows that justify it.
        let counted = tx
            .execute(
                "UPDATE team_members \
                 SET completed_evaluations = completed_evaluations + 1 \
                 WHERE id = ? AND completed_evaluations < total_evaluations",
                params![response.evaluator_id.to_string()],
            )
            .await?;

        if counted == 0 {
            tx.rollback().await?;
            return Err(PeerpulseError::Conflict(format!(
                "member {} has already completed all evaluations",
                response.evaluator_id
            )));
        }

        tx.commit().await?;
        debug!(
            "Recorded response {} for evaluation {}",
            response.id, response.evaluation_id
        );
        Ok(())
    }

    async fn find_responses_for_evaluated(
        &self,
        evaluation_id: EvaluationId,
        evaluated_id: MemberId,
    ) -> Result<Vec<Response>> {
        let conn = self.get_conn()?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM responses \
                     WHERE evaluation_id = ? AND evaluated_id = ? \
                     ORDER BY created_at, id",
                    RESPONSE_COLUMNS
                ),
                params![evaluation_id.to_string(), evaluated_id.to_string()],
            )
            .await?;

        let mut responses = Vec::new();
        while let Some(row) = rows.next().await? {
            responses.push(self.row_to_response(&row)?);
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Comments, Ratings};

    async fn test_storage() -> LibsqlStorage {
        LibsqlStorage::connect(ConnectionMode::InMemory, FieldKey::derive("test master key"))
            .await
            .unwrap()
    }

    fn test_evaluation(token: &str) -> Evaluation {
        Evaluation::new("manager@example.com", "Q1 Review", token).unwrap()
    }

    fn test_members(evaluation_id: EvaluationId, n: usize) -> Vec<Member> {
        (0..n)
            .map(|i| {
                Member::new(
                    evaluation_id,
                    format!("Member {}", i),
                    format!("member{}@example.com", i),
                    format!("{:06}", 100000 + i),
                    (n - 1) as u32,
                )
                .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_evaluation_round_trip_with_placeholders() {
        let storage = test_storage().await;
        let evaluation = test_evaluation("token-1");
        storage.save_evaluation(&evaluation).await.unwrap();

        let found = storage.find_evaluation(evaluation.id).await.unwrap().unwrap();
        assert_eq!(found.id, evaluation.id);
        assert_eq!(found.status, EvaluationStatus::Draft);
        // No key material on this path: encrypted fields are placeholders.
        assert_eq!(found.title, "");
        assert_eq!(found.manager_token, "");
        assert_eq!(found.creator_email, "");
    }

    #[tokio::test]
    async fn test_unseal_with_correct_token() {
        let storage = test_storage().await;
        let evaluation = test_evaluation("token-2");
        storage.save_evaluation(&evaluation).await.unwrap();

        let unsealed = storage
            .unseal_evaluation(evaluation.id, "token-2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unsealed.title, "Q1 Review");
        assert_eq!(unsealed.manager_token, "token-2");
    }

    #[tokio::test]
    async fn test_unseal_with_wrong_token_fails_generically() {
        let storage = test_storage().await;
        let evaluation = test_evaluation("token-3");
        storage.save_evaluation(&evaluation).await.unwrap();

        let err = storage
            .unseal_evaluation(evaluation.id, "wrong-token")
            .await
            .unwrap_err();
        assert!(matches!(err, PeerpulseError::DecryptionFailed));
    }

    #[tokio::test]
    async fn test_unseal_missing_evaluation_is_none() {
        let storage = test_storage().await;
        let missing = storage
            .unseal_evaluation(EvaluationId::new(), "any")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_status_update_persists() {
        let storage = test_storage().await;
        let evaluation = test_evaluation("token-4");
        storage.save_evaluation(&evaluation).await.unwrap();

        storage
            .update_evaluation_status(evaluation.id, EvaluationStatus::Active)
            .await
            .unwrap();

        let found = storage.find_evaluation(evaluation.id).await.unwrap().unwrap();
        assert_eq!(found.status, EvaluationStatus::Active);

        let err = storage
            .update_evaluation_status(EvaluationId::new(), EvaluationStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, PeerpulseError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_member_batch_and_lookups() {
        let storage = test_storage().await;
        let evaluation = test_evaluation("token-5");
        storage.save_evaluation(&evaluation).await.unwrap();

        let members = test_members(evaluation.id, 3);
        storage.save_members(&members).await.unwrap();

        let listed = storage
            .find_members_by_evaluation(evaluation.id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 3);
        // PII decrypts on read; access code never comes back.
        assert_eq!(listed[0].name, "Member 0");
        assert_eq!(listed[0].email, "member0@example.com");
        assert_eq!(listed[0].access_code, "");
        assert_eq!(listed[0].total_evaluations, 2);

        let by_email = storage
            .find_member_by_email(evaluation.id, "MEMBER1@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.name, "Member 1");

        let by_code = storage
            .find_member_by_access_code("100002")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_code.name, "Member 2");

        assert!(storage.access_code_in_use("100000").await.unwrap());
        assert!(!storage.access_code_in_use("999999").await.unwrap());
    }

    #[tokio::test]
    async fn test_touch_last_access() {
        let storage = test_storage().await;
        let evaluation = test_evaluation("token-6");
        storage.save_evaluation(&evaluation).await.unwrap();
        let members = test_members(evaluation.id, 2);
        storage.save_members(&members).await.unwrap();

        assert!(members[0].last_access_date.is_none());
        storage.touch_last_access(members[0].id).await.unwrap();

        let found = storage.find_member(members[0].id).await.unwrap().unwrap();
        assert!(found.last_access_date.is_some());

        let err = storage.touch_last_access(MemberId::new()).await.unwrap_err();
        assert!(matches!(err, PeerpulseError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_response_conflicts_and_counter_holds() {
        let storage = test_storage().await;
        let evaluation = test_evaluation("token-7");
        storage.save_evaluation(&evaluation).await.unwrap();
        let members = test_members(evaluation.id, 3);
        storage.save_members(&members).await.unwrap();

        let ratings = Ratings::new(5, 4, 3, 2).unwrap();
        let response = Response::new(
            evaluation.id,
            members[0].id,
            members[1].id,
            ratings,
            Comments {
                positive: "thorough reviews".to_string(),
                improvement: "share context earlier".to_string(),
            },
        )
        .unwrap();

        storage.insert_response(&response).await.unwrap();

        // Same (evaluator, evaluated) pair again, fresh response id.
        let duplicate = Response::new(
            evaluation.id,
            members[0].id,
            members[1].id,
            ratings,
            Comments::default(),
        )
        .unwrap();
        let err = storage.insert_response(&duplicate).await.unwrap_err();
        assert!(matches!(err, PeerpulseError::Conflict(_)));

        // The rejected duplicate must not have bumped the counter.
        let evaluator = storage.find_member(members[0].id).await.unwrap().unwrap();
        assert_eq!(evaluator.completed_evaluations, 1);
    }

    #[tokio::test]
    async fn test_responses_decrypt_comments_on_read() {
        let storage = test_storage().await;
        let evaluation = test_evaluation("token-8");
        storage.save_evaluation(&evaluation).await.unwrap();
        let members = test_members(evaluation.id, 2);
        storage.save_members(&members).await.unwrap();

        let response = Response::new(
            evaluation.id,
            members[0].id,
            members[1].id,
            Ratings::new(5, 5, 5, 5).unwrap(),
            Comments {
                positive: "great communication".to_string(),
                improvement: String::new(),
            },
        )
        .unwrap();
        storage.insert_response(&response).await.unwrap();

        let responses = storage
            .find_responses_for_evaluated(evaluation.id, members[1].id)
            .await
            .unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].comments.positive, "great communication");
        // An absent comment round-trips as empty, not as ciphertext.
        assert_eq!(responses[0].comments.improvement, "");
        assert_eq!(responses[0].ratings.question_1, 5);

        // No responses name member 0.
        let none = storage
            .find_responses_for_evaluated(evaluation.id, members[0].id)
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
