//! Core data types for the peerpulse evaluation service
//!
//! This module defines the domain entities of a 360-degree peer-evaluation
//! campaign: the evaluation itself, its enrolled members, and the anonymous
//! responses members submit about each other. Entities validate their
//! invariants on construction and carry no persistence logic; the storage
//! layer owns the encrypted/hashed representation at rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for evaluations
///
/// Wraps a UUID to provide type safety and prevent mixing evaluation IDs
/// with other UUID-based identifiers in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationId(pub Uuid);

impl EvaluationId {
    /// Create a new random evaluation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an evaluation ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EvaluationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for team members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub Uuid);

impl MemberId {
    /// Create a new random member ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a member ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub Uuid);

impl ResponseId {
    /// Create a new random response ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a response ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ResponseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResponseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validation error message helper
fn invalid(msg: impl Into<String>) -> crate::error::PeerpulseError {
    crate::error::PeerpulseError::Validation(msg.into())
}

/// Minimal structural email check: non-empty local part and a dotted domain.
///
/// This matches the lookup contract (emails are compared by normalized
/// hash), so anything stricter here would only reject addresses the rest
/// of the system could handle.
fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Evaluation campaign lifecycle status
///
/// Transitions are strictly forward: draft -> active -> completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    /// Created, members may still be enrolled
    Draft,

    /// Open for responses
    Active,

    /// Closed, results consolidated
    Completed,
}

impl EvaluationStatus {
    /// Stable string form used at rest
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::Draft => "draft",
            EvaluationStatus::Active => "active",
            EvaluationStatus::Completed => "completed",
        }
    }

    /// Parse the stored string form
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        match s {
            "draft" => Ok(EvaluationStatus::Draft),
            "active" => Ok(EvaluationStatus::Active),
            "completed" => Ok(EvaluationStatus::Completed),
            other => Err(invalid(format!("unknown evaluation status: {}", other))),
        }
    }
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 360-degree evaluation campaign
///
/// The manager token is a UUIDv4 capability credential: whoever holds it
/// owns the evaluation. It is emitted exactly once at creation and is never
/// persisted in recoverable plaintext; at rest it is encrypted under a key
/// derived from itself, so the token must already be known before anything
/// about the evaluation can be decrypted. Read paths that lack the token
/// reconstruct this entity with empty-string placeholders for `title` and
/// `manager_token` (id and status are still meaningful).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Unique identifier
    pub id: EvaluationId,

    /// Creator's email (stored only as a SHA-256 hash)
    pub creator_email: String,

    /// Campaign title (encrypted at rest under the token-derived key)
    pub title: String,

    /// Capability credential proving ownership
    pub manager_token: String,

    /// Lifecycle status
    pub status: EvaluationStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Evaluation {
    /// Construct a new draft evaluation, validating invariants
    pub fn new(
        creator_email: impl Into<String>,
        title: impl Into<String>,
        manager_token: impl Into<String>,
    ) -> crate::error::Result<Self> {
        let creator_email = creator_email.into().trim().to_string();
        let title = title.into().trim().to_string();
        let manager_token = manager_token.into();

        if !is_valid_email(&creator_email) {
            return Err(invalid("creator email is not a valid address"));
        }
        if title.is_empty() {
            return Err(invalid("evaluation title must not be empty"));
        }
        if manager_token.is_empty() {
            return Err(invalid("manager token must not be empty"));
        }

        Ok(Self {
            id: EvaluationId::new(),
            creator_email,
            title,
            manager_token,
            status: EvaluationStatus::Draft,
            created_at: Utc::now(),
        })
    }

    /// Move draft -> active; rejects any other starting state
    pub fn activate(&mut self) -> crate::error::Result<()> {
        match self.status {
            EvaluationStatus::Draft => {
                self.status = EvaluationStatus::Active;
                Ok(())
            }
            other => Err(invalid(format!(
                "cannot activate an evaluation in status '{}'",
                other
            ))),
        }
    }

    /// Move active -> completed; rejects any other starting state
    pub fn complete(&mut self) -> crate::error::Result<()> {
        match self.status {
            EvaluationStatus::Active => {
                self.status = EvaluationStatus::Completed;
                Ok(())
            }
            other => Err(invalid(format!(
                "cannot complete an evaluation in status '{}'",
                other
            ))),
        }
    }
}

/// A team member enrolled in an evaluation
///
/// Name and email are encrypted at rest (email additionally hashed for
/// lookup). The 6-digit access code is hashed at rest; its plaintext is
/// shown to the manager exactly once at enrollment, so read paths
/// reconstruct this entity with an empty-string `access_code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Unique identifier
    pub id: MemberId,

    /// Owning evaluation
    pub evaluation_id: EvaluationId,

    /// Display name
    pub name: String,

    /// Contact email
    pub email: String,

    /// 6-digit login credential (plaintext only at creation)
    pub access_code: String,

    /// How many peers this member has already evaluated
    pub completed_evaluations: u32,

    /// How many peers this member must evaluate (member count - 1, fixed
    /// at enrollment)
    pub total_evaluations: u32,

    /// Last access-code login, if any
    pub last_access_date: Option<DateTime<Utc>>,

    /// Enrollment timestamp
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// Construct a new member, validating invariants
    pub fn new(
        evaluation_id: EvaluationId,
        name: impl Into<String>,
        email: impl Into<String>,
        access_code: impl Into<String>,
        total_evaluations: u32,
    ) -> crate::error::Result<Self> {
        let name = name.into().trim().to_string();
        let email = email.into().trim().to_string();
        let access_code = access_code.into();

        if name.is_empty() {
            return Err(invalid("member name must not be empty"));
        }
        if !is_valid_email(&email) {
            return Err(invalid(format!("member email '{}' is not a valid address", email)));
        }
        if access_code.len() != 6 || !access_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("access code must be exactly 6 digits"));
        }

        Ok(Self {
            id: MemberId::new(),
            evaluation_id,
            name,
            email,
            access_code,
            completed_evaluations: 0,
            total_evaluations,
            last_access_date: None,
            created_at: Utc::now(),
        })
    }

    /// Record one completed peer evaluation; the counter never exceeds the
    /// fixed total.
    pub fn record_completion(&mut self) -> crate::error::Result<()> {
        if self.completed_evaluations >= self.total_evaluations {
            return Err(invalid(format!(
                "member {} has already completed all {} evaluations",
                self.id, self.total_evaluations
            )));
        }
        self.completed_evaluations += 1;
        Ok(())
    }
}

/// The four rating dimensions of a response, each an integer 1-5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    pub question_1: u8,
    pub question_2: u8,
    pub question_3: u8,
    pub question_4: u8,
}

impl Ratings {
    /// Construct ratings, validating each dimension is within 1-5
    pub fn new(question_1: u8, question_2: u8, question_3: u8, question_4: u8) -> crate::error::Result<Self> {
        let ratings = Self {
            question_1,
            question_2,
            question_3,
            question_4,
        };
        for (i, value) in ratings.as_array().iter().enumerate() {
            if !(1..=5).contains(value) {
                return Err(invalid(format!(
                    "question_{} rating must be between 1 and 5 (got {})",
                    i + 1,
                    value
                )));
            }
        }
        Ok(ratings)
    }

    /// The four dimensions in order
    pub fn as_array(&self) -> [u8; 4] {
        [
            self.question_1,
            self.question_2,
            self.question_3,
            self.question_4,
        ]
    }
}

/// Free-text feedback attached to a response
///
/// Encrypted at rest and decrypted lazily on read; a comment that fails to
/// decrypt is surfaced as its raw ciphertext rather than failing the whole
/// read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comments {
    /// What the evaluated member does well
    pub positive: String,

    /// What the evaluated member could improve
    pub improvement: String,
}

/// One member's anonymous rating of another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier
    pub id: ResponseId,

    /// Owning evaluation
    pub evaluation_id: EvaluationId,

    /// Member who submitted the rating
    pub evaluator_id: MemberId,

    /// Member being rated
    pub evaluated_id: MemberId,

    /// The four rating dimensions
    pub ratings: Ratings,

    /// Free-text feedback
    pub comments: Comments,

    /// Submission timestamp
    pub created_at: DateTime<Utc>,
}

impl Response {
    /// Construct a response, rejecting self-evaluation
    pub fn new(
        evaluation_id: EvaluationId,
        evaluator_id: MemberId,
        evaluated_id: MemberId,
        ratings: Ratings,
        comments: Comments,
    ) -> crate::error::Result<Self> {
        if evaluator_id == evaluated_id {
            return Err(invalid("a member cannot evaluate themselves"));
        }

        Ok(Self {
            id: ResponseId::new(),
            evaluation_id,
            evaluator_id,
            evaluated_id,
            ratings,
            comments,
            created_at: Utc::now(),
        })
    }
}

/// Per-dimension rating averages for one evaluated member
///
/// All-zero when the member has received no responses; the aggregation
/// never divides by zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingAverages {
    pub question_1: f64,
    pub question_2: f64,
    pub question_3: f64,
    pub question_4: f64,
    pub overall: f64,
}

/// Consolidated results for one evaluated member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberResults {
    /// The evaluated member (access code placeholder-blank)
    pub member: Member,

    /// Averages over the responses naming this member
    pub averages: RatingAverages,

    /// Free-text feedback from those responses
    pub comments: Vec<Comments>,

    /// Number of responses received
    pub response_count: usize,
}
