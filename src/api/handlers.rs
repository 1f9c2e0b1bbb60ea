//! Request handlers, one per callable operation
//!
//! Handlers are thin: decode the DTO, call the service, encode the reply.
//! Wire DTOs use camelCase field names; rating objects keep their
//! `question_1..question_4` keys, matching the consolidated-result shape.

use super::{ApiError, AppState};
use crate::types::{Comments, EvaluationId, Member, MemberId, RatingAverages, Ratings};
use axum::extract::{ConnectInfo, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::warn;

/// Generic acknowledgement body
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// A member as returned to callers (access codes never reappear here)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    pub completed_evaluations: u32,
    pub total_evaluations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_access_date: Option<DateTime<Utc>>,
}

impl From<&Member> for MemberDto {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            email: member.email.clone(),
            completed_evaluations: member.completed_evaluations,
            total_evaluations: member.total_evaluations,
            last_access_date: member.last_access_date,
        }
    }
}

// --- create-evaluation ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvaluationRequest {
    pub creator_email: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvaluationResponse {
    pub evaluation_id: EvaluationId,
    /// Emitted exactly once; it cannot be recovered later.
    pub manager_token: String,
    pub title: String,
}

pub async fn create_evaluation(
    State(state): State<AppState>,
    Json(req): Json<CreateEvaluationRequest>,
) -> Result<Json<CreateEvaluationResponse>, ApiError> {
    let created = state
        .evaluations
        .create(&req.creator_email, &req.title)
        .await?;

    Ok(Json(CreateEvaluationResponse {
        evaluation_id: created.evaluation.id,
        manager_token: created.manager_token,
        title: created.evaluation.title,
    }))
}

// --- activate-evaluation / complete-evaluation ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationTokenRequest {
    pub evaluation_id: EvaluationId,
    pub manager_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
}

pub async fn activate_evaluation(
    State(state): State<AppState>,
    Json(req): Json<EvaluationTokenRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state
        .evaluations
        .activate(req.evaluation_id, &req.manager_token)
        .await?;
    Ok(Json(StatusResponse {
        status: status.to_string(),
    }))
}

pub async fn complete_evaluation(
    State(state): State<AppState>,
    Json(req): Json<EvaluationTokenRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state
        .evaluations
        .complete(req.evaluation_id, &req.manager_token)
        .await?;
    Ok(Json(StatusResponse {
        status: status.to_string(),
    }))
}

// --- add-members ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMemberDto {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersRequest {
    pub evaluation_id: EvaluationId,
    pub members: Vec<NewMemberDto>,
}

/// Enrollment reply: the single place plaintext access codes appear
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledMemberDto {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    pub access_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersResponse {
    pub members: Vec<EnrolledMemberDto>,
}

pub async fn add_members(
    State(state): State<AppState>,
    Json(req): Json<AddMembersRequest>,
) -> Result<Json<AddMembersResponse>, ApiError> {
    let entries = req
        .members
        .into_iter()
        .map(|m| crate::services::NewMember {
            name: m.name,
            email: m.email,
        })
        .collect();

    let enrolled = state.members.add_members(req.evaluation_id, entries).await?;

    Ok(Json(AddMembersResponse {
        members: enrolled
            .iter()
            .map(|member| EnrolledMemberDto {
                id: member.id,
                name: member.name.clone(),
                email: member.email.clone(),
                access_code: member.access_code.clone(),
            })
            .collect(),
    }))
}

// --- get-members ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMembersResponse {
    pub members: Vec<MemberDto>,
}

pub async fn get_members(
    State(state): State<AppState>,
    Json(req): Json<EvaluationTokenRequest>,
) -> Result<Json<GetMembersResponse>, ApiError> {
    let members = state
        .members
        .list_members(req.evaluation_id, &req.manager_token)
        .await?;

    Ok(Json(GetMembersResponse {
        members: members.iter().map(MemberDto::from).collect(),
    }))
}

// --- login ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub access_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub evaluation_id: EvaluationId,
    pub current_member_id: MemberId,
    pub members: Vec<MemberDto>,
}

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !state.login_limiter.allow(addr.ip()) {
        warn!("Login rate limit exceeded for {}", addr.ip());
        return Err(ApiError::ResourceExhausted);
    }

    let session = state.members.login(&req.access_code).await?;

    Ok(Json(LoginResponse {
        evaluation_id: session.evaluation_id,
        current_member_id: session.current_member_id,
        members: session.members.iter().map(MemberDto::from).collect(),
    }))
}

// --- submit-response ---

/// Ratings keep their literal question keys on the wire
#[derive(Debug, Deserialize)]
pub struct RatingsDto {
    pub question_1: u8,
    pub question_2: u8,
    pub question_3: u8,
    pub question_4: u8,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentsDto {
    #[serde(default)]
    pub positive: String,
    #[serde(default)]
    pub improvement: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    pub evaluation_id: EvaluationId,
    pub evaluator_id: MemberId,
    pub evaluated_id: MemberId,
    pub ratings: RatingsDto,
    #[serde(default)]
    pub comments: CommentsDto,
}

pub async fn submit_response(
    State(state): State<AppState>,
    Json(req): Json<SubmitResponseRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let ratings = Ratings::new(
        req.ratings.question_1,
        req.ratings.question_2,
        req.ratings.question_3,
        req.ratings.question_4,
    )?;
    let comments = Comments {
        positive: req.comments.positive,
        improvement: req.comments.improvement,
    };

    state
        .responses
        .submit(
            req.evaluation_id,
            req.evaluator_id,
            req.evaluated_id,
            ratings,
            comments,
        )
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

// --- get-results ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResultsDto {
    pub member: MemberDto,
    pub averages: RatingAverages,
    pub comments: Vec<Comments>,
    pub response_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResultsResponse {
    pub title: String,
    pub results: Vec<MemberResultsDto>,
}

pub async fn get_results(
    State(state): State<AppState>,
    Json(req): Json<EvaluationTokenRequest>,
) -> Result<Json<GetResultsResponse>, ApiError> {
    let report = state
        .results
        .consolidated(req.evaluation_id, &req.manager_token)
        .await?;

    Ok(Json(GetResultsResponse {
        title: report.evaluation.title,
        results: report
            .results
            .iter()
            .map(|entry| MemberResultsDto {
                member: MemberDto::from(&entry.member),
                averages: entry.averages,
                comments: entry.comments.clone(),
                response_count: entry.response_count,
            })
            .collect(),
    }))
}

// --- update-last-access ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLastAccessRequest {
    pub member_id: MemberId,
}

pub async fn update_last_access(
    State(state): State<AppState>,
    Json(req): Json<UpdateLastAccessRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.members.update_last_access(req.member_id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// --- health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::rate_limit::{RateLimiter, RateLimiterConfig};
    use crate::crypto::FieldKey;
    use crate::storage::libsql::{ConnectionMode, LibsqlStorage};
    use std::sync::Arc;
    use std::time::Duration;

    async fn test_state() -> AppState {
        let storage = Arc::new(
            LibsqlStorage::connect(ConnectionMode::InMemory, FieldKey::derive("test key"))
                .await
                .unwrap(),
        );
        AppState::new(storage, RateLimiter::default())
    }

    fn caller() -> ConnectInfo<SocketAddr> {
        ConnectInfo("127.0.0.1:54321".parse().unwrap())
    }

    async fn created(state: &AppState) -> CreateEvaluationResponse {
        create_evaluation(
            State(state.clone()),
            Json(CreateEvaluationRequest {
                creator_email: "a@b.com".to_string(),
                title: "Q1 Review".to_string(),
            }),
        )
        .await
        .unwrap()
        .0
    }

    async fn enrolled(state: &AppState, evaluation_id: EvaluationId) -> Vec<EnrolledMemberDto> {
        add_members(
            State(state.clone()),
            Json(AddMembersRequest {
                evaluation_id,
                members: (0..3)
                    .map(|i| NewMemberDto {
                        name: format!("Member {}", i),
                        email: format!("member{}@example.com", i),
                    })
                    .collect(),
            }),
        )
        .await
        .unwrap()
        .0
        .members
    }

    #[tokio::test]
    async fn test_health() {
        let response = health().await;
        assert_eq!(response.0.status, "ok");
    }

    #[tokio::test]
    async fn test_create_and_enroll_flow() {
        let state = test_state().await;
        let evaluation = created(&state).await;
        assert_eq!(evaluation.title, "Q1 Review");

        let members = enrolled(&state, evaluation.evaluation_id).await;
        assert_eq!(members.len(), 3);
        for member in &members {
            assert_eq!(member.access_code.len(), 6);
        }
    }

    #[tokio::test]
    async fn test_add_members_requires_two() {
        let state = test_state().await;
        let evaluation = created(&state).await;

        let err = add_members(
            State(state.clone()),
            Json(AddMembersRequest {
                evaluation_id: evaluation.evaluation_id,
                members: vec![NewMemberDto {
                    name: "Solo".to_string(),
                    email: "solo@example.com".to_string(),
                }],
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_login_and_submit_and_results() {
        let state = test_state().await;
        let evaluation = created(&state).await;
        let members = enrolled(&state, evaluation.evaluation_id).await;

        let session = login(
            State(state.clone()),
            caller(),
            Json(LoginRequest {
                access_code: members[0].access_code.clone(),
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(session.current_member_id, members[0].id);
        assert_eq!(session.members.len(), 3);

        let ok = submit_response(
            State(state.clone()),
            Json(SubmitResponseRequest {
                evaluation_id: evaluation.evaluation_id,
                evaluator_id: members[0].id,
                evaluated_id: members[1].id,
                ratings: RatingsDto {
                    question_1: 5,
                    question_2: 4,
                    question_3: 5,
                    question_4: 4,
                },
                comments: CommentsDto {
                    positive: "steady reviewer".to_string(),
                    improvement: String::new(),
                },
            }),
        )
        .await
        .unwrap()
        .0;
        assert!(ok.success);

        let results = get_results(
            State(state.clone()),
            Json(EvaluationTokenRequest {
                evaluation_id: evaluation.evaluation_id,
                manager_token: evaluation.manager_token.clone(),
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(results.title, "Q1 Review");

        let rated = results
            .results
            .iter()
            .find(|r| r.member.id == members[1].id)
            .unwrap();
        assert_eq!(rated.response_count, 1);
        assert_eq!(rated.averages.overall, 4.5);
        assert_eq!(rated.comments[0].positive, "steady reviewer");
    }

    #[tokio::test]
    async fn test_out_of_range_rating_is_invalid_argument() {
        let state = test_state().await;
        let evaluation = created(&state).await;
        let members = enrolled(&state, evaluation.evaluation_id).await;

        let err = submit_response(
            State(state.clone()),
            Json(SubmitResponseRequest {
                evaluation_id: evaluation.evaluation_id,
                evaluator_id: members[0].id,
                evaluated_id: members[1].id,
                ratings: RatingsDto {
                    question_1: 6,
                    question_2: 4,
                    question_3: 5,
                    question_4: 4,
                },
                comments: CommentsDto::default(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_unknown_access_code_is_not_found() {
        let state = test_state().await;

        let err = login(
            State(state.clone()),
            caller(),
            Json(LoginRequest {
                access_code: "000000".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_wrong_manager_token_is_internal() {
        let state = test_state().await;
        let evaluation = created(&state).await;

        let err = get_results(
            State(state.clone()),
            Json(EvaluationTokenRequest {
                evaluation_id: evaluation.evaluation_id,
                manager_token: "not-the-token".to_string(),
            }),
        )
        .await
        .unwrap_err();
        // Wrong tokens are not distinguishable from other internal failures.
        assert!(matches!(err, ApiError::Internal));
    }

    #[tokio::test]
    async fn test_login_rate_limited() {
        let storage = Arc::new(
            LibsqlStorage::connect(ConnectionMode::InMemory, FieldKey::derive("test key"))
                .await
                .unwrap(),
        );
        let state = AppState::new(
            storage,
            RateLimiter::new(RateLimiterConfig {
                max_attempts: 2,
                window: Duration::from_secs(60),
            }),
        );

        for _ in 0..2 {
            // Unknown code, but the attempt still counts.
            let err = login(
                State(state.clone()),
                caller(),
                Json(LoginRequest {
                    access_code: "000000".to_string(),
                }),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ApiError::NotFound(_)));
        }

        let err = login(
            State(state.clone()),
            caller(),
            Json(LoginRequest {
                access_code: "000000".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::ResourceExhausted));
    }
}
