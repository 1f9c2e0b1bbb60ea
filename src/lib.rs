//! Peerpulse - Anonymous 360-Degree Peer Evaluation Backend
//!
//! A Rust backend for peer-evaluation campaigns: managers create an
//! evaluation, enroll team members, and members anonymously rate each
//! other on four dimensions plus free-text comments; the service
//! consolidates per-member averages for the manager.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Domain entities (Evaluation, Member, Response) that
//!   validate their invariants on construction
//! - **Crypto**: SHA-256 lookup hashing and AES-256-GCM field encryption
//! - **Storage**: Repository traits with a libSQL backend that owns the
//!   encrypted/hashed at-rest representation
//! - **Services**: Use cases (create, enroll, submit, consolidate)
//! - **API**: axum HTTP surface, one POST JSON operation per function
//!
//! # Example
//!
//! ```ignore
//! use peerpulse::{ApiServer, ApiServerConfig, ConnectionMode, FieldKey, LibsqlStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = peerpulse::Settings::load()?;
//!     let master_key = FieldKey::derive(settings.encryption_key());
//!
//!     let storage = Arc::new(
//!         LibsqlStorage::connect(
//!             ConnectionMode::Local(settings.database.path.clone()),
//!             master_key,
//!         )
//!         .await?,
//!     );
//!
//!     ApiServer::new(ApiServerConfig::default(), storage).serve().await
//! }
//! ```

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod services;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig};
pub use config::Settings;
pub use crypto::FieldKey;
pub use error::{PeerpulseError, Result};
pub use services::{EvaluationService, MemberService, ResponseService, ResultsService};
pub use storage::libsql::{ConnectionMode, LibsqlStorage};
pub use storage::{EvaluationStore, MemberStore, ResponseStore};
pub use types::{
    Comments, Evaluation, EvaluationId, EvaluationStatus, Member, MemberId, MemberResults,
    RatingAverages, Ratings, Response, ResponseId,
};
