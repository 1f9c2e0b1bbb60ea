//! Use cases for the peerpulse evaluation service
//!
//! Each service orchestrates entity construction, crypto, and repository
//! calls for one slice of the domain. Services hold their stores as trait
//! objects so tests can run them against an in-memory database.

pub mod evaluations;
pub mod members;
pub mod responses;
pub mod results;

pub use evaluations::{CreatedEvaluation, EvaluationService};
pub use members::{LoginSession, MemberService, NewMember};
pub use responses::ResponseService;
pub use results::{ResultsReport, ResultsService};
