//! Core data access for the member/team roster.
//! Owns the schema, the repositories and the dynamic member search.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::audit::{Auditable, EpochMillis, Timestamps};
pub use model::member::{Member, MemberId, MemberValidationError};
pub use model::team::{Team, TeamId, TeamValidationError, TeamWithMembers};
pub use repo::member_repo::{MemberDto, MemberRepository, MemberWithTeam, SqliteMemberRepository};
pub use repo::member_search::{
    MemberSearchCondition, MemberSearchRepository, MemberTeamDto, Predicate,
};
pub use repo::paging::{
    resolve_total, CountMode, Direction, NullOrdering, Page, PageRequest, SortField, SortOrder,
};
pub use repo::team_repo::{SqliteTeamRepository, TeamRepository};
pub use repo::{Entity, RepoError, RepoResult};
pub use service::member_service::MemberService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
