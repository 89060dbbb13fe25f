//! Repository error type shared by member, team and search operations.

use crate::db::DbError;
use crate::model::member::MemberValidationError;
use crate::model::team::TeamValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Persisted entity kinds, used to qualify lookup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Member,
    Team,
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Member => write!(f, "member"),
            Self::Team => write!(f, "team"),
        }
    }
}

#[derive(Debug)]
pub enum RepoError {
    MemberValidation(MemberValidationError),
    TeamValidation(TeamValidationError),
    Db(DbError),
    /// Connection schema is not at the version this binary migrates to.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    NotFound {
        entity: Entity,
        id: i64,
    },
    /// A required lookup by a non-id key matched nothing.
    NotFoundByKey {
        entity: Entity,
        key: String,
    },
    /// A single-result lookup matched more than one row.
    NonUniqueResult {
        entity: Entity,
        count: usize,
    },
    /// Caller-supplied paging or query arguments are out of range.
    InvalidArgument(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemberValidation(err) => write!(f, "{err}"),
            Self::TeamValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::NotFoundByKey { entity, key } => write!(f, "{entity} not found: `{key}`"),
            Self::NonUniqueResult { entity, count } => {
                write!(f, "expected at most one {entity}, found {count}")
            }
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MemberValidation(err) => Some(err),
            Self::TeamValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. }
            | Self::NotFound { .. }
            | Self::NotFoundByKey { .. }
            | Self::NonUniqueResult { .. }
            | Self::InvalidArgument(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<MemberValidationError> for RepoError {
    fn from(value: MemberValidationError) -> Self {
        Self::MemberValidation(value)
    }
}

impl From<TeamValidationError> for RepoError {
    fn from(value: TeamValidationError) -> Self {
        Self::TeamValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn count_from_db(value: i64) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative row count `{value}`")))
}
