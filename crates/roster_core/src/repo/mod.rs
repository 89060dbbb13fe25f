//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for members and teams.
//! - Isolate SQLite query details from service orchestration.
//! - Build dynamic member searches from sparse conditions.
//!
//! # Invariants
//! - Repositories only wrap connections whose schema is fully migrated.
//! - Repository writes run entity validation and pre-save hooks before SQL.
//! - Lookups by id report absence as `Ok(None)`; mutations of missing rows
//!   report `RepoError::NotFound`.

use crate::db::migrations::latest_version;
use rusqlite::Connection;

pub mod error;
pub mod member_repo;
pub mod member_search;
pub mod paging;
pub mod team_repo;

pub use error::{Entity, RepoError, RepoResult};

/// Rejects connections that did not go through `db::open_db*`.
pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
