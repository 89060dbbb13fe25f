//! Team repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `teams`.
//! - Load a team together with its member list for display.
//!
//! # Invariants
//! - Deleting a team keeps its members; their `team_id` becomes NULL
//!   through the foreign key.
//! - Member lists are ordered by `member_id ASC`.

use crate::model::audit::{now_epoch_ms, Auditable, Timestamps};
use crate::model::team::{Team, TeamId, TeamWithMembers};
use crate::repo::ensure_schema_ready;
use crate::repo::error::{count_from_db, Entity, RepoError, RepoResult};
use crate::repo::member_repo::{query_members, MEMBER_COLUMNS};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TEAM_SELECT_SQL: &str = "SELECT
    team_id,
    name,
    created_at,
    updated_at
FROM teams";

/// Repository interface for team persistence.
pub trait TeamRepository {
    /// Inserts `team` and stores the assigned id back into it.
    fn save(&self, team: &mut Team) -> RepoResult<TeamId>;
    fn update(&self, team: &mut Team) -> RepoResult<()>;
    fn find_by_id(&self, id: TeamId) -> RepoResult<Option<Team>>;
    fn find_all(&self) -> RepoResult<Vec<Team>>;
    fn find_with_members(&self, id: TeamId) -> RepoResult<Option<TeamWithMembers>>;
    fn delete(&self, id: TeamId) -> RepoResult<()>;
    fn count(&self) -> RepoResult<u64>;
}

/// SQLite-backed team repository.
pub struct SqliteTeamRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTeamRepository<'conn> {
    /// Wraps a connection opened through `db::open_db*`.
    ///
    /// # Errors
    /// - `RepoError::UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TeamRepository for SqliteTeamRepository<'_> {
    fn save(&self, team: &mut Team) -> RepoResult<TeamId> {
        team.pre_persist(now_epoch_ms());
        team.validate()?;

        self.conn.execute(
            "INSERT INTO teams (name, created_at, updated_at) VALUES (?1, ?2, ?3);",
            params![
                team.name.as_str(),
                team.timestamps.created_at,
                team.timestamps.updated_at,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        team.id = Some(id);
        Ok(id)
    }

    fn update(&self, team: &mut Team) -> RepoResult<()> {
        let id = team.id.ok_or_else(|| {
            RepoError::InvalidArgument("cannot update a team that was never saved".to_string())
        })?;
        team.pre_update(now_epoch_ms());
        team.validate()?;

        let changed = self.conn.execute(
            "UPDATE teams SET name = ?1, updated_at = ?2 WHERE team_id = ?3;",
            params![team.name.as_str(), team.timestamps.updated_at, id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Entity::Team,
                id,
            });
        }

        Ok(())
    }

    fn find_by_id(&self, id: TeamId) -> RepoResult<Option<Team>> {
        let team = self
            .conn
            .query_row(
                &format!("{TEAM_SELECT_SQL} WHERE team_id = ?1;"),
                [id],
                parse_team_row,
            )
            .optional()?;
        Ok(team)
    }

    fn find_all(&self) -> RepoResult<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEAM_SELECT_SQL} ORDER BY team_id ASC;"))?;
        let teams = stmt
            .query_map([], parse_team_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(teams)
    }

    fn find_with_members(&self, id: TeamId) -> RepoResult<Option<TeamWithMembers>> {
        let Some(team) = self.find_by_id(id)? else {
            return Ok(None);
        };
        let members = query_members(
            self.conn,
            &format!(
                "SELECT {MEMBER_COLUMNS} FROM members m WHERE m.team_id = ? ORDER BY m.member_id ASC"
            ),
            vec![Value::Integer(id)],
        )?;
        Ok(Some(TeamWithMembers { team, members }))
    }

    fn delete(&self, id: TeamId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM teams WHERE team_id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Entity::Team,
                id,
            });
        }
        Ok(())
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(team_id) FROM teams;", [], |row| row.get(0))?;
        count_from_db(count)
    }
}

fn parse_team_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: Some(row.get("team_id")?),
        name: row.get("name")?,
        timestamps: Timestamps {
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        },
    })
}
