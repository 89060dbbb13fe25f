//! Member repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and finder APIs over `members`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths run `pre_persist`/`pre_update` and `Member::validate()`
//!   before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Every list query is ordered, with `member_id ASC` as the final key.

use crate::model::audit::{now_epoch_ms, Auditable, Timestamps};
use crate::model::member::{Member, MemberId};
use crate::model::team::Team;
use crate::repo::ensure_schema_ready;
use crate::repo::error::{count_from_db, Entity, RepoError, RepoResult};
use crate::repo::paging::{
    order_by_clause, push_window, resolve_total, sort_references_team, CountMode, Page,
    PageRequest,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;

pub(crate) const MEMBER_COLUMNS: &str = "m.member_id AS member_id,
    m.username AS username,
    m.age AS age,
    m.team_id AS team_id,
    m.created_at AS created_at,
    m.updated_at AS updated_at";

const TEAM_JOIN: &str = " LEFT JOIN teams t ON t.team_id = m.team_id";

/// Member projection joined with its team name (inner join).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDto {
    pub id: MemberId,
    pub username: String,
    pub team_name: String,
}

/// Member loaded together with its team in one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberWithTeam {
    pub member: Member,
    pub team: Option<Team>,
}

/// Repository interface for member persistence and lookups.
pub trait MemberRepository {
    /// Inserts `member` and stores the assigned id back into it.
    fn save(&self, member: &mut Member) -> RepoResult<MemberId>;
    /// Inserts all `members` in one transaction; on error nothing is stored
    /// and no ids are assigned.
    fn save_all(&self, members: &mut [Member]) -> RepoResult<usize>;
    fn update(&self, member: &mut Member) -> RepoResult<()>;
    fn find_by_id(&self, id: MemberId) -> RepoResult<Option<Member>>;
    fn find_all(&self) -> RepoResult<Vec<Member>>;
    fn find_all_page(&self, page: &PageRequest) -> RepoResult<Page<Member>>;
    /// Like `find_all_page`, but the total always comes from a dedicated
    /// `COUNT(username)` query, even when the page alone would reveal it.
    fn find_all_page_counted(&self, page: &PageRequest) -> RepoResult<Page<Member>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;
    /// Fails with `NonUniqueResult` when several members share `username`.
    fn find_optional_by_username(&self, username: &str) -> RepoResult<Option<Member>>;
    /// Exactly one member named `username`: `NotFoundByKey` when there is
    /// none, `NonUniqueResult` when there are several.
    fn find_member_by_username(&self, username: &str) -> RepoResult<Member>;
    fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> RepoResult<Vec<Member>>;
    /// Exact username and age match.
    fn find_user(&self, username: &str, age: i32) -> RepoResult<Vec<Member>>;
    /// First three members by id.
    fn find_top3(&self) -> RepoResult<Vec<Member>>;
    fn find_username_list(&self) -> RepoResult<Vec<String>>;
    fn find_by_names(&self, names: &[String]) -> RepoResult<Vec<Member>>;
    /// Members with a team only.
    fn find_member_dto(&self) -> RepoResult<Vec<MemberDto>>;
    fn find_by_age(&self, age: i32, page: &PageRequest) -> RepoResult<Page<Member>>;
    fn find_with_team(&self) -> RepoResult<Vec<MemberWithTeam>>;
    /// Adds one year to every member aged `age` or older; returns rows changed.
    ///
    /// Fails with `InvalidArgument`, changing nothing, when a matching member
    /// is already at `i32::MAX`.
    fn bulk_age_plus(&self, age: i32) -> RepoResult<usize>;
    fn delete(&self, id: MemberId) -> RepoResult<()>;
    fn count(&self) -> RepoResult<u64>;
}

/// SQLite-backed member repository.
pub struct SqliteMemberRepository<'conn> {
    pub(crate) conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    /// Wraps a connection opened through `db::open_db*`.
    ///
    /// # Errors
    /// - `RepoError::UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_where(&self, condition: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Member>> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM members m WHERE {condition}{}",
            order_by_clause(&[])
        );
        query_members(self.conn, &sql, bind_values)
    }

    fn query_page(
        &self,
        condition: Option<(&str, Vec<Value>)>,
        page: &PageRequest,
        mode: CountMode,
        count_column: &str,
    ) -> RepoResult<Page<Member>> {
        let (where_sql, where_values) = match condition {
            Some((sql, values)) => (format!(" WHERE {sql}"), values),
            None => (String::new(), Vec::new()),
        };

        let join = if sort_references_team(page.sort()) {
            TEAM_JOIN
        } else {
            ""
        };
        let mut sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM members m{join}{where_sql}{}",
            order_by_clause(page.sort())
        );
        let mut bind_values = where_values.clone();
        push_window(&mut sql, &mut bind_values, page)?;
        let content = query_members(self.conn, &sql, bind_values)?;

        let count_sql = format!("SELECT COUNT({count_column}) FROM members m{where_sql}");
        let total = resolve_total(content.len(), Some(page), mode, || {
            let count: i64 = self.conn.query_row(
                &count_sql,
                params_from_iter(where_values.iter()),
                |row| row.get(0),
            )?;
            count_from_db(count)
        })?;

        Ok(Page::new(content, Some(page), total))
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn save(&self, member: &mut Member) -> RepoResult<MemberId> {
        member.pre_persist(now_epoch_ms());
        member.validate()?;
        let id = insert_member(self.conn, member)?;
        member.id = Some(id);
        Ok(id)
    }

    fn save_all(&self, members: &mut [Member]) -> RepoResult<usize> {
        let now = now_epoch_ms();
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(members.len());
        for member in members.iter_mut() {
            member.pre_persist(now);
            member.validate()?;
            ids.push(insert_member(&tx, member)?);
        }
        tx.commit()?;

        for (member, id) in members.iter_mut().zip(ids) {
            member.id = Some(id);
        }
        Ok(members.len())
    }

    fn update(&self, member: &mut Member) -> RepoResult<()> {
        let id = member.id.ok_or_else(|| {
            RepoError::InvalidArgument("cannot update a member that was never saved".to_string())
        })?;
        member.pre_update(now_epoch_ms());
        member.validate()?;

        let changed = self.conn.execute(
            "UPDATE members
             SET
                username = ?1,
                age = ?2,
                team_id = ?3,
                updated_at = ?4
             WHERE member_id = ?5;",
            params![
                member.username.as_str(),
                member.age,
                member.team_id,
                member.timestamps.updated_at,
                id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Entity::Member,
                id,
            });
        }

        Ok(())
    }

    fn find_by_id(&self, id: MemberId) -> RepoResult<Option<Member>> {
        let mut members = self.query_where("m.member_id = ?", vec![Value::Integer(id)])?;
        Ok(members.pop())
    }

    fn find_all(&self) -> RepoResult<Vec<Member>> {
        self.query_where("1 = 1", Vec::new())
    }

    fn find_all_page(&self, page: &PageRequest) -> RepoResult<Page<Member>> {
        self.query_page(None, page, CountMode::Optimized, "m.member_id")
    }

    fn find_all_page_counted(&self, page: &PageRequest) -> RepoResult<Page<Member>> {
        self.query_page(None, page, CountMode::Always, "m.username")
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.query_where("m.username = ?", vec![Value::Text(username.to_string())])
    }

    fn find_optional_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        let mut members = self.find_by_username(username)?;
        if members.len() > 1 {
            return Err(RepoError::NonUniqueResult {
                entity: Entity::Member,
                count: members.len(),
            });
        }
        Ok(members.pop())
    }

    fn find_member_by_username(&self, username: &str) -> RepoResult<Member> {
        self.find_optional_by_username(username)?
            .ok_or_else(|| RepoError::NotFoundByKey {
                entity: Entity::Member,
                key: username.to_string(),
            })
    }

    fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> RepoResult<Vec<Member>> {
        self.query_where(
            "m.username = ? AND m.age > ?",
            vec![
                Value::Text(username.to_string()),
                Value::Integer(i64::from(age)),
            ],
        )
    }

    fn find_user(&self, username: &str, age: i32) -> RepoResult<Vec<Member>> {
        self.query_where(
            "m.username = ? AND m.age = ?",
            vec![
                Value::Text(username.to_string()),
                Value::Integer(i64::from(age)),
            ],
        )
    }

    fn find_top3(&self) -> RepoResult<Vec<Member>> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members m ORDER BY m.member_id ASC LIMIT 3");
        query_members(self.conn, &sql, Vec::new())
    }

    fn find_username_list(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT username FROM members ORDER BY member_id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut usernames = Vec::new();
        while let Some(row) = rows.next()? {
            usernames.push(row.get("username")?);
        }
        Ok(usernames)
    }

    fn find_by_names(&self, names: &[String]) -> RepoResult<Vec<Member>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; names.len()].join(", ");
        let bind_values = names.iter().cloned().map(Value::Text).collect();
        self.query_where(&format!("m.username IN ({placeholders})"), bind_values)
    }

    fn find_member_dto(&self) -> RepoResult<Vec<MemberDto>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                m.member_id AS member_id,
                m.username AS username,
                t.name AS team_name
             FROM members m
             INNER JOIN teams t ON t.team_id = m.team_id
             ORDER BY m.member_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut dtos = Vec::new();
        while let Some(row) = rows.next()? {
            dtos.push(MemberDto {
                id: row.get("member_id")?,
                username: row.get("username")?,
                team_name: row.get("team_name")?,
            });
        }
        Ok(dtos)
    }

    fn find_by_age(&self, age: i32, page: &PageRequest) -> RepoResult<Page<Member>> {
        self.query_page(
            Some(("m.age = ?", vec![Value::Integer(i64::from(age))])),
            page,
            CountMode::Optimized,
            "m.member_id",
        )
    }

    fn find_with_team(&self) -> RepoResult<Vec<MemberWithTeam>> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS},
                t.team_id AS t_team_id,
                t.name AS t_name,
                t.created_at AS t_created_at,
                t.updated_at AS t_updated_at
             FROM members m{TEAM_JOIN}
             ORDER BY m.member_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut loaded = Vec::new();
        while let Some(row) = rows.next()? {
            let member = parse_member_row(row)?;
            let team = match row.get::<_, Option<i64>>("t_team_id")? {
                Some(team_id) => Some(Team {
                    id: Some(team_id),
                    name: row.get("t_name")?,
                    timestamps: Timestamps {
                        created_at: row.get("t_created_at")?,
                        updated_at: row.get("t_updated_at")?,
                    },
                }),
                None => None,
            };
            loaded.push(MemberWithTeam { member, team });
        }
        Ok(loaded)
    }

    fn bulk_age_plus(&self, age: i32) -> RepoResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let saturated: i64 = tx.query_row(
            "SELECT COUNT(member_id) FROM members WHERE age >= ?1 AND age >= ?2;",
            params![age, i32::MAX],
            |row| row.get(0),
        )?;
        if saturated > 0 {
            return Err(RepoError::InvalidArgument(format!(
                "{saturated} member(s) aged {} cannot grow older",
                i32::MAX
            )));
        }

        let changed = tx.execute(
            "UPDATE members
             SET
                age = age + 1,
                updated_at = MAX(updated_at, ?2)
             WHERE age >= ?1;",
            params![age, now_epoch_ms()],
        )?;
        tx.commit()?;
        Ok(changed)
    }

    fn delete(&self, id: MemberId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM members WHERE member_id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Entity::Member,
                id,
            });
        }
        Ok(())
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(member_id) FROM members;", [], |row| row.get(0))?;
        count_from_db(count)
    }
}

fn insert_member(conn: &Connection, member: &Member) -> RepoResult<MemberId> {
    conn.execute(
        "INSERT INTO members (username, age, team_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            member.username.as_str(),
            member.age,
            member.team_id,
            member.timestamps.created_at,
            member.timestamps.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn query_members(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
) -> RepoResult<Vec<Member>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut members = Vec::new();
    while let Some(row) = rows.next()? {
        members.push(parse_member_row(row)?);
    }
    Ok(members)
}

pub(crate) fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    let member = Member {
        id: Some(row.get("member_id")?),
        username: row.get("username")?,
        age: row.get("age")?,
        team_id: row.get("team_id")?,
        timestamps: Timestamps {
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        },
    };
    member.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "member {} failed validation: {err}",
            member.id.unwrap_or_default()
        ))
    })?;
    Ok(member)
}
