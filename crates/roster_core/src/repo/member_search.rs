//! Dynamic member search over the member/team left join.
//!
//! # Responsibility
//! - Turn a sparse `MemberSearchCondition` into an AND-ed predicate list.
//! - Run the projection query and, when asked, the matching count query.
//!
//! # Invariants
//! - Absent or blank condition fields contribute no predicate.
//! - Members without a team are returned unless `team_name` is given.
//! - The count query counts distinct member ids and joins `teams` only when
//!   a predicate references the team.
//! - Searching never writes.

use crate::model::member::MemberId;
use crate::model::team::TeamId;
use crate::repo::error::{count_from_db, RepoResult};
use crate::repo::member_repo::SqliteMemberRepository;
use crate::repo::paging::{
    order_by_clause, push_window, resolve_total, CountMode, Page, PageRequest, SortOrder,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Sparse search input; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSearchCondition {
    pub username: Option<String>,
    pub team_name: Option<String>,
    pub age_goe: Option<i32>,
    pub age_loe: Option<i32>,
}

impl MemberSearchCondition {
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn team_name(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = Some(team_name.into());
        self
    }

    pub fn age_goe(mut self, age: i32) -> Self {
        self.age_goe = Some(age);
        self
    }

    pub fn age_loe(mut self, age: i32) -> Self {
        self.age_loe = Some(age);
        self
    }

    /// Predicates contributed by the present fields, in field order.
    pub fn predicates(&self) -> Vec<Predicate> {
        [
            has_text(self.username.as_deref()).map(|v| Predicate::UsernameEq(v.to_string())),
            has_text(self.team_name.as_deref()).map(|v| Predicate::TeamNameEq(v.to_string())),
            self.age_goe.map(Predicate::AgeGoe),
            self.age_loe.map(Predicate::AgeLoe),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.predicates().is_empty()
    }
}

/// One filter condition of a member search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    UsernameEq(String),
    TeamNameEq(String),
    AgeGoe(i32),
    AgeLoe(i32),
}

impl Predicate {
    fn sql(&self) -> &'static str {
        match self {
            Self::UsernameEq(_) => "m.username = ?",
            Self::TeamNameEq(_) => "t.name = ?",
            Self::AgeGoe(_) => "m.age >= ?",
            Self::AgeLoe(_) => "m.age <= ?",
        }
    }

    fn bind_value(&self) -> Value {
        match self {
            Self::UsernameEq(value) | Self::TeamNameEq(value) => Value::Text(value.clone()),
            Self::AgeGoe(age) | Self::AgeLoe(age) => Value::Integer(i64::from(*age)),
        }
    }

    pub fn references_team(&self) -> bool {
        matches!(self, Self::TeamNameEq(_))
    }

    /// Evaluates the predicate against an already projected row.
    pub fn matches(&self, row: &MemberTeamDto) -> bool {
        match self {
            Self::UsernameEq(value) => row.username == *value,
            Self::TeamNameEq(value) => row.team_name.as_deref() == Some(value.as_str()),
            Self::AgeGoe(age) => row.age >= *age,
            Self::AgeLoe(age) => row.age <= *age,
        }
    }
}

/// Search projection: member columns plus the (optional) team columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTeamDto {
    pub member_id: MemberId,
    pub username: String,
    pub age: i32,
    pub team_id: Option<TeamId>,
    pub team_name: Option<String>,
}

/// Member search operations.
pub trait MemberSearchRepository {
    /// Every matching row, unpaged, in member id order.
    fn search(&self, condition: &MemberSearchCondition) -> RepoResult<Vec<MemberTeamDto>>;

    /// One page of matching rows; `page = None` returns everything.
    fn search_page(
        &self,
        condition: &MemberSearchCondition,
        page: Option<&PageRequest>,
        mode: CountMode,
    ) -> RepoResult<Page<MemberTeamDto>>;

    /// Number of members matching `condition`.
    fn count_matching(&self, condition: &MemberSearchCondition) -> RepoResult<u64>;

    /// Page plus a total from an unconditional count query.
    fn search_page_simple(
        &self,
        condition: &MemberSearchCondition,
        page: &PageRequest,
    ) -> RepoResult<Page<MemberTeamDto>> {
        self.search_page(condition, Some(page), CountMode::Always)
    }

    /// Page plus a total; the count query is skipped when the page reveals it.
    fn search_page_complex(
        &self,
        condition: &MemberSearchCondition,
        page: &PageRequest,
    ) -> RepoResult<Page<MemberTeamDto>> {
        self.search_page(condition, Some(page), CountMode::Optimized)
    }
}

impl MemberSearchRepository for SqliteMemberRepository<'_> {
    fn search(&self, condition: &MemberSearchCondition) -> RepoResult<Vec<MemberTeamDto>> {
        let filter = WhereClause::from_predicates(&condition.predicates());
        execute_query(self.conn, &filter, &[], None)
    }

    fn search_page(
        &self,
        condition: &MemberSearchCondition,
        page: Option<&PageRequest>,
        mode: CountMode,
    ) -> RepoResult<Page<MemberTeamDto>> {
        let started_at = Instant::now();
        let filter = WhereClause::from_predicates(&condition.predicates());
        let sort = page.map_or(&[][..], PageRequest::sort);

        let content = execute_query(self.conn, &filter, sort, page)?;
        let mut counted = false;
        let total = resolve_total(content.len(), page, mode, || {
            counted = true;
            execute_count(self.conn, &filter)
        })?;

        debug!(
            "event=member_search module=repo status=ok predicates={} rows={} count_query={} duration_ms={}",
            filter.predicate_count,
            content.len(),
            if counted { "ran" } else { "skipped" },
            started_at.elapsed().as_millis()
        );

        Ok(Page::new(content, page, total))
    }

    fn count_matching(&self, condition: &MemberSearchCondition) -> RepoResult<u64> {
        let filter = WhereClause::from_predicates(&condition.predicates());
        execute_count(self.conn, &filter)
    }
}

/// Rendered ` WHERE ...` fragment with its positional bind values.
struct WhereClause {
    sql: String,
    bind_values: Vec<Value>,
    references_team: bool,
    predicate_count: usize,
}

impl WhereClause {
    fn from_predicates(predicates: &[Predicate]) -> Self {
        let sql = if predicates.is_empty() {
            String::new()
        } else {
            let parts: Vec<&str> = predicates.iter().map(Predicate::sql).collect();
            format!(" WHERE {}", parts.join(" AND "))
        };
        Self {
            sql,
            bind_values: predicates.iter().map(Predicate::bind_value).collect(),
            references_team: predicates.iter().any(Predicate::references_team),
            predicate_count: predicates.len(),
        }
    }
}

fn execute_query(
    conn: &Connection,
    filter: &WhereClause,
    sort: &[SortOrder],
    page: Option<&PageRequest>,
) -> RepoResult<Vec<MemberTeamDto>> {
    let mut sql = format!(
        "SELECT
            m.member_id AS member_id,
            m.username AS username,
            m.age AS age,
            t.team_id AS team_id,
            t.name AS team_name
         FROM members m
         LEFT JOIN teams t ON t.team_id = m.team_id{}{}",
        filter.sql,
        order_by_clause(sort)
    );
    let mut bind_values = filter.bind_values.clone();
    if let Some(page) = page {
        push_window(&mut sql, &mut bind_values, page)?;
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut dtos = Vec::new();
    while let Some(row) = rows.next()? {
        dtos.push(MemberTeamDto {
            member_id: row.get("member_id")?,
            username: row.get("username")?,
            age: row.get("age")?,
            team_id: row.get("team_id")?,
            team_name: row.get("team_name")?,
        });
    }
    Ok(dtos)
}

fn execute_count(conn: &Connection, filter: &WhereClause) -> RepoResult<u64> {
    let join = if filter.references_team {
        " LEFT JOIN teams t ON t.team_id = m.team_id"
    } else {
        ""
    };
    let sql = format!(
        "SELECT COUNT(DISTINCT m.member_id) FROM members m{join}{}",
        filter.sql
    );
    let count: i64 = conn.query_row(&sql, params_from_iter(filter.bind_values.iter()), |row| {
        row.get(0)
    })?;
    count_from_db(count)
}

/// Returns the value when it has at least one non-blank character.
fn has_text(value: Option<&str>) -> Option<&str> {
    value.filter(|text| text.chars().any(|c| !is_blank_char(c)))
}

/// Non-breaking spaces and NEL count as text; the ASCII unit/record
/// separators count as blank.
fn is_blank_char(c: char) -> bool {
    match c {
        '\u{a0}' | '\u{2007}' | '\u{202f}' | '\u{85}' => false,
        '\u{1c}'..='\u{1f}' => true,
        other => other.is_whitespace(),
    }
}
