//! Page requests, page results and total-count resolution.
//!
//! # Responsibility
//! - Validate offset/limit/sort input once, at construction.
//! - Render ORDER BY / LIMIT / OFFSET fragments for member queries.
//! - Decide when a page total can be derived without a count query.
//!
//! # Invariants
//! - A `PageRequest` always has `limit > 0`.
//! - Every rendered ORDER BY ends with `m.member_id ASC`, so pages are stable.
//! - A derived total always equals what the count query would return.

use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::Value;
use serde::Serialize;

/// Member columns a page can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Username,
    Age,
    TeamId,
    /// Requires the `teams` join; teamless members sort as NULL.
    TeamName,
    CreatedAt,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "m.member_id",
            Self::Username => "m.username",
            Self::Age => "m.age",
            Self::TeamId => "m.team_id",
            Self::TeamName => "t.name",
            Self::CreatedAt => "m.created_at",
        }
    }

    fn references_team(self) -> bool {
        matches!(self, Self::TeamName)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

/// Placement of NULL values. `Default` keeps SQLite's behavior
/// (NULL sorts lowest).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NullOrdering {
    #[default]
    Default,
    NullsFirst,
    NullsLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: Direction,
    pub nulls: NullOrdering,
}

impl SortOrder {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Asc,
            nulls: NullOrdering::Default,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Desc,
            nulls: NullOrdering::Default,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullOrdering::NullsFirst;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullOrdering::NullsLast;
        self
    }

    fn render(&self) -> String {
        let direction = match self.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        let nulls = match self.nulls {
            NullOrdering::Default => "",
            NullOrdering::NullsFirst => " NULLS FIRST",
            NullOrdering::NullsLast => " NULLS LAST",
        };
        format!("{} {direction}{nulls}", self.field.column())
    }
}

/// Offset/limit window plus optional sort orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    offset: u64,
    limit: u32,
    sort: Vec<SortOrder>,
}

impl PageRequest {
    /// Builds a request from a raw row offset and page size.
    ///
    /// # Errors
    /// - `RepoError::InvalidArgument` when `offset < 0` or `limit <= 0`.
    pub fn new(offset: i64, limit: i64) -> RepoResult<Self> {
        let offset = u64::try_from(offset).map_err(|_| {
            RepoError::InvalidArgument(format!("offset must not be negative, got {offset}"))
        })?;
        let limit = match u32::try_from(limit) {
            Ok(value) if value > 0 => value,
            _ => {
                return Err(RepoError::InvalidArgument(format!(
                    "limit must be positive, got {limit}"
                )));
            }
        };
        Ok(Self {
            offset,
            limit,
            sort: Vec::new(),
        })
    }

    /// Builds a request for the zero-based page `page` of `size` rows.
    pub fn of_page(page: i64, size: i64) -> RepoResult<Self> {
        if page < 0 {
            return Err(RepoError::InvalidArgument(format!(
                "page number must not be negative, got {page}"
            )));
        }
        if size <= 0 {
            return Err(RepoError::InvalidArgument(format!(
                "page size must be positive, got {size}"
            )));
        }
        let offset = page.checked_mul(size).ok_or_else(|| {
            RepoError::InvalidArgument(format!("page {page} with size {size} overflows"))
        })?;
        Self::new(offset, size)
    }

    /// Appends one sort order; earlier orders take precedence.
    pub fn sorted_by(mut self, order: SortOrder) -> Self {
        self.sort.push(order);
        self
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn sort(&self) -> &[SortOrder] {
        &self.sort
    }

    /// The following window with the same size and sort.
    pub fn next(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(u64::from(self.limit)),
            limit: self.limit,
            sort: self.sort.clone(),
        }
    }
}

/// One slice of query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub offset: u64,
    /// `None` for unpaged results.
    pub limit: Option<u32>,
    /// `None` when the caller skipped counting.
    pub total: Option<u64>,
}

impl<T> Page<T> {
    pub(crate) fn new(content: Vec<T>, page: Option<&PageRequest>, total: Option<u64>) -> Self {
        Self {
            content,
            offset: page.map_or(0, PageRequest::offset),
            limit: page.map(PageRequest::limit),
            total,
        }
    }

    /// Zero-based page number.
    pub fn number(&self) -> u64 {
        match self.limit {
            Some(limit) => self.offset / u64::from(limit),
            None => 0,
        }
    }

    pub fn total_pages(&self) -> Option<u64> {
        let total = self.total?;
        match self.limit {
            Some(limit) => Some(total.div_ceil(u64::from(limit))),
            None => Some(1),
        }
    }

    /// `None` when the total is unknown.
    pub fn has_next(&self) -> Option<bool> {
        let total = self.total?;
        let seen = self.offset + self.content.len() as u64;
        Some(seen < total)
    }

    pub fn is_first(&self) -> bool {
        self.offset == 0
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            offset: self.offset,
            limit: self.limit,
            total: self.total,
        }
    }
}

/// How a paged query reports its total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    /// No total; never runs the count query.
    Skip,
    /// Always runs the count query.
    Always,
    /// Runs the count query only when the total cannot be derived from the page.
    Optimized,
}

/// Resolves the total for a fetched page.
///
/// With `CountMode::Optimized` the count query is skipped when:
/// - the query is unpaged (total = rows fetched);
/// - the window starts at row 0 and came back short (total = rows fetched);
/// - the window starts later, is non-empty and came back short
///   (total = offset + rows fetched).
///
/// An empty page past the first row still runs `count`: the offset may lie
/// beyond the last row, so `offset + 0` would overstate the total.
pub fn resolve_total<F>(
    content_len: usize,
    page: Option<&PageRequest>,
    mode: CountMode,
    count: F,
) -> RepoResult<Option<u64>>
where
    F: FnOnce() -> RepoResult<u64>,
{
    let fetched = content_len as u64;
    match mode {
        CountMode::Skip => Ok(None),
        CountMode::Always => count().map(Some),
        CountMode::Optimized => {
            let Some(page) = page else {
                return Ok(Some(fetched));
            };
            let short_page = fetched < u64::from(page.limit());
            if page.offset() == 0 {
                if short_page {
                    return Ok(Some(fetched));
                }
                return count().map(Some);
            }
            if fetched != 0 && short_page {
                return Ok(Some(page.offset() + fetched));
            }
            count().map(Some)
        }
    }
}

pub(crate) fn sort_references_team(sort: &[SortOrder]) -> bool {
    sort.iter().any(|order| order.field.references_team())
}

/// Renders ` ORDER BY ...` with the member id tie-break appended.
pub(crate) fn order_by_clause(sort: &[SortOrder]) -> String {
    let mut parts: Vec<String> = sort.iter().map(SortOrder::render).collect();
    if !sort.iter().any(|order| order.field == SortField::Id) {
        parts.push("m.member_id ASC".to_string());
    }
    format!(" ORDER BY {}", parts.join(", "))
}

/// Appends ` LIMIT ? OFFSET ?` and the matching bind values.
pub(crate) fn push_window(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    page: &PageRequest,
) -> RepoResult<()> {
    let offset = i64::try_from(page.offset()).map_err(|_| {
        RepoError::InvalidArgument(format!("offset {} is out of range", page.offset()))
    })?;
    sql.push_str(" LIMIT ? OFFSET ?");
    bind_values.push(Value::Integer(i64::from(page.limit())));
    bind_values.push(Value::Integer(offset));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        order_by_clause, resolve_total, CountMode, Page, PageRequest, SortField, SortOrder,
    };
    use crate::repo::error::RepoError;
    use std::cell::Cell;

    fn counted(calls: &Cell<u32>, value: u64) -> impl FnOnce() -> Result<u64, RepoError> + '_ {
        move || {
            calls.set(calls.get() + 1);
            Ok(value)
        }
    }

    #[test]
    fn page_request_rejects_non_positive_limit_and_negative_offset() {
        assert!(matches!(
            PageRequest::new(0, 0),
            Err(RepoError::InvalidArgument(_))
        ));
        assert!(matches!(
            PageRequest::new(0, -3),
            Err(RepoError::InvalidArgument(_))
        ));
        assert!(matches!(
            PageRequest::new(-1, 10),
            Err(RepoError::InvalidArgument(_))
        ));
        assert!(matches!(
            PageRequest::of_page(-1, 10),
            Err(RepoError::InvalidArgument(_))
        ));
        assert!(matches!(
            PageRequest::of_page(2, 0),
            Err(RepoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn of_page_computes_offset() {
        let page = PageRequest::of_page(3, 5).unwrap();
        assert_eq!(page.offset(), 15);
        assert_eq!(page.limit(), 5);
        assert_eq!(page.next().offset(), 20);
    }

    #[test]
    fn order_by_always_ends_with_id_tie_break() {
        assert_eq!(order_by_clause(&[]), " ORDER BY m.member_id ASC");
        assert_eq!(
            order_by_clause(&[
                SortOrder::desc(SortField::Age),
                SortOrder::asc(SortField::TeamName).nulls_last(),
            ]),
            " ORDER BY m.age DESC, t.name ASC NULLS LAST, m.member_id ASC"
        );
        assert_eq!(
            order_by_clause(&[SortOrder::desc(SortField::Id)]),
            " ORDER BY m.member_id DESC"
        );
    }

    #[test]
    fn optimized_total_skips_count_for_short_pages() {
        let calls = Cell::new(0);
        let first = PageRequest::new(0, 10).unwrap();
        let total = resolve_total(3, Some(&first), CountMode::Optimized, counted(&calls, 99));
        assert_eq!(total.unwrap(), Some(3));

        let later = PageRequest::new(20, 10).unwrap();
        let total = resolve_total(4, Some(&later), CountMode::Optimized, counted(&calls, 99));
        assert_eq!(total.unwrap(), Some(24));

        let total = resolve_total(7, None, CountMode::Optimized, counted(&calls, 99));
        assert_eq!(total.unwrap(), Some(7));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn optimized_total_counts_full_and_empty_trailing_pages() {
        let calls = Cell::new(0);
        let first = PageRequest::new(0, 2).unwrap();
        let total = resolve_total(2, Some(&first), CountMode::Optimized, counted(&calls, 4));
        assert_eq!(total.unwrap(), Some(4));

        let past_end = PageRequest::new(50, 10).unwrap();
        let total = resolve_total(0, Some(&past_end), CountMode::Optimized, counted(&calls, 4));
        assert_eq!(total.unwrap(), Some(4));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn skip_and_always_modes() {
        let calls = Cell::new(0);
        let page = PageRequest::new(0, 10).unwrap();
        assert_eq!(
            resolve_total(1, Some(&page), CountMode::Skip, counted(&calls, 5)).unwrap(),
            None
        );
        assert_eq!(
            resolve_total(1, Some(&page), CountMode::Always, counted(&calls, 5)).unwrap(),
            Some(5)
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn page_metadata() {
        let request = PageRequest::new(2, 2).unwrap();
        let page = Page::new(vec!["c", "d"], Some(&request), Some(5));
        assert_eq!(page.number(), 1);
        assert_eq!(page.total_pages(), Some(3));
        assert_eq!(page.has_next(), Some(true));
        assert!(!page.is_first());

        let mapped = page.map(str::len);
        assert_eq!(mapped.content, vec![1, 1]);
        assert_eq!(mapped.total, Some(5));

        let unknown = Page::new(vec![1], Some(&request), None);
        assert_eq!(unknown.has_next(), None);
        assert_eq!(unknown.total_pages(), None);
    }
}
