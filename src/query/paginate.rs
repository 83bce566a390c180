//! Limit-plus-one pagination.
//!
//! A page of `entries_per_page` rows is fetched with
//! `LIMIT entries_per_page + 1`. When the extra row comes back it is dropped
//! and the page reports `has_next_page`; no COUNT query is ever issued.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::entity::Entity;
use crate::error::{KeelError, Result};
use crate::executor::{run_query, Executor};
use crate::mapper::map_rows;
use crate::record::Record;

use super::clause::{mask_sql, IntoParams};
use super::ident::Dialect;
use super::select::SelectBuilder;
use super::Query;

/// Which page to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAddress {
    /// 1-indexed page number
    Page(u64),
    /// 0-indexed row offset
    Offset(u64),
}

impl Default for PageAddress {
    fn default() -> Self {
        PageAddress::Page(1)
    }
}

impl PageAddress {
    /// Row offset of this address for the given page size.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Build`] for a page size of 0, page 0, or an offset
    /// that overflows.
    pub fn resolve(self, entries_per_page: u64) -> Result<u64> {
        if entries_per_page == 0 {
            return Err(KeelError::build("entries_per_page must be at least 1"));
        }
        match self {
            PageAddress::Page(0) => Err(KeelError::build("page numbers start at 1")),
            PageAddress::Page(page) => entries_per_page.checked_mul(page - 1).ok_or_else(|| {
                KeelError::build(format!(
                    "page {page} with {entries_per_page} entries per page overflows the row offset"
                ))
            }),
            PageAddress::Offset(offset) => Ok(offset),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<R> {
    rows: Vec<R>,
    address: PageAddress,
    entries_per_page: u64,
    has_next_page: bool,
}

impl<R> Paginated<R> {
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    pub fn address(&self) -> PageAddress {
        self.address
    }

    /// The page number when the page was addressed by number.
    pub fn current_page(&self) -> Option<u64> {
        match self.address {
            PageAddress::Page(page) => Some(page),
            PageAddress::Offset(_) => None,
        }
    }

    /// Row offset of the first row on this page.
    pub fn offset(&self) -> u64 {
        match self.address {
            PageAddress::Page(page) => self.entries_per_page.saturating_mul(page.saturating_sub(1)),
            PageAddress::Offset(offset) => offset,
        }
    }

    pub fn entries_per_page(&self) -> u64 {
        self.entries_per_page
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    /// Map the rows, keeping the page properties.
    pub fn map<U>(self, f: impl FnMut(R) -> U) -> Paginated<U> {
        Paginated {
            rows: self.rows.into_iter().map(f).collect(),
            address: self.address,
            entries_per_page: self.entries_per_page,
            has_next_page: self.has_next_page,
        }
    }
}

impl<R> IntoIterator for Paginated<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a, R> IntoIterator for &'a Paginated<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn fetch_size(entries_per_page: u64) -> Result<u64> {
    entries_per_page
        .checked_add(1)
        .ok_or_else(|| KeelError::build("entries_per_page is too large"))
}

/// Keep at most `entries_per_page` rows; report whether more were fetched.
pub(crate) fn split_page<R>(mut rows: Vec<R>, entries_per_page: u64) -> (Vec<R>, bool) {
    let keep = usize::try_from(entries_per_page).unwrap_or(usize::MAX);
    if rows.len() > keep {
        rows.truncate(keep);
        (rows, true)
    } else {
        (rows, false)
    }
}

/// A select that returns one [`Paginated`] page.
///
/// # Example
///
/// ```no_run
/// # use keel::{DescriptorBuilder, Entity, Executor};
/// # #[derive(Default)]
/// # struct Member { id: i64 }
/// # impl Entity for Member {
/// #     fn declare() -> DescriptorBuilder<Self> {
/// #         DescriptorBuilder::<Self>::new("member").primary_key("id", |m| &m.id, |m| &mut m.id)
/// #     }
/// # }
/// # fn demo(executor: &dyn Executor) -> keel::Result<()> {
/// let page = Member::select_paginated(4)
///     .order_by("id DESC")
///     .page(2)
///     .execute(executor)?;
/// for member in &page {
///     println!("{}", member.id);
/// }
/// if page.has_next_page() {
///     // fetch page 3
/// }
/// # Ok(())
/// # }
/// ```
pub struct PaginatedSelect<T: 'static> {
    select: SelectBuilder<T>,
    entries_per_page: u64,
    address: PageAddress,
}

impl<T: Entity> PaginatedSelect<T> {
    pub fn new(entries_per_page: u64) -> Self {
        Self::from_select(SelectBuilder::new(), entries_per_page)
    }

    pub(crate) fn from_select(select: SelectBuilder<T>, entries_per_page: u64) -> Self {
        Self {
            select,
            entries_per_page,
            address: PageAddress::default(),
        }
    }

    pub fn with_dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.select.with_dialect(dialect);
        self
    }

    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.columns(columns);
        self
    }

    pub fn filter<P: IntoParams>(&mut self, template: &str, params: P) -> &mut Self {
        self.select.filter(template, params);
        self
    }

    pub fn order_by(&mut self, fragment: &str) -> &mut Self {
        self.select.order_by(fragment);
        self
    }

    /// Fetch the 1-indexed page `current_page`.
    pub fn page(&mut self, current_page: u64) -> &mut Self {
        self.address = PageAddress::Page(current_page);
        self
    }

    /// Fetch the page starting at row `offset`.
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.address = PageAddress::Offset(offset);
        self
    }

    /// Compile with `LIMIT entries_per_page + 1 OFFSET offset`.
    ///
    /// # Errors
    ///
    /// Returns [`KeelError::Build`] for an invalid page address or any select
    /// build error.
    pub fn compile(&mut self) -> Result<Query> {
        let offset = self.address.resolve(self.entries_per_page)?;
        let fetch = fetch_size(self.entries_per_page)?;
        self.select.limit(fetch).offset(offset);
        self.select.compile()
    }

    /// Fetch one page.
    ///
    /// # Errors
    ///
    /// Returns any build, execution or mapping error.
    pub fn execute<X: Executor + ?Sized>(&mut self, executor: &X) -> Result<Paginated<Record<T>>> {
        let query = self.compile()?;
        let rows = run_query(executor, &query)?;
        let (rows, has_next_page) = split_page(rows, self.entries_per_page);
        Ok(Paginated {
            rows: map_rows(T::descriptor()?, rows)?,
            address: self.address,
            entries_per_page: self.entries_per_page,
            has_next_page,
        })
    }
}

static LIMIT_OR_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(limit|offset)\b").expect("LIMIT/OFFSET pattern is valid"));

static ORDER_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\border\s+by\b").expect("ORDER BY pattern is valid"));

/// Blank out quoted text, comments and parenthesized groups, leaving top-level SQL.
fn top_level(sql: &str) -> String {
    let mut depth = 0_usize;
    mask_sql(sql)
        .chars()
        .map(|c| match c {
            '(' => {
                depth += 1;
                ' '
            }
            ')' => {
                depth = depth.saturating_sub(1);
                ' '
            }
            _ if depth == 0 => c,
            _ => ' ',
        })
        .collect()
}

/// Validate caller SQL for pagination and return it without trailing
/// comments, whitespace and `;`.
fn guard_paginated_sql(sql: &str) -> Result<&str> {
    let masked = mask_sql(sql);
    let chars: Vec<(usize, char)> = sql.char_indices().collect();
    let end = chars
        .iter()
        .zip(masked.chars().collect::<Vec<_>>())
        .rev()
        .find(|(_, m)| !m.is_whitespace() && *m != ';')
        .map(|(&(idx, c), _)| idx + c.len_utf8());
    let Some(end) = end else {
        return Err(KeelError::build("paginated SQL is empty"));
    };
    let body = sql[..end].trim_start();
    let outer = top_level(body);

    if let Some(found) = LIMIT_OR_OFFSET.find(&outer) {
        return Err(KeelError::build(format!(
            "paginated SQL must not carry its own {}: {body}",
            found.as_str().to_ascii_uppercase()
        )));
    }

    if !ORDER_BY.is_match(&outer) {
        log::warn!("paginated SQL has no top-level ORDER BY; page contents may be unstable: {body}");
    }
    Ok(body)
}

/// Run caller SQL as one limit-plus-one page.
///
/// The SQL must not contain a top-level LIMIT or OFFSET; a missing ORDER BY is
/// logged at `warn`.
///
/// # Errors
///
/// Returns [`KeelError::Build`] for rejected SQL, a bad address or a
/// placeholder mismatch, and any execution or mapping error.
///
/// # Example
///
/// ```no_run
/// # use keel::{DescriptorBuilder, Entity, Executor, PageAddress};
/// # #[derive(Default)]
/// # struct Member { id: i64 }
/// # impl Entity for Member {
/// #     fn declare() -> DescriptorBuilder<Self> {
/// #         DescriptorBuilder::<Self>::new("member").primary_key("id", |m| &m.id, |m| &mut m.id)
/// #     }
/// # }
/// # fn demo(executor: &dyn Executor) -> keel::Result<()> {
/// let page = keel::query_by_sql_paginated::<Member, _, _>(
///     executor,
///     "SELECT * FROM member WHERE id > ? ORDER BY id DESC",
///     [0],
///     4,
///     PageAddress::Offset(8),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn query_by_sql_paginated<T, X, P>(
    executor: &X,
    sql: &str,
    params: P,
    entries_per_page: u64,
    address: PageAddress,
) -> Result<Paginated<Record<T>>>
where
    T: Entity,
    X: Executor + ?Sized,
    P: IntoParams,
{
    let offset = address.resolve(entries_per_page)?;
    let fetch = fetch_size(entries_per_page)?;
    let base = guard_paginated_sql(sql)?;
    let query = Query::checked(format!("{base} LIMIT {fetch} OFFSET {offset}"), params.into_params())?;
    let descriptor = T::descriptor()?;
    let rows = run_query(executor, &query)?;
    let (rows, has_next_page) = split_page(rows, entries_per_page);
    Ok(Paginated {
        rows: map_rows(descriptor, rows)?,
        address,
        entries_per_page,
        has_next_page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{member_columns, member_row, Member, MockExecutor};
    use sea_query::Value;

    #[test]
    fn test_resolve() {
        assert_eq!(PageAddress::Page(1).resolve(4).unwrap(), 0);
        assert_eq!(PageAddress::Page(3).resolve(4).unwrap(), 8);
        assert_eq!(PageAddress::Offset(5).resolve(4).unwrap(), 5);
        assert!(matches!(PageAddress::Page(0).resolve(4), Err(KeelError::Build(_))));
        assert!(matches!(PageAddress::Offset(0).resolve(0), Err(KeelError::Build(_))));
        assert!(matches!(PageAddress::Page(u64::MAX).resolve(2), Err(KeelError::Build(_))));
    }

    #[test]
    fn test_split_page_property() {
        for total in 0_u64..12 {
            for epp in 1_u64..6 {
                for page in 1_u64..6 {
                    let start = epp * (page - 1);
                    // what a database returns for LIMIT epp + 1 OFFSET start
                    let fetched: Vec<u64> = (start..total).take((epp + 1) as usize).collect();
                    let (rows, has_next) = split_page(fetched, epp);
                    let expected = epp.min(total.saturating_sub(start));
                    assert_eq!(rows.len() as u64, expected, "total={total} epp={epp} page={page}");
                    assert_eq!(has_next, total > epp * page, "total={total} epp={epp} page={page}");
                }
            }
        }
    }

    #[test]
    fn test_paginated_select_sql() {
        let q = Member::select_paginated(4)
            .filter("id > ?", [0])
            .order_by("id DESC")
            .page(3)
            .compile()
            .unwrap();
        assert_eq!(
            q.sql(),
            "SELECT * FROM `member` WHERE (id > ?) ORDER BY id DESC LIMIT 5 OFFSET 8"
        );
    }

    #[test]
    fn test_paginated_select_drops_extra_row() {
        let mock = MockExecutor::new();
        mock.push_rows(
            &member_columns(),
            (1..=3).map(|id| member_row(id, "m", 0, 0)).collect(),
        );
        let page = Member::select_paginated(2).offset(0).execute(&mock).unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.has_next_page());
        assert_eq!(page.address(), PageAddress::Offset(0));
        assert_eq!(page.current_page(), None);
        assert_eq!(page.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_exact_boundary_has_no_next() {
        let mock = MockExecutor::new();
        mock.push_rows(
            &member_columns(),
            (1..=2).map(|id| member_row(id, "m", 0, 0)).collect(),
        );
        let page = Member::select_paginated(2).page(1).execute(&mock).unwrap();
        assert_eq!(page.len(), 2);
        assert!(!page.has_next_page());
        assert_eq!(page.current_page(), Some(1));
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_zero_page_size_issues_nothing() {
        let mock = MockExecutor::new();
        assert!(matches!(
            Member::select_paginated(0).execute(&mock),
            Err(KeelError::Build(_))
        ));
        assert!(mock.statements().is_empty());
    }

    #[test]
    fn test_top_level_ignores_nested_and_quoted() {
        let outer = top_level("SELECT * FROM (SELECT id FROM m LIMIT 3) t WHERE name = 'limit' ORDER BY id");
        assert!(!outer.to_ascii_lowercase().contains("limit"));
        assert!(outer.contains("ORDER BY id"));
    }

    #[test]
    fn test_raw_sql_rejects_limit() {
        let mock = MockExecutor::new();
        let err = query_by_sql_paginated::<Member, _, _>(
            &mock,
            "SELECT * FROM member ORDER BY id LIMIT 10",
            (),
            4,
            PageAddress::Page(1),
        )
        .unwrap_err();
        assert!(matches!(err, KeelError::Build(ref m) if m.contains("LIMIT")));
        assert!(mock.statements().is_empty());
    }

    #[test]
    fn test_raw_sql_allows_nested_limit_and_appends_window() {
        let mock = MockExecutor::new();
        let page = query_by_sql_paginated::<Member, _, _>(
            &mock,
            "SELECT * FROM member WHERE id IN (SELECT id FROM member LIMIT 5) AND id < ? ORDER BY id DESC;",
            [100],
            4,
            PageAddress::Offset(12),
        )
        .unwrap();
        assert!(page.is_empty());
        assert!(!page.has_next_page());
        let (sql, params) = mock.statements().remove(0);
        assert_eq!(
            sql,
            "SELECT * FROM member WHERE id IN (SELECT id FROM member LIMIT 5) AND id < ? ORDER BY id DESC LIMIT 5 OFFSET 12"
        );
        assert_eq!(params, vec![Value::Int(Some(100))]);
    }

    #[test]
    fn test_top_level_ignores_comments() {
        let outer = top_level("SELECT * FROM m /* no limit here */ WHERE id > 0 -- offset later\nORDER BY id");
        assert!(!outer.to_ascii_lowercase().contains("limit"));
        assert!(!outer.to_ascii_lowercase().contains("offset"));
        assert!(outer.contains("ORDER BY id"));
    }

    #[test]
    fn test_raw_sql_trailing_comment_keeps_window() {
        let mock = MockExecutor::new();
        query_by_sql_paginated::<Member, _, _>(
            &mock,
            "SELECT * FROM member ORDER BY id DESC -- newest first",
            (),
            4,
            PageAddress::Offset(4),
        )
        .unwrap();
        query_by_sql_paginated::<Member, _, _>(
            &mock,
            "SELECT * FROM member /* why? */ WHERE id < ? ORDER BY id; /* done */\n",
            [9],
            4,
            PageAddress::Page(1),
        )
        .unwrap();
        assert_eq!(
            mock.captured_sql(),
            vec![
                "SELECT * FROM member ORDER BY id DESC LIMIT 5 OFFSET 4".to_string(),
                "SELECT * FROM member /* why? */ WHERE id < ? ORDER BY id LIMIT 5 OFFSET 0".to_string(),
            ]
        );
    }

    #[test]
    fn test_raw_sql_only_comments_is_empty() {
        let mock = MockExecutor::new();
        let err = query_by_sql_paginated::<Member, _, _>(&mock, " -- nothing\n ; ", (), 4, PageAddress::Page(1))
            .unwrap_err();
        assert!(matches!(err, KeelError::Build(_)));
        assert!(mock.statements().is_empty());
    }

    #[test]
    fn test_raw_sql_placeholder_mismatch() {
        let mock = MockExecutor::new();
        let err = query_by_sql_paginated::<Member, _, _>(
            &mock,
            "SELECT * FROM member WHERE id < ? ORDER BY id",
            (),
            4,
            PageAddress::Page(1),
        )
        .unwrap_err();
        assert!(matches!(err, KeelError::Build(_)));
    }
}
