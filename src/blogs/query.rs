//! Turns loosely typed listing parameters into a typed [`BlogQuery`].
//!
//! Visibility is decided here and nowhere else:
//! - no `state` parameter, or any value other than `draft`: published only;
//! - `state=draft`: drafts owned by the caller, or an empty page when the
//!   caller is anonymous.
//!
//! [`BlogFilter::matches`] and [`Sort::compare`] define the semantics every
//! store must reproduce; the Postgres repository compiles the same filter
//! to SQL.

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::Number;
use uuid::Uuid;

use super::repo_types::{Blog, BlogState};
use crate::auth::extractors::Identity;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;

/// Raw query string of `GET /blogs`. Everything arrives as text.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListBlogsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub state: Option<String>,
    pub search: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub tags: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<String>,
}

impl ListBlogsQuery {
    pub fn author_term(&self) -> Option<&str> {
        non_empty(&self.author)
    }
}

/// Raw query string of `GET /blogs/me`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MyBlogsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub state: Option<String>,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

/// Splits a comma separated tag list, trimming entries and dropping empty ones.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    ReadCount,
    ReadingTime,
    CreatedAt,
}

impl SortField {
    /// Unknown fields fall back to creation time.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("read_count") => SortField::ReadCount,
            Some("reading_time") => SortField::ReadingTime,
            _ => SortField::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::ReadCount => "read_count",
            SortField::ReadingTime => "reading_time",
            SortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

impl Sort {
    /// Ties break on id, in the same direction as the primary key.
    pub fn compare(&self, a: &Blog, b: &Blog) -> Ordering {
        let primary = match self.field {
            SortField::ReadCount => a.read_count.cmp(&b.read_count),
            SortField::ReadingTime => a.reading_time.cmp(&b.reading_time),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let ord = primary.then_with(|| a.id.cmp(&b.id));
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// Effective paging plus the values to echo back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
    /// Requested page as the number the caller sent (fractions included);
    /// `None` when it was not a number.
    pub echo_page: Option<Number>,
    pub echo_limit: Option<Number>,
}

/// Reads a paging parameter as a JSON number. A blank value reads as 0.
fn parse_number(raw: &str) -> Option<Number> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(Number::from(0));
    }
    match raw.parse::<i64>() {
        Ok(n) => Some(Number::from(n)),
        Err(_) => raw.parse::<f64>().ok().and_then(Number::from_f64),
    }
}

/// Only whole numbers of at least 1 drive paging.
fn effective(echo: Option<&Number>, default: i64) -> i64 {
    echo.and_then(Number::as_f64)
        .filter(|n| n.fract() == 0.0 && *n >= 1.0 && *n <= i64::MAX as f64)
        .map(|n| n as i64)
        .unwrap_or(default)
}

impl PageRequest {
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let echo_page = page.map_or(Some(Number::from(DEFAULT_PAGE)), parse_number);
        let echo_limit = limit.map_or(Some(Number::from(DEFAULT_LIMIT)), parse_number);
        Self {
            page: effective(echo_page.as_ref(), DEFAULT_PAGE),
            limit: effective(echo_limit.as_ref(), DEFAULT_LIMIT),
            echo_page,
            echo_limit,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::parse(None, None)
    }
}

/// Conjunction of constraints; unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogFilter {
    pub state: Option<BlogState>,
    /// Restricts to one author. Used for drafts and for "my blogs".
    pub owner: Option<Uuid>,
    /// Restricts to any of these authors. An empty set matches nothing.
    pub authors: Option<Vec<Uuid>>,
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    /// Matches when the blog carries at least one of these tags.
    pub tags: Vec<String>,
    /// Case-insensitive substring of title, description or body, or an
    /// exact tag.
    pub search: Option<String>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl BlogFilter {
    pub fn matches(&self, blog: &Blog) -> bool {
        if let Some(state) = self.state {
            if blog.state != state {
                return false;
            }
        }
        if let Some(owner) = self.owner {
            if blog.author_id != owner {
                return false;
            }
        }
        if let Some(authors) = &self.authors {
            if !authors.contains(&blog.author_id) {
                return false;
            }
        }
        if let Some(title) = &self.title {
            if !contains_ci(&blog.title, title) {
                return false;
            }
        }
        if !self.tags.is_empty() && !blog.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        if let Some(term) = &self.search {
            let hit = contains_ci(&blog.title, term)
                || blog
                    .description
                    .as_deref()
                    .is_some_and(|d| contains_ci(d, term))
                || contains_ci(&blog.body, term)
                || blog.tags.iter().any(|t| t == term);
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogQuery {
    pub filter: BlogFilter,
    pub sort: Sort,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingPlan {
    /// Nothing can match; answer with an empty page without touching the store.
    Empty(PageRequest),
    Query(BlogQuery),
}

/// Plan for the public listing. `authors` is the resolved author term, if
/// one was supplied.
pub fn plan_public_listing(
    q: &ListBlogsQuery,
    identity: &Identity,
    authors: Option<Vec<Uuid>>,
) -> ListingPlan {
    let page = PageRequest::parse(q.page.as_deref(), q.limit.as_deref());

    let (state, owner) = match non_empty(&q.state) {
        Some("draft") => match identity.user_id() {
            Some(id) => (BlogState::Draft, Some(id)),
            None => return ListingPlan::Empty(page),
        },
        _ => (BlogState::Published, None),
    };

    let filter = BlogFilter {
        state: Some(state),
        owner,
        authors,
        title: non_empty(&q.title).map(str::to_string),
        tags: non_empty(&q.tags).map(split_tags).unwrap_or_default(),
        search: non_empty(&q.search).map(str::to_string),
    };

    ListingPlan::Query(BlogQuery {
        filter,
        sort: Sort {
            field: SortField::parse(q.order_by.as_deref()),
            order: SortOrder::parse(q.order.as_deref()),
        },
        page,
    })
}

/// Plan for the caller's own blogs: every state, newest first, optionally
/// narrowed to one exact state.
pub fn plan_owner_listing(owner: Uuid, q: &MyBlogsQuery) -> ListingPlan {
    let page = PageRequest::parse(q.page.as_deref(), q.limit.as_deref());
    let state = match non_empty(&q.state) {
        None => None,
        Some(raw) => match raw.parse::<BlogState>() {
            Ok(s) => Some(s),
            Err(_) => return ListingPlan::Empty(page),
        },
    };
    ListingPlan::Query(BlogQuery {
        filter: BlogFilter {
            state,
            owner: Some(owner),
            ..BlogFilter::default()
        },
        sort: Sort::default(),
        page,
    })
}
