use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogState {
    #[default]
    Draft,
    Published,
}

impl BlogState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlogState::Draft => "draft",
            BlogState::Published => "published",
        }
    }
}

impl fmt::Display for BlogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlogState {
    type Err = anyhow::Error;

    /// Exact match only; `"Draft"` is not a state.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BlogState::Draft),
            "published" => Ok(BlogState::Published),
            other => anyhow::bail!("unknown blog state: {}", other),
        }
    }
}

/// Row as stored; `state` is a checked TEXT column.
#[derive(Debug, FromRow)]
pub struct BlogRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub author_id: Uuid,
    pub state: String,
    pub read_count: i64,
    pub reading_time: i32,
    pub tags: Vec<String>,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Blog record.
#[derive(Debug, Clone, PartialEq)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub author_id: Uuid,
    pub state: BlogState,
    pub read_count: i64,
    pub reading_time: i32,
    pub tags: Vec<String>,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<BlogRow> for Blog {
    type Error = anyhow::Error;

    fn try_from(r: BlogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            title: r.title,
            description: r.description,
            author_id: r.author_id,
            state: r.state.parse()?,
            read_count: r.read_count,
            reading_time: r.reading_time,
            tags: r.tags,
            body: r.body,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Fields needed to insert a blog. State and read count are not choosable.
#[derive(Debug, Clone)]
pub struct NewBlog {
    pub title: String,
    pub description: Option<String>,
    pub author_id: Uuid,
    pub tags: Vec<String>,
    pub body: String,
    pub reading_time: i32,
}
