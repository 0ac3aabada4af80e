use serde::{Deserialize, Serialize};
use serde_json::Number;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    query::split_tags,
    repo_types::{Blog, BlogState},
};
use crate::auth::repo_types::PublicUser;

/// Tags arrive either as a JSON array or as `"a, b, c"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    pub fn normalize(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            TagsInput::Csv(raw) => split_tags(&raw),
        }
    }
}

/// Request body for `POST /blogs`. Author, state and counters are not
/// accepted from the client; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct CreateBlogRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<TagsInput>,
    pub body: Option<String>,
}

/// Request body for `PUT /blogs/:id`. Every field is an optional patch.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<TagsInput>,
    pub body: Option<String>,
    /// Only `draft` and `published` are applied; anything else is ignored.
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub author: PublicUser,
    pub state: BlogState,
    pub read_count: i64,
    pub reading_time: i32,
    pub tags: Vec<String>,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl BlogResponse {
    pub fn new(blog: Blog, author: PublicUser) -> Self {
        Self {
            id: blog.id,
            title: blog.title,
            description: blog.description,
            author,
            state: blog.state,
            read_count: blog.read_count,
            reading_time: blog.reading_time,
            tags: blog.tags,
            body: blog.body,
            created_at: blog.created_at,
            updated_at: blog.updated_at,
        }
    }
}

/// Paginated envelope. `page`/`limit` echo the request (null if it was not a number).
#[derive(Debug, Serialize)]
pub struct BlogPage {
    pub items: Vec<BlogResponse>,
    pub page: Option<Number>,
    pub limit: Option<Number>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}
