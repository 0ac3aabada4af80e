use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    query::{BlogFilter, BlogQuery},
    repo_types::{Blog, BlogRow, NewBlog},
};
use crate::error::RepoError;

/// Blog storage. Title uniqueness is enforced by the store.
#[async_trait]
pub trait BlogRepo: Send + Sync {
    async fn insert(&self, blog: NewBlog) -> Result<Blog, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, RepoError>;
    async fn list(&self, query: &BlogQuery) -> Result<Vec<Blog>, RepoError>;
    /// Same filter as `list`, without paging.
    async fn count(&self, filter: &BlogFilter) -> Result<i64, RepoError>;
    /// Writes the owner-editable fields and bumps `updated_at`. Never touches
    /// `read_count` or `author_id`.
    async fn update(&self, blog: &Blog) -> Result<Option<Blog>, RepoError>;
    /// Atomically adds one to `read_count` and returns the new record.
    async fn increment_read_count(&self, id: Uuid) -> Result<Option<Blog>, RepoError>;
    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;
}

const BLOG_COLUMNS: &str = "id, title, description, author_id, state, read_count, \
                            reading_time, tags, body, created_at, updated_at";

#[derive(Clone)]
pub struct PgBlogRepo {
    db: PgPool,
}

impl PgBlogRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_blog(row: BlogRow) -> Result<Blog, RepoError> {
    Blog::try_from(row).map_err(RepoError::Store)
}

/// Appends `WHERE ...` for `filter`. Every value is bound, never inlined.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &BlogFilter) {
    qb.push(" WHERE TRUE");
    if let Some(state) = filter.state {
        qb.push(" AND state = ").push_bind(state.as_str());
    }
    if let Some(owner) = filter.owner {
        qb.push(" AND author_id = ").push_bind(owner);
    }
    if let Some(authors) = &filter.authors {
        qb.push(" AND author_id = ANY(")
            .push_bind(authors.clone())
            .push(")");
    }
    if let Some(title) = &filter.title {
        qb.push(" AND strpos(lower(title), lower(")
            .push_bind(title.clone())
            .push(")) > 0");
    }
    if !filter.tags.is_empty() {
        qb.push(" AND tags && ")
            .push_bind(filter.tags.clone())
            .push("::text[]");
    }
    if let Some(term) = &filter.search {
        qb.push(" AND (strpos(lower(title), lower(")
            .push_bind(term.clone())
            .push(")) > 0 OR strpos(lower(coalesce(description, '')), lower(")
            .push_bind(term.clone())
            .push(")) > 0 OR strpos(lower(body), lower(")
            .push_bind(term.clone())
            .push(")) > 0 OR ")
            .push_bind(term.clone())
            .push(" = ANY(tags))");
    }
}

fn list_sql<'a>(query: &BlogQuery) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {BLOG_COLUMNS} FROM blogs"));
    push_filter(&mut qb, &query.filter);
    // column and direction come from closed enums
    let dir = query.sort.order.keyword();
    qb.push(format!(
        " ORDER BY {} {dir}, id {dir}",
        query.sort.field.column()
    ));
    qb.push(" LIMIT ")
        .push_bind(query.page.limit)
        .push(" OFFSET ")
        .push_bind(query.page.offset());
    qb
}

#[async_trait]
impl BlogRepo for PgBlogRepo {
    async fn insert(&self, blog: NewBlog) -> Result<Blog, RepoError> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            r#"
            INSERT INTO blogs (id, title, description, author_id, tags, body, reading_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&blog.title)
        .bind(&blog.description)
        .bind(blog.author_id)
        .bind(&blog.tags)
        .bind(&blog.body)
        .bind(blog.reading_time)
        .fetch_one(&self.db)
        .await?;
        into_blog(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(into_blog).transpose()
    }

    async fn list(&self, query: &BlogQuery) -> Result<Vec<Blog>, RepoError> {
        let mut qb = list_sql(query);
        let rows = qb.build_query_as::<BlogRow>().fetch_all(&self.db).await?;
        rows.into_iter().map(into_blog).collect()
    }

    async fn count(&self, filter: &BlogFilter) -> Result<i64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM blogs");
        push_filter(&mut qb, filter);
        let total = qb.build_query_scalar::<i64>().fetch_one(&self.db).await?;
        Ok(total)
    }

    async fn update(&self, blog: &Blog) -> Result<Option<Blog>, RepoError> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            r#"
            UPDATE blogs
               SET title = $2,
                   description = $3,
                   tags = $4,
                   body = $5,
                   reading_time = $6,
                   state = $7,
                   updated_at = now()
             WHERE id = $1
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(blog.id)
        .bind(&blog.title)
        .bind(&blog.description)
        .bind(&blog.tags)
        .bind(&blog.body)
        .bind(blog.reading_time)
        .bind(blog.state.as_str())
        .fetch_optional(&self.db)
        .await?;
        row.map(into_blog).transpose()
    }

    async fn increment_read_count(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            r#"
            UPDATE blogs
               SET read_count = read_count + 1
             WHERE id = $1
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(into_blog).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
