use std::collections::HashMap;

use tracing::{error, info};
use uuid::Uuid;

use super::{
    dto::{BlogPage, BlogResponse, CreateBlogRequest, UpdateBlogRequest},
    query::{
        plan_owner_listing, plan_public_listing, ListBlogsQuery, ListingPlan, MyBlogsQuery,
    },
    reading_time::reading_time,
    repo_types::{Blog, BlogState, NewBlog},
};
use crate::{
    auth::{
        extractors::Identity,
        repo_types::{PublicUser, User},
    },
    error::{AppError, RepoError},
    state::AppState,
};

const TITLE_TAKEN: &str = "Blog title must be unique";

fn title_conflict(e: RepoError) -> AppError {
    match e {
        RepoError::UniqueViolation(_) => AppError::Conflict(TITLE_TAKEN.into()),
        other => other.into(),
    }
}

/// Resolves each blog's author to its public projection with one lookup.
async fn attach_authors(state: &AppState, blogs: Vec<Blog>) -> Result<Vec<BlogResponse>, AppError> {
    let mut ids: Vec<Uuid> = blogs.iter().map(|b| b.author_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let authors: HashMap<Uuid, PublicUser> = state
        .users
        .find_many(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, PublicUser::from(u)))
        .collect();

    blogs
        .into_iter()
        .map(|b| match authors.get(&b.author_id) {
            Some(author) => Ok(BlogResponse::new(b, author.clone())),
            None => {
                error!(blog_id = %b.id, author_id = %b.author_id, "blog author missing");
                Err(AppError::Internal("Blog author missing".into()))
            }
        })
        .collect()
}

async fn attach_author(state: &AppState, blog: Blog) -> Result<BlogResponse, AppError> {
    attach_authors(state, vec![blog])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Blog author missing".into()))
}

async fn run_listing(state: &AppState, plan: ListingPlan) -> Result<BlogPage, AppError> {
    let query = match plan {
        ListingPlan::Empty(page) => {
            return Ok(BlogPage {
                items: Vec::new(),
                page: page.echo_page,
                limit: page.echo_limit,
                total: 0,
            })
        }
        ListingPlan::Query(q) => q,
    };

    let total = state.blogs.count(&query.filter).await?;
    let blogs = state.blogs.list(&query).await?;
    Ok(BlogPage {
        items: attach_authors(state, blogs).await?,
        page: query.page.echo_page,
        limit: query.page.echo_limit,
        total,
    })
}

pub async fn list_blogs(
    state: &AppState,
    identity: &Identity,
    q: &ListBlogsQuery,
) -> Result<BlogPage, AppError> {
    let authors = match q.author_term() {
        Some(term) => Some(state.users.search_ids(term).await?),
        None => None,
    };
    run_listing(state, plan_public_listing(q, identity, authors)).await
}

pub async fn list_my_blogs(
    state: &AppState,
    user: &User,
    q: &MyBlogsQuery,
) -> Result<BlogPage, AppError> {
    run_listing(state, plan_owner_listing(user.id, q)).await
}

/// Drafts are reported as missing to everyone but their author. Every
/// successful read counts.
pub async fn get_blog(state: &AppState, identity: &Identity, id: Uuid) -> Result<BlogResponse, AppError> {
    let blog = state
        .blogs
        .find_by_id(id)
        .await?
        .ok_or_else(AppError::blog_not_found)?;

    if blog.state == BlogState::Draft && !identity.is(blog.author_id) {
        return Err(AppError::blog_not_found());
    }

    let blog = state
        .blogs
        .increment_read_count(blog.id)
        .await?
        .ok_or_else(AppError::blog_not_found)?;
    attach_author(state, blog).await
}

pub async fn create_blog(
    state: &AppState,
    author: &User,
    req: CreateBlogRequest,
) -> Result<BlogResponse, AppError> {
    let title = req.title.filter(|t| !t.is_empty());
    let body = req.body.filter(|b| !b.is_empty());
    let (Some(title), Some(body)) = (title, body) else {
        return Err(AppError::BadRequest("Title and body required".into()));
    };

    let blog = state
        .blogs
        .insert(NewBlog {
            reading_time: reading_time(&body),
            title,
            description: req.description,
            author_id: author.id,
            tags: req.tags.map(|t| t.normalize()).unwrap_or_default(),
            body,
        })
        .await
        .map_err(title_conflict)?;

    info!(blog_id = %blog.id, author_id = %author.id, "blog created");
    Ok(BlogResponse::new(blog, PublicUser::from(author)))
}

/// Applies the supplied fields to an already owner-checked blog.
pub fn apply_update(blog: &mut Blog, req: UpdateBlogRequest) {
    if let Some(title) = req.title.filter(|t| !t.is_empty()) {
        blog.title = title;
    }
    if let Some(description) = req.description {
        blog.description = Some(description);
    }
    if let Some(tags) = req.tags {
        blog.tags = tags.normalize();
    }
    if let Some(body) = req.body.filter(|b| !b.is_empty()) {
        blog.reading_time = reading_time(&body);
        blog.body = body;
    }
    if let Some(state) = req.state.as_deref().and_then(|s| s.parse::<BlogState>().ok()) {
        blog.state = state;
    }
}

pub async fn update_blog(
    state: &AppState,
    mut blog: Blog,
    req: UpdateBlogRequest,
) -> Result<BlogResponse, AppError> {
    apply_update(&mut blog, req);
    let blog = state
        .blogs
        .update(&blog)
        .await
        .map_err(title_conflict)?
        .ok_or_else(AppError::blog_not_found)?;

    info!(blog_id = %blog.id, state = %blog.state, "blog updated");
    attach_author(state, blog).await
}

pub async fn delete_blog(state: &AppState, blog: Blog) -> Result<(), AppError> {
    if !state.blogs.delete(blog.id).await? {
        return Err(AppError::blog_not_found());
    }
    info!(blog_id = %blog.id, "blog deleted");
    Ok(())
}
