use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{BlogPage, BlogResponse, CreateBlogRequest, DeleteResponse, UpdateBlogRequest},
    guard::{parse_blog_id, require_owner},
    query::{ListBlogsQuery, MyBlogsQuery},
    services,
};
use crate::{
    auth::extractors::{CurrentUser, Identity},
    error::AppError,
    json::AppJson,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(list_blogs))
        .route("/blogs/me", get(my_blogs))
        .route("/blogs/:id", get(get_blog))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", post(create_blog))
        .route("/blogs/:id", put(update_blog).delete(delete_blog))
}

#[instrument(skip(state, identity))]
pub async fn list_blogs(
    State(state): State<AppState>,
    identity: Identity,
    Query(q): Query<ListBlogsQuery>,
) -> Result<Json<BlogPage>, AppError> {
    Ok(Json(services::list_blogs(&state, &identity, &q).await?))
}

#[instrument(skip(state, user))]
pub async fn my_blogs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<MyBlogsQuery>,
) -> Result<Json<BlogPage>, AppError> {
    Ok(Json(services::list_my_blogs(&state, &user, &q).await?))
}

#[instrument(skip(state, identity))]
pub async fn get_blog(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<BlogResponse>, AppError> {
    let id = parse_blog_id(&id)?;
    Ok(Json(services::get_blog(&state, &identity, id).await?))
}

#[instrument(skip(state, user, payload))]
pub async fn create_blog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<CreateBlogRequest>,
) -> Result<(StatusCode, Json<BlogResponse>), AppError> {
    let blog = services::create_blog(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(blog)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_blog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    payload: Result<AppJson<UpdateBlogRequest>, AppError>,
) -> Result<Json<BlogResponse>, AppError> {
    // ownership is decided before the body is looked at
    let blog = require_owner(&state, &user, parse_blog_id(&id)?).await?;
    let AppJson(payload) = payload?;
    Ok(Json(services::update_blog(&state, blog, payload).await?))
}

#[instrument(skip(state, user))]
pub async fn delete_blog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let blog = require_owner(&state, &user, parse_blog_id(&id)?).await?;
    services::delete_blog(&state, blog).await?;
    Ok(Json(DeleteResponse {
        message: "Deleted".into(),
    }))
}
