use tracing::warn;
use uuid::Uuid;

use super::repo_types::Blog;
use crate::{auth::repo_types::User, error::AppError, state::AppState};

/// Path ids that are not UUIDs cannot name a blog.
pub fn parse_blog_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::blog_not_found())
}

/// Loads the blog and checks that `user` wrote it. The loaded record is
/// handed back so the caller does not fetch it twice.
pub async fn require_owner(state: &AppState, user: &User, blog_id: Uuid) -> Result<Blog, AppError> {
    let blog = state
        .blogs
        .find_by_id(blog_id)
        .await?
        .ok_or_else(AppError::blog_not_found)?;

    if blog.author_id != user.id {
        warn!(user_id = %user.id, blog_id = %blog.id, "not the owner");
        return Err(AppError::Forbidden("Forbidden: not the owner".into()));
    }
    Ok(blog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo_types::NewUser, blogs::repo_types::NewBlog, config::AppConfig,
    };
    use axum::http::StatusCode;

    async fn user(state: &AppState, email: &str) -> User {
        state
            .users
            .create(NewUser {
                first_name: "F".into(),
                last_name: "L".into(),
                email: email.into(),
                password_hash: "h".into(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn owner_gets_the_blog_back() {
        let state = AppState::in_memory(AppConfig::for_tests());
        let owner = user(&state, "o@x.io").await;
        let other = user(&state, "n@x.io").await;
        let blog = state
            .blogs
            .insert(NewBlog {
                title: "Mine".into(),
                description: None,
                author_id: owner.id,
                tags: vec![],
                body: "b".into(),
                reading_time: 1,
            })
            .await
            .unwrap();

        let got = require_owner(&state, &owner, blog.id).await.unwrap();
        assert_eq!(got.id, blog.id);

        let err = require_owner(&state, &other, blog.id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = require_owner(&state, &owner, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn malformed_id_is_not_found() {
        assert_eq!(parse_blog_id("nope").unwrap_err().status(), StatusCode::NOT_FOUND);
        assert!(parse_blog_id(&Uuid::new_v4().to_string()).is_ok());
    }
}
