//! In-process store used for `DATABASE_URL=memory://` and in tests.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    blogs::{
        query::{BlogFilter, BlogQuery},
        repo::BlogRepo,
        repo_types::{Blog, BlogState, NewBlog},
    },
    error::RepoError,
};

#[derive(Default)]
pub struct MemoryUserRepo {
    users: RwLock<Vec<User>>,
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn search_ids(&self, term: &str) -> Result<Vec<Uuid>, RepoError> {
        let needle = term.to_lowercase();
        let exact_id = Uuid::parse_str(term).ok();
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| {
                u.first_name.to_lowercase().contains(&needle)
                    || u.last_name.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
                    || Some(u.id) == exact_id
            })
            .map(|u| u.id)
            .collect())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::UniqueViolation("users_email_key".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[derive(Default)]
pub struct MemoryBlogRepo {
    blogs: RwLock<Vec<Blog>>,
}

fn title_taken(blogs: &[Blog], title: &str, except: Option<Uuid>) -> bool {
    blogs
        .iter()
        .any(|b| b.title == title && Some(b.id) != except)
}

#[async_trait]
impl BlogRepo for MemoryBlogRepo {
    async fn insert(&self, blog: NewBlog) -> Result<Blog, RepoError> {
        let mut blogs = self.blogs.write().await;
        if title_taken(&blogs, &blog.title, None) {
            return Err(RepoError::UniqueViolation("blogs_title_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let blog = Blog {
            id: Uuid::new_v4(),
            title: blog.title,
            description: blog.description,
            author_id: blog.author_id,
            state: BlogState::Draft,
            read_count: 0,
            reading_time: blog.reading_time,
            tags: blog.tags,
            body: blog.body,
            created_at: now,
            updated_at: now,
        };
        blogs.push(blog.clone());
        Ok(blog)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        let blogs = self.blogs.read().await;
        Ok(blogs.iter().find(|b| b.id == id).cloned())
    }

    async fn list(&self, query: &BlogQuery) -> Result<Vec<Blog>, RepoError> {
        let blogs = self.blogs.read().await;
        let mut hits: Vec<&Blog> = blogs.iter().filter(|b| query.filter.matches(b)).collect();
        hits.sort_by(|a, b| query.sort.compare(a, b));
        Ok(hits
            .into_iter()
            .skip(query.page.offset().max(0) as usize)
            .take(query.page.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &BlogFilter) -> Result<i64, RepoError> {
        let blogs = self.blogs.read().await;
        Ok(blogs.iter().filter(|b| filter.matches(b)).count() as i64)
    }

    async fn update(&self, blog: &Blog) -> Result<Option<Blog>, RepoError> {
        let mut blogs = self.blogs.write().await;
        if title_taken(&blogs, &blog.title, Some(blog.id)) {
            return Err(RepoError::UniqueViolation("blogs_title_key".into()));
        }
        let Some(stored) = blogs.iter_mut().find(|b| b.id == blog.id) else {
            return Ok(None);
        };
        stored.title = blog.title.clone();
        stored.description = blog.description.clone();
        stored.tags = blog.tags.clone();
        stored.body = blog.body.clone();
        stored.reading_time = blog.reading_time;
        stored.state = blog.state;
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(Some(stored.clone()))
    }

    async fn increment_read_count(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        let mut blogs = self.blogs.write().await;
        Ok(blogs.iter_mut().find(|b| b.id == id).map(|b| {
            b.read_count += 1;
            b.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut blogs = self.blogs.write().await;
        let before = blogs.len();
        blogs.retain(|b| b.id != id);
        Ok(blogs.len() != before)
    }
}
