use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{jwt::JwtKeys, repo_types::User};
use crate::{error::AppError, state::AppState};

/// Who is making the request. Resolving it never fails the request:
/// a missing, malformed, expired or orphaned token is simply `Anonymous`.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Authenticated(User),
}

impl Identity {
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(u) => Some(u),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user().map(|u| u.id)
    }

    pub fn is(&self, user_id: Uuid) -> bool {
        self.user_id() == Some(user_id)
    }

    pub fn require_authenticated(self) -> Result<User, AppError> {
        match self {
            Identity::Authenticated(u) => Ok(u),
            Identity::Anonymous => Err(AppError::Unauthorized("Authentication required".into())),
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn resolve_identity(state: &AppState, auth_header: Option<&str>) -> Identity {
    let Some(token) = auth_header.and_then(bearer_token) else {
        return Identity::Anonymous;
    };

    let keys = JwtKeys::from_ref(state);
    let claims = match keys.verify(token) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "invalid or expired token; treating as anonymous");
            return Identity::Anonymous;
        }
    };

    match state.users.find_by_id(claims.sub).await {
        Ok(Some(user)) => Identity::Authenticated(user),
        Ok(None) => {
            debug!(user_id = %claims.sub, "token for unknown user; treating as anonymous");
            Identity::Anonymous
        }
        Err(e) => {
            warn!(error = %e, user_id = %claims.sub, "user lookup failed; treating as anonymous");
            Identity::Anonymous
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        Ok(resolve_identity(state, header).await)
    }
}

/// Resolved identity that must not be anonymous; rejects with 401.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = match Identity::from_request_parts(parts, state).await {
            Ok(i) => i,
            Err(never) => match never {},
        };
        identity.require_authenticated().map(CurrentUser)
    }
}
