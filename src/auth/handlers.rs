use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{required, AuthResponse, LoginRequest, SignupRequest},
        jwt::JwtKeys,
        password::{hash_password, is_valid_email, verify_password},
        repo_types::{NewUser, PublicUser},
    },
    error::{AppError, RepoError},
    json::AppJson,
    state::AppState,
};

const EMAIL_IN_USE: &str = "Email already in use";
const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (Some(first_name), Some(last_name), Some(email), Some(password)) = (
        required(&payload.first_name),
        required(&payload.last_name),
        required(&payload.email),
        required(&payload.password),
    ) else {
        warn!("signup missing required fields");
        return Err(AppError::BadRequest("Missing required fields".into()));
    };

    if !is_valid_email(email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    if state.users.find_by_email(email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict(EMAIL_IN_USE.into()));
    }

    let password_hash = hash_password(password)?;

    let user = match state
        .users
        .create(NewUser {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(RepoError::UniqueViolation(_)) => {
            warn!(email = %email, "email registered concurrently");
            return Err(AppError::Conflict(EMAIL_IN_USE.into()));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(e.into());
        }
    };

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (Some(email), Some(password)) = (required(&payload.email), required(&payload.password))
    else {
        warn!("login missing email or password");
        return Err(AppError::BadRequest("Missing email or password".into()));
    };

    // Unknown email and wrong password share one message so that login does
    // not reveal which accounts exist.
    let Some(user) = state.users.find_by_email(email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(user),
    }))
}
