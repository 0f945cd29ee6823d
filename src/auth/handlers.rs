use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{Credentials, PublicUser, TokenResponse},
        middleware::{require_auth, AuthUser},
        password,
        repo::{StoreError, User},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/protected", get(protected))
        .route("/me", get(get_me))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn credentials(payload: Result<Json<Credentials>, JsonRejection>) -> Result<(String, String), ApiError> {
    let Json(body) = payload.map_err(|e| {
        warn!(error = %e, "unreadable credentials body");
        ApiError::Validation("username and password are required".into())
    })?;
    body.into_parts().ok_or_else(|| {
        warn!("missing username or password");
        ApiError::Validation("username and password are required".into())
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let (username, plain) = credentials(payload)?;

    if User::find_by_username(&state.db, &username)
        .await
        .map_err(ApiError::server_verbose)?
        .is_some()
    {
        warn!(%username, "username already registered");
        return Err(ApiError::UserExists);
    }

    let hash = password::hash_password_blocking(plain)
        .await
        .map_err(ApiError::server_verbose)?;

    let user = insert_user(&state.db, &username, &hash).await?;
    let token = state.keys.sign(user.id).map_err(ApiError::server_verbose)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Inserts the account. Losing a race against a concurrent registration of
/// the same name yields the same error as the up-front check.
async fn insert_user(db: &SqlitePool, username: &str, hash: &str) -> Result<User, ApiError> {
    match User::create(db, username, hash).await {
        Ok(u) => Ok(u),
        Err(StoreError::DuplicateUsername) => {
            warn!(%username, "username registered concurrently");
            Err(ApiError::UserExists)
        }
        Err(e) => Err(ApiError::server_verbose(e)),
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let (username, plain) = credentials(payload)?;

    let user = match User::find_by_username(&state.db, &username).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(%username, "login unknown username");
            return Err(ApiError::UserNotFound);
        }
        Err(e) => return Err(ApiError::server(e)),
    };

    let ok = password::verify_password_blocking(plain, user.password_hash.clone())
        .await
        .map_err(ApiError::server)?;

    if !ok {
        warn!(%username, user_id = %user.id, "login invalid password");
        return Err(ApiError::WrongPassword);
    }

    let token = state.keys.sign(user.id).map_err(ApiError::server)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(TokenResponse { token }))
}

#[instrument]
pub async fn protected(Extension(AuthUser(user_id)): Extension<AuthUser>) -> &'static str {
    info!(%user_id, "protected route accessed");
    "This is a protected route"
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(ApiError::server)?
        .ok_or_else(|| {
            warn!(%user_id, "token subject no longer exists");
            ApiError::NotAuthenticated
        })?;

    Ok(Json(PublicUser {
        id: user.id,
        username: user.username,
    }))
}
