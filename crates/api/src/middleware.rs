use anyhow::anyhow;
use axum::body::Body;
use axum::extract::{Extension, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use sqlx::types::Uuid;

use avatar_clients::{AuthUser, PostgresClient};
use avatar_common::ModuleClient;
use avatar_database::{QueryCriteria, SqlxFilterQuery};
use avatar_domain::{Profile, ProfileRole};

use crate::response::AppError;
use crate::utils::extract_bearer_token;
use crate::GlobalState;

/// Resolves the bearer token against the identity provider and stashes the
/// account in request extensions. Everything behind this layer can rely on
/// `Extension<AuthUser>` being present.
pub async fn authenticate(
    State(state): State<GlobalState>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let token = extract_bearer_token(&req)?;
    let auth_user = state.identity.get_user(&token).await
        .map_err(|e| AppError::new(StatusCode::UNAUTHORIZED, anyhow!("[authenticate] invalid token: {}", e)))?;

    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}

/// Gate for the admin surface; layered inside `authenticate`.
pub async fn admin_only(
    State(state): State<GlobalState>,
    Extension(auth_user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let profile = ensure_profile(&state.db, auth_user.id).await?
        .ok_or_else(|| AppError::new(StatusCode::FORBIDDEN, anyhow!("[admin_only] no profile for account")))?;

    if profile.role != ProfileRole::Admin {
        return Err(AppError::new(StatusCode::FORBIDDEN, anyhow!("[admin_only] admin access required")));
    }

    Ok(next.run(req).await)
}

/// Loads the caller's Profile row, if provisioning has created one yet.
pub async fn ensure_profile(db: &PostgresClient, user_id: Uuid) -> Result<Option<Profile>, AppError> {
    let profile = Profile::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("user_id", "=", user_id),
        db.get_client().as_ref()
    ).await?;

    Ok(profile)
}
