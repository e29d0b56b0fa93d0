use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::json;
use axum::{
    extract::{Extension, State},
    http::StatusCode, middleware,
    routing::{get, post}, Json, Router,
};

use avatar_clients::AuthUser;
use avatar_common::ModuleClient;
use avatar_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery};
use avatar_domain::PersonProfile;

use crate::{
    middleware::authenticate,
    response::{AppError, AppSuccess},
    GlobalState,
};

pub fn profile_routes(state: GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/profiles",
            get(list_person_profiles)
            .post(create_person_profile)
        )
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

async fn list_person_profiles(
    State(state): State<GlobalState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<AppSuccess, AppError> {
    let person_profiles = PersonProfile::find_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("user_id", "=", auth_user.id)
            .order_by("created_at", OrderDirection::Asc),
        state.db.get_client().as_ref()
    ).await?;

    Ok(AppSuccess::new(StatusCode::OK, "Person profiles", json!({
        "profiles": person_profiles,
    })))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePersonProfileRequest {
    pub name: String,
}

async fn create_person_profile(
    State(state): State<GlobalState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreatePersonProfileRequest>,
) -> Result<AppSuccess, AppError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, anyhow!("[create_person_profile] Missing name")));
    }

    let mut tx = state.db.get_client().begin().await?;

    let existing = PersonProfile::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("user_id", "=", auth_user.id),
        &mut *tx
    ).await?;

    // The first profile of an account is its primary one.
    let person_profile = PersonProfile::new(auth_user.id, name, existing.is_none());
    let person_profile = person_profile.create(&mut *tx).await?;
    tx.commit().await?;

    Ok(AppSuccess::new(StatusCode::OK, "Person profile created", json!({
        "profile_id": person_profile.id,
    })))
}
