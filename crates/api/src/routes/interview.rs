use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::json;
use axum::{
    extract::{Extension, State},
    http::StatusCode, middleware,
    routing::post, Json, Router,
};
use sqlx::types::{Json as SqlxJson, Uuid};

use avatar_clients::AuthUser;
use avatar_common::ModuleClient;
use avatar_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery};
use avatar_domain::{AdminNotification, InterviewStatus, NutritionInterview, PersonProfile};

use crate::{
    middleware::authenticate,
    response::{AppError, AppSuccess},
    GlobalState,
};

pub fn interview_routes(state: GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/interview/draft",
            post(save_draft)
        )
        .route("/interview/submit",
            post(submit_interview)
        )
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftRequest {
    pub person_profile_id: Uuid,
    pub answers: serde_json::Value,
}

async fn save_draft(
    State(state): State<GlobalState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<SaveDraftRequest>,
) -> Result<AppSuccess, AppError> {
    let mut tx = state.db.get_client().begin().await?;

    let person_profile = owned_person_profile(&mut tx, payload.person_profile_id, auth_user.id).await?;

    let latest = NutritionInterview::find_one_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("person_profile_id", "=", person_profile.id)
            .order_by("updated_at", OrderDirection::Desc),
        &mut *tx
    ).await?;

    // A sent interview stays untouched; saving again starts a fresh draft.
    let interview = match latest {
        Some(mut interview) if interview.status == InterviewStatus::Draft => {
            interview.answers = SqlxJson(payload.answers);
            interview.update(&mut *tx).await?
        }
        _ => {
            NutritionInterview::draft(person_profile.id, payload.answers).create(&mut *tx).await?
        }
    };

    tx.commit().await?;

    Ok(AppSuccess::new(StatusCode::OK, "Draft saved", json!({
        "interview_id": interview.id,
    })))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitInterviewRequest {
    pub person_profile_id: Uuid,
}

async fn submit_interview(
    State(state): State<GlobalState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<SubmitInterviewRequest>,
) -> Result<AppSuccess, AppError> {
    let mut tx = state.db.get_client().begin().await?;

    let person_profile = owned_person_profile(&mut tx, payload.person_profile_id, auth_user.id).await?;

    let draft = NutritionInterview::find_one_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("person_profile_id", "=", person_profile.id)
            .add_valued_filter("status", "=", InterviewStatus::Draft)
            .order_by("updated_at", OrderDirection::Desc),
        &mut *tx
    ).await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("[submit_interview] No interview draft to submit")))?;

    let mut interview = draft;
    interview.status = InterviewStatus::Sent;
    let interview = interview.update(&mut *tx).await?;

    let notification = AdminNotification::interview_sent(auth_user.id, person_profile.id);
    notification.create(&mut *tx).await?;

    tx.commit().await?;

    Ok(AppSuccess::new(StatusCode::OK, "Interview submitted", json!({
        "interview_id": interview.id,
    })))
}

async fn owned_person_profile(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    person_profile_id: Uuid,
    user_id: Uuid,
) -> Result<PersonProfile, AppError> {
    let person_profile = PersonProfile::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("id", "=", person_profile_id),
        &mut **tx
    ).await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("[interview] Person profile not found")))?;

    if person_profile.user_id != user_id {
        return Err(AppError::new(StatusCode::FORBIDDEN, anyhow!("[interview] Person profile not found")));
    }

    Ok(person_profile)
}
