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
use avatar_domain::{full_name, verify_referral_claim, Referral, RepairError};

use crate::{
    ensure_profile,
    middleware::authenticate,
    response::{AppError, AppSuccess},
    GlobalState,
};

pub fn referral_routes(state: GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/functions/repair-referral",
            post(repair_referral)
        )
        .route("/referral/list",
            get(list_referrals)
        )
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReferralRequest {
    pub referred_email: String,
}

/// Support action for referrers whose automatic attribution never ran.
/// Unlike the signup path this is fully strict: every failure comes back
/// to the caller with a specific message, and nothing is silently fixed.
async fn repair_referral(
    State(state): State<GlobalState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<RepairReferralRequest>,
) -> Result<AppSuccess, AppError> {
    let caller = ensure_profile(&state.db, auth_user.id).await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("[repair_referral] Profile not found")))?;
    let caller_code = caller.referral_code.clone()
        .ok_or_else(|| repair_error(RepairError::NoReferralCode))?;

    let target = state.identity.find_user_by_email(&payload.referred_email).await
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow!("[repair_referral] identity lookup failed: {}", e)))?
        .ok_or_else(|| repair_error(RepairError::UserNotFound))?;

    verify_referral_claim(&caller_code, target.metadata.referred_by.as_deref())
        .map_err(repair_error)?;

    let referred_name = full_name(target.metadata.first_name.as_deref(), target.metadata.last_name.as_deref());
    let referred_email = target.email.clone().unwrap_or_else(|| payload.referred_email.trim().to_string());
    let referral = Referral::pending(caller.user_id, caller_code, target.id, referred_email, referred_name);

    let mut tx = state.db.get_client().begin().await?;
    let created = referral.create_or_ignore(&mut *tx).await?;
    tx.commit().await?;

    let created = created.ok_or_else(|| repair_error(RepairError::AlreadyExists))?;
    tracing::info!("[repair_referral] referral {} restored by {}", created.id, auth_user.id);

    Ok(AppSuccess::new(StatusCode::OK, "Referral restored", json!({ "success": true })))
}

async fn list_referrals(
    State(state): State<GlobalState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<AppSuccess, AppError> {
    let referrals = Referral::find_by_criteria(
        QueryCriteria::new()
            .add_valued_filter("referrer_user_id", "=", auth_user.id)
            .order_by("created_at", OrderDirection::Desc),
        state.db.get_client().as_ref()
    ).await?;

    Ok(AppSuccess::new(StatusCode::OK, "Referrals", json!({ "referrals": referrals })))
}

fn repair_error(error: RepairError) -> AppError {
    let status = match error {
        RepairError::UserNotFound => StatusCode::NOT_FOUND,
        RepairError::NoReferralCode
        | RepairError::NotYourReferral
        | RepairError::AlreadyExists => StatusCode::BAD_REQUEST,
    };
    AppError::new(status, error.into())
}
