use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use axum::{
    extract::State,
    http::StatusCode,
    routing::post, Json, Router,
};
use sqlx::types::Uuid;
use sqlx::PgPool;

use avatar_common::ModuleClient;
use avatar_database::{is_unique_violation, QueryCriteria, SqlxCrud, SqlxFilterQuery};
use avatar_domain::{
    full_name, generate_referral_code, AdminNotification, Patient, PersonProfile, Profile, Referral,
};

use crate::{
    response::{AppError, AppSuccess},
    GlobalState,
};

/// Extra attempts after the caller-supplied code collides with an existing
/// profile's code.
const REFERRAL_CODE_RETRIES: usize = 3;

pub fn signup_routes() -> Router<GlobalState> {
    Router::new()
        .route("/functions/post-signup",
            post(post_signup)
        )
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSignupRequest {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub referral_code: Option<String>,
    pub referred_by: Option<String>,
}

/// Runs right after the identity provider creates the account. Everything
/// here is a side effect of a signup that already happened, so no failure
/// may surface to the caller: each phase logs and is absorbed, and the
/// endpoint reports success regardless. Missed attributions are picked up
/// later by the repair endpoint.
async fn post_signup(
    State(state): State<GlobalState>,
    Json(payload): Json<PostSignupRequest>,
) -> Result<AppSuccess, AppError> {
    if let Err(e) = provision_account(&state, &payload).await {
        tracing::error!("[post_signup] provisioning failed for {}: {:?}", payload.user_id, e);
    }

    if let Some(referred_by) = payload.referred_by.clone() {
        if let Err(e) = attribute_referral(&state, &payload, &referred_by).await {
            tracing::error!("[post_signup] attribution failed for {}: {:?}", payload.user_id, e);
        }
    }

    Ok(AppSuccess::new(StatusCode::OK, "Signup processed", json!({ "success": true })))
}

/// Creates the Profile / Patient / primary PersonProfile rows for a fresh
/// account. Safe to call any number of times for the same account: every
/// insert lands on a `user_id` conflict target and backs off.
pub(crate) async fn provision_account(state: &GlobalState, payload: &PostSignupRequest) -> Result<()> {
    let pool = state.db.get_client();

    insert_profile_with_unique_code(pool.as_ref(), payload).await?;

    let mut tx = pool.begin().await?;

    let patient = Patient::new(
        payload.user_id,
        payload.email.clone(),
        payload.first_name.clone(),
        payload.last_name.clone(),
        payload.phone.clone(),
    );
    patient.create_or_ignore(&mut *tx).await?;

    let display_name = full_name(payload.first_name.as_deref(), payload.last_name.as_deref());
    let existing_person_profile = PersonProfile::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("user_id", "=", payload.user_id),
        &mut *tx
    ).await?;
    if existing_person_profile.is_none() {
        let person_profile = PersonProfile::new(payload.user_id, display_name.clone(), true);
        person_profile.create(&mut *tx).await?;

        // Only the first provisioning pass announces the account.
        let notification = AdminNotification::new_registration(payload.user_id, display_name);
        notification.create(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// A unique-violation aborts any transaction it happens in, so the
/// collision retry loop runs each attempt as its own statement on the pool.
async fn insert_profile_with_unique_code(pool: &PgPool, payload: &PostSignupRequest) -> Result<()> {
    let mut code = payload.referral_code.clone().unwrap_or_else(generate_referral_code);

    for attempt in 0..=REFERRAL_CODE_RETRIES {
        let profile = Profile::new_patient(
            payload.user_id,
            payload.email.clone(),
            payload.first_name.clone().unwrap_or_default(),
            payload.last_name.clone().unwrap_or_default(),
            payload.phone.clone(),
            code.clone(),
        );

        match profile.create_or_ignore(pool).await {
            Ok(Some(_)) => return Ok(()),
            Ok(None) => {
                tracing::info!("[post_signup] profile for {} already exists", payload.user_id);
                return Ok(());
            }
            Err(e) if is_unique_violation(&e) && attempt < REFERRAL_CODE_RETRIES => {
                tracing::warn!("[post_signup] referral code {} already taken, regenerating", code);
                code = generate_referral_code();
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(anyhow!("[post_signup] could not find a free referral code after {} attempts", REFERRAL_CODE_RETRIES + 1))
}

/// Links the new account to its referrer. An unknown code is not an error:
/// the signup form accepts arbitrary text, and a bad code just means no
/// attribution happens.
async fn attribute_referral(state: &GlobalState, payload: &PostSignupRequest, referred_by: &str) -> Result<()> {
    let mut tx = state.db.get_client().begin().await?;

    let referrer = Profile::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("referral_code", "=", referred_by.to_string()),
        &mut *tx
    ).await?;

    let Some(referrer) = referrer else {
        tracing::warn!("[post_signup] referral code {} does not belong to anyone, skipping attribution", referred_by);
        return Ok(());
    };

    let referral = Referral::pending(
        referrer.user_id,
        referred_by.to_string(),
        payload.user_id,
        payload.email.clone(),
        full_name(payload.first_name.as_deref(), payload.last_name.as_deref()),
    );

    match referral.create_or_ignore(&mut *tx).await? {
        Some(created) => {
            tracing::info!("[post_signup] referral {} recorded for referrer {}", created.id, referrer.user_id);
        }
        None => {
            tracing::info!("[post_signup] account {} is already attributed", payload.user_id);
        }
    }

    tx.commit().await?;
    Ok(())
}
