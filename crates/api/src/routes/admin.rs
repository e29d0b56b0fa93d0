use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::json;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode, middleware,
    routing::{get, post}, Json, Router,
};
use sqlx::types::Uuid;

use avatar_clients::SignupMetadata;
use avatar_common::ModuleClient;
use avatar_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery};
use avatar_domain::{
    generate_one_time_password, generate_referral_code, AdminNotification, NotificationEvent,
    Patient,
};

use crate::{
    middleware::{admin_only, authenticate},
    response::{AppError, AppSuccess},
    routes::billing::{activate_pending_referral, mark_patient_paid},
    routes::signup::{provision_account, PostSignupRequest},
    GlobalState,
};

pub fn admin_routes(state: GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/admin/patients",
            get(list_patients)
        )
        .route("/admin/patients/{user_id}/grant-access",
            post(grant_access)
        )
        .route("/admin/patients/import",
            post(import_patients)
        )
        .route("/admin/notifications",
            get(notifications_feed)
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_only))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

async fn list_patients(
    State(state): State<GlobalState>,
) -> Result<AppSuccess, AppError> {
    let patients = Patient::find_by_criteria(
        QueryCriteria::new().order_by("created_at", OrderDirection::Desc),
        state.db.get_client().as_ref()
    ).await?;

    Ok(AppSuccess::new(StatusCode::OK, "Patients", json!({ "patients": patients })))
}

/// Manual access grant: the support path for patients who paid outside the
/// checkout flow (bank transfer, promo). Same effects as a completed
/// payment, minus the payment record.
async fn grant_access(
    State(state): State<GlobalState>,
    Path(user_id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let mut tx = state.db.get_client().begin().await?;

    let patient = Patient::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("user_id", "=", user_id),
        &mut *tx
    ).await?;
    if patient.is_none() {
        return Err(AppError::new(StatusCode::NOT_FOUND, anyhow!("[grant_access] Patient not found")));
    }

    mark_patient_paid(&mut tx, user_id).await?;
    activate_pending_referral(&mut tx, user_id).await?;

    tx.commit().await?;

    Ok(AppSuccess::new(StatusCode::OK, "Access granted", json!({ "success": true })))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPatientRequest {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportPatientsRequest {
    pub patients: Vec<ImportPatientRequest>,
}

/// Bulk onboarding from the old spreadsheet workflow: creates identity
/// accounts with one-time passwords and provisions the same rows the
/// signup hook would have. The generated credentials are returned once,
/// to be handed out over a side channel.
async fn import_patients(
    State(state): State<GlobalState>,
    Json(payload): Json<ImportPatientsRequest>,
) -> Result<AppSuccess, AppError> {
    let mut imported = Vec::new();
    let mut failed = Vec::new();

    for patient in payload.patients {
        let email = patient.email.trim().to_string();
        if email.is_empty() {
            failed.push(json!({ "email": patient.email, "error": "missing email" }));
            continue;
        }

        let password = generate_one_time_password();
        let metadata = SignupMetadata {
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            phone: patient.phone.clone(),
            referral_code: Some(generate_referral_code()),
            referred_by: None,
        };

        let account = match state.identity.create_user(&email, &password, &metadata).await {
            Ok(account) => account,
            Err(e) => {
                tracing::error!("[import_patients] account creation failed for {}: {:?}", email, e);
                failed.push(json!({ "email": email, "error": e.to_string() }));
                continue;
            }
        };

        let provisioning = PostSignupRequest {
            user_id: account.id,
            email: email.clone(),
            first_name: patient.first_name,
            last_name: patient.last_name,
            phone: patient.phone,
            referral_code: metadata.referral_code,
            referred_by: None,
        };
        if let Err(e) = provision_account(&state, &provisioning).await {
            tracing::error!("[import_patients] provisioning failed for {}: {:?}", email, e);
            failed.push(json!({ "email": email, "error": e.to_string() }));
            continue;
        }

        imported.push(json!({ "email": email, "password": password }));
    }

    Ok(AppSuccess::new(StatusCode::OK, "Import finished", json!({
        "imported": imported,
        "failed": failed,
    })))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationsQuery {
    /// Unix timestamp; only events strictly newer are returned. Clients
    /// poll with the timestamp of the last event they saw.
    pub since: Option<i64>,
}

#[derive(Debug, Serialize, Default)]
struct EventCounts {
    patient_question: usize,
    support_ticket: usize,
    interview_sent: usize,
    new_registration: usize,
}

const NOTIFICATIONS_PAGE_SIZE: i64 = 100;

async fn notifications_feed(
    State(state): State<GlobalState>,
    Query(query): Query<NotificationsQuery>,
) -> Result<AppSuccess, AppError> {
    let mut criteria = QueryCriteria::new()
        .order_by("created_at", OrderDirection::Desc)
        .limit(NOTIFICATIONS_PAGE_SIZE);
    if let Some(since) = query.since {
        criteria = criteria.add_valued_filter("created_at", ">", since);
    }

    let notifications = AdminNotification::find_by_criteria(
        criteria,
        state.db.get_client().as_ref()
    ).await?;

    let mut counts = EventCounts::default();
    for notification in &notifications {
        match notification.event {
            NotificationEvent::PatientQuestion => counts.patient_question += 1,
            NotificationEvent::SupportTicket => counts.support_ticket += 1,
            NotificationEvent::InterviewSent => counts.interview_sent += 1,
            NotificationEvent::NewRegistration => counts.new_registration += 1,
        }
    }

    Ok(AppSuccess::new(StatusCode::OK, "Notifications", json!({
        "notifications": notifications,
        "counts": counts,
    })))
}
