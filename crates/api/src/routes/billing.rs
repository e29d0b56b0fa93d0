use std::str::FromStr;

use anyhow::anyhow;
use serde_json::json;
use axum::{
    extract::{Extension, Path, State},
    http::{HeaderMap, StatusCode}, middleware,
    routing::post, Router,
};
use sqlx::types::Uuid;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionPaymentMethodTypes, EventObject, EventType, Webhook,
};

use avatar_clients::AuthUser;
use avatar_common::{EnvVars, ModuleClient};
use avatar_database::{QueryCriteria, SqlxCrud, SqlxFilterQuery};
use avatar_domain::{Package, Patient, PaymentRecord, PaymentStatus, Referral};

use crate::{
    ensure_profile,
    middleware::authenticate,
    response::{AppError, AppSuccess},
    ApiServerEnv, GlobalState,
};

/// The subscription status written on a completed payment. Polish spelling
/// on purpose: it is what the rest of the product (and its admins) look
/// for, alongside the "active"/"paid" synonyms.
const PAID_SUBSCRIPTION_STATUS: &str = "aktywna";

pub fn billing_routes(state: GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/billing/checkout/{package}",
            post(create_checkout_session)
            .route_layer(middleware::from_fn_with_state(state, authenticate))
        )
        .route("/billing/webhook", post(billing_webhook))
}

fn price_id_for(env: &ApiServerEnv, package: Package) -> String {
    match package {
        Package::Basic => env.get_env_var("STRIPE_PRICE_BASIC"),
        Package::Standard => env.get_env_var("STRIPE_PRICE_STANDARD"),
        Package::Premium => env.get_env_var("STRIPE_PRICE_PREMIUM"),
    }
}

async fn create_checkout_session(
    State(state): State<GlobalState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(package): Path<Package>,
    headers: HeaderMap,
) -> Result<AppSuccess, AppError> {
    let env = ApiServerEnv::load();

    let profile = ensure_profile(&state.db, auth_user.id).await?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, anyhow!("[create_checkout_session] Profile not found")))?;

    let origin = headers
        .get("origin")
        .and_then(|o| o.to_str().ok())
        .unwrap_or("http://localhost:3000");

    let user_id_str = auth_user.id.to_string();
    let price_id = price_id_for(&env, package);
    let success_url = format!("{}/payment/success", origin);
    let cancel_url = format!("{}/payment", origin);

    let params = CreateCheckoutSession {
        customer_email: Some(&profile.email),
        client_reference_id: Some(&user_id_str),
        payment_method_types: Some(vec![
            CreateCheckoutSessionPaymentMethodTypes::Card,
        ]),
        line_items: Some(vec![CreateCheckoutSessionLineItems {
            price: Some(price_id.clone()),
            quantity: Some(1),
            ..Default::default()
        }]),
        mode: Some(CheckoutSessionMode::Payment),
        success_url: Some(&success_url),
        cancel_url: Some(&cancel_url),
        allow_promotion_codes: Some(true),
        ..Default::default()
    };

    let session = CheckoutSession::create(&state.stripe_client, params)
        .await
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow!("Stripe error: {}", e)))?;
    let url = session.url
        .ok_or_else(|| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow!("Stripe error: no session url")))?;

    let payment = PaymentRecord {
        id: Uuid::default(),
        user_id: auth_user.id,
        checkout_session_id: session.id.to_string(),
        url: url.clone(),
        package,
        amount_total: session.amount_total.unwrap_or_default(),
        currency: session.currency.map(|c| c.to_string()).unwrap_or_default(),
        status: PaymentStatus::Pending,
        created_at: 0,
        updated_at: 0,
    };

    let mut tx = state.db.get_client().begin().await?;
    payment.create(&mut *tx).await?;
    tx.commit().await?;

    Ok(AppSuccess::new(StatusCode::OK, "Checkout session created", json!({ "url": url })))
}

/// Completion is where an account turns into a paying patient: the payment
/// record flips to completed, the patient goes active, and a pending
/// referral pointing at this account becomes active too.
async fn billing_webhook(
    State(state): State<GlobalState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<AppSuccess, AppError> {
    let env = ApiServerEnv::load();
    let sig = headers
        .get("stripe-signature")
        .and_then(|s| s.to_str().ok())
        .ok_or_else(|| AppError::new(StatusCode::BAD_REQUEST, anyhow!("Missing stripe-signature header")))?;

    let payload = String::from_utf8(body.to_vec())
        .map_err(|e| AppError::new(StatusCode::BAD_REQUEST, anyhow!("Webhook error: {}", e)))?;
    let event = Webhook::construct_event(&payload, sig, &env.get_env_var("STRIPE_WEBHOOK_SECRET"))
        .map_err(|e| AppError::new(StatusCode::BAD_REQUEST, anyhow!("Webhook error: {}", e)))?;

    if let EventObject::CheckoutSession(session) = event.data.object {
        let session_id = session.id.to_string();
        let mut tx = state.db.get_client().begin().await?;
        match event.type_ {
            EventType::CheckoutSessionCompleted => {
                let user_id = session.client_reference_id.clone()
                    .ok_or_else(|| AppError::new(StatusCode::BAD_REQUEST, anyhow!("Missing client_reference_id")))?;
                match Uuid::from_str(&user_id) {
                    Err(_) => {
                        tracing::error!("[billing_webhook] Invalid user id: {}", user_id);
                    }
                    Ok(user_uuid) => {
                        let maybe_payment = PaymentRecord::find_one_by_criteria(
                            QueryCriteria::new().add_valued_filter("checkout_session_id", "=", session_id.clone()),
                            &mut *tx
                        ).await?;

                        match maybe_payment {
                            None => {
                                tracing::error!("[billing_webhook] Payment not found for session {} for user {}", session_id, user_id);
                            }
                            Some(mut payment) => {
                                if payment.user_id != user_uuid {
                                    tracing::error!("[billing_webhook] user_id mismatch, unexpected session: {} user_id: {}", session_id, user_id);
                                } else {
                                    payment.status = PaymentStatus::Completed;
                                    payment.update(&mut *tx).await?;

                                    mark_patient_paid(&mut tx, user_uuid).await?;
                                    activate_pending_referral(&mut tx, user_uuid).await?;

                                    tracing::info!("[billing_webhook] Payment completed for user {}", user_id);
                                }
                            }
                        }
                    }
                }
            }
            EventType::CheckoutSessionExpired => {
                let maybe_payment = PaymentRecord::find_one_by_criteria(
                    QueryCriteria::new().add_valued_filter("checkout_session_id", "=", session_id.clone()),
                    &mut *tx
                ).await?;
                if let Some(mut payment) = maybe_payment {
                    if payment.status == PaymentStatus::Pending {
                        payment.status = PaymentStatus::Canceled;
                        payment.update(&mut *tx).await?;
                    }
                }
            }
            _ => {
                // unhandled event type
            }
        }

        tx.commit().await?;
    }

    Ok(AppSuccess::new(StatusCode::OK, "Webhook received", json!({})))
}

pub(crate) async fn mark_patient_paid(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<(), AppError> {
    let patient = Patient::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("user_id", "=", user_id),
        &mut **tx
    ).await?;

    match patient {
        Some(mut patient) => {
            patient.subscription_status = Some(PAID_SUBSCRIPTION_STATUS.to_string());
            patient.update(&mut **tx).await?;
        }
        None => {
            tracing::error!("[billing] no patient row for paying account {}", user_id);
        }
    }

    Ok(())
}

pub(crate) async fn activate_pending_referral(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    referred_user_id: Uuid,
) -> Result<(), AppError> {
    let referral = Referral::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("referred_user_id", "=", referred_user_id),
        &mut **tx
    ).await?;

    if let Some(mut referral) = referral {
        if referral.activate() {
            let referral = referral.update(&mut **tx).await?;
            tracing::info!("[billing] referral {} activated for referrer {}", referral.id, referral.referrer_user_id);
        }
    }

    Ok(())
}
