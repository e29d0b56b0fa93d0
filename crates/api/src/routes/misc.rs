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
use avatar_database::SqlxCrud;
use avatar_domain::AdminNotification;

use crate::{
    middleware::authenticate,
    response::{AppError, AppSuccess},
    GlobalState,
};

pub fn misc_routes(state: GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/health",
            get(|| async { "OK" })
        )
        .route("/contact",
            post(contact)
            .route_layer(middleware::from_fn_with_state(state, authenticate))
        )
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Question,
    Support,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactRequest {
    pub kind: ContactKind,
    pub message: String,
}

/// Patient-to-staff messages land in the admin feed rather than a mailbox.
async fn contact(
    State(state): State<GlobalState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ContactRequest>,
) -> Result<AppSuccess, AppError> {
    let message = payload.message.trim().to_string();
    if message.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, anyhow!("[contact] Missing message")));
    }

    let notification = match payload.kind {
        ContactKind::Question => AdminNotification::patient_question(auth_user.id, message),
        ContactKind::Support => AdminNotification::support_ticket(auth_user.id, message),
    };

    let mut tx = state.db.get_client().begin().await?;
    notification.create(&mut *tx).await?;
    tx.commit().await?;

    Ok(AppSuccess::new(StatusCode::OK, "Message received", json!({ "success": true })))
}
