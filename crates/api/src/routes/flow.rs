use serde::{Deserialize, Serialize};
use serde_json::json;
use axum::{
    extract::{Extension, Query, State},
    http::StatusCode, middleware,
    routing::get, Router,
};
use sqlx::types::Uuid;

use avatar_clients::AuthUser;
use avatar_common::ModuleClient;
use avatar_database::{OrderDirection, QueryCriteria, SqlxFilterQuery};
use avatar_domain::{
    resolve_flow_redirect_target, select_active_profile, FlowStatus, NutritionInterview, Patient,
    PersonProfile,
};

use crate::{
    middleware::authenticate,
    response::{AppError, AppSuccess},
    GlobalState,
};

pub fn flow_routes(state: GlobalState) -> Router<GlobalState> {
    Router::new()
        .route("/flow/status",
            get(flow_status)
        )
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlowStatusQuery {
    /// The person profile the client is currently looking at. Optional;
    /// the primary profile (or the first one) is used when absent or
    /// when the id does not belong to the account.
    pub person_profile_id: Option<Uuid>,
    /// When present, the response includes where this path should be
    /// force-navigated to, or null to stay.
    pub pathname: Option<String>,
}

/// Recomputed by the client on every navigation and focus change. Pure
/// read: two independent lookups, then the interview of whichever person
/// profile is active.
async fn flow_status(
    State(state): State<GlobalState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<FlowStatusQuery>,
) -> Result<AppSuccess, AppError> {
    let pool = state.db.get_client().as_ref();

    let (patient, person_profiles) = futures::try_join!(
        Patient::find_one_by_criteria(
            QueryCriteria::new().add_valued_filter("user_id", "=", auth_user.id),
            pool
        ),
        PersonProfile::find_by_criteria(
            QueryCriteria::new()
                .add_valued_filter("user_id", "=", auth_user.id)
                .order_by("created_at", OrderDirection::Asc),
            pool
        )
    )?;

    let has_paid_plan = patient.as_ref().is_some_and(Patient::has_active_subscription);

    let active_profile = select_active_profile(&person_profiles, query.person_profile_id);
    let latest_interview_status = match active_profile {
        Some(profile) => {
            NutritionInterview::find_one_by_criteria(
                QueryCriteria::new()
                    .add_valued_filter("person_profile_id", "=", profile.id)
                    .order_by("updated_at", OrderDirection::Desc),
                pool
            ).await?
                .map(|interview| interview.status)
        }
        None => None,
    };

    let status = FlowStatus::from_parts(
        has_paid_plan,
        latest_interview_status,
        active_profile.map(|profile| profile.id),
    );
    let redirect_to = query.pathname.as_deref()
        .and_then(|pathname| resolve_flow_redirect_target(pathname, status.state));

    Ok(AppSuccess::new(StatusCode::OK, "Flow status", json!({
        "status": status,
        "redirect_to": redirect_to,
    })))
}
