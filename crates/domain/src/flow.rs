use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use crate::interview::InterviewStatus;

/// Where an account stands in onboarding. Derived on every request, never
/// persisted.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    NoPlan,
    PlanNoInterview,
    Ready,
}

impl FlowState {
    /// The plan check dominates: an unpaid account is `NoPlan` no matter
    /// what interviews exist.
    pub fn derive(has_paid_plan: bool, has_interview: bool) -> Self {
        if !has_paid_plan {
            FlowState::NoPlan
        } else if !has_interview {
            FlowState::PlanNoInterview
        } else {
            FlowState::Ready
        }
    }
}

/// The full derived picture handed back to the client. `state` drives the
/// route guard; the rest is context for the UI.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FlowStatus {
    pub state: FlowState,
    pub has_paid_plan: bool,
    pub has_interview: bool,
    pub has_interview_draft: bool,
    pub active_person_profile_id: Option<Uuid>,
}

impl FlowStatus {
    pub fn from_parts(
        has_paid_plan: bool,
        latest_interview_status: Option<InterviewStatus>,
        active_person_profile_id: Option<Uuid>,
    ) -> Self {
        let has_interview = latest_interview_status == Some(InterviewStatus::Sent);
        let has_interview_draft = latest_interview_status == Some(InterviewStatus::Draft);
        Self {
            state: FlowState::derive(has_paid_plan, has_interview),
            has_paid_plan,
            has_interview,
            has_interview_draft,
            active_person_profile_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteFamily {
    Payment,
    Interview,
    Dashboard,
}

const PAYMENT_PREFIXES: &[&str] = &["/payment"];
const INTERVIEW_PREFIXES: &[&str] = &["/interview", "/dashboard/interview"];
const DASHBOARD_PREFIXES: &[&str] = &["/dashboard"];

fn prefix_matches(path: &str, prefix: &str) -> bool {
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

impl RouteFamily {
    /// Interview is checked before dashboard so `/dashboard/interview`
    /// lands in the interview family.
    fn classify(path: &str) -> Option<Self> {
        if PAYMENT_PREFIXES.iter().any(|prefix| prefix_matches(path, prefix)) {
            Some(RouteFamily::Payment)
        } else if INTERVIEW_PREFIXES.iter().any(|prefix| prefix_matches(path, prefix)) {
            Some(RouteFamily::Interview)
        } else if DASHBOARD_PREFIXES.iter().any(|prefix| prefix_matches(path, prefix)) {
            Some(RouteFamily::Dashboard)
        } else {
            None
        }
    }
}

fn normalize_pathname(pathname: &str) -> &str {
    let end = pathname.find(['?', '#']).unwrap_or(pathname.len());
    let mut path = &pathname[..end];
    while path.len() > 1 && path.ends_with('/') {
        path = &path[..path.len() - 1];
    }
    path
}

/// Decides whether the current navigation must be redirected, and where.
/// `None` means stay. Paths outside the three route families are never
/// touched. Callers must hold off until the flow status has actually
/// loaded, otherwise users get bounced around on stale state.
pub fn resolve_flow_redirect_target(pathname: &str, flow_state: FlowState) -> Option<&'static str> {
    let path = normalize_pathname(pathname);

    match flow_state {
        FlowState::NoPlan => match RouteFamily::classify(path) {
            Some(RouteFamily::Payment) => None,
            Some(RouteFamily::Dashboard) if path == "/dashboard" => None,
            Some(RouteFamily::Dashboard) | Some(RouteFamily::Interview) => Some("/dashboard"),
            None => None,
        },
        FlowState::PlanNoInterview => match RouteFamily::classify(path) {
            Some(RouteFamily::Interview) => None,
            Some(RouteFamily::Dashboard) | Some(RouteFamily::Payment) => Some("/interview"),
            None => None,
        },
        FlowState::Ready => match RouteFamily::classify(path) {
            Some(RouteFamily::Payment) => Some("/dashboard"),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_covers_all_inputs() {
        assert_eq!(FlowState::derive(false, false), FlowState::NoPlan);
        assert_eq!(FlowState::derive(false, true), FlowState::NoPlan);
        assert_eq!(FlowState::derive(true, false), FlowState::PlanNoInterview);
        assert_eq!(FlowState::derive(true, true), FlowState::Ready);
    }

    #[test]
    fn status_flags_follow_latest_interview() {
        let status = FlowStatus::from_parts(true, Some(InterviewStatus::Sent), None);
        assert_eq!(status.state, FlowState::Ready);
        assert!(status.has_interview);
        assert!(!status.has_interview_draft);

        let status = FlowStatus::from_parts(true, Some(InterviewStatus::Draft), None);
        assert_eq!(status.state, FlowState::PlanNoInterview);
        assert!(!status.has_interview);
        assert!(status.has_interview_draft);

        let status = FlowStatus::from_parts(true, None, None);
        assert_eq!(status.state, FlowState::PlanNoInterview);
        assert!(!status.has_interview);
        assert!(!status.has_interview_draft);
    }

    #[test]
    fn a_draft_never_satisfies_the_gate_without_a_plan() {
        let status = FlowStatus::from_parts(false, Some(InterviewStatus::Sent), None);
        assert_eq!(status.state, FlowState::NoPlan);
    }

    #[test]
    fn no_plan_allows_dashboard_root_and_payment() {
        assert_eq!(resolve_flow_redirect_target("/dashboard", FlowState::NoPlan), None);
        assert_eq!(resolve_flow_redirect_target("/payment", FlowState::NoPlan), None);
        assert_eq!(resolve_flow_redirect_target("/payment/checkout", FlowState::NoPlan), None);
    }

    #[test]
    fn no_plan_pushes_everything_else_back_to_dashboard() {
        assert_eq!(
            resolve_flow_redirect_target("/dashboard/results", FlowState::NoPlan),
            Some("/dashboard")
        );
        assert_eq!(
            resolve_flow_redirect_target("/interview", FlowState::NoPlan),
            Some("/dashboard")
        );
        assert_eq!(
            resolve_flow_redirect_target("/dashboard/interview", FlowState::NoPlan),
            Some("/dashboard")
        );
    }

    #[test]
    fn plan_no_interview_forces_the_interview() {
        assert_eq!(
            resolve_flow_redirect_target("/dashboard", FlowState::PlanNoInterview),
            Some("/interview")
        );
        assert_eq!(
            resolve_flow_redirect_target("/payment", FlowState::PlanNoInterview),
            Some("/interview")
        );
        assert_eq!(resolve_flow_redirect_target("/interview", FlowState::PlanNoInterview), None);
        assert_eq!(
            resolve_flow_redirect_target("/interview/step/2", FlowState::PlanNoInterview),
            None
        );
        assert_eq!(
            resolve_flow_redirect_target("/dashboard/interview", FlowState::PlanNoInterview),
            None
        );
    }

    #[test]
    fn ready_only_blocks_payment_routes() {
        assert_eq!(
            resolve_flow_redirect_target("/payment", FlowState::Ready),
            Some("/dashboard")
        );
        assert_eq!(
            resolve_flow_redirect_target("/payment/success", FlowState::Ready),
            Some("/dashboard")
        );
        assert_eq!(resolve_flow_redirect_target("/dashboard", FlowState::Ready), None);
        assert_eq!(resolve_flow_redirect_target("/interview", FlowState::Ready), None);
    }

    #[test]
    fn query_strings_do_not_change_classification() {
        assert_eq!(resolve_flow_redirect_target("/dashboard?x=1", FlowState::NoPlan), None);
        assert_eq!(
            resolve_flow_redirect_target("/dashboard/results?tab=2", FlowState::NoPlan),
            Some("/dashboard")
        );
        assert_eq!(
            resolve_flow_redirect_target("/payment?package=basic", FlowState::Ready),
            Some("/dashboard")
        );
        assert_eq!(resolve_flow_redirect_target("/dashboard#section", FlowState::NoPlan), None);
    }

    #[test]
    fn trailing_slashes_are_normalized() {
        assert_eq!(resolve_flow_redirect_target("/dashboard/", FlowState::NoPlan), None);
        assert_eq!(
            resolve_flow_redirect_target("/interview/", FlowState::NoPlan),
            Some("/dashboard")
        );
    }

    #[test]
    fn unrelated_paths_are_left_alone() {
        for state in [FlowState::NoPlan, FlowState::PlanNoInterview, FlowState::Ready] {
            assert_eq!(resolve_flow_redirect_target("/settings", state), None);
            assert_eq!(resolve_flow_redirect_target("/", state), None);
            assert_eq!(resolve_flow_redirect_target("/dashboardless", state), None);
            assert_eq!(resolve_flow_redirect_target("/payments-history", state), None);
        }
    }
}
