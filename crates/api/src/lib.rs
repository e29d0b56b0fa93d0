mod env;
mod global_state;
mod middleware;
mod response;
mod utils;
mod routes;

pub use routes::{
    admin_routes,
    billing_routes,
    flow_routes,
    interview_routes,
    misc_routes,
    profile_routes,
    referral_routes,
    signup_routes,
};

pub use env::ApiServerEnv;
pub use global_state::GlobalState;
pub use middleware::{admin_only, authenticate, ensure_profile};
pub use response::{AppError, AppSuccess};
pub use utils::setup_tracing;
