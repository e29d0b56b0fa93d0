mod admin;
mod billing;
mod flow;
mod interview;
mod misc;
mod profiles;
mod referral;
mod signup;

pub use admin::admin_routes;
pub use billing::billing_routes;
pub use flow::flow_routes;
pub use interview::interview_routes;
pub use misc::misc_routes;
pub use profiles::profile_routes;
pub use referral::referral_routes;
pub use signup::signup_routes;
