mod codes;
mod flow;
mod interview;
mod notification;
mod patient;
mod payment;
mod person_profile;
mod profile;
mod referral;

pub use codes::{generate_one_time_password, generate_referral_code, ONE_TIME_PASSWORD_LENGTH, REFERRAL_CODE_LENGTH};
pub use flow::{resolve_flow_redirect_target, FlowState, FlowStatus};
pub use interview::{InterviewStatus, NutritionInterview};
pub use notification::{AdminNotification, NotificationEvent};
pub use patient::{is_active_subscription_status, Patient, ACTIVE_SUBSCRIPTION_STATUSES};
pub use payment::{Package, PaymentRecord, PaymentStatus};
pub use person_profile::{select_active_profile, PersonProfile};
pub use profile::{Profile, ProfileRole};
pub use referral::{full_name, verify_referral_claim, Referral, ReferralStatus, RepairError, FALLBACK_REFERRED_NAME};
