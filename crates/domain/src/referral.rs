use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::{FromRow, Postgres};

use avatar_common::get_current_timestamp;
use avatar_database::{text_enum, SqlxCrud, SqlxFilterQuery, SqlxSchema};

/// Placeholder shown for referred accounts whose signup metadata carried
/// no usable name.
pub const FALLBACK_REFERRED_NAME: &str = "Użytkownik";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    #[default]
    Pending,
    Active,
}

text_enum!(ReferralStatus {
    Pending => "pending",
    Active => "active",
});

/// One attribution edge: who brought whom. `referred_user_id` is unique at
/// the database level, so a referred account can be the target of at most
/// one referral no matter how many writers race.
#[derive(Debug, Serialize, Deserialize, Clone, Default, FromRow)]
pub struct Referral {
    pub id: Uuid,

    pub referrer_user_id: Uuid,
    pub referrer_code: String,

    pub referred_user_id: Uuid,
    pub referred_email: String,
    pub referred_name: String,

    pub status: ReferralStatus,
    pub activated_at: Option<i64>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Referral {
    pub fn pending(
        referrer_user_id: Uuid,
        referrer_code: String,
        referred_user_id: Uuid,
        referred_email: String,
        referred_name: String,
    ) -> Self {
        Self {
            id: Uuid::default(),
            referrer_user_id,
            referrer_code,
            referred_user_id,
            referred_email,
            referred_name,
            status: ReferralStatus::Pending,
            activated_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Marks the edge active, e.g. when the referred account pays for the
    /// first time. Idempotent: an already-active edge keeps its original
    /// activation timestamp.
    pub fn activate(&mut self) -> bool {
        if self.status == ReferralStatus::Active {
            return false;
        }
        self.status = ReferralStatus::Active;
        self.activated_at = Some(get_current_timestamp());
        true
    }
}

impl SqlxSchema for Referral {
    type Id = Uuid;

    const TABLE_NAME: &'static str = "referrals";
    const COLUMNS: &'static [&'static str] = &[
        "id", "referrer_user_id", "referrer_code", "referred_user_id",
        "referred_email", "referred_name", "status", "activated_at",
        "created_at", "updated_at",
    ];
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "referrer_user_id", "referrer_code", "referred_user_id",
        "referred_email", "referred_name", "status", "activated_at",
    ];
    const CONFLICT_TARGET: &'static [&'static str] = &["referred_user_id"];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS \"idx_referrals_referrer_user_id\" ON \"referrals\" (\"referrer_user_id\");",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"CREATE TABLE IF NOT EXISTS "referrals" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "referrer_user_id" UUID NOT NULL,
            "referrer_code" TEXT NOT NULL,
            "referred_user_id" UUID NOT NULL UNIQUE,
            "referred_email" TEXT NOT NULL,
            "referred_name" TEXT NOT NULL,
            "status" TEXT NOT NULL,
            "activated_at" BIGINT,
            "created_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now())),
            "updated_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now()))
        );"#.to_string()
    }
}

impl SqlxCrud for Referral {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        query
            .bind(self.referrer_user_id)
            .bind(self.referrer_code.clone())
            .bind(self.referred_user_id)
            .bind(self.referred_email.clone())
            .bind(self.referred_name.clone())
            .bind(self.status.clone())
            .bind(self.activated_at)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        self.bind_insert(query)
    }
}

impl SqlxFilterQuery for Referral {}

/// Failure taxonomy of the user-facing repair flow. Unlike the signup
/// path, every one of these is surfaced to the caller verbatim.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RepairError {
    #[error("You don't have a referral code yet")]
    NoReferralCode,
    #[error("User not found")]
    UserNotFound,
    #[error("This person did not sign up via your referral link")]
    NotYourReferral,
    #[error("Referral already exists")]
    AlreadyExists,
}

/// The core correctness guard of the repair flow: the referred account's
/// signup metadata must name the caller's own code. Without this check a
/// referrer could claim any account they know the email of.
pub fn verify_referral_claim(caller_code: &str, recorded_referred_by: Option<&str>) -> Result<(), RepairError> {
    match recorded_referred_by {
        Some(recorded) if recorded.trim() == caller_code.trim() => Ok(()),
        _ => Err(RepairError::NotYourReferral),
    }
}

/// Joins first/last name metadata into a display name, falling back to the
/// generic placeholder when both are missing.
pub fn full_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    let joined = [first_name, last_name]
        .iter()
        .filter_map(|part| part.map(str::trim))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if joined.is_empty() {
        FALLBACK_REFERRED_NAME.to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_accepts_exact_code_match() {
        assert_eq!(verify_referral_claim("ABC12345", Some("ABC12345")), Ok(()));
        assert_eq!(verify_referral_claim("ABC12345", Some("  ABC12345  ")), Ok(()));
    }

    #[test]
    fn claim_rejects_foreign_or_absent_code() {
        assert_eq!(
            verify_referral_claim("ABC12345", Some("ZZZ99999")),
            Err(RepairError::NotYourReferral)
        );
        assert_eq!(
            verify_referral_claim("ABC12345", None),
            Err(RepairError::NotYourReferral)
        );
    }

    #[test]
    fn claim_is_case_sensitive() {
        assert_eq!(
            verify_referral_claim("ABC12345", Some("abc12345")),
            Err(RepairError::NotYourReferral)
        );
    }

    #[test]
    fn full_name_joins_and_falls_back() {
        assert_eq!(full_name(Some("Anna"), Some("Nowak")), "Anna Nowak");
        assert_eq!(full_name(Some("Anna"), None), "Anna");
        assert_eq!(full_name(None, Some("  Nowak ")), "Nowak");
        assert_eq!(full_name(Some("  "), None), FALLBACK_REFERRED_NAME);
        assert_eq!(full_name(None, None), FALLBACK_REFERRED_NAME);
    }

    #[test]
    fn activation_is_idempotent() {
        let mut referral = Referral::pending(
            Uuid::default(),
            "ABC12345".to_string(),
            Uuid::default(),
            "kasia@example.com".to_string(),
            "Kasia Kowalska".to_string(),
        );
        assert_eq!(referral.status, ReferralStatus::Pending);
        assert!(referral.activate());
        assert_eq!(referral.status, ReferralStatus::Active);
        let first_activation = referral.activated_at;
        assert!(first_activation.is_some());

        assert!(!referral.activate());
        assert_eq!(referral.activated_at, first_activation);
    }

    #[test]
    fn repair_errors_render_user_facing_messages() {
        assert_eq!(RepairError::NoReferralCode.to_string(), "You don't have a referral code yet");
        assert_eq!(RepairError::UserNotFound.to_string(), "User not found");
        assert_eq!(
            RepairError::NotYourReferral.to_string(),
            "This person did not sign up via your referral link"
        );
        assert_eq!(RepairError::AlreadyExists.to_string(), "Referral already exists");
    }
}
