use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::{FromRow, Postgres};

use avatar_database::{SqlxCrud, SqlxFilterQuery, SqlxSchema};

/// `subscription_status` is free text written by the billing integration
/// and, historically, by hand. These spellings all mean "paying".
pub const ACTIVE_SUBSCRIPTION_STATUSES: &[&str] = &["aktywna", "active", "paid"];

pub fn is_active_subscription_status(status: Option<&str>) -> bool {
    match status {
        Some(status) => {
            let normalized = status.trim().to_lowercase();
            ACTIVE_SUBSCRIPTION_STATUSES.iter().any(|active| *active == normalized)
        }
        None => false,
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub user_id: Uuid,

    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,

    pub subscription_status: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Patient {
    pub fn new(user_id: Uuid, email: String, first_name: Option<String>, last_name: Option<String>, phone: Option<String>) -> Self {
        Self {
            id: Uuid::default(),
            user_id,
            email,
            first_name,
            last_name,
            phone,
            subscription_status: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn has_active_subscription(&self) -> bool {
        is_active_subscription_status(self.subscription_status.as_deref())
    }
}

impl SqlxSchema for Patient {
    type Id = Uuid;

    const TABLE_NAME: &'static str = "patients";
    const COLUMNS: &'static [&'static str] = &[
        "id", "user_id", "email", "first_name", "last_name", "phone",
        "subscription_status", "created_at", "updated_at",
    ];
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "user_id", "email", "first_name", "last_name", "phone", "subscription_status",
    ];
    const CONFLICT_TARGET: &'static [&'static str] = &["user_id"];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS \"idx_patients_email\" ON \"patients\" (\"email\");",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"CREATE TABLE IF NOT EXISTS "patients" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "user_id" UUID NOT NULL UNIQUE,
            "email" TEXT NOT NULL,
            "first_name" TEXT,
            "last_name" TEXT,
            "phone" TEXT,
            "subscription_status" TEXT,
            "created_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now())),
            "updated_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now()))
        );"#.to_string()
    }
}

impl SqlxCrud for Patient {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        query
            .bind(self.user_id)
            .bind(self.email.clone())
            .bind(self.first_name.clone())
            .bind(self.last_name.clone())
            .bind(self.phone.clone())
            .bind(self.subscription_status.clone())
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        self.bind_insert(query)
    }
}

impl SqlxFilterQuery for Patient {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_every_active_synonym() {
        for status in ["aktywna", "active", "paid"] {
            assert!(is_active_subscription_status(Some(status)), "{} should be active", status);
        }
    }

    #[test]
    fn normalization_ignores_case_and_whitespace() {
        assert!(is_active_subscription_status(Some("Aktywna")));
        assert!(is_active_subscription_status(Some("  ACTIVE ")));
        assert!(is_active_subscription_status(Some("Paid")));
    }

    #[test]
    fn everything_else_is_inactive() {
        assert!(!is_active_subscription_status(Some("canceled")));
        assert!(!is_active_subscription_status(Some("trial")));
        assert!(!is_active_subscription_status(Some("")));
        assert!(!is_active_subscription_status(None));
    }

    #[test]
    fn patient_reads_its_own_status() {
        let mut patient = Patient::new(Uuid::default(), "jan@example.com".to_string(), None, None, None);
        assert!(!patient.has_active_subscription());
        patient.subscription_status = Some("aktywna".to_string());
        assert!(patient.has_active_subscription());
    }
}
