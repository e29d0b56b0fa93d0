use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::{FromRow, Postgres};

use avatar_database::{text_enum, SqlxCrud, SqlxFilterQuery, SqlxSchema};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    Admin,
    #[default]
    Patient,
}

text_enum!(ProfileRole {
    Admin => "admin",
    Patient => "patient",
});

/// One-to-one companion of an identity-provider account. Carries the
/// account's own referral code; `referral_code` stays nullable because
/// accounts provisioned before the referral program have none until
/// backfilled.
#[derive(Debug, Serialize, Deserialize, Clone, Default, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,

    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,

    pub referral_code: Option<String>,
    pub role: ProfileRole,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Profile {
    pub fn new_patient(
        user_id: Uuid,
        email: String,
        first_name: String,
        last_name: String,
        phone: Option<String>,
        referral_code: String,
    ) -> Self {
        Self {
            id: Uuid::default(),
            user_id,
            email,
            first_name,
            last_name,
            phone,
            avatar_url: None,
            referral_code: Some(referral_code),
            role: ProfileRole::Patient,
            created_at: 0,
            updated_at: 0,
        }
    }
}

impl SqlxSchema for Profile {
    type Id = Uuid;

    const TABLE_NAME: &'static str = "profiles";
    const COLUMNS: &'static [&'static str] = &[
        "id", "user_id", "email", "first_name", "last_name", "phone",
        "avatar_url", "referral_code", "role", "created_at", "updated_at",
    ];
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "user_id", "email", "first_name", "last_name", "phone",
        "avatar_url", "referral_code", "role",
    ];
    const CONFLICT_TARGET: &'static [&'static str] = &["user_id"];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS \"idx_profiles_email\" ON \"profiles\" (\"email\");",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"CREATE TABLE IF NOT EXISTS "profiles" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "user_id" UUID NOT NULL UNIQUE,
            "email" TEXT NOT NULL,
            "first_name" TEXT NOT NULL,
            "last_name" TEXT NOT NULL,
            "phone" TEXT,
            "avatar_url" TEXT,
            "referral_code" TEXT UNIQUE,
            "role" TEXT NOT NULL,
            "created_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now())),
            "updated_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now()))
        );"#.to_string()
    }
}

impl SqlxCrud for Profile {
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
            .bind(self.avatar_url.clone())
            .bind(self.referral_code.clone())
            .bind(self.role.clone())
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        self.bind_insert(query)
    }
}

impl SqlxFilterQuery for Profile {}
