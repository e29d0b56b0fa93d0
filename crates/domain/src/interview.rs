use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::{Json, Uuid};
use sqlx::{FromRow, Postgres};

use avatar_database::{text_enum, SqlxCrud, SqlxFilterQuery, SqlxSchema};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    #[default]
    Draft,
    Sent,
}

text_enum!(InterviewStatus {
    Draft => "draft",
    Sent => "sent",
});

/// The nutrition interview for one person profile. Only a `sent`
/// interview satisfies the onboarding gate; a draft merely unlocks the
/// "continue where you left off" affordance.
#[derive(Debug, Serialize, Deserialize, Clone, Default, FromRow)]
pub struct NutritionInterview {
    pub id: Uuid,
    pub person_profile_id: Uuid,

    pub answers: Json<serde_json::Value>,
    pub status: InterviewStatus,

    pub created_at: i64,
    pub updated_at: i64,
}

impl NutritionInterview {
    pub fn draft(person_profile_id: Uuid, answers: serde_json::Value) -> Self {
        Self {
            id: Uuid::default(),
            person_profile_id,
            answers: Json(answers),
            status: InterviewStatus::Draft,
            created_at: 0,
            updated_at: 0,
        }
    }
}

impl SqlxSchema for NutritionInterview {
    type Id = Uuid;

    const TABLE_NAME: &'static str = "nutrition_interviews";
    const COLUMNS: &'static [&'static str] = &[
        "id", "person_profile_id", "answers", "status", "created_at", "updated_at",
    ];
    const INSERT_COLUMNS: &'static [&'static str] = &["person_profile_id", "answers", "status"];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS \"idx_nutrition_interviews_person_profile_id\" ON \"nutrition_interviews\" (\"person_profile_id\");",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"CREATE TABLE IF NOT EXISTS "nutrition_interviews" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "person_profile_id" UUID NOT NULL,
            "answers" JSONB NOT NULL DEFAULT '{}',
            "status" TEXT NOT NULL,
            "created_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now())),
            "updated_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now()))
        );"#.to_string()
    }
}

impl SqlxCrud for NutritionInterview {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        query
            .bind(self.person_profile_id)
            .bind(self.answers.clone())
            .bind(self.status.clone())
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        self.bind_insert(query)
    }
}

impl SqlxFilterQuery for NutritionInterview {}
