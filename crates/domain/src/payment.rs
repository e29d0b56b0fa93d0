use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::{FromRow, Postgres};

use avatar_database::{text_enum, SqlxCrud, SqlxFilterQuery, SqlxSchema};

/// The packages offered on the payment step.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Package {
    #[default]
    Basic,
    Standard,
    Premium,
}

text_enum!(Package {
    Basic => "basic",
    Standard => "standard",
    Premium => "premium",
});

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Canceled,
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Canceled => "canceled",
});

/// One checkout attempt against the billing provider, keyed by the
/// provider's session id so the webhook can find it again.
#[derive(Debug, Serialize, Deserialize, Clone, Default, FromRow)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: Uuid,

    pub checkout_session_id: String,
    pub url: String,

    pub package: Package,
    pub amount_total: i64,
    pub currency: String,

    pub status: PaymentStatus,

    pub created_at: i64,
    pub updated_at: i64,
}

impl SqlxSchema for PaymentRecord {
    type Id = Uuid;

    const TABLE_NAME: &'static str = "payments";
    const COLUMNS: &'static [&'static str] = &[
        "id", "user_id", "checkout_session_id", "url", "package",
        "amount_total", "currency", "status", "created_at", "updated_at",
    ];
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "user_id", "checkout_session_id", "url", "package",
        "amount_total", "currency", "status",
    ];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS \"idx_payments_user_id\" ON \"payments\" (\"user_id\");",
        "CREATE INDEX IF NOT EXISTS \"idx_payments_checkout_session_id\" ON \"payments\" (\"checkout_session_id\");",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"CREATE TABLE IF NOT EXISTS "payments" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "user_id" UUID NOT NULL,
            "checkout_session_id" TEXT NOT NULL,
            "url" TEXT NOT NULL,
            "package" TEXT NOT NULL,
            "amount_total" BIGINT NOT NULL DEFAULT 0,
            "currency" TEXT NOT NULL DEFAULT '',
            "status" TEXT NOT NULL,
            "created_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now())),
            "updated_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now()))
        );"#.to_string()
    }
}

impl SqlxCrud for PaymentRecord {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        query
            .bind(self.user_id)
            .bind(self.checkout_session_id.clone())
            .bind(self.url.clone())
            .bind(self.package)
            .bind(self.amount_total)
            .bind(self.currency.clone())
            .bind(self.status.clone())
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        self.bind_insert(query)
    }
}

impl SqlxFilterQuery for PaymentRecord {}
