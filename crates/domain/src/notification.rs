use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::{FromRow, Postgres};

use avatar_database::{text_enum, SqlxCrud, SqlxFilterQuery, SqlxSchema};

/// Closed set of events the admin feed dispatches over. Adding a variant
/// forces every `match` on this type to be revisited.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    PatientQuestion,
    SupportTicket,
    InterviewSent,
    #[default]
    NewRegistration,
}

text_enum!(NotificationEvent {
    PatientQuestion => "patient_question",
    SupportTicket => "support_ticket",
    InterviewSent => "interview_sent",
    NewRegistration => "new_registration",
});

#[derive(Debug, Serialize, Deserialize, Clone, Default, FromRow)]
pub struct AdminNotification {
    pub id: Uuid,

    pub event: NotificationEvent,

    pub user_id: Option<Uuid>,
    pub person_profile_id: Option<Uuid>,
    pub content: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl AdminNotification {
    pub fn new_registration(user_id: Uuid, name: String) -> Self {
        Self {
            id: Uuid::default(),
            event: NotificationEvent::NewRegistration,
            user_id: Some(user_id),
            person_profile_id: None,
            content: Some(name),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn interview_sent(user_id: Uuid, person_profile_id: Uuid) -> Self {
        Self {
            id: Uuid::default(),
            event: NotificationEvent::InterviewSent,
            user_id: Some(user_id),
            person_profile_id: Some(person_profile_id),
            content: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn patient_question(user_id: Uuid, message: String) -> Self {
        Self {
            id: Uuid::default(),
            event: NotificationEvent::PatientQuestion,
            user_id: Some(user_id),
            person_profile_id: None,
            content: Some(message),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn support_ticket(user_id: Uuid, message: String) -> Self {
        Self {
            id: Uuid::default(),
            event: NotificationEvent::SupportTicket,
            user_id: Some(user_id),
            person_profile_id: None,
            content: Some(message),
            created_at: 0,
            updated_at: 0,
        }
    }
}

impl SqlxSchema for AdminNotification {
    type Id = Uuid;

    const TABLE_NAME: &'static str = "admin_notifications";
    const COLUMNS: &'static [&'static str] = &[
        "id", "event", "user_id", "person_profile_id", "content", "created_at", "updated_at",
    ];
    const INSERT_COLUMNS: &'static [&'static str] = &["event", "user_id", "person_profile_id", "content"];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS \"idx_admin_notifications_created_at\" ON \"admin_notifications\" (\"created_at\");",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"CREATE TABLE IF NOT EXISTS "admin_notifications" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "event" TEXT NOT NULL,
            "user_id" UUID,
            "person_profile_id" UUID,
            "content" TEXT,
            "created_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now())),
            "updated_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now()))
        );"#.to_string()
    }
}

impl SqlxCrud for AdminNotification {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        query
            .bind(self.event.clone())
            .bind(self.user_id)
            .bind(self.person_profile_id)
            .bind(self.content.clone())
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        self.bind_insert(query)
    }
}

impl SqlxFilterQuery for AdminNotification {}
