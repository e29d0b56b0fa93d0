use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::{FromRow, Postgres};

use avatar_database::{SqlxCrud, SqlxFilterQuery, SqlxSchema};

/// A household member the account answers interviews for. The primary
/// profile is created at signup; accounts can add more later.
#[derive(Debug, Serialize, Deserialize, Clone, Default, FromRow)]
pub struct PersonProfile {
    pub id: Uuid,
    pub user_id: Uuid,

    pub name: String,
    pub is_primary: bool,

    pub created_at: i64,
    pub updated_at: i64,
}

impl PersonProfile {
    pub fn new(user_id: Uuid, name: String, is_primary: bool) -> Self {
        Self {
            id: Uuid::default(),
            user_id,
            name,
            is_primary,
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Resolves which person profile the flow computation should look at.
/// The caller-supplied pointer wins when it names one of the account's
/// profiles; otherwise the primary profile; otherwise the first one.
pub fn select_active_profile(profiles: &[PersonProfile], preferred: Option<Uuid>) -> Option<&PersonProfile> {
    if let Some(preferred_id) = preferred {
        if let Some(profile) = profiles.iter().find(|profile| profile.id == preferred_id) {
            return Some(profile);
        }
    }
    profiles
        .iter()
        .find(|profile| profile.is_primary)
        .or_else(|| profiles.first())
}

impl SqlxSchema for PersonProfile {
    type Id = Uuid;

    const TABLE_NAME: &'static str = "person_profiles";
    const COLUMNS: &'static [&'static str] = &[
        "id", "user_id", "name", "is_primary", "created_at", "updated_at",
    ];
    const INSERT_COLUMNS: &'static [&'static str] = &["user_id", "name", "is_primary"];
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS \"idx_person_profiles_user_id\" ON \"person_profiles\" (\"user_id\");",
    ];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"CREATE TABLE IF NOT EXISTS "person_profiles" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "user_id" UUID NOT NULL,
            "name" TEXT NOT NULL,
            "is_primary" BOOLEAN NOT NULL DEFAULT false,
            "created_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now())),
            "updated_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now()))
        );"#.to_string()
    }
}

impl SqlxCrud for PersonProfile {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        query
            .bind(self.user_id)
            .bind(self.name.clone())
            .bind(self.is_primary)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        self.bind_insert(query)
    }
}

impl SqlxFilterQuery for PersonProfile {}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: u128, is_primary: bool) -> PersonProfile {
        PersonProfile {
            id: Uuid::from_u128(id),
            user_id: Uuid::from_u128(1),
            name: format!("profile-{}", id),
            is_primary,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn explicit_pointer_wins() {
        let profiles = vec![profile(10, true), profile(11, false)];
        let active = select_active_profile(&profiles, Some(Uuid::from_u128(11))).unwrap();
        assert_eq!(active.id, Uuid::from_u128(11));
    }

    #[test]
    fn unknown_pointer_falls_back_to_primary() {
        let profiles = vec![profile(10, false), profile(11, true)];
        let active = select_active_profile(&profiles, Some(Uuid::from_u128(99))).unwrap();
        assert_eq!(active.id, Uuid::from_u128(11));
    }

    #[test]
    fn no_primary_falls_back_to_first() {
        let profiles = vec![profile(10, false), profile(11, false)];
        let active = select_active_profile(&profiles, None).unwrap();
        assert_eq!(active.id, Uuid::from_u128(10));
    }

    #[test]
    fn empty_list_selects_nothing() {
        assert!(select_active_profile(&[], None).is_none());
        assert!(select_active_profile(&[], Some(Uuid::from_u128(5))).is_none());
    }
}
