use avatar_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxSchema};
use sqlx::postgres::PgArguments;
use sqlx::types::Uuid;
use sqlx::{FromRow, Postgres};

#[derive(Debug, Clone, FromRow)]
struct Widget {
    id: Uuid,
    name: String,
    owner_id: Uuid,
    created_at: i64,
    updated_at: i64,
}

impl SqlxSchema for Widget {
    type Id = Uuid;

    const TABLE_NAME: &'static str = "widgets";
    const COLUMNS: &'static [&'static str] = &["id", "name", "owner_id", "created_at", "updated_at"];
    const INSERT_COLUMNS: &'static [&'static str] = &["name", "owner_id"];
    const CONFLICT_TARGET: &'static [&'static str] = &["owner_id"];

    fn get_id_value(&self) -> Uuid {
        self.id
    }

    fn create_table_sql() -> String {
        r#"CREATE TABLE IF NOT EXISTS "widgets" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "name" TEXT NOT NULL,
            "owner_id" UUID NOT NULL UNIQUE,
            "created_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now())),
            "updated_at" BIGINT NOT NULL DEFAULT floor(extract(epoch from now()))
        );"#.to_string()
    }
}

impl SqlxCrud for Widget {
    fn bind_insert<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        query.bind(self.name.clone()).bind(self.owner_id)
    }

    fn bind_update<'q>(
        &self,
        query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments> {
        query.bind(self.name.clone()).bind(self.owner_id)
    }
}

#[test]
fn insert_sql_skips_id_and_timestamps() {
    assert_eq!(
        Widget::insert_sql(),
        "INSERT INTO \"widgets\" (\"name\", \"owner_id\") VALUES ($1, $2) \
         RETURNING \"id\", \"name\", \"owner_id\", \"created_at\", \"updated_at\""
    );
}

#[test]
fn insert_or_ignore_sql_names_the_conflict_target() {
    let sql = Widget::insert_or_ignore_sql();
    assert!(sql.contains("ON CONFLICT (\"owner_id\") DO NOTHING"), "got: {}", sql);
    assert!(sql.ends_with("RETURNING \"id\", \"name\", \"owner_id\", \"created_at\", \"updated_at\""));
}

#[test]
fn update_sql_binds_id_last() {
    assert_eq!(
        Widget::update_by_id_sql(),
        "UPDATE \"widgets\" SET \"name\" = $1, \"owner_id\" = $2 WHERE \"id\" = $3 \
         RETURNING \"id\", \"name\", \"owner_id\", \"created_at\", \"updated_at\""
    );
}

#[test]
fn select_by_id_sql_lists_columns_explicitly() {
    assert_eq!(
        Widget::select_by_id_sql(),
        "SELECT \"id\", \"name\", \"owner_id\", \"created_at\", \"updated_at\" FROM \"widgets\" WHERE \"id\" = $1"
    );
}

#[test]
fn criteria_renders_numbered_placeholders() {
    let criteria = QueryCriteria::new()
        .add_valued_filter("name", "=", "scale".to_string())
        .add_valued_filter("owner_id", "=", Uuid::nil());

    let mut args = PgArguments::default();
    let where_clause = criteria.build_where_clause(&mut args).unwrap();
    assert_eq!(where_clause, " WHERE \"name\" = $1 AND \"owner_id\" = $2");
}

#[test]
fn criteria_supports_valueless_operators() {
    let criteria = QueryCriteria::new().add_filter::<String>("deleted_at", "IS NULL", None);

    let mut args = PgArguments::default();
    let where_clause = criteria.build_where_clause(&mut args).unwrap();
    assert_eq!(where_clause, " WHERE \"deleted_at\" IS NULL");
}

#[test]
fn criteria_suffix_orders_then_limits() {
    let criteria = QueryCriteria::new()
        .order_by("created_at", OrderDirection::Desc)
        .limit(20)
        .offset(40);

    assert_eq!(criteria.build_suffix(), " ORDER BY \"created_at\" DESC LIMIT 20 OFFSET 40");
}

#[test]
fn empty_criteria_renders_nothing() {
    let criteria = QueryCriteria::new();
    let mut args = PgArguments::default();
    assert_eq!(criteria.build_where_clause(&mut args).unwrap(), "");
    assert_eq!(criteria.build_suffix(), "");
}

#[test]
fn trigger_sql_is_per_table() {
    let sql = Widget::trigger_sql();
    assert!(sql.contains("DROP TRIGGER IF EXISTS set_updated_at_widgets"));
    assert!(sql.contains("CREATE TRIGGER set_updated_at_widgets BEFORE UPDATE ON \"widgets\""));
}
