use sqlx::{FromRow, Postgres, Error as SqlxError, postgres::PgArguments, Executor};

/// Trait to define the schema of a database object for PostgreSQL.
///
/// Implementations list their columns once; every SQL string is derived
/// from those consts. The primary key is DB-generated (`gen_random_uuid()`),
/// and `created_at` / `updated_at` are owned by the database (defaults plus
/// the `set_updated_at_unix_timestamp()` trigger), so neither appears in
/// `INSERT_COLUMNS`.
pub trait SqlxSchema: Send + Sync + Unpin + Clone + std::fmt::Debug + for<'r> FromRow<'r, sqlx::postgres::PgRow> {
    /// The type of the primary key for this database object.
    type Id: Send + Sync + for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Clone + 'static;

    const TABLE_NAME: &'static str;
    const ID_COLUMN_NAME: &'static str = "id";
    /// All columns, in `FromRow` order.
    const COLUMNS: &'static [&'static str];
    /// Columns bound on INSERT/UPDATE (no pk, no timestamps).
    const INSERT_COLUMNS: &'static [&'static str];
    /// Conflict target for `create_or_ignore`; empty means a bare
    /// `ON CONFLICT DO NOTHING`.
    const CONFLICT_TARGET: &'static [&'static str] = &[];
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn id_column_name() -> &'static str { Self::ID_COLUMN_NAME }
    fn table_name() -> &'static str { Self::TABLE_NAME }
    fn columns() -> &'static [&'static str] { Self::COLUMNS }
    fn indexes_sql() -> &'static [&'static str] { Self::INDEXES_SQL }

    /// Retrieves the value of the primary key for an instance of the object.
    fn get_id_value(&self) -> Self::Id;

    /// Generates the SQL query string for creating the table.
    fn create_table_sql() -> String;

    fn drop_table_sql() -> String {
        format!("DROP TABLE IF EXISTS \"{}\" CASCADE;", Self::TABLE_NAME)
    }

    fn select_columns_sql() -> String {
        Self::COLUMNS
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn select_all_sql() -> String {
        format!("SELECT {} FROM \"{}\"", Self::select_columns_sql(), Self::TABLE_NAME)
    }

    fn select_by_id_sql() -> String {
        format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = $1",
            Self::select_columns_sql(), Self::TABLE_NAME, Self::ID_COLUMN_NAME
        )
    }

    fn insert_sql() -> String {
        let cols = Self::INSERT_COLUMNS
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=Self::INSERT_COLUMNS.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING {}",
            Self::TABLE_NAME, cols, placeholders, Self::select_columns_sql()
        )
    }

    fn insert_or_ignore_sql() -> String {
        let cols = Self::INSERT_COLUMNS
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=Self::INSERT_COLUMNS.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let conflict = if Self::CONFLICT_TARGET.is_empty() {
            "ON CONFLICT DO NOTHING".to_string()
        } else {
            let target = Self::CONFLICT_TARGET
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", ");
            format!("ON CONFLICT ({}) DO NOTHING", target)
        };
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) {} RETURNING {}",
            Self::TABLE_NAME, cols, placeholders, conflict, Self::select_columns_sql()
        )
    }

    fn update_by_id_sql() -> String {
        let assignments = Self::INSERT_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, c)| format!("\"{}\" = ${}", c, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ${} RETURNING {}",
            Self::TABLE_NAME,
            assignments,
            Self::ID_COLUMN_NAME,
            Self::INSERT_COLUMNS.len() + 1,
            Self::select_columns_sql()
        )
    }

    fn delete_by_id_sql() -> String {
        format!("DELETE FROM \"{}\" WHERE \"{}\" = $1", Self::TABLE_NAME, Self::ID_COLUMN_NAME)
    }

    fn trigger_sql() -> String {
        format!(
            "DROP TRIGGER IF EXISTS set_updated_at_{table} ON \"{table}\"; CREATE TRIGGER set_updated_at_{table} BEFORE UPDATE ON \"{table}\" FOR EACH ROW EXECUTE PROCEDURE set_updated_at_unix_timestamp();",
            table = Self::TABLE_NAME
        )
    }
}

/// Trait for CRUD (Create, Read, Update, Delete) operations for PostgreSQL.
#[async_trait::async_trait]
pub trait SqlxCrud: SqlxSchema + Sized {
    /// Binds the struct fields to an insert query, in `INSERT_COLUMNS` order.
    fn bind_insert<'q>(&self, query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>)
        -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>;

    /// Binds the struct fields to an update query; the ID is bound last by
    /// the default `update` implementation.
    fn bind_update<'q>(&self, query: sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>)
        -> sqlx::query::QueryAs<'q, Postgres, Self, PgArguments>;

    /// Creates a new record in the database.
    async fn create<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let sql = Self::insert_sql();
        self.bind_insert(sqlx::query_as(&sql)).fetch_one(executor).await
    }

    /// Creates a new record unless it collides with the conflict target;
    /// `None` means the row already existed and nothing was written.
    async fn create_or_ignore<'e, E>(self, executor: E) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let sql = Self::insert_or_ignore_sql();
        self.bind_insert(sqlx::query_as(&sql)).fetch_optional(executor).await
    }

    /// Finds a record by its primary key.
    async fn find_by_id<'e, E>(id: Self::Id, executor: E) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let sql = Self::select_by_id_sql();
        sqlx::query_as(&sql).bind(id).fetch_optional(executor).await
    }

    /// Updates an existing record in the database (identified by its primary key).
    async fn update<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let sql = Self::update_by_id_sql();
        let id = self.get_id_value();
        self.bind_update(sqlx::query_as(&sql)).bind(id).fetch_one(executor).await
    }

    /// Deletes a record from the database by its primary key.
    async fn delete<'e, E>(self, executor: E) -> Result<u64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let sql = Self::delete_by_id_sql();
        sqlx::query(&sql)
            .bind(self.get_id_value())
            .execute(executor)
            .await
            .map(|result| result.rows_affected())
    }

    /// Retrieves all records from the table.
    async fn find_all<'e, E>(executor: E) -> Result<Vec<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let sql = Self::select_all_sql();
        sqlx::query_as(&sql).fetch_all(executor).await
    }
}

/// Specifies the direction for ordering query results.
#[derive(Debug, Clone, Copy)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

// --- Filtering Structures and Trait ---

/// A trait to allow for boxing of different types that can be encoded as
/// sqlx arguments. Helper for `QueryCriteria` to store values of different
/// types.
pub trait AsSqlxArg: Send + Sync {
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError>;
}

impl<T> AsSqlxArg for T
where
    T: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
{
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError> {
        use sqlx::Arguments;
        args.add(self.clone()).map_err(SqlxError::Encode)
    }
}

/// Represents a single filter condition for a database query.
pub struct FilterCondition {
    pub column: &'static str,
    pub operator: &'static str,
    /// Holds the value for the condition's placeholder, if any.
    pub value: Option<Box<dyn AsSqlxArg>>,
}

/// Represents the complete criteria for a filtered database query.
#[derive(Default)]
pub struct QueryCriteria {
    pub conditions: Vec<FilterCondition>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order_by: Vec<(&'static str, OrderDirection)>,
}

impl QueryCriteria {
    /// Creates a new, empty `QueryCriteria` builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter condition that may or may not have a value.
    pub fn add_filter<V>(mut self, column: &'static str, operator: &'static str, value: Option<V>) -> Self
    where
        V: for<'a> ::sqlx::Encode<'a, Postgres> + ::sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.conditions.push(FilterCondition {
            column,
            operator,
            value: value.map(|v| Box::new(v) as Box<dyn AsSqlxArg>),
        });
        self
    }

    /// A convenience method for `add_filter` that requires a value.
    pub fn add_valued_filter<V>(self, column: &'static str, operator: &'static str, value: V) -> Self
    where
        V: for<'a> ::sqlx::Encode<'a, Postgres> + ::sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.add_filter(column, operator, Some(value))
    }

    /// Sets the LIMIT for the query.
    pub fn limit(mut self, limit_val: i64) -> Self {
        self.limit = Some(limit_val);
        self
    }

    /// Sets the OFFSET for the query.
    pub fn offset(mut self, offset_val: i64) -> Self {
        self.offset = Some(offset_val);
        self
    }

    /// Adds an ORDER BY clause.
    pub fn order_by(mut self, column: &'static str, direction: OrderDirection) -> Self {
        self.order_by.push((column, direction));
        self
    }

    /// Renders the WHERE clause (with a leading space) and pushes the
    /// condition values onto `args`. Placeholders are numbered from 1.
    pub fn build_where_clause(&self, args: &mut PgArguments) -> Result<String, SqlxError> {
        if self.conditions.is_empty() {
            return Ok(String::new());
        }

        let mut parts = Vec::with_capacity(self.conditions.len());
        let mut placeholder = 0usize;
        for condition in &self.conditions {
            match &condition.value {
                Some(value) => {
                    placeholder += 1;
                    value.add_to_args(args)?;
                    parts.push(format!("\"{}\" {} ${}", condition.column, condition.operator, placeholder));
                }
                None => {
                    parts.push(format!("\"{}\" {}", condition.column, condition.operator));
                }
            }
        }
        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }

    /// Renders ORDER BY / LIMIT / OFFSET (with a leading space when present).
    pub fn build_suffix(&self) -> String {
        let mut suffix = String::new();
        if !self.order_by.is_empty() {
            let order = self.order_by
                .iter()
                .map(|(column, direction)| format!("\"{}\" {}", column, direction.as_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            suffix.push_str(&format!(" ORDER BY {}", order));
        }
        if let Some(limit) = self.limit {
            suffix.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            suffix.push_str(&format!(" OFFSET {}", offset));
        }
        suffix
    }
}

/// Trait for finding records based on dynamic filter criteria.
#[async_trait::async_trait]
pub trait SqlxFilterQuery: SqlxSchema + Sized {
    /// Finds records based on the provided criteria.
    async fn find_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<Vec<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let mut args = PgArguments::default();
        let where_clause = criteria.build_where_clause(&mut args)?;
        let sql = format!("{}{}{}", Self::select_all_sql(), where_clause, criteria.build_suffix());
        sqlx::query_as_with::<Postgres, Self, PgArguments>(&sql, args)
            .fetch_all(executor)
            .await
    }

    /// Finds a single optional record based on the provided criteria.
    /// If multiple records match, the first one returned wins; add ordering
    /// to the criteria for deterministic results.
    async fn find_one_by_criteria<'e, E>(
        mut criteria: QueryCriteria,
        executor: E,
    ) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        if criteria.limit.is_none() {
            criteria = criteria.limit(1);
        };
        let mut results = Self::find_by_criteria(criteria, executor).await?;
        Ok(results.pop())
    }

    /// Deletes records based on the provided criteria.
    async fn delete_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<u64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let mut args = PgArguments::default();
        let where_clause = criteria.build_where_clause(&mut args)?;
        let sql = format!("DELETE FROM \"{}\"{}", Self::TABLE_NAME, where_clause);
        sqlx::query_with(&sql, args)
            .execute(executor)
            .await
            .map(|result| result.rows_affected())
    }
}

/// True when the error is a Postgres unique-constraint violation (23505).
/// Inserts racing on the same key land here instead of in a
/// check-then-insert window.
pub fn is_unique_violation(error: &SqlxError) -> bool {
    match error {
        SqlxError::Database(db_error) => db_error.code().as_deref() == Some("23505"),
        _ => false,
    }
}
