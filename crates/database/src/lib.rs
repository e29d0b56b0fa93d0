mod postgres_connect;
mod sqlx_postgres;
mod text_enum;

pub use sqlx_postgres::*;
