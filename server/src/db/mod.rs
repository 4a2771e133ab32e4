// codcall_server/src/db/mod.rs

pub mod pg_store;
pub mod rows;

pub use pg_store::PgStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

const SCHEMA: &str = include_str!("../../schema.sql");

pub async fn connect(database_url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<PgPool, sqlx::Error> {
  PgPoolOptions::new()
    .max_connections(max_connections)
    .acquire_timeout(acquire_timeout)
    .connect(database_url)
    .await
}

/// Runs `schema.sql`. Every statement in it is idempotent.
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
  sqlx::raw_sql(SCHEMA).execute(pool).await?;
  Ok(())
}
