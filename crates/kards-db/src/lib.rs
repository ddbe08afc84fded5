pub mod models;
pub mod repositories;

use anyhow::Context;
use sqlx::{PgPool, Postgres, migrate::MigrateDatabase, postgres::PgPoolOptions};

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;

    Ok(pool)
}

/// Create the database if it does not exist yet. Call before [`create_pool`].
pub async fn ensure_database(database_url: &str) -> anyhow::Result<()> {
    if !Postgres::database_exists(database_url).await? {
        Postgres::create_database(database_url)
            .await
            .context("failed to create database")?;
    }

    Ok(())
}

/// Run the migrations bundled from this crate's `migrations/` folder.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!()
        .run(pool)
        .await
        .context("failed to run migrations")?;

    Ok(())
}
