mod db;

pub mod catalog;
pub mod loyalty;
pub mod orders;
pub mod promos;
pub mod settings;
pub mod slots;

use std::env;

pub use db::SqliteDatabase;
use log::info;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::traits::OrderFlowError;

const SQLITE_DB_URL: &str = "sqlite://data/boba_store.db";

pub fn db_url() -> String {
    let result = env::var("BOS_DATABASE_URL").unwrap_or_else(|_| {
        info!("BOS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

/// Open a connection pool and bring the schema up to date.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, OrderFlowError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| OrderFlowError::DatabaseError(e.to_string()))?;
    Ok(pool)
}
