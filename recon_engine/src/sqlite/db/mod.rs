pub mod transactions;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new().max_connections(max_connections).connect(url).await
}
