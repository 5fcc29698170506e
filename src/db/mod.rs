pub mod alert_repo;
pub mod ledger;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub use alert_repo::PgAlertStore;
pub use ledger::DedupLedger;

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
