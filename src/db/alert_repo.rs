use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::SinkError;
use crate::models::AlertRecord;
use crate::services::dispatcher::AlertStore;

/// Insert an alert row. Re-inserting the same fingerprint is a no-op.
/// Returns true when a row was written.
pub async fn insert_alert(pool: &PgPool, alert: &AlertRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO alerts (
            fingerprint, trader_id, display_name, usd_amount, outcome_label,
            market_title, category, account_age_days, activity_count, token_id,
            dispatched_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (fingerprint) DO NOTHING
        "#,
    )
    .bind(&alert.trade_fingerprint)
    .bind(&alert.trader_id)
    .bind(&alert.display_name)
    .bind(alert.usd_amount)
    .bind(&alert.outcome_label)
    .bind(&alert.market_title)
    .bind(alert.category.as_str())
    .bind(alert.account_age_days)
    .bind(i64::try_from(alert.activity_count).unwrap_or(i64::MAX))
    .bind(&alert.token_id)
    .bind(alert.dispatched_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Postgres-backed durable row sink.
#[derive(Debug, Clone)]
pub struct PgAlertStore {
    pool: PgPool,
}

impl PgAlertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn append(&self, alert: &AlertRecord) -> Result<(), SinkError> {
        let inserted = insert_alert(&self.pool, alert).await?;
        if !inserted {
            tracing::debug!(
                fingerprint = %alert.trade_fingerprint,
                "Alert row already present"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
