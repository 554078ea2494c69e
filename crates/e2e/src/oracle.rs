//! Persisted transaction state of the system under test

use async_trait::async_trait;
use checkout_common::{PurchaseMode, TransactionStatus};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

mod queries {
    pub const LAST_PAYMENT_STATUS: &str =
        "SELECT status FROM payment_entity ORDER BY created DESC LIMIT 1";
    pub const LAST_CREDIT_STATUS: &str =
        "SELECT status FROM credit_request_entity ORDER BY created DESC LIMIT 1";
    pub const ORDER_COUNT: &str = "SELECT COUNT(*) FROM order_entity";

    /// Orders reference payments and credits, so they go first
    pub const CLEANUP: [&str; 3] = [
        "DELETE FROM order_entity",
        "DELETE FROM payment_entity",
        "DELETE FROM credit_request_entity",
    ];
}

/// Ground truth for what a submission left in the store
#[async_trait]
pub trait OutcomeOracle: Send + Sync {
    /// Status of the most recent transaction for `mode`, if any
    async fn last_status(&self, mode: PurchaseMode) -> E2eResult<Option<TransactionStatus>>;

    /// Number of orders written since the last cleanup
    async fn persisted_count(&self) -> E2eResult<u64>;

    /// Delete every transaction and order row
    async fn cleanup(&self) -> E2eResult<()>;
}

/// Oracle over the SUT's relational store
#[derive(Clone)]
pub struct SqlOracle {
    pool: AnyPool,
}

impl SqlOracle {
    /// Connect to a `mysql://`, `postgres://` or `sqlite:` URL
    pub async fn connect(url: &str) -> E2eResult<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await?;

        info!("Connected to persisted store ({})", redact(url));
        Ok(Self { pool })
    }

    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl OutcomeOracle for SqlOracle {
    async fn last_status(&self, mode: PurchaseMode) -> E2eResult<Option<TransactionStatus>> {
        let query = match mode {
            PurchaseMode::Debit => queries::LAST_PAYMENT_STATUS,
            PurchaseMode::Credit => queries::LAST_CREDIT_STATUS,
        };

        let raw: Option<String> = sqlx::query_scalar(query)
            .fetch_optional(&self.pool)
            .await?;

        Ok(raw.and_then(|status| {
            let parsed = TransactionStatus::parse(&status);
            if parsed.is_none() {
                warn!("Unrecognised status '{}' in {}", status, mode.status_table());
            }
            parsed
        }))
    }

    async fn persisted_count(&self) -> E2eResult<u64> {
        let count: i64 = sqlx::query_scalar(queries::ORDER_COUNT)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn cleanup(&self) -> E2eResult<()> {
        for statement in queries::CLEANUP {
            let result = sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| E2eError::CleanupFailure(format!("{}: {}", statement, e)))?;
            debug!("{} removed {} row(s)", statement, result.rows_affected());
        }

        let remaining = self
            .persisted_count()
            .await
            .map_err(|e| E2eError::CleanupFailure(e.to_string()))?;
        if remaining != 0 {
            return Err(E2eError::CleanupFailure(format!(
                "{} order row(s) survived cleanup",
                remaining
            )));
        }
        Ok(())
    }
}

/// Hide credentials when logging a connection URL
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://***{}", &url[..scheme], &url[at..])
        }
        _ => url.to_string(),
    }
}
