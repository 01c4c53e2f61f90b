use crate::error::RecordQueryError;
use crate::models::GiroRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use db_pool::{acquire_with_metrics, with_query_timeout};
use sqlx::MySqlPool;
use std::time::Duration;

use super::FINAN_POOL;

/// Pending receivable giros: company 1, not yet remitted, collections side,
/// instrument numbers starting with R or S.
const GIROS_BY_ACCOUNT_SQL: &str = r#"
    SELECT
        CAST(cli_pro AS CHAR) AS cta_contable,
        CAST(num_efecto AS CHAR) AS num_efecto,
        vencimiento,
        CAST(importe AS DECIMAL(15, 2)) AS importe
    FROM efectos_e
    WHERE empresa = 1
      AND giro_rec = 0
      AND cobro_pago = 1
      AND (num_efecto LIKE 'R%' OR num_efecto LIKE 'S%')
      AND cli_pro = ?
      AND vencimiento BETWEEN ? AND ?
    ORDER BY vencimiento ASC, num_efecto ASC
"#;

#[async_trait]
pub trait GiroSource: Send + Sync {
    /// Giros of one account due in `[from, to]`, both ends inclusive
    async fn fetch_giros_by_account(
        &self,
        cta_contable: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<GiroRecord>, RecordQueryError>;
}

/// Giro queries on the finance schema
#[derive(Debug, Clone)]
pub struct GiroRepository {
    pool: MySqlPool,
    query_timeout: Duration,
}

impl GiroRepository {
    pub fn new(pool: MySqlPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }
}

#[async_trait]
impl GiroSource for GiroRepository {
    async fn fetch_giros_by_account(
        &self,
        cta_contable: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<GiroRecord>, RecordQueryError> {
        let mut conn = acquire_with_metrics(&self.pool, FINAN_POOL).await?;
        let rows = with_query_timeout(
            self.query_timeout,
            sqlx::query_as::<_, GiroRecord>(GIROS_BY_ACCOUNT_SQL)
                .bind(cta_contable)
                .bind(from)
                .bind(to)
                .fetch_all(&mut *conn),
        )
        .await?;
        Ok(rows)
    }
}
