use crate::error::RecordQueryError;
use crate::models::RepartoRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use db_pool::{acquire_with_metrics, with_query_timeout};
use sqlx::MySqlPool;
use std::time::Duration;

use super::VENTAS_POOL;

/// Routes programmed on one date for the zone (group/subgroup) of an active customer
const REPARTOS_BY_CUSTOMER_SQL: &str = r#"
    SELECT
        CAST(c.codigo AS CHAR) AS clt_prov,
        r.fecha,
        CAST(l.ruta AS SIGNED) AS ruta,
        CAST(l.subruta AS SIGNED) AS subruta,
        CAST(l.grupo AS SIGNED) AS grupo,
        CAST(l.subgrupo AS SIGNED) AS subgrupo
    FROM cliente c
    INNER JOIN lin_rutas_grupo l
        ON c.grupo = l.grupo AND c.subgrupo = l.subgrupo
    INNER JOIN rutas_programacion r
        ON l.ruta = r.ruta AND l.subruta = r.subruta
    WHERE c.baja_comercial = 'N'
      AND c.codigo = ?
      AND r.fecha = ?
    ORDER BY r.fecha ASC, c.codigo ASC, l.ruta ASC, l.subruta ASC
"#;

#[async_trait]
pub trait RepartoSource: Send + Sync {
    async fn fetch_repartos_by_customer(
        &self,
        erp_clt_prov: &str,
        target: NaiveDate,
    ) -> Result<Vec<RepartoRecord>, RecordQueryError>;
}

/// Route queries on the sales schema
#[derive(Debug, Clone)]
pub struct RepartoRepository {
    pool: MySqlPool,
    query_timeout: Duration,
}

impl RepartoRepository {
    pub fn new(pool: MySqlPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }
}

#[async_trait]
impl RepartoSource for RepartoRepository {
    async fn fetch_repartos_by_customer(
        &self,
        erp_clt_prov: &str,
        target: NaiveDate,
    ) -> Result<Vec<RepartoRecord>, RecordQueryError> {
        let mut conn = acquire_with_metrics(&self.pool, VENTAS_POOL).await?;
        let rows = with_query_timeout(
            self.query_timeout,
            sqlx::query_as::<_, RepartoRecord>(REPARTOS_BY_CUSTOMER_SQL)
                .bind(erp_clt_prov)
                .bind(target)
                .fetch_all(&mut *conn),
        )
        .await?;
        Ok(rows)
    }
}
