/// Repository layer over the ERP database
///
/// The ERP keeps sales data (`ventas`) and accounting data (`finan`) in two
/// schemas on the same MariaDB server. Each schema gets its own pool.
pub mod giro_repository;
pub mod reparto_repository;

pub use giro_repository::{GiroRepository, GiroSource};
pub use reparto_repository::{RepartoRepository, RepartoSource};

use db_pool::{close_pool, create_pool, DbConfig};
use sqlx::MySqlPool;
use tracing::info;

pub const VENTAS_POOL: &str = "ventas";
pub const FINAN_POOL: &str = "finan";

/// The two ERP pools, created once at startup and closed on shutdown
#[derive(Debug, Clone)]
pub struct DbPools {
    pub ventas: MySqlPool,
    pub finan: MySqlPool,
}

impl DbPools {
    /// Connect both schemas. If the second pool fails the first is closed again.
    pub async fn connect(ventas_db: &str, finan_db: &str) -> Result<Self, sqlx::Error> {
        let ventas_config = DbConfig::for_schema(VENTAS_POOL, ventas_db);
        ventas_config.log_config();
        let ventas = create_pool(ventas_config).await?;

        let finan_config = DbConfig::for_schema(FINAN_POOL, finan_db);
        finan_config.log_config();
        let finan = match create_pool(finan_config).await {
            Ok(pool) => pool,
            Err(e) => {
                close_pool(&ventas, VENTAS_POOL).await;
                return Err(e);
            }
        };

        info!(ventas = %ventas_db, finan = %finan_db, "ERP pools ready");
        Ok(Self { ventas, finan })
    }

    /// Schema each pool is currently connected to, as reported by the server
    pub async fn current_schemas(&self) -> Result<(String, String), sqlx::Error> {
        let ventas: (Option<String>,) = sqlx::query_as("SELECT DATABASE()")
            .fetch_one(&self.ventas)
            .await?;
        let finan: (Option<String>,) = sqlx::query_as("SELECT DATABASE()")
            .fetch_one(&self.finan)
            .await?;
        Ok((ventas.0.unwrap_or_default(), finan.0.unwrap_or_default()))
    }

    pub async fn close(&self) {
        close_pool(&self.ventas, VENTAS_POOL).await;
        close_pool(&self.finan, FINAN_POOL).await;
    }
}
