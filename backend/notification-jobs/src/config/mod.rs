//! Configuration for the notification jobs, loaded from environment variables
//!
//! MariaDB host, credentials and pool sizing (`MARIADB_HOST`, `MARIADB_USER`,
//! `MARIADB_PASSWORD`, `DB_MAX_CONNECTIONS`, ...) are read by the db-pool
//! library; this struct only carries the schema names.
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::jobs::JobSchedule;
use crate::models::JobKind;

#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_app_env")]
    pub app_env: String,

    /// Port of the /health and /metrics server
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    // ============================================
    // Portal backend (profiles and notifications)
    // ============================================
    #[serde(default)]
    pub supabase_url: String,

    #[serde(default)]
    pub supabase_service_role_key: String,

    #[serde(default = "default_directory_timeout_secs")]
    pub directory_timeout_secs: u64,

    #[serde(default = "default_sink_timeout_secs")]
    pub sink_timeout_secs: u64,

    // ============================================
    // ERP database
    // ============================================
    /// Sales schema (customers, routes)
    #[serde(default = "default_mariadb_db")]
    pub mariadb_db: String,

    /// Accounting schema (giros)
    #[serde(default = "default_mariadb_finan_db")]
    pub mariadb_finan_db: String,

    #[serde(default = "default_db_query_timeout_secs")]
    pub db_query_timeout_secs: u64,

    // ============================================
    // Offer files
    // ============================================
    #[serde(default = "default_pdf_base_dir")]
    pub pdf_base_dir: PathBuf,

    #[serde(default = "default_offer_file_prefix")]
    pub offer_file_prefix: String,

    #[serde(default = "default_offer_file_extension")]
    pub offer_file_extension: String,

    // ============================================
    // Schedules
    // ============================================
    /// IANA zone for cron triggers and for "today"
    #[serde(default = "default_jobs_timezone")]
    pub jobs_timezone: String,

    #[serde(default = "default_true")]
    pub giro_job_enabled: bool,
    #[serde(default = "default_giro_job_hour")]
    pub giro_job_hour: u32,
    #[serde(default)]
    pub giro_job_minute: u32,
    /// Calendar days
    #[serde(default = "default_giro_dias_aviso")]
    pub giro_default_dias_aviso: i64,

    #[serde(default = "default_true")]
    pub reparto_job_enabled: bool,
    #[serde(default = "default_reparto_job_hour")]
    pub reparto_job_hour: u32,
    #[serde(default = "default_reparto_job_minute")]
    pub reparto_job_minute: u32,
    /// Business days
    #[serde(default = "default_reparto_dias_aviso")]
    pub reparto_default_dias_aviso: i64,

    #[serde(default = "default_true")]
    pub offer_job_enabled: bool,
    #[serde(default = "default_offer_job_hour")]
    pub offer_job_hour: u32,
    #[serde(default)]
    pub offer_job_minute: u32,
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_metrics_port() -> u16 {
    9464
}

fn default_directory_timeout_secs() -> u64 {
    15
}

fn default_sink_timeout_secs() -> u64 {
    10
}

fn default_mariadb_db() -> String {
    "g4".to_string()
}

fn default_mariadb_finan_db() -> String {
    "g4finan".to_string()
}

fn default_db_query_timeout_secs() -> u64 {
    30
}

fn default_pdf_base_dir() -> PathBuf {
    PathBuf::from("./_pdfs/invoices_issued")
}

fn default_offer_file_prefix() -> String {
    "oferta".to_string()
}

fn default_offer_file_extension() -> String {
    "pdf".to_string()
}

fn default_jobs_timezone() -> String {
    "Europe/Madrid".to_string()
}

fn default_true() -> bool {
    true
}

fn default_giro_job_hour() -> u32 {
    7
}

fn default_giro_dias_aviso() -> i64 {
    5
}

fn default_reparto_job_hour() -> u32 {
    7
}

fn default_reparto_job_minute() -> u32 {
    15
}

fn default_reparto_dias_aviso() -> i64 {
    2
}

fn default_offer_job_hour() -> u32 {
    8
}

impl Config {
    /// Load and validate configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Config = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;

        for kind in JobKind::ALL {
            let schedule = self.schedule(kind);
            if schedule.hour > 23 {
                return Err(ConfigError::Invalid(format!(
                    "{} job hour must be 0-23, got {}",
                    kind, schedule.hour
                )));
            }
            if schedule.minute > 59 {
                return Err(ConfigError::Invalid(format!(
                    "{} job minute must be 0-59, got {}",
                    kind, schedule.minute
                )));
            }
        }

        if self.giro_default_dias_aviso < 0 {
            return Err(ConfigError::Invalid(
                "GIRO_DEFAULT_DIAS_AVISO must be >= 0".to_string(),
            ));
        }
        if self.reparto_default_dias_aviso < 0 {
            return Err(ConfigError::Invalid(
                "REPARTO_DEFAULT_DIAS_AVISO must be >= 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.jobs_timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Invalid(format!("unknown time zone '{}'", self.jobs_timezone))
        })
    }

    pub fn schedule(&self, kind: JobKind) -> JobSchedule {
        match kind {
            JobKind::Giro => JobSchedule {
                enabled: self.giro_job_enabled,
                hour: self.giro_job_hour,
                minute: self.giro_job_minute,
            },
            JobKind::Reparto => JobSchedule {
                enabled: self.reparto_job_enabled,
                hour: self.reparto_job_hour,
                minute: self.reparto_job_minute,
            },
            JobKind::Offer => JobSchedule {
                enabled: self.offer_job_enabled,
                hour: self.offer_job_hour,
                minute: self.offer_job_minute,
            },
        }
    }

    /// Portal URL and service-role key; both are required to build the adapters
    pub fn supabase_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let url = self.supabase_url.trim();
        let key = self.supabase_service_role_key.trim();
        if url.is_empty() || key.is_empty() {
            return Err(ConfigError::Invalid(
                "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY must be set".to_string(),
            ));
        }
        Ok((url, key))
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_secs(self.directory_timeout_secs)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_secs)
    }

    pub fn db_query_timeout(&self) -> Duration {
        Duration::from_secs(self.db_query_timeout_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_env", &self.app_env)
            .field("metrics_port", &self.metrics_port)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_service_role_key", &"[REDACTED]")
            .field("mariadb_db", &self.mariadb_db)
            .field("mariadb_finan_db", &self.mariadb_finan_db)
            .field("pdf_base_dir", &"[REDACTED]")
            .field("jobs_timezone", &self.jobs_timezone)
            .field("giro", &self.schedule(JobKind::Giro))
            .field("reparto", &self.schedule(JobKind::Reparto))
            .field("offer", &self.schedule(JobKind::Offer))
            .finish_non_exhaustive()
    }
}
