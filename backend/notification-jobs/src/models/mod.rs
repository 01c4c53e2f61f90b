use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Notification category as stored in the notification store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Pending bill of exchange close to its due date
    Giro,
    /// Scheduled delivery route for the customer's zone
    Reparto,
    /// Promotional offer available to every opted-in customer
    Oferta,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Giro => "giro",
            NotificationType::Reparto => "reparto",
            NotificationType::Oferta => "oferta",
        }
    }
}

/// The three scheduled jobs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Giro,
    Reparto,
    Offer,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::Giro, JobKind::Reparto, JobKind::Offer];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Giro => "giro",
            JobKind::Reparto => "reparto",
            JobKind::Offer => "offer",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "giro" => Ok(JobKind::Giro),
            "reparto" => Ok(JobKind::Reparto),
            "offer" | "oferta" => Ok(JobKind::Offer),
            other => Err(format!("unknown job '{}'", other)),
        }
    }
}

/// Directory projection used by the giro job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GiroProfile {
    pub user_id: String,

    /// Accounting code the giros are booked against
    pub cta_contable: String,

    /// Lead time in calendar days; `None` uses the job default
    pub dias_aviso_giro: Option<i32>,
}

/// Directory projection used by the reparto job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepartoProfile {
    pub user_id: String,

    /// ERP customer code
    pub erp_clt_prov: String,

    /// Lead time in business days; `None` uses the job default
    pub dias_aviso_reparto: Option<i32>,
}

/// Single-customer lookup result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerProfile {
    pub erp_clt_prov: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

/// Pending giro row from the finance schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct GiroRecord {
    pub cta_contable: String,
    pub num_efecto: String,
    pub vencimiento: NaiveDate,
    pub importe: Decimal,
}

/// Scheduled route row from the sales schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RepartoRecord {
    pub clt_prov: String,
    pub fecha: NaiveDate,
    pub ruta: i64,
    pub subruta: i64,
    pub grupo: i64,
    pub subgrupo: i64,
}

/// The currently active offer file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferRecord {
    pub expiry: NaiveDate,
    /// File name only, never the full path
    pub file_name: String,
}

/// Notification ready to be written to the notification store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    pub title: String,

    pub body: String,

    pub event_date: NaiveDate,

    /// Mirror of the source record for client-side rendering
    pub data: serde_json::Value,

    /// Deduplication identity, unique in the store
    pub source_key: String,
}

/// Notification as read back from the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub body: Option<String>,
    pub data: Option<serde_json::Value>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Successful result of a store insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The `source_key` already existed
    Deduplicated,
}

/// What happened to one notification during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Inserted,
    Deduplicated,
    Unavailable,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Inserted => "inserted",
            DeliveryOutcome::Deduplicated => "deduped",
            DeliveryOutcome::Unavailable => "error",
        }
    }
}

impl From<InsertOutcome> for DeliveryOutcome {
    fn from(outcome: InsertOutcome) -> Self {
        match outcome {
            InsertOutcome::Inserted => DeliveryOutcome::Inserted,
            InsertOutcome::Deduplicated => DeliveryOutcome::Deduplicated,
        }
    }
}

/// Counters for one job run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub profiles_considered: u32,
    pub records_considered: u32,
    pub inserted: u32,
    pub deduped: u32,
    pub errors: u32,
}

impl JobSummary {
    /// Summary of a run that stopped before any per-recipient work
    pub fn aborted() -> Self {
        Self {
            errors: 1,
            ..Self::default()
        }
    }

    pub fn record_delivery(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Inserted => self.inserted += 1,
            DeliveryOutcome::Deduplicated => self.deduped += 1,
            DeliveryOutcome::Unavailable => self.errors += 1,
        }
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Notifications that are known to be in the store after this run
    pub fn delivered(&self) -> u32 {
        self.inserted + self.deduped
    }
}
