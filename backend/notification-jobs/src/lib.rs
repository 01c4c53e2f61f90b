pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod repositories;
pub mod services;

pub use config::Config;
pub use error::{ConfigError, DirectoryError, RecordQueryError, SinkError};
pub use jobs::{GiroJob, NotificationJob, NotificationScheduler, OfferJob, RepartoJob};
pub use models::{JobKind, JobSummary};
pub use repositories::DbPools;
