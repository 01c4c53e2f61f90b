//! Notification jobs
//!
//! Each job reads recipients from the profile directory, resolves the records
//! that concern them, and writes one notification per (recipient, record).
//! A run never returns an error: failures are logged and counted in the
//! [`JobSummary`].
//!
//! - directory unavailable: the run stops, `errors = 1`
//! - one recipient fails: counted, the next recipient is processed
//! - store unavailable for one insert: counted, the next insert is attempted

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::metrics;
use crate::models::{DeliveryOutcome, JobKind, JobSummary, NewNotification};
use crate::services::NotificationSink;

pub mod giro_job;
pub mod offer_job;
pub mod reparto_job;
pub mod scheduler;

pub use giro_job::GiroJob;
pub use offer_job::OfferJob;
pub use reparto_job::RepartoJob;
pub use scheduler::{JobSchedule, NotificationScheduler};

/// Per-run context carried into logs
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job: JobKind,
    pub today: NaiveDate,
    pub correlation_id: String,
}

impl JobContext {
    pub fn new(job: JobKind, today: NaiveDate) -> Self {
        Self {
            job,
            today,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Calendar date "now" in `tz`
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

#[async_trait]
pub trait NotificationJob: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Time zone used to decide what "today" is
    fn timezone(&self) -> Tz;

    /// Job body. Implementations fold every failure into the summary.
    async fn execute(&self, ctx: &JobContext) -> JobSummary;

    /// Run for the current date in the configured time zone
    async fn run(&self) -> JobSummary {
        self.run_on(today_in(self.timezone())).await
    }

    /// Run as if `today` were the current date
    async fn run_on(&self, today: NaiveDate) -> JobSummary {
        let ctx = JobContext::new(self.kind(), today);
        let span = info_span!(
            "notification_job",
            job = %ctx.job,
            correlation_id = %ctx.correlation_id,
        );

        async {
            let start = std::time::Instant::now();
            info!(%today, "Starting notification job");

            let summary = self.execute(&ctx).await;

            let elapsed = start.elapsed();
            metrics::observe_job_run(ctx.job, &summary, elapsed);
            info!(
                profiles_considered = summary.profiles_considered,
                records_considered = summary.records_considered,
                inserted = summary.inserted,
                deduped = summary.deduped,
                errors = summary.errors,
                elapsed_ms = elapsed.as_millis() as u64,
                "Notification job completed"
            );
            summary
        }
        .instrument(span)
        .await
    }
}

/// Insert one notification and count the outcome
pub(crate) async fn deliver(
    sink: &dyn NotificationSink,
    notification: &NewNotification,
    summary: &mut JobSummary,
) {
    let outcome = match sink.insert(notification).await {
        Ok(outcome) => DeliveryOutcome::from(outcome),
        Err(e) => {
            warn!(
                user_id = %notification.user_id,
                source_key = %notification.source_key,
                error = %e,
                "Failed to store notification"
            );
            DeliveryOutcome::Unavailable
        }
    };
    summary.record_delivery(outcome);
}

/// Notice days for one recipient, falling back to the job default only when absent
pub(crate) fn notice_days(configured: Option<i32>, default: i64) -> i64 {
    configured.map(i64::from).unwrap_or(default)
}
