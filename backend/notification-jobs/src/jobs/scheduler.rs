//! Daily cron triggers for the notification jobs
//!
//! Each enabled job fires once a day at `hour:minute` in the configured time
//! zone. Runs are not serialized: a run that outlasts a day would overlap
//! with the next one.

use std::sync::Arc;

use chrono_tz::Tz;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::info;

use super::NotificationJob;
use crate::models::JobKind;

/// When a job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSchedule {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
}

impl JobSchedule {
    /// Six-field cron expression (`sec min hour dom mon dow`)
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

/// Running scheduler with the jobs registered on it
pub struct NotificationScheduler {
    inner: JobScheduler,
    registered: Vec<JobKind>,
}

impl NotificationScheduler {
    /// Register every enabled job and start ticking
    pub async fn start(
        jobs: Vec<(Arc<dyn NotificationJob>, JobSchedule)>,
        timezone: Tz,
    ) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        let mut registered = Vec::new();

        for (job, schedule) in jobs {
            let kind = job.kind();
            if !schedule.enabled {
                info!(job = %kind, "Job disabled, not scheduling");
                continue;
            }

            let cron = schedule.cron_expression();
            let cron_job = Job::new_async_tz(cron.as_str(), timezone, move |_id, _scheduler| {
                let job = Arc::clone(&job);
                Box::pin(async move {
                    job.run().await;
                })
            })?;
            inner.add(cron_job).await?;

            info!(
                job = %kind,
                cron = %cron,
                timezone = %timezone.name(),
                "Job scheduled"
            );
            registered.push(kind);
        }

        inner.start().await?;
        Ok(Self { inner, registered })
    }

    pub fn registered(&self) -> &[JobKind] {
        &self.registered
    }

    pub async fn shutdown(mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        info!("Scheduler stopped");
        Ok(())
    }
}
