use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, error, warn};

use super::{deliver, notice_days, JobContext, NotificationJob};
use crate::error::RecipientError;
use crate::models::{JobKind, JobSummary, RepartoProfile, RepartoRecord};
use crate::repositories::RepartoSource;
use crate::services::notification_builder::build_reparto_notification;
use crate::services::{add_business_days, NotificationSink, ProfileDirectory};

/// Notifies customers of deliveries programmed `notice` business days ahead
pub struct RepartoJob {
    directory: Arc<dyn ProfileDirectory>,
    repartos: Arc<dyn RepartoSource>,
    sink: Arc<dyn NotificationSink>,
    default_notice_days: i64,
    timezone: Tz,
}

impl RepartoJob {
    pub fn new(
        directory: Arc<dyn ProfileDirectory>,
        repartos: Arc<dyn RepartoSource>,
        sink: Arc<dyn NotificationSink>,
        default_notice_days: i64,
        timezone: Tz,
    ) -> Self {
        Self {
            directory,
            repartos,
            sink,
            default_notice_days,
            timezone,
        }
    }

    async fn repartos_for(
        &self,
        profile: &RepartoProfile,
        today: NaiveDate,
    ) -> Result<(NaiveDate, Vec<RepartoRecord>), RecipientError> {
        let notice = notice_days(profile.dias_aviso_reparto, self.default_notice_days);
        let target = add_business_days(today, notice)?;
        let rows = self
            .repartos
            .fetch_repartos_by_customer(&profile.erp_clt_prov, target)
            .await?;
        debug!(
            user_id = %profile.user_id,
            %target,
            routes = rows.len(),
            "Resolved routes for recipient"
        );
        Ok((target, rows))
    }
}

#[async_trait]
impl NotificationJob for RepartoJob {
    fn kind(&self) -> JobKind {
        JobKind::Reparto
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }

    async fn execute(&self, ctx: &JobContext) -> JobSummary {
        let profiles = match self.directory.fetch_reparto_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                error!(error = %e, "Cannot load reparto recipients, aborting run");
                return JobSummary::aborted();
            }
        };

        let mut summary = JobSummary {
            profiles_considered: profiles.len() as u32,
            ..JobSummary::default()
        };

        for profile in &profiles {
            let (target, rows) = match self.repartos_for(profile, ctx.today).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(user_id = %profile.user_id, error = %e, "Skipping reparto recipient");
                    summary.record_error();
                    continue;
                }
            };

            summary.records_considered += rows.len() as u32;
            for row in &rows {
                let notification = build_reparto_notification(profile, row, target);
                deliver(self.sink.as_ref(), &notification, &mut summary).await;
            }
        }

        summary
    }
}
