use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use chrono_tz::Tz;
use tracing::{debug, error, warn};

use super::{deliver, notice_days, JobContext, NotificationJob};
use crate::error::{BusinessDayError, RecipientError};
use crate::models::{GiroProfile, GiroRecord, JobKind, JobSummary};
use crate::repositories::GiroSource;
use crate::services::notification_builder::build_giro_notification;
use crate::services::{NotificationSink, ProfileDirectory};

/// Notifies customers of giros due within their notice window
pub struct GiroJob {
    directory: Arc<dyn ProfileDirectory>,
    giros: Arc<dyn GiroSource>,
    sink: Arc<dyn NotificationSink>,
    default_notice_days: i64,
    timezone: Tz,
}

impl GiroJob {
    pub fn new(
        directory: Arc<dyn ProfileDirectory>,
        giros: Arc<dyn GiroSource>,
        sink: Arc<dyn NotificationSink>,
        default_notice_days: i64,
        timezone: Tz,
    ) -> Self {
        Self {
            directory,
            giros,
            sink,
            default_notice_days,
            timezone,
        }
    }

    /// Inclusive calendar window `[today, today + notice]`
    fn window(
        &self,
        profile: &GiroProfile,
        today: NaiveDate,
    ) -> Result<(NaiveDate, NaiveDate), BusinessDayError> {
        let notice = notice_days(profile.dias_aviso_giro, self.default_notice_days);
        if notice < 0 {
            return Err(BusinessDayError::NegativeOffset(notice));
        }
        let to = today
            .checked_add_days(Days::new(notice as u64))
            .ok_or(BusinessDayError::OutOfRange(notice))?;
        Ok((today, to))
    }

    async fn giros_for(
        &self,
        profile: &GiroProfile,
        today: NaiveDate,
    ) -> Result<Vec<GiroRecord>, RecipientError> {
        let (from, to) = self.window(profile, today)?;
        let giros = self
            .giros
            .fetch_giros_by_account(&profile.cta_contable, from, to)
            .await?;
        debug!(
            user_id = %profile.user_id,
            %from,
            %to,
            giros = giros.len(),
            "Resolved giros for recipient"
        );
        Ok(giros)
    }
}

#[async_trait]
impl NotificationJob for GiroJob {
    fn kind(&self) -> JobKind {
        JobKind::Giro
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }

    async fn execute(&self, ctx: &JobContext) -> JobSummary {
        let profiles = match self.directory.fetch_giro_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                error!(error = %e, "Cannot load giro recipients, aborting run");
                return JobSummary::aborted();
            }
        };

        let mut summary = JobSummary {
            profiles_considered: profiles.len() as u32,
            ..JobSummary::default()
        };

        for profile in &profiles {
            let giros = match self.giros_for(profile, ctx.today).await {
                Ok(giros) => giros,
                Err(e) => {
                    warn!(user_id = %profile.user_id, error = %e, "Skipping giro recipient");
                    summary.record_error();
                    continue;
                }
            };

            summary.records_considered += giros.len() as u32;
            for giro in &giros {
                let notification = build_giro_notification(profile, giro);
                deliver(self.sink.as_ref(), &notification, &mut summary).await;
            }
        }

        summary
    }
}
