use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use tracing::{error, info};

use super::{deliver, JobContext, NotificationJob};
use crate::models::{JobKind, JobSummary};
use crate::services::notification_builder::build_offer_notification;
use crate::services::{NotificationSink, OfferSource, ProfileDirectory};

/// Announces the active offer to every opted-in customer
///
/// All recipients share the offer's `source_key`; the store's per-recipient
/// uniqueness keeps reruns from notifying anyone twice about the same offer.
pub struct OfferJob {
    directory: Arc<dyn ProfileDirectory>,
    offers: Arc<dyn OfferSource>,
    sink: Arc<dyn NotificationSink>,
    timezone: Tz,
}

impl OfferJob {
    pub fn new(
        directory: Arc<dyn ProfileDirectory>,
        offers: Arc<dyn OfferSource>,
        sink: Arc<dyn NotificationSink>,
        timezone: Tz,
    ) -> Self {
        Self {
            directory,
            offers,
            sink,
            timezone,
        }
    }
}

#[async_trait]
impl NotificationJob for OfferJob {
    fn kind(&self) -> JobKind {
        JobKind::Offer
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }

    async fn execute(&self, ctx: &JobContext) -> JobSummary {
        let Some(offer) = self.offers.fetch_active_offer(ctx.today).await else {
            info!("No active offer, nothing to notify");
            return JobSummary::default();
        };

        let recipients = match self.directory.fetch_active_recipient_ids().await {
            Ok(recipients) => recipients,
            Err(e) => {
                error!(error = %e, "Cannot load offer recipients, aborting run");
                return JobSummary::aborted();
            }
        };

        info!(
            file_name = %offer.file_name,
            expiry = %offer.expiry,
            recipients = recipients.len(),
            "Announcing active offer"
        );

        let mut summary = JobSummary {
            profiles_considered: recipients.len() as u32,
            records_considered: u32::from(!recipients.is_empty()),
            ..JobSummary::default()
        };

        for user_id in &recipients {
            let notification = build_offer_notification(user_id, offer.expiry);
            deliver(self.sink.as_ref(), &notification, &mut summary).await;
        }

        summary
    }
}
