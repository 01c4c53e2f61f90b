//! Notification store
//!
//! Insert-only write path used by the jobs. The `notifications` table is
//! unique on `(user_id, source_key)`, which makes every insert idempotent.
//! The read helpers serve operational tooling.
use crate::error::SinkError;
use crate::models::{InsertOutcome, NewNotification, StoredNotification};
use crate::services::supabase::{describe_transport_error, SupabaseClient};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::json;
use tracing::{debug, warn};

const NOTIFICATIONS_TABLE: &str = "notifications";
const MAX_PAGE_SIZE: i64 = 100;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Insert one notification. A uniqueness conflict is `Deduplicated`, not an error.
    async fn insert(&self, notification: &NewNotification) -> Result<InsertOutcome, SinkError>;
}

/// Map an insert response to an outcome.
///
/// 409 is the uniqueness conflict. Some gateway versions answer a conflict
/// with 400 and a constraint message instead, so a 400 whose body mentions
/// `duplicate` or `unique` is read as a conflict too.
pub fn classify_insert_response(
    status: StatusCode,
    body: &str,
) -> Result<InsertOutcome, SinkError> {
    if status.is_success() {
        return Ok(InsertOutcome::Inserted);
    }
    if status == StatusCode::CONFLICT {
        return Ok(InsertOutcome::Deduplicated);
    }
    if status == StatusCode::BAD_REQUEST {
        let body = body.to_ascii_lowercase();
        if body.contains("duplicate") || body.contains("unique") {
            return Ok(InsertOutcome::Deduplicated);
        }
    }
    if status.is_server_error() {
        return Err(SinkError::Unavailable(format!("status {}", status.as_u16())));
    }
    Err(SinkError::Rejected {
        status: status.as_u16(),
    })
}

fn read_error(status: StatusCode) -> SinkError {
    if status.is_server_error() {
        SinkError::Unavailable(format!("status {}", status.as_u16()))
    } else {
        SinkError::Rejected {
            status: status.as_u16(),
        }
    }
}

/// Page bounds for `list_for_user`: limit in 1..=100, offset >= 0
pub fn clamp_page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
}

#[derive(Debug, Clone)]
pub struct SupabaseNotificationStore {
    client: SupabaseClient,
}

impl SupabaseNotificationStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Newest notifications first
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredNotification>, SinkError> {
        let (limit, offset) = clamp_page(limit, offset);
        let user_filter = format!("eq.{}", user_id);
        let limit = limit.to_string();
        let offset = offset.to_string();

        let response = self
            .client
            .get(NOTIFICATIONS_TABLE)
            .query(&[
                ("select", "id,type,title,body,data,read_at,created_at"),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SinkError::Unavailable(describe_transport_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(read_error(status));
        }

        response
            .json::<Vec<StoredNotification>>()
            .await
            .map_err(|e| SinkError::Unavailable(describe_transport_error(e)))
    }

    /// Set `read_at` on one notification owned by `user_id`.
    ///
    /// Returns `false` when no row matched both the id and the owner.
    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<bool, SinkError> {
        let id_filter = format!("eq.{}", notification_id);
        let user_filter = format!("eq.{}", user_id);

        let response = self
            .client
            .patch(NOTIFICATIONS_TABLE)
            .query(&[
                ("id", id_filter.as_str()),
                ("user_id", user_filter.as_str()),
            ])
            .header("Prefer", "return=representation")
            .json(&json!({ "read_at": Utc::now().to_rfc3339() }))
            .send()
            .await
            .map_err(|e| SinkError::Unavailable(describe_transport_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(read_error(status));
        }

        let rows = response
            .json::<Vec<serde_json::Value>>()
            .await
            .map_err(|e| SinkError::Unavailable(describe_transport_error(e)))?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl NotificationSink for SupabaseNotificationStore {
    async fn insert(&self, notification: &NewNotification) -> Result<InsertOutcome, SinkError> {
        let response = self
            .client
            .post(NOTIFICATIONS_TABLE)
            .header("Prefer", "return=minimal")
            .json(notification)
            .send()
            .await
            .map_err(|e| SinkError::Unavailable(describe_transport_error(e)))?;

        let status = response.status();
        let body = if status.is_success() {
            String::new()
        } else {
            response.text().await.unwrap_or_default()
        };

        let outcome = classify_insert_response(status, &body);
        match &outcome {
            Ok(InsertOutcome::Deduplicated) => debug!(
                source_key = %notification.source_key,
                "Notification already exists"
            ),
            Err(SinkError::Rejected { status }) => warn!(
                source_key = %notification.source_key,
                status = *status,
                "Notification store rejected insert"
            ),
            _ => {}
        }
        outcome
    }
}
