//! Customer profile directory
//!
//! Reads opted-in recipients from the `customer_profiles` table. Filtering on
//! `is_active` and the per-type opt-in flag happens server side; rows with a
//! blank identifier are dropped again here.
use crate::error::DirectoryError;
use crate::models::{CustomerProfile, GiroProfile, RepartoProfile};
use crate::services::supabase::{describe_transport_error, SupabaseClient};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

const PROFILES_TABLE: &str = "customer_profiles";

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn fetch_giro_profiles(&self) -> Result<Vec<GiroProfile>, DirectoryError>;

    async fn fetch_reparto_profiles(&self) -> Result<Vec<RepartoProfile>, DirectoryError>;

    /// Ids of active customers opted into offer notifications
    async fn fetch_active_recipient_ids(&self) -> Result<Vec<String>, DirectoryError>;
}

#[derive(Debug, Deserialize)]
struct GiroProfileRow {
    user_id: Option<String>,
    cta_contable: Option<String>,
    dias_aviso_giro: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RepartoProfileRow {
    user_id: Option<String>,
    erp_clt_prov: Option<String>,
    dias_aviso_reparto: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RecipientRow {
    user_id: Option<String>,
}

/// Trimmed, non-empty value or `None`
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn giro_profiles_from_rows(rows: Vec<GiroProfileRow>) -> Vec<GiroProfile> {
    rows.into_iter()
        .filter_map(|row| {
            Some(GiroProfile {
                user_id: non_blank(row.user_id)?,
                cta_contable: non_blank(row.cta_contable)?,
                dias_aviso_giro: row.dias_aviso_giro,
            })
        })
        .collect()
}

fn reparto_profiles_from_rows(rows: Vec<RepartoProfileRow>) -> Vec<RepartoProfile> {
    rows.into_iter()
        .filter_map(|row| {
            Some(RepartoProfile {
                user_id: non_blank(row.user_id)?,
                erp_clt_prov: non_blank(row.erp_clt_prov)?,
                dias_aviso_reparto: row.dias_aviso_reparto,
            })
        })
        .collect()
}

fn recipient_ids_from_rows(rows: Vec<RecipientRow>) -> Vec<String> {
    rows.into_iter()
        .filter_map(|row| non_blank(row.user_id))
        .collect()
}

/// Directory backed by the portal's PostgREST endpoint
#[derive(Debug, Clone)]
pub struct SupabaseDirectory {
    client: SupabaseClient,
}

impl SupabaseDirectory {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Run a filtered select. 4xx is logged and read as "no rows".
    async fn select<T: DeserializeOwned>(
        &self,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, DirectoryError> {
        let response = self
            .client
            .get(PROFILES_TABLE)
            .query(query)
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(describe_transport_error(e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(DirectoryError::Unavailable(format!(
                "status {}",
                status.as_u16()
            )));
        }
        if status.is_client_error() {
            warn!(
                status = status.as_u16(),
                "Profile directory rejected query, treating as empty"
            );
            return Ok(Vec::new());
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| DirectoryError::Unavailable(describe_transport_error(e)))
    }

    /// Single customer lookup, `None` when the profile does not exist or is not readable
    pub async fn fetch_customer_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<CustomerProfile>, DirectoryError> {
        let user_filter = format!("eq.{}", user_id);
        let rows: Vec<CustomerProfile> = self
            .select(&[
                ("select", "erp_clt_prov,is_active"),
                ("user_id", user_filter.as_str()),
                ("limit", "1"),
            ])
            .await?;

        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl ProfileDirectory for SupabaseDirectory {
    async fn fetch_giro_profiles(&self) -> Result<Vec<GiroProfile>, DirectoryError> {
        let rows: Vec<GiroProfileRow> = self
            .select(&[
                ("select", "user_id,cta_contable,dias_aviso_giro"),
                ("is_active", "eq.true"),
                ("avisar_giro", "eq.true"),
                ("cta_contable", "not.is.null"),
            ])
            .await?;

        let total = rows.len();
        let profiles = giro_profiles_from_rows(rows);
        debug!(rows = total, profiles = profiles.len(), "Fetched giro profiles");
        Ok(profiles)
    }

    async fn fetch_reparto_profiles(&self) -> Result<Vec<RepartoProfile>, DirectoryError> {
        let rows: Vec<RepartoProfileRow> = self
            .select(&[
                ("select", "user_id,erp_clt_prov,dias_aviso_reparto"),
                ("is_active", "eq.true"),
                ("avisar_reparto", "eq.true"),
                ("erp_clt_prov", "not.is.null"),
            ])
            .await?;

        let total = rows.len();
        let profiles = reparto_profiles_from_rows(rows);
        debug!(rows = total, profiles = profiles.len(), "Fetched reparto profiles");
        Ok(profiles)
    }

    async fn fetch_active_recipient_ids(&self) -> Result<Vec<String>, DirectoryError> {
        let rows: Vec<RecipientRow> = self
            .select(&[
                ("select", "user_id"),
                ("is_active", "eq.true"),
                ("avisar_oferta", "eq.true"),
            ])
            .await?;

        let ids = recipient_ids_from_rows(rows);
        debug!(recipients = ids.len(), "Fetched offer recipients");
        Ok(ids)
    }
}
