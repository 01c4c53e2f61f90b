//! PostgREST client for the customer portal backend
//!
//! Holds the base URL and the service-role key and stamps every request with
//! `apikey` and `Authorization: Bearer` headers. Shared by the profile
//! directory and the notification store.
use reqwest::{Client, RequestBuilder};
use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    /// Project URL without trailing slash (e.g. "https://xyz.supabase.co")
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(
        base_url: &str,
        service_role_key: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_role_key: service_role_key.to_string(),
        })
    }

    /// `{base_url}/rest/v1/{table}`
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    pub fn get(&self, table: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.table_url(table)))
    }

    pub fn post(&self, table: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.table_url(table)))
    }

    pub fn patch(&self, table: &str) -> RequestBuilder {
        self.authorize(self.client.patch(self.table_url(table)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_role_key)
            .header(
                "Authorization",
                format!("Bearer {}", self.service_role_key),
            )
    }
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("service_role_key", &"[REDACTED]")
            .finish()
    }
}

/// Map a transport error to a short description without the request URL.
pub(crate) fn describe_transport_error(err: reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else if err.is_decode() {
        "response body could not be decoded".to_string()
    } else {
        err.without_url().to_string()
    }
}
