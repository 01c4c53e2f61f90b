//! Shared fixtures for the job pipeline tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use notification_jobs::error::SinkError;
use notification_jobs::models::{
    GiroProfile, GiroRecord, InsertOutcome, NewNotification, RepartoProfile, RepartoRecord,
};
use notification_jobs::services::NotificationSink;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Mutex;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

pub fn giro_profile(user_id: &str, cta: &str, dias: Option<i32>) -> GiroProfile {
    GiroProfile {
        user_id: user_id.to_string(),
        cta_contable: cta.to_string(),
        dias_aviso_giro: dias,
    }
}

pub fn reparto_profile(user_id: &str, clt_prov: &str, dias: Option<i32>) -> RepartoProfile {
    RepartoProfile {
        user_id: user_id.to_string(),
        erp_clt_prov: clt_prov.to_string(),
        dias_aviso_reparto: dias,
    }
}

pub fn giro(cta: &str, num_efecto: &str, vencimiento: NaiveDate, cents: i64) -> GiroRecord {
    GiroRecord {
        cta_contable: cta.to_string(),
        num_efecto: num_efecto.to_string(),
        vencimiento,
        importe: Decimal::new(cents, 2),
    }
}

pub fn route(clt_prov: &str, fecha: NaiveDate, ruta: i64, subruta: i64) -> RepartoRecord {
    RepartoRecord {
        clt_prov: clt_prov.to_string(),
        fecha,
        ruta,
        subruta,
        grupo: 3,
        subgrupo: 1,
    }
}

/// How the fake store answers for a given `source_key`
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Unavailable,
    Rejected(u16),
}

/// Notification store fake, unique on `(user_id, source_key)`
#[derive(Default)]
pub struct InMemorySink {
    keys: Mutex<HashSet<(String, String)>>,
    stored: Mutex<Vec<NewNotification>>,
    failures: Mutex<Vec<(String, Failure)>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert with `source_key` fail
    pub fn fail_on(&self, source_key: &str, failure: Failure) {
        self.failures
            .lock()
            .unwrap()
            .push((source_key.to_string(), failure));
    }

    pub fn stored(&self) -> Vec<NewNotification> {
        self.stored.lock().unwrap().clone()
    }

    /// Stored `source_key`s, sorted, one entry per stored row
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .keys
            .lock()
            .unwrap()
            .iter()
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl NotificationSink for InMemorySink {
    async fn insert(&self, notification: &NewNotification) -> Result<InsertOutcome, SinkError> {
        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| key == &notification.source_key)
            .map(|(_, failure)| *failure);
        match failure {
            Some(Failure::Unavailable) => {
                return Err(SinkError::Unavailable("status 503".to_string()))
            }
            Some(Failure::Rejected(status)) => return Err(SinkError::Rejected { status }),
            None => {}
        }

        let mut keys = self.keys.lock().unwrap();
        let identity = (
            notification.user_id.clone(),
            notification.source_key.clone(),
        );
        if !keys.insert(identity) {
            return Ok(InsertOutcome::Deduplicated);
        }
        self.stored.lock().unwrap().push(notification.clone());
        Ok(InsertOutcome::Inserted)
    }
}
