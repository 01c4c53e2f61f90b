//! Notification builders
//!
//! Pure mapping from (recipient, record) to a [`NewNotification`]. Texts are
//! fixed es-ES templates; dates in bodies use DD/MM/YYYY, dates in keys and
//! payloads use ISO 8601.
//!
//! `source_key` identities:
//! - giro: `giro:{cta_contable}:{num_efecto}:{vencimiento}`
//! - reparto: `reparto:{clt_prov}:{ruta}:{subruta}:{fecha}`
//! - oferta: `oferta:{expiry}`, shared by every recipient of the same offer
use crate::models::{
    GiroProfile, GiroRecord, NewNotification, NotificationType, RepartoProfile, RepartoRecord,
};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;

const BODY_DATE_FORMAT: &str = "%d/%m/%Y";

pub fn giro_source_key(giro: &GiroRecord) -> String {
    format!(
        "{}:{}:{}:{}",
        NotificationType::Giro.as_str(),
        giro.cta_contable,
        giro.num_efecto,
        giro.vencimiento
    )
}

pub fn reparto_source_key(row: &RepartoRecord, target_date: NaiveDate) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        NotificationType::Reparto.as_str(),
        row.clt_prov,
        row.ruta,
        row.subruta,
        target_date
    )
}

pub fn offer_source_key(expiry: NaiveDate) -> String {
    format!("{}:{}", NotificationType::Oferta.as_str(), expiry)
}

pub fn build_giro_notification(profile: &GiroProfile, giro: &GiroRecord) -> NewNotification {
    NewNotification {
        user_id: profile.user_id.clone(),
        notification_type: NotificationType::Giro,
        title: "Giro pendiente".to_string(),
        body: format!(
            "El efecto {} por importe de {:.2} \u{20ac} vence el {}.",
            giro.num_efecto,
            giro.importe,
            giro.vencimiento.format(BODY_DATE_FORMAT)
        ),
        event_date: giro.vencimiento,
        data: json!({
            "cta_contable": giro.cta_contable,
            "num_efecto": giro.num_efecto,
            "vencimiento": giro.vencimiento.to_string(),
            "importe": giro.importe.to_f64().unwrap_or_default(),
        }),
        source_key: giro_source_key(giro),
    }
}

pub fn build_reparto_notification(
    profile: &RepartoProfile,
    row: &RepartoRecord,
    target_date: NaiveDate,
) -> NewNotification {
    NewNotification {
        user_id: profile.user_id.clone(),
        notification_type: NotificationType::Reparto,
        title: "\u{1f69a} Reparto programado".to_string(),
        body: format!(
            "Cargamos para su zona el {}.\nRealice su pedido antes de las 23:59 del d\u{ed}a anterior.",
            target_date.format(BODY_DATE_FORMAT)
        ),
        event_date: target_date,
        data: json!({
            "clt_prov": row.clt_prov,
            "fecha": target_date.to_string(),
            "ruta": row.ruta,
            "subruta": row.subruta,
            "grupo": row.grupo,
            "subgrupo": row.subgrupo,
        }),
        source_key: reparto_source_key(row, target_date),
    }
}

pub fn build_offer_notification(user_id: &str, expiry: NaiveDate) -> NewNotification {
    NewNotification {
        user_id: user_id.to_string(),
        notification_type: NotificationType::Oferta,
        title: "\u{1f389} Nueva oferta disponible".to_string(),
        body: format!(
            "Hay una nueva oferta disponible hasta el {}.",
            expiry.format(BODY_DATE_FORMAT)
        ),
        event_date: expiry,
        data: json!({ "expiry": expiry.to_string() }),
        source_key: offer_source_key(expiry),
    }
}
