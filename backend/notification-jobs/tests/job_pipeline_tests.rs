/// Integration tests for the notification job pipeline
///
/// Directory and ERP sources are mocked; the store is an in-memory fake unique
/// on `(user_id, source_key)`, so reruns exercise the real dedup path.
mod common;

use chrono::NaiveDate;
use chrono_tz::Europe::Madrid;
use common::{date, giro, giro_profile, reparto_profile, route, Failure, InMemorySink};
use mockall::mock;
use mockall::predicate::*;
use notification_jobs::error::{DirectoryError, RecordQueryError};
use notification_jobs::jobs::{GiroJob, NotificationJob, OfferJob, RepartoJob};
use notification_jobs::models::{
    GiroProfile, GiroRecord, JobSummary, NotificationType, OfferRecord, RepartoProfile,
    RepartoRecord,
};
use notification_jobs::repositories::{GiroSource, RepartoSource};
use notification_jobs::services::{FsOfferStore, OfferSource, ProfileDirectory};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ============================================
// Mocks
// ============================================

mock! {
    pub Directory {}

    #[async_trait::async_trait]
    impl ProfileDirectory for Directory {
        async fn fetch_giro_profiles(&self) -> Result<Vec<GiroProfile>, DirectoryError>;
        async fn fetch_reparto_profiles(&self) -> Result<Vec<RepartoProfile>, DirectoryError>;
        async fn fetch_active_recipient_ids(&self) -> Result<Vec<String>, DirectoryError>;
    }
}

mock! {
    pub Giros {}

    #[async_trait::async_trait]
    impl GiroSource for Giros {
        async fn fetch_giros_by_account(
            &self,
            cta_contable: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<GiroRecord>, RecordQueryError>;
    }
}

mock! {
    pub Repartos {}

    #[async_trait::async_trait]
    impl RepartoSource for Repartos {
        async fn fetch_repartos_by_customer(
            &self,
            erp_clt_prov: &str,
            target: NaiveDate,
        ) -> Result<Vec<RepartoRecord>, RecordQueryError>;
    }
}

mock! {
    pub Offers {}

    #[async_trait::async_trait]
    impl OfferSource for Offers {
        async fn fetch_active_offer(&self, today: NaiveDate) -> Option<OfferRecord>;
    }
}

fn summary(
    profiles_considered: u32,
    records_considered: u32,
    inserted: u32,
    deduped: u32,
    errors: u32,
) -> JobSummary {
    JobSummary {
        profiles_considered,
        records_considered,
        inserted,
        deduped,
        errors,
    }
}

fn giro_job(directory: MockDirectory, giros: MockGiros, sink: Arc<InMemorySink>) -> GiroJob {
    GiroJob::new(Arc::new(directory), Arc::new(giros), sink, 5, Madrid)
}

fn reparto_job(
    directory: MockDirectory,
    repartos: MockRepartos,
    sink: Arc<InMemorySink>,
) -> RepartoJob {
    RepartoJob::new(Arc::new(directory), Arc::new(repartos), sink, 2, Madrid)
}

// ============================================
// Giro job
// ============================================

#[tokio::test]
async fn test_giro_default_window_inserts_each_giro() {
    let today = date(2026, 2, 16);
    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_giro_profiles()
        .times(1)
        .returning(|| Ok(vec![giro_profile("uid-1", "430000962", None)]));

    let mut giros = MockGiros::new();
    giros
        .expect_fetch_giros_by_account()
        .with(eq("430000962"), eq(date(2026, 2, 16)), eq(date(2026, 2, 21)))
        .times(1)
        .returning(|cta, _, _| {
            Ok(vec![
                giro(cta, "R001", date(2026, 2, 18), 150000),
                giro(cta, "S002", date(2026, 2, 21), 9950),
            ])
        });

    let sink = Arc::new(InMemorySink::new());
    let result = giro_job(directory, giros, sink.clone()).run_on(today).await;

    assert_eq!(result, summary(1, 2, 2, 0, 0));
    assert_eq!(
        sink.keys(),
        vec![
            "giro:430000962:R001:2026-02-18".to_string(),
            "giro:430000962:S002:2026-02-21".to_string(),
        ]
    );
    let stored = sink.stored();
    assert!(stored.iter().all(|n| n.user_id == "uid-1"));
    assert!(stored
        .iter()
        .all(|n| n.notification_type == NotificationType::Giro));
}

#[tokio::test]
async fn test_giro_profile_notice_overrides_default() {
    let today = date(2026, 2, 16);
    let mut directory = MockDirectory::new();
    directory.expect_fetch_giro_profiles().returning(|| {
        Ok(vec![
            giro_profile("uid-1", "430000001", Some(0)),
            giro_profile("uid-2", "430000002", Some(10)),
        ])
    });

    let mut giros = MockGiros::new();
    giros
        .expect_fetch_giros_by_account()
        .with(eq("430000001"), eq(today), eq(today))
        .times(1)
        .returning(|_, _, _| Ok(vec![]));
    giros
        .expect_fetch_giros_by_account()
        .with(eq("430000002"), eq(today), eq(date(2026, 2, 26)))
        .times(1)
        .returning(|_, _, _| Ok(vec![]));

    let sink = Arc::new(InMemorySink::new());
    let result = giro_job(directory, giros, sink.clone()).run_on(today).await;

    assert_eq!(result, summary(2, 0, 0, 0, 0));
    assert!(sink.stored().is_empty());
}

#[tokio::test]
async fn test_giro_rerun_is_deduplicated() {
    let today = date(2026, 2, 16);
    let sink = Arc::new(InMemorySink::new());

    for expected in [summary(1, 1, 1, 0, 0), summary(1, 1, 0, 1, 0)] {
        let mut directory = MockDirectory::new();
        directory
            .expect_fetch_giro_profiles()
            .returning(|| Ok(vec![giro_profile("uid-1", "430000962", Some(5))]));
        let mut giros = MockGiros::new();
        giros
            .expect_fetch_giros_by_account()
            .returning(|cta, _, _| Ok(vec![giro(cta, "R001", date(2026, 2, 20), 1000)]));

        let result = giro_job(directory, giros, sink.clone()).run_on(today).await;
        assert_eq!(result, expected);
        assert_eq!(result.delivered(), 1);
    }

    assert_eq!(sink.stored().len(), 1);
}

#[tokio::test]
async fn test_giro_directory_failure_aborts_without_queries() {
    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_giro_profiles()
        .times(1)
        .returning(|| Err(DirectoryError::Unavailable("status 503".to_string())));

    let mut giros = MockGiros::new();
    giros.expect_fetch_giros_by_account().times(0);

    let sink = Arc::new(InMemorySink::new());
    let result = giro_job(directory, giros, sink.clone())
        .run_on(date(2026, 2, 16))
        .await;

    assert_eq!(result, JobSummary::aborted());
    assert_eq!(result, summary(0, 0, 0, 0, 1));
    assert!(sink.stored().is_empty());
}

#[tokio::test]
async fn test_giro_recipient_failure_is_isolated() {
    let mut directory = MockDirectory::new();
    directory.expect_fetch_giro_profiles().returning(|| {
        Ok(vec![
            giro_profile("uid-1", "430000001", None),
            giro_profile("uid-2", "430000002", None),
            giro_profile("uid-3", "430000003", None),
        ])
    });

    let mut giros = MockGiros::new();
    giros
        .expect_fetch_giros_by_account()
        .with(eq("430000002"), always(), always())
        .returning(|_, _, _| Err(RecordQueryError::Timeout(Duration::from_secs(30))));
    giros
        .expect_fetch_giros_by_account()
        .returning(|cta, _, _| Ok(vec![giro(cta, "R100", date(2026, 2, 17), 5000)]));

    let sink = Arc::new(InMemorySink::new());
    let result = giro_job(directory, giros, sink.clone())
        .run_on(date(2026, 2, 16))
        .await;

    assert_eq!(result, summary(3, 2, 2, 0, 1));
    let users: Vec<String> = sink.stored().into_iter().map(|n| n.user_id).collect();
    assert_eq!(users, vec!["uid-1", "uid-3"]);
}

#[tokio::test]
async fn test_giro_negative_notice_fails_only_that_recipient() {
    let mut directory = MockDirectory::new();
    directory.expect_fetch_giro_profiles().returning(|| {
        Ok(vec![
            giro_profile("uid-1", "430000001", Some(-3)),
            giro_profile("uid-2", "430000002", Some(1)),
        ])
    });

    let mut giros = MockGiros::new();
    giros
        .expect_fetch_giros_by_account()
        .with(eq("430000002"), always(), always())
        .times(1)
        .returning(|cta, _, _| Ok(vec![giro(cta, "S001", date(2026, 2, 17), 100)]));

    let sink = Arc::new(InMemorySink::new());
    let result = giro_job(directory, giros, sink)
        .run_on(date(2026, 2, 16))
        .await;

    assert_eq!(result, summary(2, 1, 1, 0, 1));
}

#[tokio::test]
async fn test_giro_notice_past_calendar_range_fails_only_that_recipient() {
    let mut directory = MockDirectory::new();
    directory.expect_fetch_giro_profiles().returning(|| {
        Ok(vec![
            giro_profile("uid-1", "430000001", Some(i32::MAX)),
            giro_profile("uid-2", "430000002", Some(1)),
        ])
    });

    let mut giros = MockGiros::new();
    giros
        .expect_fetch_giros_by_account()
        .with(eq("430000002"), always(), always())
        .times(1)
        .returning(|_, _, _| Ok(vec![]));

    let sink = Arc::new(InMemorySink::new());
    let result = giro_job(directory, giros, sink)
        .run_on(date(2026, 2, 16))
        .await;

    assert_eq!(result, summary(2, 0, 0, 0, 1));
}

#[tokio::test]
async fn test_store_unavailable_does_not_stop_run() {
    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_giro_profiles()
        .returning(|| Ok(vec![giro_profile("uid-1", "430000962", None)]));

    let mut giros = MockGiros::new();
    giros.expect_fetch_giros_by_account().returning(|cta, _, _| {
        Ok(vec![
            giro(cta, "R001", date(2026, 2, 17), 100),
            giro(cta, "R002", date(2026, 2, 18), 200),
            giro(cta, "R003", date(2026, 2, 19), 300),
        ])
    });

    let sink = Arc::new(InMemorySink::new());
    sink.fail_on("giro:430000962:R002:2026-02-18", Failure::Unavailable);

    let result = giro_job(directory, giros, sink.clone())
        .run_on(date(2026, 2, 16))
        .await;

    assert_eq!(result, summary(1, 3, 2, 0, 1));
    assert_eq!(
        sink.keys(),
        vec![
            "giro:430000962:R001:2026-02-17".to_string(),
            "giro:430000962:R003:2026-02-19".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_rejected_insert_counts_as_error_not_dedup() {
    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_giro_profiles()
        .returning(|| Ok(vec![giro_profile("uid-1", "430000962", None)]));

    let mut giros = MockGiros::new();
    giros
        .expect_fetch_giros_by_account()
        .returning(|cta, _, _| Ok(vec![giro(cta, "R001", date(2026, 2, 17), 100)]));

    let sink = Arc::new(InMemorySink::new());
    sink.fail_on("giro:430000962:R001:2026-02-17", Failure::Rejected(422));

    let result = giro_job(directory, giros, sink)
        .run_on(date(2026, 2, 16))
        .await;

    assert_eq!(result, summary(1, 1, 0, 0, 1));
}

// ============================================
// Reparto job
// ============================================

#[tokio::test]
async fn test_reparto_friday_plus_one_targets_monday() {
    let friday = date(2026, 2, 20);
    let monday = date(2026, 2, 23);

    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_reparto_profiles()
        .returning(|| Ok(vec![reparto_profile("uid-1", "000962", Some(1))]));

    let mut repartos = MockRepartos::new();
    repartos
        .expect_fetch_repartos_by_customer()
        .with(eq("000962"), eq(monday))
        .times(1)
        .returning(move |clt, target| Ok(vec![route(clt, target, 1, 0)]));

    let sink = Arc::new(InMemorySink::new());
    let result = reparto_job(directory, repartos, sink.clone())
        .run_on(friday)
        .await;

    assert_eq!(result, summary(1, 1, 1, 0, 0));
    let stored = sink.stored();
    assert_eq!(stored[0].source_key, "reparto:000962:1:0:2026-02-23");
    assert_eq!(stored[0].event_date, monday);
    assert!(stored[0].body.starts_with("Cargamos para su zona el 23/02/2026."));
}

#[tokio::test]
async fn test_reparto_default_notice_is_two_business_days() {
    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_reparto_profiles()
        .returning(|| Ok(vec![reparto_profile("uid-1", "000962", None)]));

    let mut repartos = MockRepartos::new();
    repartos
        .expect_fetch_repartos_by_customer()
        .with(eq("000962"), eq(date(2026, 2, 24)))
        .times(1)
        .returning(|_, _| Ok(vec![]));

    let sink = Arc::new(InMemorySink::new());
    let result = reparto_job(directory, repartos, sink)
        .run_on(date(2026, 2, 20))
        .await;

    assert_eq!(result, summary(1, 0, 0, 0, 0));
}

#[tokio::test]
async fn test_reparto_one_notification_per_route() {
    let target = date(2026, 2, 18);
    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_reparto_profiles()
        .returning(|| Ok(vec![reparto_profile("uid-1", "000962", Some(2))]));

    let mut repartos = MockRepartos::new();
    repartos
        .expect_fetch_repartos_by_customer()
        .returning(|clt, target| {
            Ok(vec![
                route(clt, target, 1, 0),
                route(clt, target, 1, 1),
                route(clt, target, 2, 0),
            ])
        });

    let sink = Arc::new(InMemorySink::new());
    let result = reparto_job(directory, repartos, sink.clone())
        .run_on(date(2026, 2, 16))
        .await;

    assert_eq!(result, summary(1, 3, 3, 0, 0));
    assert!(sink.keys().iter().all(|k| k.ends_with(&target.to_string())));
}

#[tokio::test]
async fn test_reparto_negative_notice_and_query_failure_are_counted() {
    let mut directory = MockDirectory::new();
    directory.expect_fetch_reparto_profiles().returning(|| {
        Ok(vec![
            reparto_profile("uid-1", "000001", Some(-1)),
            reparto_profile("uid-2", "000002", Some(1)),
            reparto_profile("uid-3", "000003", Some(1)),
        ])
    });

    let mut repartos = MockRepartos::new();
    repartos
        .expect_fetch_repartos_by_customer()
        .with(eq("000002"), always())
        .returning(|_, _| Err(RecordQueryError::Database(sqlx::Error::PoolTimedOut)));
    repartos
        .expect_fetch_repartos_by_customer()
        .with(eq("000003"), always())
        .returning(|clt, target| Ok(vec![route(clt, target, 4, 2)]));

    let sink = Arc::new(InMemorySink::new());
    let result = reparto_job(directory, repartos, sink)
        .run_on(date(2026, 2, 16))
        .await;

    assert_eq!(result, summary(3, 1, 1, 0, 2));
}

#[tokio::test]
async fn test_reparto_directory_failure_aborts() {
    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_reparto_profiles()
        .returning(|| Err(DirectoryError::Unavailable("request timed out".to_string())));

    let mut repartos = MockRepartos::new();
    repartos.expect_fetch_repartos_by_customer().times(0);

    let sink = Arc::new(InMemorySink::new());
    let result = reparto_job(directory, repartos, sink)
        .run_on(date(2026, 2, 16))
        .await;

    assert_eq!(result, JobSummary::aborted());
}

// ============================================
// Offer job
// ============================================

fn offers_dir(files: &[&str]) -> TempDir {
    let base = TempDir::new().unwrap();
    let offers = base.path().join("offers");
    std::fs::create_dir_all(&offers).unwrap();
    for file in files {
        std::fs::write(offers.join(file), b"%PDF-1.4").unwrap();
    }
    base
}

#[tokio::test]
async fn test_offer_announced_once_per_recipient_then_deduplicated() {
    let base = offers_dir(&["oferta_20260301.pdf", "oferta_20260101.pdf"]);
    let offers = Arc::new(FsOfferStore::new(base.path(), "oferta", "pdf").unwrap());
    let sink = Arc::new(InMemorySink::new());
    let today = date(2026, 2, 18);

    for expected in [summary(3, 1, 3, 0, 0), summary(3, 1, 0, 3, 0)] {
        let mut directory = MockDirectory::new();
        directory
            .expect_fetch_active_recipient_ids()
            .times(1)
            .returning(|| Ok(vec!["u1".to_string(), "u2".to_string(), "u3".to_string()]));

        let job = OfferJob::new(Arc::new(directory), offers.clone(), sink.clone(), Madrid);
        let result = job.run_on(today).await;
        assert_eq!(result, expected);
        assert_eq!(result.delivered(), 3);
    }

    // Every recipient shares the same key for the same offer
    assert_eq!(sink.keys(), vec!["oferta:2026-03-01".to_string(); 3]);
}

#[tokio::test]
async fn test_offer_absent_skips_directory() {
    let mut offers = MockOffers::new();
    offers
        .expect_fetch_active_offer()
        .with(eq(date(2026, 2, 18)))
        .returning(|_| None);

    let mut directory = MockDirectory::new();
    directory.expect_fetch_active_recipient_ids().times(0);

    let sink = Arc::new(InMemorySink::new());
    let job = OfferJob::new(Arc::new(directory), Arc::new(offers), sink, Madrid);

    assert_eq!(job.run_on(date(2026, 2, 18)).await, JobSummary::default());
}

#[tokio::test]
async fn test_offer_directory_failure_aborts() {
    let mut offers = MockOffers::new();
    offers.expect_fetch_active_offer().returning(|_| {
        Some(OfferRecord {
            expiry: date(2026, 3, 1),
            file_name: "oferta_20260301.pdf".to_string(),
        })
    });

    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_active_recipient_ids()
        .returning(|| Err(DirectoryError::Unavailable("status 502".to_string())));

    let sink = Arc::new(InMemorySink::new());
    let job = OfferJob::new(Arc::new(directory), Arc::new(offers), sink.clone(), Madrid);

    assert_eq!(job.run_on(date(2026, 2, 18)).await, JobSummary::aborted());
    assert!(sink.stored().is_empty());
}

#[tokio::test]
async fn test_offer_without_recipients_considers_no_record() {
    let base = offers_dir(&["oferta_20260301.pdf"]);
    let offers = Arc::new(FsOfferStore::new(base.path(), "oferta", "pdf").unwrap());

    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_active_recipient_ids()
        .returning(|| Ok(vec![]));

    let sink = Arc::new(InMemorySink::new());
    let job = OfferJob::new(Arc::new(directory), offers, sink, Madrid);

    assert_eq!(job.run_on(date(2026, 2, 18)).await, JobSummary::default());
}

#[test]
fn test_offer_job_runs_on_blocking_executor() {
    let base = offers_dir(&["oferta_20260220.pdf"]);
    let offers = Arc::new(FsOfferStore::new(base.path(), "oferta", "pdf").unwrap());

    let mut directory = MockDirectory::new();
    directory
        .expect_fetch_active_recipient_ids()
        .returning(|| Ok(vec!["u1".to_string()]));

    let sink = Arc::new(InMemorySink::new());
    let job = OfferJob::new(Arc::new(directory), offers, sink.clone(), Madrid);

    let result = tokio_test::block_on(job.run_on(date(2026, 2, 20)));

    assert_eq!(result, summary(1, 1, 1, 0, 0));
    assert_eq!(sink.stored()[0].body, "Hay una nueva oferta disponible hasta el 20/02/2026.");
}
