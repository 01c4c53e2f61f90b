//! Notification jobs - Main entry point
//!
//! Writes giro, reparto and offer notifications for portal customers on a
//! daily schedule.
//!
//! # Modes
//! - `scheduler` (default): cron triggers plus the /health and /metrics server
//! - `run-once --job giro|reparto|offer|all`: run now, print summaries as JSON
//! - `check-pools`: connect both ERP schemas and exit

use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use notification_jobs::{
    metrics,
    repositories::{GiroRepository, RepartoRepository},
    services::{FsOfferStore, SupabaseClient, SupabaseDirectory, SupabaseNotificationStore},
    Config, DbPools, GiroJob, JobKind, NotificationJob, NotificationScheduler, OfferJob,
    RepartoJob,
};
use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,notification_jobs=debug,sqlx=warn";

/// Service run mode
#[derive(Debug, Clone, PartialEq)]
enum RunMode {
    Scheduler,
    RunOnce(Vec<JobKind>),
    CheckPools,
}

impl RunMode {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = env::args().collect();
        Self::parse(&args)
    }

    /// An unknown `--mode` falls back to the scheduler. An unknown `--job` is
    /// rejected, since running the wrong jobs notifies real customers.
    fn parse(args: &[String]) -> Result<Self, String> {
        let value_of = |flag: &str| {
            args.iter()
                .position(|arg| arg == flag)
                .and_then(|i| args.get(i + 1))
                .map(String::as_str)
        };

        let mode = match value_of("--mode") {
            None | Some("scheduler") => RunMode::Scheduler,
            Some("check-pools") => RunMode::CheckPools,
            Some("run-once") => {
                let jobs = match value_of("--job") {
                    None | Some("all") => JobKind::ALL.to_vec(),
                    Some(name) => vec![name.parse::<JobKind>()?],
                };
                RunMode::RunOnce(jobs)
            }
            Some(other) => {
                warn!("Unknown mode '{}', using default 'scheduler'", other);
                RunMode::Scheduler
            }
        };
        Ok(mode)
    }
}

fn init_tracing() {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter())
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter())
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Wire adapters and jobs for the three notification types
fn build_jobs(config: &Config, pools: &DbPools) -> Result<Vec<Arc<dyn NotificationJob>>> {
    let (supabase_url, service_role_key) = config.supabase_credentials()?;
    let timezone = config.timezone()?;

    let directory = Arc::new(SupabaseDirectory::new(
        SupabaseClient::new(supabase_url, service_role_key, config.directory_timeout())
            .context("building profile directory client")?,
    ));
    let sink = Arc::new(SupabaseNotificationStore::new(
        SupabaseClient::new(supabase_url, service_role_key, config.sink_timeout())
            .context("building notification store client")?,
    ));
    let offers = Arc::new(
        FsOfferStore::new(
            config.pdf_base_dir.clone(),
            &config.offer_file_prefix,
            &config.offer_file_extension,
        )
        .context("invalid offer file name pattern")?,
    );
    let giros = Arc::new(GiroRepository::new(
        pools.finan.clone(),
        config.db_query_timeout(),
    ));
    let repartos = Arc::new(RepartoRepository::new(
        pools.ventas.clone(),
        config.db_query_timeout(),
    ));

    let jobs: Vec<Arc<dyn NotificationJob>> = vec![
        Arc::new(GiroJob::new(
            directory.clone(),
            giros,
            sink.clone(),
            config.giro_default_dias_aviso,
            timezone,
        )),
        Arc::new(RepartoJob::new(
            directory.clone(),
            repartos,
            sink.clone(),
            config.reparto_default_dias_aviso,
            timezone,
        )),
        Arc::new(OfferJob::new(directory, offers, sink, timezone)),
    ];
    Ok(jobs)
}

async fn run_scheduler(config: &Config, pools: &DbPools) -> Result<()> {
    let jobs = build_jobs(config, pools)?;
    let scheduled = jobs
        .into_iter()
        .map(|job| {
            let schedule = config.schedule(job.kind());
            (job, schedule)
        })
        .collect();
    let scheduler = NotificationScheduler::start(scheduled, config.timezone()?)
        .await
        .context("starting job scheduler")?;

    let addr = format!("0.0.0.0:{}", config.metrics_port);
    info!("Starting operations server on {}", addr);
    let server = HttpServer::new(|| {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
    })
    .workers(1)
    .disable_signals()
    .bind(&addr)?
    .run();
    let server_handle = server.handle();
    actix_rt::spawn(server);

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutdown signal received");

    if let Err(e) = scheduler.shutdown().await {
        error!("Failed to stop scheduler cleanly: {}", e);
    }
    server_handle.stop(true).await;
    Ok(())
}

async fn run_once(config: &Config, pools: &DbPools, kinds: &[JobKind]) -> Result<()> {
    let jobs = build_jobs(config, pools)?;
    let mut summaries = BTreeMap::new();

    for kind in kinds {
        for job in jobs.iter().filter(|job| job.kind() == *kind) {
            let summary = job.run().await;
            summaries.insert(kind.as_str(), summary);
        }
    }

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}

async fn check_pools(pools: &DbPools) -> Result<()> {
    let (ventas, finan) = pools.current_schemas().await?;
    info!(ventas = %ventas, finan = %finan, "Pools connected");
    if ventas == finan {
        anyhow::bail!("ventas and finan pools point to the same schema '{}'", ventas);
    }
    println!("ventas={} finan={}", ventas, finan);
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mode = RunMode::from_args().map_err(|e| {
        error!("Invalid arguments: {}", e);
        anyhow::anyhow!("Invalid arguments: {}", e)
    })?;
    info!("Starting notification jobs in {:?} mode", mode);

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    info!(app_env = %config.app_env, "Configuration loaded: {:?}", config);

    let pools = DbPools::connect(&config.mariadb_db, &config.mariadb_finan_db)
        .await
        .context("connecting to MariaDB")?;

    let result = match &mode {
        RunMode::Scheduler => run_scheduler(&config, &pools).await,
        RunMode::RunOnce(kinds) => run_once(&config, &pools, kinds).await,
        RunMode::CheckPools => check_pools(&pools).await,
    };

    pools.close().await;
    result
}
