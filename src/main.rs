//! shield-edge — edge data platform for shield-tunneling operations.
//!
//! Wires the collection, quality, buffering, ring-alignment, warning,
//! notification, and work-order stages into one supervised process,
//! following the reference's `main.rs` JoinSet-supervisor pattern
//! (`examples/ashton-dyke-SAIREN-OS/src/main.rs`): one task per
//! independent subsystem, a shared `CancellationToken` for cooperative
//! shutdown, `Ctrl+C` triggering the shutdown sequence from section 5.
//!
//! # Usage
//!
//! ```bash
//! # Run with configured HTTP monitoring endpoints plus the query API
//! cargo run --release
//!
//! # Replay recorded samples (JSON lines, one Sample per line) from stdin
//! ./wits-simulation | cargo run --release -- --stdin
//! ```
//!
//! # Environment Variables
//!
//! - `SHIELD_EDGE_CONFIG`: path to the process TOML config.
//! - `SHIELD_EDGE_SERVER_ADDR`: HTTP bind address (default `0.0.0.0:8080`).
//! - `SHIELD_EDGE_DATA_DIR`: sled data directory (default `./data`).
//! - `SHIELD_EDGE_MINIMAL_HEALTH` / `SHIELD_EDGE_STUB_API` /
//!   `SHIELD_EDGE_SKIP_SOURCE_MANAGER` / `SHIELD_EDGE_DISABLE_LIFESPAN`:
//!   operational-mode toggles (section 6).
//! - `RESET_DB`: wipes the data directory on startup when `true`.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use shield_edge::api::{create_app, AppState};
use shield_edge::buffer::BufferWriter;
use shield_edge::collectors::http_polling::HttpMonitoringCollector;
use shield_edge::collectors::Collector;
use shield_edge::config::calibration::CalibrationConfig;
use shield_edge::config::geometry::AlignmentGeometry;
use shield_edge::config::reasonableness::ReasonablenessConfig;
use shield_edge::config::sources::SourcesConfig;
use shield_edge::config::thresholds::{ThresholdCache, ThresholdsDocument};
use shield_edge::config::validation::ValidationConfig;
use shield_edge::config::{self, ProcessConfig};
use shield_edge::notification::channels::{Channel, EmailSink, LoggingEmailTransport, LoggingSmsTransport, SmsSink};
use shield_edge::notification::NotificationRegistry;
use shield_edge::pipeline::{PipelineConfig, PipelineRuntime};
use shield_edge::quality::calibrator::Calibrator;
use shield_edge::quality::threshold::ThresholdValidator;
use shield_edge::quality::QualityPipeline;
use shield_edge::scheduler::Scheduler;
use shield_edge::storage::Store;
use shield_edge::types::{now, Sample};
use shield_edge::warning::engine::WarningEngine;
use shield_edge::warning::predictive_checker::StorePredictionSource;
use shield_edge::work_order::WorkOrderGenerator;

const ALIGN_RING_INTERVAL_SECONDS: f64 = 60.0;
const BUFFER_FLUSH_INTERVAL_SECONDS: f64 = 5.0;
const RETRY_SWEEP_INTERVAL_SECONDS: f64 = 30.0;
const RETRY_CLEANUP_INTERVAL_SECONDS: f64 = 3600.0;

#[derive(Parser, Debug)]
#[command(name = "shield-edge")]
#[command(about = "Shield-tunneling edge data platform: collection, quality, ring alignment, warning engine")]
#[command(version)]
struct CliArgs {
    /// Read samples as JSON lines from stdin instead of (or alongside)
    /// configured collectors — the same replay mode the simulation
    /// binary's output is meant to feed.
    #[arg(long)]
    stdin: bool,

    /// Override the HTTP server bind address.
    #[arg(short, long)]
    addr: Option<String>,

    /// Directory holding the five YAML configuration documents
    /// (sources.yaml, thresholds.yaml, calibration.yaml,
    /// reasonableness.yaml, geometry.yaml, validation.yaml). Missing
    /// files fall back to built-in defaults (section 7:
    /// `ConfigurationMissing` is permissive outside the warning engine).
    #[arg(long, default_value = "./config")]
    config_dir: String,

    /// Wipe the data directory before starting. Can also be set via
    /// `RESET_DB=true`.
    #[arg(long)]
    reset_db: bool,
}

fn should_reset_db(cli_flag: bool) -> bool {
    cli_flag
        || std::env::var("RESET_DB")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
}

fn reset_data_directory(data_dir: &str) -> anyhow::Result<()> {
    let path = std::path::Path::new(data_dir);
    if !path.exists() {
        return Ok(());
    }
    warn!("RESET_DB requested — removing {}", path.display());
    std::fs::remove_dir_all(path).context("failed to remove data directory")?;
    Ok(())
}

fn load_or_default<T: Default>(path: std::path::PathBuf, load: impl FnOnce(&std::path::Path) -> anyhow::Result<T>) -> T {
    if path.exists() {
        match load(&path) {
            Ok(value) => {
                info!(path = %path.display(), "loaded configuration document");
                return value;
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to parse configuration document, using defaults");
            }
        }
    } else {
        info!(path = %path.display(), "configuration document not found, using defaults");
    }
    T::default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = CliArgs::parse();

    let mut process_config = ProcessConfig::load();
    if let Some(addr) = args.addr.clone() {
        process_config.server_addr = addr;
    }
    config::init(process_config.clone());

    if should_reset_db(args.reset_db) {
        reset_data_directory(&process_config.data_dir)?;
    }

    info!(data_dir = %process_config.data_dir, addr = %process_config.server_addr, "starting shield-edge");

    let store = Store::open(&process_config.data_dir).context("failed to open store")?;

    let config_dir = std::path::PathBuf::from(&args.config_dir);
    let sources: SourcesConfig = load_or_default(config_dir.join("sources.yaml"), |p| SourcesConfig::load_yaml(p));
    let thresholds_doc: ThresholdsDocument = load_or_default(config_dir.join("thresholds.yaml"), |p| ThresholdsDocument::load_yaml(p));
    let calibration: CalibrationConfig = load_or_default(config_dir.join("calibration.yaml"), |p| CalibrationConfig::load_yaml(p));
    let reasonableness: ReasonablenessConfig = load_or_default(config_dir.join("reasonableness.yaml"), |p| ReasonablenessConfig::load_yaml(p));
    let geometry: AlignmentGeometry = load_or_default(config_dir.join("geometry.yaml"), |p| AlignmentGeometry::load_yaml(p));
    let validation: ValidationConfig = load_or_default(config_dir.join("validation.yaml"), |p| ValidationConfig::load_yaml(p));

    // Seed the durable warning_thresholds table from the YAML document on
    // first run only — operators edit the durable table via API/DB tools
    // afterward, and a restart shouldn't clobber their changes.
    if store.list_warning_thresholds().unwrap_or_default().is_empty() {
        for threshold in &thresholds_doc.thresholds {
            if let Err(err) = store.put_warning_threshold(threshold) {
                error!(indicator = %threshold.indicator_name, error = %err, "failed to seed warning threshold");
            }
        }
    }
    let threshold_cache = Arc::new(ThresholdCache::new(store.list_warning_thresholds().unwrap_or_default()));

    let quality_pipeline = QualityPipeline::new(ThresholdValidator::new(validation.to_bounds_map()), Calibrator::new(calibration.calibrations));

    let buffer = Arc::new(BufferWriter::with_defaults(store.clone()));

    let email_sink = Arc::new(EmailSink::new(LoggingEmailTransport));
    let sms_sink = Arc::new(SmsSink::new(LoggingSmsTransport));
    let notifications = NotificationRegistry::new(email_sink, sms_sink);

    let prediction_source = Arc::new(StorePredictionSource { store: store.clone() });
    let warning_engine = Arc::new(WarningEngine::new(store.clone(), threshold_cache, prediction_source, notifications.clone()));

    let work_orders = Arc::new(WorkOrderGenerator::new(store.clone()));
    {
        let work_orders = Arc::clone(&work_orders);
        warning_engine.register_on_warnings(move |warnings| {
            let orders = work_orders.generate_batch(warnings, now());
            if !orders.is_empty() {
                info!(count = orders.len(), "work orders generated from ring evaluation");
            }
        });
    }

    let pipeline = Arc::new(PipelineRuntime::new(
        store.clone(),
        Arc::clone(&buffer),
        quality_pipeline,
        Arc::clone(&warning_engine),
        Arc::clone(&work_orders),
        geometry,
        PipelineConfig { reasonableness, ..Default::default() },
    ));

    let scheduler = Arc::new(Scheduler::new());
    {
        let pipeline = Arc::clone(&pipeline);
        scheduler.register("align_ring", ALIGN_RING_INTERVAL_SECONDS, true, move || {
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.align_next_ring().await }
        });
    }
    {
        let buffer = Arc::clone(&buffer);
        scheduler.register("buffer_flush", BUFFER_FLUSH_INTERVAL_SECONDS, true, move || {
            let buffer = Arc::clone(&buffer);
            async move {
                buffer.flush(now())?;
                Ok(())
            }
        });
    }
    {
        let notifications = notifications.clone();
        scheduler.register("notification_retry", RETRY_SWEEP_INTERVAL_SECONDS, true, move || {
            let notifications = notifications.clone();
            async move {
                notifications
                    .retry
                    .run_due_tasks(|task| {
                        let notifications = notifications.clone();
                        async move {
                            let sink = match task.channel {
                                Channel::Email => &notifications.email,
                                Channel::Sms => &notifications.sms,
                                Channel::Webhook | Channel::Broadcast => return Ok(()),
                            };
                            sink.send(&task.recipient, &task.subject, &task.body, &Default::default()).await
                        }
                    })
                    .await;
                Ok(())
            }
        });
    }
    {
        let notifications = notifications.clone();
        scheduler.register("notification_retry_cleanup", RETRY_CLEANUP_INTERVAL_SECONDS, true, move || {
            let notifications = notifications.clone();
            async move {
                notifications.retry.cleanup_expired();
                Ok(())
            }
        });
    }

    let app_state = AppState {
        store: store.clone(),
        buffer: Arc::clone(&buffer),
        warning_engine: Arc::clone(&warning_engine),
        work_orders: Arc::clone(&work_orders),
        notifications: notifications.clone(),
        scheduler: Arc::clone(&scheduler),
        started_at: std::time::Instant::now(),
    };
    let app = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&process_config.server_addr)
        .await
        .with_context(|| format!("failed to bind to {}", process_config.server_addr))?;
    info!(addr = %process_config.server_addr, "query API listening");

    let cancel_token = CancellationToken::new();
    let mut tasks: JoinSet<anyhow::Result<&'static str>> = JoinSet::new();

    {
        let cancel = cancel_token.clone();
        tasks.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
                .context("HTTP server error")?;
            Ok("http_server")
        });
    }

    {
        let scheduler = Arc::clone(&scheduler);
        tasks.spawn(async move {
            scheduler.run().await;
            Ok("scheduler")
        });
    }

    // The PLC subscription and guidance polling collectors are generic
    // over a `PlcTagTransport`/`RegisterTransport` implementation — the
    // actual OPC-UA/Modbus wire protocol is vendor-specific and out of
    // scope for this crate (section 1). A deployment links in its own
    // transport and constructs the collector directly; this process only
    // logs that the source is configured and waiting on one.
    if let Some(plc) = &sources.plc {
        info!(endpoint = %plc.endpoint, tags = plc.tags.len(), "plc source configured; awaiting a linked-in PlcTagTransport");
    }
    if let Some(guidance) = &sources.guidance {
        info!(endpoint = %guidance.endpoint, "guidance source configured; awaiting a linked-in RegisterTransport");
    }

    if !process_config.skip_source_manager {
        for endpoint in sources.monitoring_endpoints.clone() {
            let collector = Arc::new(HttpMonitoringCollector::new(endpoint));
            let (tx, mut rx) = mpsc::channel::<Sample>(1000);
            let pipeline = Arc::clone(&pipeline);
            let collector_for_start = Arc::clone(&collector);
            tasks.spawn(async move {
                collector_for_start.start(tx).await;
                Ok("monitoring_collector")
            });
            let cancel = cancel_token.clone();
            tasks.spawn(async move {
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        sample = rx.recv() => {
                            match sample {
                                Some(sample) => { pipeline.ingest_sample(sample).await; }
                                None => break,
                            }
                        }
                    }
                }
                Ok("monitoring_consumer")
            });
            let stop_collector = collector;
            let cancel = cancel_token.clone();
            tasks.spawn(async move {
                cancel.cancelled().await;
                stop_collector.stop();
                Ok("monitoring_stop_watcher")
            });
        }
    }

    if args.stdin {
        let pipeline = Arc::clone(&pipeline);
        let cancel = cancel_token.clone();
        tasks.spawn(async move {
            let stdin = tokio::io::stdin();
            let mut reader = BufReader::new(stdin);
            let mut line = String::new();
            let mut accepted = 0u64;
            loop {
                line.clear();
                tokio::select! {
                    () = cancel.cancelled() => break,
                    read = reader.read_line(&mut line) => {
                        match read {
                            Ok(0) => break,
                            Ok(_) => {
                                let trimmed = line.trim();
                                if trimmed.is_empty() { continue }
                                match serde_json::from_str::<Sample>(trimmed) {
                                    Ok(sample) => {
                                        pipeline.ingest_sample(sample).await;
                                        accepted += 1;
                                    }
                                    Err(err) => warn!(error = %err, "failed to parse stdin sample"),
                                }
                            }
                            Err(err) => {
                                error!(error = %err, "stdin read error");
                                break;
                            }
                        }
                    }
                }
            }
            info!(accepted, "stdin replay finished");
            Ok("stdin_ingestion")
        });
    }

    {
        let cancel = cancel_token.clone();
        tasks.spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown signal received");
            cancel.cancel();
            Ok("ctrl_c_watcher")
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(name)) => info!(task = name, "task exited"),
            Ok(Err(err)) => error!(error = %err, "task failed"),
            Err(err) => error!(error = %err, "task panicked"),
        }
        if cancel_token.is_cancelled() {
            break;
        }
    }

    // Shutdown sequence (section 5): stop accepting samples, drain and
    // flush the buffer, stop the scheduler, let retry tasks lapse.
    cancel_token.cancel();
    buffer.shutdown(now()).context("final buffer flush failed")?;
    scheduler.stop();
    info!("shield-edge shut down cleanly");
    Ok(())
}
