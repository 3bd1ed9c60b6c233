//! CamScan Service
//!
//! Runs one scan against a still image: start the session, capture a photo
//! cropped to the configured viewport, save it, and shut down.
//!
//! Usage: `camscan-service <image> [output]`

use camscan_common::logging::{ensure_log_dir, SERVICE_LOG_PREFIX};
use camscan_service::capture::{load_still, ScriptedPermission, StillImageDevice};
use camscan_service::config::{self, AppConfig};
use camscan_service::export::{self, ExportFormat};
use camscan_service::{CameraService, ServiceConfig};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Non-blocking daily rolling file writer in `dir`.
///
/// Lines are flushed to disk when the returned guard drops.
fn file_writer(dir: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(SERVICE_LOG_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .ok()?;
    Some(tracing_appender::non_blocking(appender))
}

/// Initialize logging to stderr and a daily rolling file.
///
/// The returned guard must outlive every log call that should reach the file.
fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    match ensure_log_dir().ok().and_then(|dir| file_writer(&dir)) {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            warn!("Log directory unavailable, logging to stderr only");
            None
        }
    }
}

fn main() -> ExitCode {
    // Dropped on return, which flushes the file log
    let _log_guard = init_logging();
    info!("CamScan Service starting (pid: {})...", std::process::id());

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        eprintln!("Usage: camscan-service <image> [output]");
        return ExitCode::from(2);
    };
    let output = args.next().map(PathBuf::from);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = config::load_config();
    let code = runtime.block_on(run(input, output, &config, ctrl_c()));

    info!("CamScan Service stopped");
    ExitCode::from(code)
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl+C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C");
}

/// Run one scan through the camera service and return the process exit code.
async fn run(
    input: PathBuf,
    output: Option<PathBuf>,
    config: &AppConfig,
    interrupt: impl Future<Output = ()>,
) -> u8 {
    let frame = match load_still(&input, config.capture.orientation) {
        Ok(frame) => frame,
        Err(e) => {
            error!("Scan failed: {}", e);
            return 1;
        }
    };
    let (service, mut alerts) = CameraService::new(
        Box::new(StillImageDevice::new(frame)),
        Arc::new(ScriptedPermission::authorized()),
        ServiceConfig::from(config),
    );

    let outcome = service
        .run_until(scan(&service, output, config), interrupt)
        .await;

    if let Some(alert) = alerts.poll() {
        warn!("{}: {}", alert.title, alert.message);
    }
    match outcome {
        Some(Ok(path)) => {
            info!("Scan saved to {}", path.display());
            0
        }
        Some(Err(e)) => {
            error!("Scan failed: {}", e);
            1
        }
        None => 130,
    }
}

async fn scan(
    service: &CameraService,
    output: Option<PathBuf>,
    config: &AppConfig,
) -> Result<PathBuf, String> {
    service.start().await?;
    let result = service.capture(None).await?;

    let path = match output {
        Some(path) => path,
        None => export::default_output_path(&config::get_output_dir(config)?, ExportFormat::Jpeg),
    };
    export::save_result(&result, &path, config.output.jpeg_quality)?;
    Ok(path)
}
