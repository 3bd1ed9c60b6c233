//! CLI command implementations.

use crate::colors;
use crate::exit_codes::ExitCode;
use crate::{CropOptions, PermissionMode};
use camscan_common::{CropViewport, ImageOrientation, PermissionState, SessionState};
use camscan_service::capture::thumbnail::{
    preview_jpeg_base64, PREVIEW_MAX_HEIGHT, PREVIEW_MAX_WIDTH,
};
use camscan_service::capture::{load_still, CroppedResult, ScriptedPermission, StillImageDevice};
use camscan_service::config::{self, AppConfig};
use camscan_service::crop::apply_viewport;
use camscan_service::export::{self, ExportFormat};
use camscan_service::{AlertChannel, CameraService, CaptureError, ServiceConfig};
use serde_json::json;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Arguments of the `scan` command.
#[derive(Debug)]
pub struct ScanRequest {
    pub input: PathBuf,
    pub options: CropOptions,
    pub permission: PermissionMode,
    pub latency_ms: u64,
    pub preview: bool,
}

impl PermissionMode {
    fn provider(self) -> ScriptedPermission {
        match self {
            PermissionMode::Granted => ScriptedPermission::authorized(),
            PermissionMode::Denied => ScriptedPermission::new(PermissionState::Denied, false),
            PermissionMode::PromptGrant => {
                ScriptedPermission::new(PermissionState::NotDetermined, true)
            }
            PermissionMode::PromptDeny => {
                ScriptedPermission::new(PermissionState::NotDetermined, false)
            }
        }
    }
}

fn report_error(json: bool, quiet: bool, kind: &str, msg: &str) {
    if json {
        println!("{}", json!({ "error": kind, "message": msg }));
    } else if !quiet {
        eprintln!("{}", colors::error(msg));
    }
}

/// Resolve where a result is written: explicit path, else a timestamped
/// JPEG in the configured output directory.
fn resolve_output(output: Option<&Path>, config: &AppConfig) -> Result<PathBuf, String> {
    match output {
        Some(path) => Ok(path.to_path_buf()),
        None => {
            let dir = config::get_output_dir(config)?;
            Ok(export::default_output_path(&dir, ExportFormat::Jpeg))
        }
    }
}

fn orientation_for(options: &CropOptions, config: &AppConfig) -> ImageOrientation {
    options.orientation.unwrap_or(config.capture.orientation)
}

fn save(
    result: &CroppedResult,
    options: &CropOptions,
    config: &AppConfig,
    json: bool,
    quiet: bool,
) -> Result<PathBuf, ExitCode> {
    let path = resolve_output(options.output.as_deref(), config).map_err(|e| {
        report_error(json, quiet, "output_dir", &e);
        ExitCode::ExportFailed
    })?;

    export::save_result(result, &path, config.output.jpeg_quality).map_err(|e| {
        report_error(json, quiet, "export", &e.to_string());
        ExitCode::from(&e)
    })?;
    Ok(path)
}

fn print_result(result: &CroppedResult, path: &Path, fallback: Option<&str>, quiet: bool) {
    if quiet {
        println!("{}", path.display());
        return;
    }

    if let Some(reason) = fallback {
        eprintln!("{}", colors::warning(&format!("Crop skipped: {}", reason)));
    }
    let size = format!("{}x{}", result.width, result.height);
    match result.crop_rect {
        Some(rect) => println!(
            "{} {} {}",
            colors::bold("Cropped:"),
            colors::number(&size),
            colors::dim(&format!(
                "(x={}, y={}, w={}, h={})",
                rect.x, rect.y, rect.width, rect.height
            ))
        ),
        None => println!("{} {}", colors::bold("Uncropped:"), colors::number(&size)),
    }
    println!(
        "{} {}",
        colors::success("Saved:"),
        colors::path(&path.display().to_string())
    );
}

/// Crop a still image to the requested viewport and save it.
pub fn crop(input: &Path, options: &CropOptions, json: bool, quiet: bool) -> ExitCode {
    let config = config::load_config();

    let raw = match load_still(input, orientation_for(options, &config)) {
        Ok(raw) => raw,
        Err(e) => {
            report_error(json, quiet, "input", &e.to_string());
            return ExitCode::InputUnreadable;
        }
    };
    let (source_width, source_height) = (raw.width, raw.height);

    let viewport = options
        .viewport()
        .or(config.capture.default_aspect.map(CropViewport::AspectFill));
    debug!("Cropping {:?} with viewport {:?}", input, viewport);

    let outcome = apply_viewport(raw, viewport.as_ref());
    let fallback = outcome.fallback.as_ref().map(|e| e.to_string());

    let path = match save(&outcome.image, options, &config, json, quiet) {
        Ok(path) => path,
        Err(code) => return code,
    };

    if json {
        println!(
            "{}",
            json!({
                "path": path,
                "source": { "width": source_width, "height": source_height },
                "width": outcome.image.width,
                "height": outcome.image.height,
                "crop_rect": outcome.image.crop_rect,
                "orientation": outcome.image.orientation,
                "fallback": fallback,
            })
        );
    } else {
        print_result(&outcome.image, &path, fallback.as_deref(), quiet);
    }
    ExitCode::Success
}

/// Run a full session: permission, start, capture, crop, save, shutdown.
///
/// The device is released before returning, also when `interrupt` fires.
pub async fn scan(
    request: ScanRequest,
    json: bool,
    quiet: bool,
    interrupt: impl Future<Output = ()>,
) -> ExitCode {
    let config = config::load_config();

    let frame = match load_still(&request.input, orientation_for(&request.options, &config)) {
        Ok(frame) => frame,
        Err(e) => {
            report_error(json, quiet, "input", &e.to_string());
            return ExitCode::InputUnreadable;
        }
    };

    let device =
        StillImageDevice::new(frame).with_latency(Duration::from_millis(request.latency_ms));
    let permission = request
        .permission
        .provider()
        .with_prompt_delay(Duration::from_millis(request.latency_ms));
    let (service, mut alerts) = CameraService::new(
        Box::new(device),
        Arc::new(permission),
        ServiceConfig::from(&config),
    );

    let work = run_scan(&service, &mut alerts, &request, &config, json, quiet);
    match service.run_until(work, interrupt).await {
        Some(code) => code,
        None => {
            if !quiet {
                eprintln!("{}", colors::warning("Interrupted"));
            }
            ExitCode::Interrupted
        }
    }
}

async fn run_scan(
    service: &CameraService,
    alerts: &mut AlertChannel,
    request: &ScanRequest,
    config: &AppConfig,
    json: bool,
    quiet: bool,
) -> ExitCode {
    let start = service.start().await;
    if !json && !quiet {
        println!(
            "{} {}",
            colors::bold("Session:"),
            colors::state(service.state())
        );
    }

    let result = match start {
        Ok(_) => service.capture(request.options.viewport()).await,
        Err(e) => Err(e),
    };

    let result = match result {
        Ok(result) => result,
        Err(e) => return report_capture_error(&e, alerts, service.state(), json, quiet),
    };

    let path = match save(&result, &request.options, config, json, quiet) {
        Ok(path) => path,
        Err(code) => return code,
    };

    if json {
        let mut out = json!({
            "state": service.state(),
            "path": path,
            "width": result.width,
            "height": result.height,
            "crop_rect": result.crop_rect,
            "orientation": result.orientation,
        });
        if request.preview {
            match preview_jpeg_base64(&result, PREVIEW_MAX_WIDTH, PREVIEW_MAX_HEIGHT) {
                Ok((data, width, height)) => {
                    out["preview"] = json!({
                        "data_uri": format!("data:image/jpeg;base64,{}", data),
                        "width": width,
                        "height": height,
                    });
                }
                Err(e) => debug!("Preview encoding failed: {}", e),
            }
        }
        println!("{}", out);
    } else {
        let fallback = match (request.options.viewport(), result.crop_rect) {
            (Some(_), None) => Some("viewport produced no usable crop"),
            _ => None,
        };
        print_result(&result, &path, fallback, quiet);
    }

    service.stop().await;
    ExitCode::Success
}

fn report_capture_error(
    err: &CaptureError,
    alerts: &mut AlertChannel,
    state: SessionState,
    json: bool,
    quiet: bool,
) -> ExitCode {
    let alert = alerts.poll().cloned();

    if json {
        println!(
            "{}",
            json!({
                "error": "capture",
                "message": err.to_string(),
                "state": state,
                "alert": alert,
            })
        );
    } else if !quiet {
        match alert {
            Some(alert) => eprintln!(
                "{}",
                colors::error(&format!("{}: {}", alert.title, alert.message))
            ),
            None => eprintln!("{}", colors::error(&err.to_string())),
        }
        eprintln!("{} {}", colors::bold("Session:"), colors::state(state));
    }
    ExitCode::from(err)
}

/// Print the effective configuration.
pub fn config_show(json: bool) -> ExitCode {
    let config = config::load_config();

    if json {
        match serde_json::to_string_pretty(&config) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                report_error(true, false, "config", &e.to_string());
                return ExitCode::GeneralError;
            }
        }
        return ExitCode::Success;
    }

    let output_dir = config::get_output_dir(&config)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|e| format!("<{}>", e));
    let aspect = config
        .capture
        .default_aspect
        .map(|a| format!("{}:{}", a.width, a.height))
        .unwrap_or_else(|| "none".to_string());

    println!("{} {}", colors::bold("Output directory:"), colors::path(&output_dir));
    println!(
        "{} {}",
        colors::bold("JPEG quality:"),
        colors::number(&config.output.jpeg_quality.to_string())
    );
    println!("{} {}", colors::bold("Default aspect:"), aspect);
    println!(
        "{} {:?}",
        colors::bold("Orientation:"),
        config.capture.orientation
    );
    ExitCode::Success
}

/// Print the configuration file path.
pub fn config_path(json: bool) -> ExitCode {
    match config::get_config_path() {
        Ok(path) => {
            if json {
                println!("{}", json!({ "path": path }));
            } else {
                println!("{}", path.display());
            }
            ExitCode::Success
        }
        Err(e) => {
            report_error(json, false, "config", &e);
            ExitCode::GeneralError
        }
    }
}

/// Show version information.
pub fn version(json: bool) {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!("{}", json!({ "version": version }));
    } else {
        println!("{} {}", colors::bold("camscan"), version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camscan_service::capture::RawCapturedImage;

    fn options(output: Option<PathBuf>) -> CropOptions {
        CropOptions {
            rect: None,
            aspect: None,
            output,
            orientation: None,
        }
    }

    #[test]
    fn test_permission_modes() {
        use camscan_service::PermissionProvider;
        assert_eq!(
            PermissionMode::Granted.provider().current_status(),
            PermissionState::Authorized
        );
        assert_eq!(
            PermissionMode::Denied.provider().current_status(),
            PermissionState::Denied
        );
        assert_eq!(
            PermissionMode::PromptDeny.provider().current_status(),
            PermissionState::NotDetermined
        );
    }

    #[test]
    fn test_resolve_output_prefers_explicit_path() {
        let config = AppConfig::default();
        let path = resolve_output(Some(Path::new("/tmp/x.png")), &config).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x.png"));
    }

    #[test]
    fn test_resolve_output_uses_configured_dir() {
        let mut config = AppConfig::default();
        config.output.directory = Some("/srv/scans".to_string());
        let path = resolve_output(None, &config).unwrap();
        assert!(path.starts_with("/srv/scans"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
    }

    fn scan_request(input: PathBuf, output: PathBuf) -> ScanRequest {
        ScanRequest {
            input,
            options: options(Some(output)),
            permission: PermissionMode::Granted,
            latency_ms: 0,
            preview: false,
        }
    }

    fn write_still(path: &Path) {
        let raw = RawCapturedImage::new(6, 4, vec![128; 96], ImageOrientation::Up).unwrap();
        export::save_result(&CroppedResult::uncropped(raw), path, 90).unwrap();
    }

    #[tokio::test]
    async fn test_scan_saves_result() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.png");
        let output = dir.path().join("scan.png");
        write_still(&input);

        let code = scan(
            scan_request(input, output.clone()),
            false,
            true,
            std::future::pending(),
        )
        .await;
        assert_eq!(code, ExitCode::Success);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_scan_interrupted_before_capture() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.png");
        let output = dir.path().join("scan.png");
        write_still(&input);

        let code = scan(
            scan_request(input, output.clone()),
            false,
            true,
            std::future::ready(()),
        )
        .await;
        assert_eq!(code, ExitCode::Interrupted);
        assert!(!output.exists());
    }

    #[test]
    fn test_orientation_falls_back_to_config() {
        let mut config = AppConfig::default();
        config.capture.orientation = ImageOrientation::Right;
        assert_eq!(orientation_for(&options(None), &config), ImageOrientation::Right);

        let mut explicit = options(None);
        explicit.orientation = Some(ImageOrientation::Down);
        assert_eq!(orientation_for(&explicit, &config), ImageOrientation::Down);
    }
}
