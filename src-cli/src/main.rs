//! CamScan Command-Line Interface
//!
//! Crops still images the way the scanner screen crops camera photos, and
//! runs the full camera session flow against a still image standing in for
//! the camera.

mod colors;
mod commands;
mod exit_codes;

use camscan_common::{AspectSize, CropViewport, ImageOrientation, NormalizedRect};
use clap::{Args, Parser, Subcommand, ValueEnum};
use exit_codes::ExitCode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// CamScan - Camera Capture & Viewport Crop CLI
#[derive(Parser, Debug)]
#[command(name = "camscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crop a still image to a viewport
    Crop {
        /// Input image (png or jpeg)
        input: PathBuf,

        #[command(flatten)]
        options: CropOptions,
    },
    /// Run a full camera session against a still image
    Scan {
        /// Image served as the camera photo
        input: PathBuf,

        #[command(flatten)]
        options: CropOptions,

        /// Simulated camera permission
        #[arg(long, value_enum, default_value_t = PermissionMode::Granted)]
        permission: PermissionMode,

        /// Simulated shutter latency (milliseconds)
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,

        /// Include a base64 JPEG preview in JSON output
        #[arg(long)]
        preview: bool,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}

#[derive(Args, Debug, Clone)]
pub struct CropOptions {
    /// Normalized crop rectangle: x,y,width,height in [0, 1]
    #[arg(long, value_parser = parse_rect, conflicts_with = "aspect")]
    rect: Option<NormalizedRect>,

    /// Viewport aspect ratio for a centered fill crop, e.g. 3:4 or 300x400
    #[arg(long, value_parser = parse_aspect)]
    aspect: Option<AspectSize>,

    /// Output file path (png or jpg; overrides configured output directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Orientation tag of the input image (up, right, down_mirrored, ...)
    #[arg(long, value_parser = parse_orientation)]
    orientation: Option<ImageOrientation>,
}

impl CropOptions {
    /// Viewport selected on the command line, if any.
    pub fn viewport(&self) -> Option<CropViewport> {
        match (self.rect, self.aspect) {
            (Some(rect), _) => Some(CropViewport::Normalized(rect)),
            (None, Some(aspect)) => Some(CropViewport::AspectFill(aspect)),
            (None, None) => None,
        }
    }
}

/// Scripted answer of the simulated permission provider.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// Already authorized
    Granted,
    /// Already denied
    Denied,
    /// Not determined; the prompt grants access
    PromptGrant,
    /// Not determined; the prompt denies access
    PromptDeny,
}

fn parse_rect(s: &str) -> Result<NormalizedRect, String> {
    NormalizedRect::parse(s).ok_or_else(|| format!("expected x,y,width,height, got '{}'", s))
}

fn parse_aspect(s: &str) -> Result<AspectSize, String> {
    AspectSize::parse(s).ok_or_else(|| format!("expected W:H or WxH, got '{}'", s))
}

fn parse_orientation(s: &str) -> Result<ImageOrientation, String> {
    ImageOrientation::parse(s).ok_or_else(|| format!("unknown orientation '{}'", s))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Build the async runtime
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}", colors::error(&format!("Failed to create Tokio runtime: {}", e)));
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    };

    let exit_code = runtime.block_on(run(cli));
    std::process::exit(exit_code.as_i32());
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Commands::Crop { input, options } => commands::crop(&input, &options, cli.json, cli.quiet),
        Commands::Scan {
            input,
            options,
            permission,
            latency_ms,
            preview,
        } => {
            let scan = commands::ScanRequest {
                input,
                options,
                permission,
                latency_ms,
                preview,
            };
            commands::scan(scan, cli.json, cli.quiet, ctrl_c()).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(cli.json),
            ConfigAction::Path => commands::config_path(cli.json),
        },
        Commands::Version => {
            commands::version(cli.json);
            ExitCode::Success
        }
    }
}
