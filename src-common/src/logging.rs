//! Platform-specific logging directory resolution.

use std::path::PathBuf;

/// Returns the platform-appropriate directory for log files.
///
/// | Platform | Directory |
/// |----------|-----------|
/// | Linux | `$XDG_STATE_HOME/camscan/logs` or `~/.local/state/camscan/logs` |
/// | macOS | `~/Library/Logs/camscan` |
/// | Windows | `%LOCALAPPDATA%\camscan\camscan\logs` |
///
/// Falls back to `./camscan-logs` when no home directory can be resolved.
pub fn log_dir() -> PathBuf {
    let Some(base) = directories::ProjectDirs::from("", "", "camscan") else {
        return PathBuf::from("camscan-logs");
    };

    #[cfg(target_os = "linux")]
    {
        base.state_dir()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| base.data_local_dir().join("state"))
            .join("logs")
    }

    #[cfg(target_os = "macos")]
    {
        // data_local_dir is ~/Library/Application Support/camscan; walk up to ~/Library.
        let library = base
            .data_local_dir()
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| base.data_local_dir().to_path_buf());
        library.join("Logs").join("camscan")
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        base.data_local_dir().join("logs")
    }
}

/// Ensures the log directory exists, creating it if necessary.
pub fn ensure_log_dir() -> Result<PathBuf, std::io::Error> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// File name prefix for the rolling service log.
///
/// The rolling appender creates dated files such as
/// `camscan-service.2026-03-01.log` inside [`log_dir`].
pub const SERVICE_LOG_PREFIX: &str = "camscan-service";
