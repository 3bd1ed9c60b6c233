//! Terminal styling for CLI output.
//!
//! Styles apply only when the target stream is a terminal, so piped or
//! redirected output stays plain text.

use camscan_common::SessionState;
use owo_colors::OwoColorize;
use std::io::IsTerminal;

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn styled(self) -> bool {
        match self {
            Stream::Stdout => std::io::stdout().is_terminal(),
            Stream::Stderr => std::io::stderr().is_terminal(),
        }
    }
}

fn paint(stream: Stream, plain: &str, style: impl FnOnce(&str) -> String) -> String {
    if stream.styled() {
        style(plain)
    } else {
        plain.to_string()
    }
}

fn labelled(label: &str, msg: &str, style: impl FnOnce(&str) -> String) -> String {
    format!("{} {}", paint(Stream::Stderr, label, style), msg)
}

/// `error:` prefixed message for stderr.
pub fn error(msg: &str) -> String {
    labelled("error:", msg, |s| s.red().bold().to_string())
}

/// `warning:` prefixed message for stderr.
pub fn warning(msg: &str) -> String {
    labelled("warning:", msg, |s| s.yellow().bold().to_string())
}

pub fn success(msg: &str) -> String {
    paint(Stream::Stdout, msg, |s| s.green().to_string())
}

pub fn dim(msg: &str) -> String {
    paint(Stream::Stdout, msg, |s| s.dimmed().to_string())
}

/// Field labels such as `Saved:` and `Session:`.
pub fn bold(msg: &str) -> String {
    paint(Stream::Stdout, msg, |s| s.bold().to_string())
}

pub fn path(msg: &str) -> String {
    paint(Stream::Stdout, msg, |s| s.underline().to_string())
}

/// Pixel dimensions and settings values.
pub fn number(msg: &str) -> String {
    paint(Stream::Stdout, msg, |s| s.cyan().to_string())
}

/// Session state name, colored by how usable the camera is.
pub fn state(state: SessionState) -> String {
    let name = state.as_str();
    match state {
        SessionState::Running => paint(Stream::Stdout, name, |s| s.green().bold().to_string()),
        SessionState::PermissionPending => paint(Stream::Stdout, name, |s| s.yellow().to_string()),
        SessionState::PermissionDenied => {
            paint(Stream::Stdout, name, |s| s.red().bold().to_string())
        }
        SessionState::Uninitialized | SessionState::Stopped => {
            paint(Stream::Stdout, name, |s| s.dimmed().to_string())
        }
        SessionState::Configured => name.to_string(),
    }
}

