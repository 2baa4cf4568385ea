use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    File(PathBuf),
    Discard,
}

pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// An explicit directive wins, then `RUST_LOG`, then the `-v` count.
pub fn build_filter(verbosity: u8, directive: Option<&str>) -> Result<EnvFilter, String> {
    if let Some(directive) = directive.map(str::trim).filter(|d| !d.is_empty()) {
        return EnvFilter::try_new(directive)
            .map_err(|e| format!("invalid log level '{directive}': {e}"));
    }
    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity))))
}

pub fn init(verbosity: u8, directive: Option<&str>, sink: LogSink) -> Result<(), String> {
    let filter = build_filter(verbosity, directive)?;
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match sink {
        LogSink::Stderr => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| format!("failed to open log file '{}': {e}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        LogSink::Discard => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::sink))
            .try_init(),
    };
    // a subscriber may already be installed (tests, embedding)
    if let Err(e) = installed {
        tracing::debug!("tracing subscriber already set: {e}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(9), "trace");
    }

    #[test]
    fn explicit_directive_is_validated() {
        assert!(build_filter(0, Some("dserve_admin=debug")).is_ok());
        assert!(build_filter(0, Some("dserve_admin=loud")).is_err());
        assert!(build_filter(1, Some("  ")).is_ok());
    }

    #[test]
    fn file_sink_creates_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.log");
        init(1, Some("info"), LogSink::File(path.clone())).unwrap();
        assert!(path.exists());
    }
}
