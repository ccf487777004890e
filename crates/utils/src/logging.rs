//! provides logging helpers

use std::path::Path;

use anyhow::anyhow;
use anyhow::Context;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

const MAX_LOG_FILES: usize = 3;

fn env_filter() -> filter::EnvFilter {
    filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy()
}

/// initiate the global tracing subscriber
///
/// Events always go to stderr. When `log_file` is set they are also written to
/// a daily-rolling file next to it; keep the returned guard alive until exit so
/// buffered lines get flushed.
pub fn init(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = rolling_writer(path)?;
            let file_layer = layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter());
            (Some(file_layer), Some(guard))
        }
        None => (None, None),
    };

    registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install global tracing subscriber")?;

    Ok(guard)
}

fn rolling_writer(path: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    let appender = rolling_appender(path)?;
    Ok(tracing_appender::non_blocking(appender))
}

fn rolling_appender(path: &Path) -> anyhow::Result<RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("failed to create rolling file appender in {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn rejects_path_without_file_name() {
        let err = rolling_appender(Path::new("/")).expect_err("root has no file name");
        assert!(err.to_string().contains("no file name"));
    }

    #[test]
    fn appender_writes_into_parent_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut appender =
            rolling_appender(&dir.path().join("operator.log")).expect("appender builds");

        appender.write_all(b"hello\n").expect("write succeeds");
        appender.flush().expect("flush succeeds");

        let written: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(
            written.iter().any(|name| name.starts_with("operator.log")),
            "unexpected files: {written:?}"
        );
    }
}
