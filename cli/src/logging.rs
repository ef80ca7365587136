use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE_NAME: &str = "tickertape.log";
const DEFAULT_FILTER: &str = "tickertape_core=info,tickertape_tui=info,tickertape_cli=info";

/// Routes `tracing` output to `<log_dir>/tickertape.log`. The terminal belongs to the ticker.
///
/// Logs are flushed when the returned guard is dropped.
pub fn init(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("create log directory {}", log_dir.display()))?;

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let path = log_dir.join(LOG_FILE_NAME);
    let log_file = options
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let (writer, guard) = non_blocking(log_file);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;
    Ok(guard)
}
