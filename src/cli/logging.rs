//! Subscriber setup for the command-line front end

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{LOG_ENV_VAR, LogConfig};

/// Install the global subscriber.
///
/// `MATCHSPEC_LOG` wins over the configured level. Logs go to stderr unless a
/// file is configured; the returned guard flushes the file writer and must be
/// kept alive until the process exits.
pub fn init(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log level '{}'", config.level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let Some(path) = &config.file else {
        let result = if config.json {
            builder.json().with_writer(std::io::stderr).try_init()
        } else {
            builder.with_writer(std::io::stderr).try_init()
        };
        result.map_err(|e| anyhow::anyhow!(e))?;
        return Ok(None);
    };

    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    let file_name = path
        .file_name()
        .with_context(|| format!("log file path has no file name: {}", path.display()))?;

    let appender = tracing_appender::rolling::never(dir.unwrap_or_else(|| Path::new(".")), file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let result = if config.json {
        builder.json().with_ansi(false).with_writer(writer).try_init()
    } else {
        builder.with_ansi(false).with_writer(writer).try_init()
    };
    result.map_err(|e| anyhow::anyhow!(e))?;

    Ok(Some(guard))
}
