use crate::error::ConfigError;
use crate::settings::{LogFormat, LoggingSettings};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "auctions.log";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. When a log directory
/// is configured the returned guard must be held until shutdown, otherwise
/// buffered lines are lost.
pub fn init(settings: &LoggingSettings) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::rfc_3339());

    let (result, guard) = match (&settings.directory, settings.format) {
        (Some(dir), format) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = builder.with_writer(writer).with_ansi(false);
            let result = match format {
                LogFormat::Full => builder.try_init(),
                LogFormat::Compact => builder.compact().try_init(),
            };
            (result, Some(guard))
        }
        (None, LogFormat::Full) => (builder.try_init(), None),
        (None, LogFormat::Compact) => (builder.compact().try_init(), None),
    };

    result.map_err(|e| ConfigError::LoggingError(e.to_string()))?;
    Ok(guard)
}
