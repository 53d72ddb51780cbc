//! Logging setup for both commands
//!
//! The player owns the terminal, so it logs to a daily-rotated file. The proxy
//! is a plain server process and logs to stdout.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_DIR: &str = ".logs";
const LOG_FILE_PREFIX: &str = "now-playing";
const DEFAULT_FILTER: &str = "now_playing=debug,reqwest=info,warn";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogTarget {
    /// `.logs/now-playing.YYYY-MM-DD`
    File,
    Stdout,
}

/// Initialize the logging system.
///
/// The log level can be controlled via the `RUST_LOG` environment variable;
/// by default this crate logs at DEBUG and everything else at WARN.
pub fn init_logging(target: LogTarget) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match target {
        LogTarget::File => {
            let log_dir = Path::new(LOG_DIR);
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir)?;
            }

            let file_appender = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, LOG_FILE_PREFIX);

            // Non-blocking so a slow disk never stalls the render loop
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The guard flushes on drop; keep it for the whole process
            Box::leak(Box::new(guard));

            let fmt_layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;

            tracing::info!("Logging initialized - logs written to {}/", LOG_DIR);
        }
        LogTarget::Stdout => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true))
                .try_init()?;
        }
    }

    Ok(())
}

/// Log the outcome of an outbound lookup
#[macro_export]
macro_rules! log_api_result {
    ($operation:expr, $result:expr) => {
        match &$result {
            Ok(_) => tracing::info!(operation = $operation, "API request successful"),
            Err(e) => tracing::warn!(operation = $operation, error = %e, "API request failed"),
        }
    };
}

/// Log an outbound lookup with additional context
#[macro_export]
macro_rules! log_api_request {
    ($operation:expr, $($field:tt)*) => {
        tracing::debug!(operation = $operation, $($field)*, "API request started");
    };
}
