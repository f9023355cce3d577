use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;

/// File-only subscriber: the terminal is owned by the UI, so nothing is
/// written to stdout. JSON lines in production, plain text when debugging.
pub fn get_subscriber(
    debug: bool,
    log_dir: &Path,
) -> (impl tracing::Subscriber + Send + Sync, WorkerGuard) {
    let env_filter = if debug {
        "trace".to_string()
    } else {
        "info".to_string()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(env_filter));

    let file_appender = tracing_appender::rolling::daily(log_dir, "mood_diary.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_log = if !debug {
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking.clone()),
        )
    } else {
        None
    };
    let text_log = if debug {
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
    } else {
        None
    };

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(json_log)
        .with(text_log);

    (subscriber, guard)
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered log lines are lost.
pub fn init_subscriber(
    debug: bool,
    log_dir: &Path,
) -> Result<WorkerGuard, tracing::subscriber::SetGlobalDefaultError> {
    let (subscriber, guard) = get_subscriber(debug, log_dir);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}
