use sentitrade::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber: console layer plus an optional daily file.
///
/// The returned guard flushes the file writer and must outlive the run.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let log_dir = config
        .dir
        .clone()
        .or_else(|| std::env::var("SENTITRADE_LOG_DIR").ok().map(Into::into));

    // `tracing_appender::rolling::daily` panics if it can't create the
    // initial log file, so writability is checked first.
    let mut guard = None;
    let file_layer = match log_dir {
        Some(dir) if std::fs::create_dir_all(&dir).is_ok() => {
            let test_path = dir.join(".sentitrade_write_test");
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&test_path)
            {
                Ok(_) => {
                    let _ = std::fs::remove_file(&test_path);
                    let file_appender = tracing_appender::rolling::daily(&dir, "sentitrade.log");
                    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
                    guard = Some(file_guard);
                    eprintln!("Logging to: {}/sentitrade.log", dir.display());

                    Some(
                        tracing_subscriber::fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(false)
                            .with_target(true),
                    )
                }
                Err(e) => {
                    eprintln!(
                        "Warning: Could not write to log directory {} ({}), file logging disabled",
                        dir.display(),
                        e
                    );
                    None
                }
            }
        }
        Some(dir) => {
            eprintln!(
                "Warning: Could not create log directory {}, file logging disabled",
                dir.display()
            );
            None
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init();
    }

    guard
}
