use std::path::PathBuf;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Initialise logging. The level is `info` unless `debug` is set, in which
/// case it starts at `debug` and `RUST_LOG` may override it.
///
/// With `log_file` every line is also appended to that file.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    // RUST_LOG is ignored outside debug mode so a stray variable in the
    // user's environment cannot make the app chatty.
    let level = if debug { "debug" } else { "info" };
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let file = log_file.and_then(|path| {
        let name = path.file_name()?.to_owned();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Some(tracing_appender::rolling::never(dir, name))
    });

    let installed = match file {
        Some(appender) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stdout.and(appender))
            .try_init(),
        None => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("logger already initialised");
    }
}
